// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Utility functions shared across the crate.
//!
//! - [`config_helpers`]: Parse option records from JSON and merge partial patches

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the guard if a previous holder panicked.
///
/// All state behind these mutexes stays consistent between statements, so a
/// poisoned lock is safe to keep using.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Helper functions for parsing option records from JSON values.
pub mod config_helpers {
    use crate::error::PacketFlowError;
    use serde::de::DeserializeOwned;
    use serde::Serialize;

    /// Parses options from an optional JSON value, using defaults if not provided.
    ///
    /// # Errors
    ///
    /// Returns `PacketFlowError::Configuration` if `params` is present but does not
    /// deserialize into `T`.
    pub fn parse_config_optional<T>(
        params: Option<&serde_json::Value>,
    ) -> Result<T, PacketFlowError>
    where
        T: DeserializeOwned + Default,
    {
        match params {
            None | Some(serde_json::Value::Null) => Ok(T::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                PacketFlowError::Configuration(format!("Failed to parse config: {e}"))
            }),
        }
    }

    /// Parses options from an optional JSON value, returning an error if not provided.
    ///
    /// # Errors
    ///
    /// Returns `PacketFlowError::Configuration` if `params` is `None` or if deserialization fails.
    pub fn parse_config_required<T>(
        params: Option<&serde_json::Value>,
    ) -> Result<T, PacketFlowError>
    where
        T: DeserializeOwned,
    {
        let value = params
            .ok_or_else(|| PacketFlowError::Configuration("Configuration required".to_string()))?
            .clone();
        serde_json::from_value(value)
            .map_err(|e| PacketFlowError::Configuration(format!("Failed to parse config: {e}")))
    }

    /// Applies a partial JSON object on top of `current`, field by field.
    ///
    /// Fields absent from `patch` keep their current value. `null` patches are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PacketFlowError::Configuration` if `patch` is neither an object nor `null`,
    /// or if the merged record fails to deserialize.
    pub fn merge_options<T>(current: &T, patch: &serde_json::Value) -> Result<T, PacketFlowError>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut merged = serde_json::to_value(current).map_err(|e| {
            PacketFlowError::Configuration(format!("Failed to serialize current options: {e}"))
        })?;

        match (merged.as_object_mut(), patch) {
            (_, serde_json::Value::Null) => {},
            (Some(target), serde_json::Value::Object(fields)) => {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            },
            _ => {
                return Err(PacketFlowError::Configuration(format!(
                    "Option patch must be a JSON object, got {patch}"
                )));
            },
        }

        serde_json::from_value(merged)
            .map_err(|e| PacketFlowError::Configuration(format!("Failed to apply options: {e}")))
    }
}
