// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Runtime-adjustable option records.
//!
//! Components that can be retuned while packets flow implement [`Configurable`]:
//! they expose a typed options record, accept partial JSON patches, and react in
//! [`Configurable::apply_options`] once the merged record has been validated.

use crate::error::Result;
use crate::helpers::config_helpers::merge_options;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait Configurable {
    type Options: Clone + Serialize + DeserializeOwned;

    /// Snapshot of the current options.
    fn options(&self) -> Self::Options;

    /// Installs a complete options record. Called after every change.
    ///
    /// # Errors
    ///
    /// Implementations reject invalid records with `PacketFlowError::Configuration`,
    /// leaving the previous options in place.
    fn apply_options(&self, options: Self::Options) -> Result<()>;

    /// Merges `patch` into the current options and applies the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the patch is malformed or the merged record is rejected.
    fn set_options(&self, patch: &serde_json::Value) -> Result<Self::Options> {
        let merged = merge_options(&self.options(), patch)?;
        self.apply_options(merged.clone())?;
        Ok(merged)
    }
}
