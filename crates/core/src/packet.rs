// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Packets: the unit of data exchanged on the graph.
//!
//! - [`Packet`]: either a data packet (zero or more [`BufferSlice`]s plus timing) or a
//!   symbolic marker ([`PacketSymbol::Eos`], [`PacketSymbol::Flush`])
//! - [`BufferSlice`]: a window onto shared byte storage (`bytes::Bytes`)
//! - [`BufferProperties`]: optional per-slice metadata
//!
//! Slices alias their underlying storage: sub-slicing never copies, and cloning a
//! packet only bumps reference counts. When a packet crosses a thread boundary its
//! storage moves with it; [`Packet::transfer_list`] enumerates the distinct
//! underlying buffers involved.

use base64::Engine as _;
use bytes::Bytes;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{PacketFlowError, Result};

/// Timescale used when none is given: timestamps are already in seconds.
pub const DEFAULT_TIMESCALE: u32 = 1;

/// Symbolic markers carried by packets without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketSymbol {
    /// End of stream.
    Eos,
    /// Discard buffered state downstream (seek/reset).
    Flush,
}

/// Per-slice metadata attached by producers (demuxers, decoders).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferProperties {
    /// MIME type of the slice content, e.g. `audio/mpeg`.
    pub mime_type: Option<String>,
    /// Whether the slice starts a decodable unit (sync sample).
    #[serde(default)]
    pub is_keyframe: bool,
    /// Duration of the sample carried by this slice, in the packet's timescale.
    pub sample_duration: Option<u32>,
}

/// Identity of an underlying byte buffer (its base address and length).
///
/// Two slices cut from the same storage report the same `BufferId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId {
    addr: usize,
    len: usize,
}

impl BufferId {
    fn of(buffer: &Bytes) -> Self {
        Self { addr: buffer.as_ptr() as usize, len: buffer.len() }
    }

    /// Size of the identified buffer in bytes.
    pub const fn byte_length(&self) -> usize {
        self.len
    }
}

/// A window `[offset, offset + length)` onto a shared byte buffer.
#[derive(Debug, Clone)]
pub struct BufferSlice {
    buffer: Bytes,
    offset: usize,
    length: usize,
    props: Option<Arc<BufferProperties>>,
}

impl BufferSlice {
    /// Creates a slice covering the whole buffer.
    pub fn new(buffer: impl Into<Bytes>) -> Self {
        let buffer = buffer.into();
        let length = buffer.len();
        Self { buffer, offset: 0, length, props: None }
    }

    /// Creates a slice over `buffer[offset..offset + length]`.
    ///
    /// # Errors
    ///
    /// Returns [`PacketFlowError::Buffer`] if the window exceeds the buffer.
    pub fn from_parts(buffer: impl Into<Bytes>, offset: usize, length: usize) -> Result<Self> {
        let buffer = buffer.into();
        check_window(buffer.len(), offset, length)?;
        Ok(Self { buffer, offset, length, props: None })
    }

    /// Attaches metadata to this slice.
    #[must_use]
    pub fn with_props(mut self, props: BufferProperties) -> Self {
        self.props = Some(Arc::new(props));
        self
    }

    /// Cuts a sub-slice relative to this slice's window. No bytes are copied.
    ///
    /// # Errors
    ///
    /// Returns [`PacketFlowError::Buffer`] if the window exceeds this slice.
    pub fn sub_slice(&self, offset: usize, length: usize) -> Result<Self> {
        check_window(self.length, offset, length)?;
        Ok(Self {
            buffer: self.buffer.clone(),
            offset: self.offset + offset,
            length,
            props: self.props.clone(),
        })
    }

    /// The bytes visible through this slice.
    pub fn data(&self) -> &[u8] {
        &self.buffer[self.offset..self.offset + self.length]
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub const fn len(&self) -> usize {
        self.length
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn props(&self) -> Option<&BufferProperties> {
        self.props.as_deref()
    }

    /// The full underlying storage this slice is cut from.
    pub const fn underlying(&self) -> &Bytes {
        &self.buffer
    }

    pub fn buffer_id(&self) -> BufferId {
        BufferId::of(&self.buffer)
    }
}

fn check_window(available: usize, offset: usize, length: usize) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= available => Ok(()),
        _ => Err(PacketFlowError::Buffer(format!(
            "slice [{offset}, +{length}) exceeds available length {available}"
        ))),
    }
}

impl PartialEq for BufferSlice {
    fn eq(&self, other: &Self) -> bool {
        self.data() == other.data() && self.props() == other.props()
    }
}

impl Serialize for BufferSlice {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Base64 keeps the debug representation JSON friendly
        let mut state = serializer.serialize_struct("BufferSlice", 3)?;
        state.serialize_field(
            "data",
            &base64::engine::general_purpose::STANDARD.encode(self.data()),
        )?;
        state.serialize_field("offset", &self.offset)?;
        state.serialize_field("props", &self.props)?;
        state.end()
    }
}

/// What a packet carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketPayload {
    /// Media data. Most packets carry a single slice.
    Data(SmallVec<[BufferSlice; 1]>),
    /// A symbolic marker without payload.
    Symbol(PacketSymbol),
}

/// The unit of data flowing through sockets.
///
/// # Example
/// ```rust
/// use packetflow_core::packet::{BufferSlice, Packet};
///
/// let storage = bytes::Bytes::from_static(b"abcdef");
/// let head = BufferSlice::new(storage.clone()).sub_slice(0, 2).unwrap();
/// let tail = BufferSlice::new(storage).sub_slice(2, 4).unwrap();
/// let packet = Packet::from_slices(vec![head, tail], 3000).with_timescale(1000);
///
/// assert_eq!(packet.byte_length(), 6);
/// assert!((packet.normalized_dts() - 3.0).abs() < f64::EPSILON);
/// // Both slices share one underlying buffer
/// assert_eq!(packet.transfer_list().len(), 1);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Packet {
    payload: PacketPayload,
    dts: i64,
    cto: i64,
    timescale: u32,
    #[serde(skip)]
    created_at: Instant,
}

impl Packet {
    /// Creates a data packet from slices and a decode timestamp.
    pub fn from_slices(slices: impl IntoIterator<Item = BufferSlice>, dts: i64) -> Self {
        Self::with_payload(PacketPayload::Data(slices.into_iter().collect()), dts)
    }

    /// Creates a single-slice data packet covering `data`.
    pub fn from_bytes(data: impl Into<Bytes>, dts: i64) -> Self {
        Self::from_slices([BufferSlice::new(data)], dts)
    }

    /// Creates a symbolic packet.
    pub fn symbol(symbol: PacketSymbol) -> Self {
        Self::with_payload(PacketPayload::Symbol(symbol), 0)
    }

    pub fn eos() -> Self {
        Self::symbol(PacketSymbol::Eos)
    }

    pub fn flush() -> Self {
        Self::symbol(PacketSymbol::Flush)
    }

    fn with_payload(payload: PacketPayload, dts: i64) -> Self {
        Self { payload, dts, cto: 0, timescale: DEFAULT_TIMESCALE, created_at: Instant::now() }
    }

    /// Sets the composition time offset (PTS - DTS).
    #[must_use]
    pub fn with_cto(mut self, cto: i64) -> Self {
        self.cto = cto;
        self
    }

    /// Declares the timescale the timestamps are expressed in, without rescaling.
    #[must_use]
    pub fn with_timescale(mut self, timescale: u32) -> Self {
        self.timescale = timescale.max(1);
        self
    }

    /// Converts the timestamps to another timescale (rounding to nearest tick).
    #[must_use]
    pub fn rescaled(mut self, timescale: u32) -> Self {
        let timescale = timescale.max(1);
        self.dts = rescale(self.dts, self.timescale, timescale);
        self.cto = rescale(self.cto, self.timescale, timescale);
        self.timescale = timescale;
        self
    }

    pub const fn payload(&self) -> &PacketPayload {
        &self.payload
    }

    /// The marker carried by a symbolic packet.
    pub const fn symbol_value(&self) -> Option<PacketSymbol> {
        match self.payload {
            PacketPayload::Symbol(symbol) => Some(symbol),
            PacketPayload::Data(_) => None,
        }
    }

    pub const fn is_symbolic(&self) -> bool {
        matches!(self.payload, PacketPayload::Symbol(_))
    }

    pub const fn is_eos(&self) -> bool {
        matches!(self.payload, PacketPayload::Symbol(PacketSymbol::Eos))
    }

    pub const fn is_flush(&self) -> bool {
        matches!(self.payload, PacketPayload::Symbol(PacketSymbol::Flush))
    }

    /// Decode timestamp in ticks of [`Packet::timescale`].
    pub const fn dts(&self) -> i64 {
        self.dts
    }

    pub const fn cto(&self) -> i64 {
        self.cto
    }

    /// Presentation timestamp in ticks (`dts + cto`).
    pub const fn pts(&self) -> i64 {
        self.dts.saturating_add(self.cto)
    }

    pub const fn timescale(&self) -> u32 {
        self.timescale
    }

    /// Decode timestamp in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn normalized_dts(&self) -> f64 {
        self.dts as f64 / f64::from(self.timescale)
    }

    /// When this packet was constructed.
    pub const fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Iterates the slices. Repeatable; symbolic packets yield nothing.
    pub fn slices(&self) -> std::slice::Iter<'_, BufferSlice> {
        match &self.payload {
            PacketPayload::Data(slices) => slices.iter(),
            PacketPayload::Symbol(_) => <&[BufferSlice]>::default().iter(),
        }
    }

    pub fn for_each_buffer_slice(&self, f: impl FnMut(&BufferSlice)) {
        self.slices().for_each(f);
    }

    /// Total payload size in bytes across all slices.
    pub fn byte_length(&self) -> usize {
        self.slices().map(BufferSlice::len).sum()
    }

    /// The distinct underlying buffers referenced by this packet's slices, in first-seen order.
    pub fn transfer_list(&self) -> Vec<Bytes> {
        let mut seen = HashSet::new();
        self.slices()
            .filter(|slice| seen.insert(slice.buffer_id()))
            .map(|slice| slice.underlying().clone())
            .collect()
    }

    /// Identities of the distinct underlying buffers, in first-seen order.
    pub fn buffer_ids(&self) -> Vec<BufferId> {
        let mut seen = HashSet::new();
        self.slices().map(BufferSlice::buffer_id).filter(|id| seen.insert(*id)).collect()
    }
}

/// Content equality: payload and timing, ignoring the creation instant.
impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
            && self.dts == other.dts
            && self.cto == other.cto
            && self.timescale == other.timescale
    }
}

#[allow(clippy::cast_possible_truncation)]
fn rescale(value: i64, from: u32, to: u32) -> i64 {
    if from == to {
        return value;
    }
    let numerator = i128::from(value) * i128::from(to);
    let from = i128::from(from);
    // Round half away from zero
    let rounded = if numerator >= 0 {
        (numerator + from / 2) / from
    } else {
        (numerator - from / 2) / from
    };
    rounded as i64
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_slice_aliases_storage() {
        let slice = BufferSlice::new(vec![1u8, 2, 3, 4, 5, 6]);
        let sub = slice.sub_slice(2, 3).unwrap();
        assert_eq!(sub.data(), &[3, 4, 5]);
        assert_eq!(sub.offset(), 2);
        assert_eq!(sub.buffer_id(), slice.buffer_id());

        let nested = sub.sub_slice(1, 2).unwrap();
        assert_eq!(nested.data(), &[4, 5]);
        assert_eq!(nested.offset(), 3);
    }

    #[test]
    fn test_slice_bounds_are_checked() {
        let slice = BufferSlice::new(vec![0u8; 4]);
        assert!(slice.sub_slice(3, 2).is_err());
        assert!(slice.sub_slice(usize::MAX, 2).is_err());
        assert!(BufferSlice::from_parts(vec![0u8; 4], 1, 3).is_ok());
        assert!(matches!(
            BufferSlice::from_parts(vec![0u8; 4], 2, 3),
            Err(PacketFlowError::Buffer(_))
        ));
    }

    #[test]
    fn test_byte_length_and_repeatable_iteration() {
        let packet = Packet::from_slices(
            [BufferSlice::new(vec![0u8; 10]), BufferSlice::new(vec![0u8; 5])],
            0,
        );
        assert_eq!(packet.byte_length(), 15);

        // Collaborators walk the slices more than once
        let mut first = 0;
        packet.for_each_buffer_slice(|s| first += s.len());
        let second: usize = packet.slices().map(BufferSlice::len).sum();
        assert_eq!(first, second);
    }

    #[test]
    fn test_symbolic_packets_have_no_payload() {
        let eos = Packet::eos();
        assert!(eos.is_symbolic());
        assert!(eos.is_eos());
        assert!(!eos.is_flush());
        assert_eq!(eos.byte_length(), 0);
        assert_eq!(eos.slices().count(), 0);
        assert!(eos.transfer_list().is_empty());
        assert_eq!(Packet::flush().symbol_value(), Some(PacketSymbol::Flush));
    }

    #[test]
    fn test_transfer_list_is_distinct() {
        let shared = Bytes::from(vec![7u8; 32]);
        let other = Bytes::from(vec![9u8; 8]);
        let a = BufferSlice::new(shared.clone()).sub_slice(0, 16).unwrap();
        let b = BufferSlice::new(other.clone());
        let c = BufferSlice::new(shared).sub_slice(16, 16).unwrap();
        let packet = Packet::from_slices([a, b, c], 0);

        let list = packet.transfer_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].len(), 32);
        assert_eq!(list[1], other);
        assert_eq!(packet.buffer_ids().len(), 2);
    }

    #[test]
    fn test_timing() {
        let packet = Packet::from_bytes(vec![0u8], 90_000).with_timescale(90_000).with_cto(3000);
        assert_eq!(packet.normalized_dts(), 1.0);
        assert_eq!(packet.pts(), 93_000);

        let ms = packet.rescaled(1000);
        assert_eq!(ms.dts(), 1000);
        assert_eq!(ms.cto(), 33);
        assert_eq!(ms.timescale(), 1000);
    }

    #[test]
    fn test_pts_saturates_at_extreme_timestamps() {
        let late = Packet::from_bytes(vec![0u8], i64::MAX).with_cto(10);
        assert_eq!(late.pts(), i64::MAX);
        let early = Packet::from_bytes(vec![0u8], i64::MIN).with_cto(-10);
        assert_eq!(early.pts(), i64::MIN);
    }

    #[test]
    fn test_content_equality_ignores_creation_instant() {
        let a = Packet::from_bytes(vec![1u8, 2, 3], 42);
        let b = Packet::from_bytes(vec![1u8, 2, 3], 42);
        assert_eq!(a, b);
        assert_ne!(a, Packet::from_bytes(vec![1u8, 2, 3], 43));
    }

    #[test]
    fn test_serialize_uses_base64() {
        let packet = Packet::from_slices(
            [BufferSlice::new(b"hi".to_vec()).with_props(BufferProperties {
                mime_type: Some("text/plain".to_string()),
                ..Default::default()
            })],
            5,
        );
        let json = serde_json::to_value(&packet).unwrap();
        assert_eq!(json["payload"]["data"][0]["data"], "aGk=");
        assert_eq!(json["payload"]["data"][0]["props"]["mime_type"], "text/plain");
        assert_eq!(json["dts"], 5);
    }
}
