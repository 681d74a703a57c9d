//! Common data types used across the data_capture subsystem.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::network::layer_classifier::LayerClassifier;

/// Largest payload a single frame can carry.
pub const MAX_FRAME_LEN: usize = 65535;

/// One captured unit of raw link-layer data plus its capture metadata.
///
/// Frames are read-only once built; they move by value from the capture queue to exactly one
/// terminal queue, or are dropped by admission control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    id: u64,
    captured_at: DateTime<Utc>,
    payload: Vec<u8>,
    source_address: Option<Ipv4Addr>,
    destination_address: Option<Ipv4Addr>,
}

impl Frame {
    /// Builds a frame, extracting IPv4 addresses when the payload carries a complete
    /// Ethernet + IPv4 header. Payloads longer than [`MAX_FRAME_LEN`] are truncated.
    pub fn new(id: u64, captured_at: DateTime<Utc>, mut payload: Vec<u8>) -> Self {
        payload.truncate(MAX_FRAME_LEN);
        let addresses = LayerClassifier::new().ipv4_addresses(&payload);

        Self {
            id,
            captured_at,
            payload,
            source_address: addresses.map(|(src, _)| src),
            destination_address: addresses.map(|(_, dst)| dst),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn source_address(&self) -> Option<Ipv4Addr> {
        self.source_address
    }

    pub fn destination_address(&self) -> Option<Ipv4Addr> {
        self.destination_address
    }
}

/// Counters kept by a frame source, in the spirit of kernel capture statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    /// Buffers successfully received
    pub received: u64,
    /// Acquisition calls that failed and were skipped
    pub read_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ethernet_frame, ipv4_frame, IpProto};

    #[test]
    fn test_ipv4_frame_gets_addresses() {
        let frame = Frame::new(1, Utc::now(), ipv4_frame(IpProto::Tcp, 100));

        assert_eq!(frame.id(), 1);
        assert_eq!(frame.len(), 100);
        assert_eq!(frame.source_address(), Some(Ipv4Addr::new(192, 168, 1, 10)));
        assert_eq!(frame.destination_address(), Some(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn test_non_ipv4_frame_has_no_addresses() {
        let frame = Frame::new(2, Utc::now(), ethernet_frame(0x86DD, 100));

        assert_eq!(frame.source_address(), None);
        assert_eq!(frame.destination_address(), None);
    }

    #[test]
    fn test_short_frame_has_no_addresses() {
        let frame = Frame::new(3, Utc::now(), vec![0u8; 10]);

        assert_eq!(frame.source_address(), None);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_oversized_payload_is_truncated() {
        let frame = Frame::new(4, Utc::now(), vec![0u8; MAX_FRAME_LEN + 10]);
        assert_eq!(frame.len(), MAX_FRAME_LEN);
    }
}
