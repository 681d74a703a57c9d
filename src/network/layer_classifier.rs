//! Outer-layer classification of raw link-layer frames.
//!
//! Only the first few headers are looked at: Ethernet, then IPv4 or IPv6, then for IPv4 the
//! transport protocol number. Nothing past the transport protocol field is decoded.

use std::net::Ipv4Addr;

use super::types::{Layer, LayerStack};
use crate::data_capture::types::Frame;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const IPV4_MIN_HEADER_LEN: usize = 20;

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86DD;

const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;

// Offsets inside the IPv4 header
const IPV4_PROTOCOL_OFFSET: usize = 9;
const IPV4_SOURCE_OFFSET: usize = 12;
const IPV4_DESTINATION_OFFSET: usize = 16;

/// Stateless classifier turning frame bytes into a [`LayerStack`].
///
/// Classification never fails: truncated or unknown headers simply produce fewer layers.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayerClassifier;

impl LayerClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, frame: &Frame) -> LayerStack {
        self.classify_bytes(frame.payload())
    }

    /// Classifies a raw buffer, innermost layer first.
    pub fn classify_bytes(&self, data: &[u8]) -> LayerStack {
        let Some(ethertype) = ethertype(data) else {
            return LayerStack::empty();
        };

        let layers = match ethertype {
            ETHERTYPE_IPV4 => match ipv4_header(data).map(|ip| ip[IPV4_PROTOCOL_OFFSET]) {
                Some(IPPROTO_TCP) => vec![Layer::TCP, Layer::IPv4, Layer::Ethernet],
                Some(IPPROTO_UDP) => vec![Layer::UDP, Layer::IPv4, Layer::Ethernet],
                _ => vec![Layer::IPv4, Layer::Ethernet],
            },
            ETHERTYPE_IPV6 => vec![Layer::IPv6, Layer::Ethernet],
            _ => Vec::new(),
        };

        LayerStack::from_innermost(layers)
    }

    /// Source and destination of an Ethernet/IPv4 frame carrying a complete IPv4 header.
    pub fn ipv4_addresses(&self, data: &[u8]) -> Option<(Ipv4Addr, Ipv4Addr)> {
        if ethertype(data)? != ETHERTYPE_IPV4 {
            return None;
        }
        let ip = ipv4_header(data)?;

        let src = read_ipv4(&ip[IPV4_SOURCE_OFFSET..IPV4_SOURCE_OFFSET + 4]);
        let dst = read_ipv4(&ip[IPV4_DESTINATION_OFFSET..IPV4_DESTINATION_OFFSET + 4]);
        Some((src, dst))
    }
}

fn ethertype(data: &[u8]) -> Option<u16> {
    if data.len() < ETHERNET_HEADER_LEN {
        return None;
    }
    Some(u16::from_be_bytes([data[12], data[13]]))
}

fn ipv4_header(data: &[u8]) -> Option<&[u8]> {
    data.get(ETHERNET_HEADER_LEN..ETHERNET_HEADER_LEN + IPV4_MIN_HEADER_LEN)
}

fn read_ipv4(bytes: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3])
}
