use serde::{Deserialize, Serialize};

/// Admission control settings applied by the router before any replay attempt.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Frames with a payload larger than this many bytes are dropped
    pub max_frame_size: usize,
    /// Dotted-decimal IPv4 source address to accept, blank accepts all
    pub source_filter: String,
    /// Dotted-decimal IPv4 destination address to accept, blank accepts all
    pub destination_filter: String,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 1500,
            source_filter: String::new(),
            destination_filter: String::new(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Accept every frame without forwarding it anywhere
    Discard,
    /// Re-inject frames on a named output interface
    Interface,
}

impl Default for SinkKind {
    fn default() -> Self {
        SinkKind::Discard
    }
}

/// Replay and pacing settings for the routing loop.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Retries after the first failed attempt before a frame goes to backup
    pub max_retries: u32,
    /// Sleep `payload_len / 1000` milliseconds after each admitted frame
    pub pacing: bool,
    /// Idle sleep when the capture queue is empty
    pub idle_poll_ms: u64,
    pub sink: SinkKind,
    /// Output interface, only read when `sink` is `interface`
    pub interface: String,
    /// Fail every Nth replay attempt, 0 disables fault injection
    pub fail_every: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            pacing: true,
            idle_poll_ms: 100,
            sink: SinkKind::Discard,
            interface: String::new(),
            fail_every: 0,
        }
    }
}
