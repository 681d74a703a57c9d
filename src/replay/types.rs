use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

use crate::configuration::config::Config;
use crate::data_capture::types::Frame;
use crate::error_handling::types::ConfigError;

/// Why admission control refused a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DropReason {
    Oversized { len: usize, limit: usize },
    SourceFiltered,
    DestinationFiltered,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Oversized { len, limit } => {
                write!(f, "oversized ({} bytes, limit {})", len, limit)
            }
            DropReason::SourceFiltered => write!(f, "source address filtered"),
            DropReason::DestinationFiltered => write!(f, "destination address filtered"),
        }
    }
}

/// Terminal state of one frame after routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RouteOutcome {
    Dropped(DropReason),
    Replayed { attempts: u32 },
    BackedUp { attempts: u32 },
}

impl RouteOutcome {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, RouteOutcome::Dropped(_))
    }
}

/// Size limit plus optional exact-match address filters.
///
/// A blank filter accepts every frame. A set filter only accepts frames whose extracted address
/// equals it, so frames without an IPv4 address never pass a set filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionPolicy {
    pub max_frame_size: usize,
    pub source: Option<Ipv4Addr>,
    pub destination: Option<Ipv4Addr>,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            max_frame_size: 1500,
            source: None,
            destination: None,
        }
    }
}

impl AdmissionPolicy {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            max_frame_size: config.admission.max_frame_size,
            source: config.source_filter()?,
            destination: config.destination_filter()?,
        })
    }

    pub fn admit(&self, frame: &Frame) -> Result<(), DropReason> {
        if frame.len() > self.max_frame_size {
            return Err(DropReason::Oversized {
                len: frame.len(),
                limit: self.max_frame_size,
            });
        }
        if let Some(source) = self.source {
            if frame.source_address() != Some(source) {
                return Err(DropReason::SourceFiltered);
            }
        }
        if let Some(destination) = self.destination {
            if frame.destination_address() != Some(destination) {
                return Err(DropReason::DestinationFiltered);
            }
        }
        Ok(())
    }
}

/// Per-router counters, returned when the routing loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub routed: u64,
    pub replayed: u64,
    pub backed_up: u64,
    pub dropped: u64,
    pub replay_attempts: u64,
}

impl RouterStats {
    pub(crate) fn record(&mut self, outcome: &RouteOutcome) {
        self.routed += 1;
        match outcome {
            RouteOutcome::Dropped(_) => self.dropped += 1,
            RouteOutcome::Replayed { attempts } => {
                self.replayed += 1;
                self.replay_attempts += u64::from(*attempts);
            }
            RouteOutcome::BackedUp { attempts } => {
                self.backed_up += 1;
                self.replay_attempts += u64::from(*attempts);
            }
        }
    }
}
