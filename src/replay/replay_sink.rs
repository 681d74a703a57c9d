//! Replay actions: where an admitted frame is sent.

use std::time::Duration;

use log::{debug, info, trace};
use socket2::Socket;

use crate::configuration::types::{ReplayConfig, SinkKind};
use crate::data_capture::types::Frame;
use crate::error_handling::types::ReplayError;
use crate::network::packet_socket::open_packet_socket;

/// One replay attempt for one frame. An `Err` counts as a failed attempt; the router decides
/// whether to retry.
pub trait ReplaySink: Send {
    fn replay(&mut self, frame: &Frame) -> Result<(), ReplayError>;

    fn name(&self) -> &str;
}

impl<S: ReplaySink + ?Sized> ReplaySink for Box<S> {
    fn replay(&mut self, frame: &Frame) -> Result<(), ReplayError> {
        (**self).replay(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Accepts every frame and forwards it nowhere.
#[derive(Debug, Default)]
pub struct DiscardSink {
    forwarded: u64,
}

impl DiscardSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }
}

impl ReplaySink for DiscardSink {
    fn replay(&mut self, frame: &Frame) -> Result<(), ReplayError> {
        self.forwarded += 1;
        trace!("Discarded frame #{} ({} bytes)", frame.id(), frame.len());
        Ok(())
    }

    fn name(&self) -> &str {
        "discard"
    }
}

/// Upper bound on one blocking send. A timed out send is a failed attempt.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Re-injects frames unchanged on an output interface through an `AF_PACKET` socket.
#[derive(Debug)]
pub struct InterfaceSink {
    interface: String,
    socket: Socket,
}

impl InterfaceSink {
    pub fn open(interface: &str) -> Result<Self, ReplayError> {
        let socket = open_packet_socket(interface, None)
            .and_then(|socket| {
                socket.set_write_timeout(Some(SEND_TIMEOUT))?;
                Ok(socket)
            })
            .map_err(|e| ReplayError::Unavailable(format!("{}: {}", interface, e)))?;

        info!("Replay sink bound to {}", interface);
        Ok(Self {
            interface: interface.to_string(),
            socket,
        })
    }
}

impl ReplaySink for InterfaceSink {
    fn replay(&mut self, frame: &Frame) -> Result<(), ReplayError> {
        let sent = self.socket.send(frame.payload()).map_err(ReplayError::Send)?;
        if sent != frame.len() {
            return Err(ReplayError::Send(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("short write: {} of {} bytes", sent, frame.len()),
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.interface
    }
}

/// Wraps a sink and fails every `fail_every`-th attempt before it reaches the inner sink.
///
/// Gives the backup path a deterministic failure mode. `fail_every = 1` fails every attempt.
#[derive(Debug)]
pub struct FaultInjector<S: ReplaySink> {
    inner: S,
    fail_every: u64,
    attempts: u64,
}

impl<S: ReplaySink> FaultInjector<S> {
    pub fn new(inner: S, fail_every: u64) -> Self {
        Self {
            inner,
            fail_every,
            attempts: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ReplaySink> ReplaySink for FaultInjector<S> {
    fn replay(&mut self, frame: &Frame) -> Result<(), ReplayError> {
        self.attempts += 1;
        if self.fail_every > 0 && self.attempts % self.fail_every == 0 {
            debug!("Injecting replay fault on attempt {}", self.attempts);
            return Err(ReplayError::Injected(self.attempts));
        }
        self.inner.replay(frame)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Builds the sink described by the replay configuration.
pub fn build_sink(config: &ReplayConfig) -> Result<Box<dyn ReplaySink>, ReplayError> {
    let sink: Box<dyn ReplaySink> = match config.sink {
        SinkKind::Discard => Box::new(DiscardSink::new()),
        SinkKind::Interface => Box::new(InterfaceSink::open(config.interface.trim())?),
    };

    if config.fail_every > 0 {
        info!("Replay fault injection enabled: every {} attempts", config.fail_every);
        return Ok(Box::new(FaultInjector::new(sink, config.fail_every)));
    }
    Ok(sink)
}
