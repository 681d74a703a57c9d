//! Frame builders and scripted fakes for the capture and replay boundaries.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{LevelFilter, Log, Metadata, Record};

use crate::data_capture::frame_source::FrameSource;
use crate::data_capture::types::Frame;
use crate::error_handling::types::{CaptureError, ReplayError};
use crate::replay::replay_sink::ReplaySink;

/// Test logger: prints through `env_logger` and keeps every message, tagged with the thread
/// that logged it.
pub struct CapturedLogs {
    inner: env_logger::Logger,
    records: Mutex<Vec<(ThreadId, String)>>,
}

impl CapturedLogs {
    pub fn messages_on_current_thread(&self) -> Vec<String> {
        let current = thread::current().id();
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == current)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Log for CapturedLogs {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.records
            .lock()
            .unwrap()
            .push((thread::current().id(), record.args().to_string()));
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

static LOGS: OnceLock<CapturedLogs> = OnceLock::new();

/// Installs the capturing logger once per test binary and returns it.
pub fn init_logging() -> &'static CapturedLogs {
    let logs = LOGS.get_or_init(|| CapturedLogs {
        inner: env_logger::Builder::from_default_env().is_test(true).build(),
        records: Mutex::new(Vec::new()),
    });
    if log::set_logger(logs).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
    logs
}

pub enum IpProto {
    Tcp,
    Udp,
    Other(u8),
}

/// Zero-filled Ethernet frame of `len` bytes with the given ethertype.
pub fn ethernet_frame(ethertype: u16, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len.max(14)];
    data[0..6].copy_from_slice(&[0xff; 6]);
    data[6..12].copy_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    data[12..14].copy_from_slice(&ethertype.to_be_bytes());
    data.truncate(len);
    data
}

/// Ethernet + IPv4 frame from 192.168.1.10 to 10.0.0.1, padded or truncated to `len` bytes.
pub fn ipv4_frame(proto: IpProto, len: usize) -> Vec<u8> {
    let mut data = ethernet_frame(0x0800, len.max(34));
    let ip = &mut data[14..34];
    ip[0] = 0x45;
    ip[8] = 64;
    ip[9] = match proto {
        IpProto::Tcp => 6,
        IpProto::Udp => 17,
        IpProto::Other(p) => p,
    };
    ip[12..16].copy_from_slice(&[192, 168, 1, 10]);
    ip[16..20].copy_from_slice(&[10, 0, 0, 1]);
    data.truncate(len);
    data
}

pub fn frame_of_len(id: u64, len: usize) -> Frame {
    Frame::new(id, Utc::now(), ipv4_frame(IpProto::Tcp, len))
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

pub enum SourceStep {
    Frame(Vec<u8>),
    ReadError,
    Fatal,
}

/// Frame source replaying a fixed script, then reporting poll timeouts forever.
pub struct ScriptedSource {
    steps: VecDeque<SourceStep>,
    fail_bind: bool,
    interface: Option<String>,
    receive_calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<SourceStep>) -> Self {
        Self {
            steps: steps.into(),
            fail_bind: false,
            interface: None,
            receive_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_bind() -> Self {
        Self {
            fail_bind: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn receive_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.receive_calls)
    }
}

impl FrameSource for ScriptedSource {
    fn bind(&mut self, interface: &str) -> Result<(), CaptureError> {
        if self.fail_bind {
            return Err(CaptureError::Bind(
                interface.to_string(),
                io::Error::new(io::ErrorKind::NotFound, "no such device"),
            ));
        }
        self.interface = Some(interface.to_string());
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<Option<usize>, CaptureError> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(SourceStep::Frame(data)) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(Some(data.len()))
            }
            Some(SourceStep::ReadError) => Err(CaptureError::Read(io::Error::new(
                io::ErrorKind::Other,
                "scripted read failure",
            ))),
            Some(SourceStep::Fatal) => Err(CaptureError::NotBound),
            None => {
                thread::sleep(Duration::from_millis(1));
                Ok(None)
            }
        }
    }

    fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }
}

/// Replay sink answering each attempt from a script, then with a fixed default.
///
/// Records the id of the frame passed to every attempt.
pub struct ScriptedSink {
    outcomes: VecDeque<bool>,
    default: bool,
    delay: Duration,
    attempts: Arc<Mutex<Vec<u64>>>,
}

impl ScriptedSink {
    pub fn new(outcomes: Vec<bool>, default: bool) -> Self {
        Self {
            outcomes: outcomes.into(),
            default,
            delay: Duration::ZERO,
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always(success: bool) -> Self {
        Self::new(Vec::new(), success)
    }

    /// Blocks every attempt for `delay`, standing in for a slow output link.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn attempts(&self) -> Arc<Mutex<Vec<u64>>> {
        Arc::clone(&self.attempts)
    }
}

impl ReplaySink for ScriptedSink {
    fn replay(&mut self, frame: &Frame) -> Result<(), ReplayError> {
        self.attempts.lock().unwrap().push(frame.id());
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let attempt = self.attempts.lock().unwrap().len() as u64;
        if self.outcomes.pop_front().unwrap_or(self.default) {
            Ok(())
        } else {
            Err(ReplayError::Injected(attempt))
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
