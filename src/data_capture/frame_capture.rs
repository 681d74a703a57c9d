//! Capture loop: turns buffers from a [`FrameSource`] into sequenced [`Frame`]s.
//!
//! The loop runs on a dedicated blocking thread. It checks the pipeline's stop signal between
//! acquisitions, so the source's poll timeout bounds how long shutdown can take.

use std::fmt;
use std::net::Ipv4Addr;

use chrono::Utc;
use log::{debug, error, info, warn};

use super::frame_source::FrameSource;
use super::types::{CaptureStats, Frame, MAX_FRAME_LEN};
use crate::controller::pipeline_context::PipelineContext;
use crate::error_handling::types::CaptureError;

pub struct FrameCapture<S: FrameSource> {
    source: S,
    buffer: Vec<u8>,
    last_id: u64,
    stats: CaptureStats,
}

impl<S: FrameSource> FrameCapture<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: vec![0u8; MAX_FRAME_LEN + 1],
            last_id: 0,
            stats: CaptureStats::default(),
        }
    }

    /// Binds the underlying source. Must succeed before [`FrameCapture::run`] is called.
    pub fn bind(&mut self, interface: &str) -> Result<(), CaptureError> {
        self.source.bind(interface)
    }

    /// Captures until the pipeline's stop signal is observed, then returns the counters.
    ///
    /// Transient read errors are logged and skipped. Any other error, or a capture queue closed
    /// by a departed router, ends capture and requests a pipeline stop. The capture-finished flag is set on every exit path, unwinding included.
    pub fn run(mut self, ctx: &PipelineContext) -> CaptureStats {
        let _finished = ctx.capture_guard();
        info!(
            "[{}] Capture started on {}",
            ctx.run_id,
            self.source.interface().unwrap_or("<unbound>")
        );

        while !ctx.should_stop() {
            match self.source.receive(&mut self.buffer) {
                Ok(Some(n)) => {
                    let n = n.min(self.buffer.len());
                    self.stats.received += 1;
                    self.last_id += 1;

                    let frame = Frame::new(self.last_id, Utc::now(), self.buffer[..n].to_vec());
                    info!(
                        "[+] Captured Frame #{} | Src: {} | Dest: {} | {} bytes",
                        frame.id(),
                        Address(frame.source_address()),
                        Address(frame.destination_address()),
                        frame.len()
                    );

                    ctx.record_captured();
                    if let Err(frame) = ctx.capture_queue.push(frame) {
                        error!(
                            "[x] Router is gone, frame #{} will not be routed",
                            frame.id()
                        );
                        ctx.request_stop();
                        break;
                    }
                }
                Ok(None) => continue,
                Err(CaptureError::Read(e)) => {
                    self.stats.read_errors += 1;
                    warn!("[!] Skipping failed read: {}", e);
                }
                Err(e) => {
                    error!("[!] Capture aborted: {}", e);
                    ctx.request_stop();
                    break;
                }
            }
        }

        debug!(
            "[{}] Capture loop exiting: received={}, read_errors={}",
            ctx.run_id, self.stats.received, self.stats.read_errors
        );
        self.stats
    }
}

struct Address(Option<Ipv4Addr>);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(addr) => write!(f, "{}", addr),
            None => f.write_str("-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ipv4_frame, wait_until, IpProto, ScriptedSource, SourceStep};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use uuid::Uuid;

    fn context() -> Arc<PipelineContext> {
        Arc::new(PipelineContext::new(Uuid::new_v4(), 16))
    }

    #[test]
    fn test_transient_failures_do_not_stop_capture() {
        crate::testing::init_logging();
        let ctx = context();
        let source = ScriptedSource::new(vec![
            SourceStep::ReadError,
            SourceStep::ReadError,
            SourceStep::Frame(ipv4_frame(IpProto::Tcp, 100)),
        ]);
        let calls = source.receive_calls();

        let mut capture = FrameCapture::new(source);
        capture.bind("test0").unwrap();

        let worker = {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || capture.run(&ctx))
        };

        assert!(wait_until(Duration::from_secs(2), || ctx.captured() == 1));
        // still polling after the scripted steps ran out
        assert!(wait_until(Duration::from_secs(2), || {
            calls.load(Ordering::SeqCst) > 4
        }));
        assert!(!ctx.capture_finished());

        ctx.request_stop();
        let stats = worker.join().unwrap();

        assert_eq!(stats.received, 1);
        assert_eq!(stats.read_errors, 2);
        assert_eq!(ctx.capture_queue.ids(), vec![1]);
        assert!(ctx.capture_finished());
    }

    #[test]
    fn test_ids_are_sequential() {
        let ctx = context();
        let steps = (0..5)
            .map(|i| SourceStep::Frame(ipv4_frame(IpProto::Udp, 60 + i)))
            .collect();

        let mut capture = FrameCapture::new(ScriptedSource::new(steps));
        capture.bind("test0").unwrap();

        let worker = {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || capture.run(&ctx))
        };
        assert!(wait_until(Duration::from_secs(2), || ctx.captured() == 5));
        ctx.request_stop();
        worker.join().unwrap();

        assert_eq!(ctx.capture_queue.ids(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_stop_before_start_captures_nothing() {
        let ctx = context();
        ctx.request_stop();

        let capture = FrameCapture::new(ScriptedSource::new(vec![SourceStep::Frame(
            ipv4_frame(IpProto::Tcp, 80),
        )]));
        let stats = capture.run(&ctx);

        assert_eq!(stats.received, 0);
        assert!(ctx.capture_queue.is_empty());
        assert!(ctx.capture_finished());
    }

    #[test]
    fn test_fatal_receive_error_stops_pipeline() {
        let ctx = context();
        let capture = FrameCapture::new(ScriptedSource::new(vec![SourceStep::Fatal]));
        let stats = capture.run(&ctx);

        assert_eq!(stats.received, 0);
        assert!(ctx.should_stop());
        assert!(ctx.capture_finished());
    }

    #[test]
    fn test_closed_queue_ends_capture() {
        let ctx = Arc::new(PipelineContext::new(Uuid::new_v4(), 1));
        let steps = (0..4)
            .map(|_| SourceStep::Frame(ipv4_frame(IpProto::Tcp, 100)))
            .collect();

        let mut capture = FrameCapture::new(ScriptedSource::new(steps));
        capture.bind("test0").unwrap();

        let worker = {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || capture.run(&ctx))
        };
        // frame 2 is waiting for space that nobody will free
        assert!(wait_until(Duration::from_secs(2), || ctx.captured() == 2));
        drop(ctx.router_guard());

        let stats = worker.join().unwrap();
        assert_eq!(stats.received, 2);
        assert_eq!(ctx.capture_queue.ids(), vec![1]);
        assert!(ctx.should_stop());
        assert!(ctx.capture_finished());
    }

    #[test]
    fn test_bind_failure_surfaces() {
        let mut capture = FrameCapture::new(ScriptedSource::failing_bind());
        assert!(matches!(capture.bind("eth0"), Err(CaptureError::Bind(_, _))));
    }
}
