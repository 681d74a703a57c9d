use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::debug;
use uuid::Uuid;

use crate::data_capture::frame_queue::BoundedFrameQueue;

/// State shared by the deadline timer, the capture loop and the router for one run.
///
/// The capture queue is the only structure written by more than one worker. The replay and
/// backup queues are written by the router alone and read by the supervisor once every worker
/// has been joined.
#[derive(Debug)]
pub struct PipelineContext {
    pub run_id: Uuid,
    pub capture_queue: BoundedFrameQueue,
    pub replay_queue: BoundedFrameQueue,
    pub backup_queue: BoundedFrameQueue,
    stop: AtomicBool,
    capture_finished: AtomicBool,
    captured: AtomicU64,
    dropped: AtomicU64,
}

impl PipelineContext {
    pub fn new(run_id: Uuid, queue_capacity: usize) -> Self {
        Self {
            run_id,
            capture_queue: BoundedFrameQueue::bounded(queue_capacity),
            replay_queue: BoundedFrameQueue::unbounded(),
            backup_queue: BoundedFrameQueue::unbounded(),
            stop: AtomicBool::new(false),
            capture_finished: AtomicBool::new(false),
            captured: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Asks the capture loop to stop. Idempotent.
    pub fn request_stop(&self) {
        if !self.stop.swap(true, Ordering::AcqRel) {
            debug!("[{}] Stop requested", self.run_id);
        }
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn capture_finished(&self) -> bool {
        self.capture_finished.load(Ordering::Acquire)
    }

    /// Returns a guard that marks capture as finished when dropped.
    pub fn capture_guard(&self) -> CaptureGuard<'_> {
        CaptureGuard { ctx: self }
    }

    /// Returns a guard that stops the pipeline and closes the capture queue when dropped.
    ///
    /// Held by the routing loop. Once it is gone nothing will pop the capture queue again, so a
    /// capture loop waiting for space has to be released.
    pub fn router_guard(&self) -> RouterGuard<'_> {
        RouterGuard { ctx: self }
    }

    /// True once capture is over for good and every captured frame has left the capture queue.
    ///
    /// `capture_finished` is read before the queue so that a frame pushed just before the capture
    /// loop returned is always seen.
    pub fn is_drained(&self) -> bool {
        self.should_stop() && self.capture_finished() && self.capture_queue.is_empty()
    }

    pub fn record_captured(&self) {
        self.captured.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::AcqRel);
    }

    pub fn captured(&self) -> u64 {
        self.captured.load(Ordering::Acquire)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Acquire)
    }
}

pub struct CaptureGuard<'a> {
    ctx: &'a PipelineContext,
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        self.ctx.capture_finished.store(true, Ordering::Release);
    }
}

pub struct RouterGuard<'a> {
    ctx: &'a PipelineContext,
}

impl Drop for RouterGuard<'_> {
    fn drop(&mut self) {
        self.ctx.request_stop();
        self.ctx.capture_queue.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::frame_of_len;

    #[test]
    fn test_drained_requires_all_conditions() {
        let ctx = PipelineContext::new(Uuid::new_v4(), 4);
        ctx.capture_queue.push(frame_of_len(1, 60)).unwrap();
        assert!(!ctx.is_drained());

        ctx.request_stop();
        assert!(!ctx.is_drained());

        drop(ctx.capture_guard());
        assert!(ctx.capture_finished());
        assert!(!ctx.is_drained());

        ctx.capture_queue.try_pop();
        assert!(ctx.is_drained());
    }

    #[test]
    fn test_guard_marks_finished_on_unwind() {
        let ctx = PipelineContext::new(Uuid::new_v4(), 4);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ctx.capture_guard();
            panic!("capture blew up");
        }));

        assert!(result.is_err());
        assert!(ctx.capture_finished());
    }

    #[test]
    fn test_router_guard_closes_capture_queue_on_unwind() {
        let ctx = PipelineContext::new(Uuid::new_v4(), 4);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ctx.router_guard();
            panic!("router blew up");
        }));

        assert!(result.is_err());
        assert!(ctx.should_stop());
        assert!(ctx.capture_queue.is_closed());
        assert!(ctx.capture_queue.push(frame_of_len(1, 60)).is_err());
    }

    #[test]
    fn test_counters() {
        let ctx = PipelineContext::new(Uuid::new_v4(), 4);
        ctx.record_captured();
        ctx.record_captured();
        ctx.record_dropped();

        assert_eq!(ctx.captured(), 2);
        assert_eq!(ctx.dropped(), 1);
    }
}
