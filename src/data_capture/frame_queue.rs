use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use log::debug;

use super::types::Frame;

/// Thread-safe FIFO of frames.
///
/// Every operation holds the lock only long enough to move one frame in or out. A bounded queue
/// makes `push` wait for free space instead of discarding, so a full queue slows capture down but
/// never loses a frame. Once the consumer has gone away the queue is closed and `push` hands the
/// frame back instead of waiting for space that will never come.
#[derive(Debug)]
pub struct BoundedFrameQueue {
    frames: Mutex<VecDeque<Frame>>,
    not_full: Condvar,
    capacity: Option<usize>,
    closed: AtomicBool,
}

impl BoundedFrameQueue {
    pub fn bounded(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            not_full: Condvar::new(),
            capacity: Some(capacity.max(1)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            not_full: Condvar::new(),
            capacity: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Appends a frame at the back, blocking the calling thread while a bounded queue is full.
    ///
    /// # Errors
    ///
    /// Returns the frame untouched if the queue is closed, including while waiting for space.
    pub fn push(&self, frame: Frame) -> Result<(), Frame> {
        let mut frames = self.lock();
        if let Some(capacity) = self.capacity {
            if frames.len() >= capacity && !self.is_closed() {
                debug!("Frame queue full ({}), waiting for space", capacity);
                frames = self
                    .not_full
                    .wait_while(frames, |f| f.len() >= capacity && !self.is_closed())
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        if self.is_closed() {
            return Err(frame);
        }
        frames.push_back(frame);
        Ok(())
    }

    /// Refuses further pushes and wakes every producer waiting for space.
    pub fn close(&self) {
        // flag is flipped under the lock so a producer cannot miss the wakeup
        let _frames = self.lock();
        self.closed.store(true, Ordering::Release);
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Removes the front frame without waiting.
    pub fn try_pop(&self) -> Option<Frame> {
        let frame = self.lock().pop_front();
        if frame.is_some() {
            self.not_full.notify_one();
        }
        frame
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Ids of the queued frames, front first.
    pub fn ids(&self) -> Vec<u64> {
        self.lock().iter().map(Frame::id).collect()
    }

    /// Takes every queued frame, leaving the queue empty.
    pub fn drain(&self) -> Vec<Frame> {
        let frames: Vec<Frame> = self.lock().drain(..).collect();
        self.not_full.notify_all();
        frames
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Frame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
