//! # Replay Router
//!
//! Consumer side of the pipeline. Every frame taken from the capture queue goes through:
//!
//! ```text
//! Received ──▶ Classified ──┬──▶ Dropped (admission control)
//!                           └──▶ Admitted ──▶ replay attempts ──┬──▶ Replayed  (replay queue)
//!                                                               └──▶ BackedUp  (backup queue)
//! ```
//!
//! Replay is tried once plus up to `max_retries` more times. After each admitted frame the router
//! sleeps for `payload_len / 1000` milliseconds, a crude throughput cap. When the capture queue
//! is empty it idles for `idle_poll` and polls again, and it only returns once capture has stopped
//! for good and the queue is drained.
//!
//! Sinks send synchronously, so the loop runs on a blocking thread like the capture loop.

use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use super::replay_sink::ReplaySink;
use super::types::{AdmissionPolicy, RouteOutcome, RouterStats};
use crate::configuration::config::Config;
use crate::controller::pipeline_context::PipelineContext;
use crate::data_capture::frame_queue::BoundedFrameQueue;
use crate::data_capture::types::Frame;
use crate::error_handling::types::ConfigError;
use crate::network::layer_classifier::LayerClassifier;

pub struct ReplayRouter<R: ReplaySink> {
    classifier: LayerClassifier,
    sink: R,
    policy: AdmissionPolicy,
    max_retries: u32,
    pacing: bool,
    idle_poll: Duration,
    stats: RouterStats,
}

impl<R: ReplaySink> ReplayRouter<R> {
    pub fn new(sink: R, policy: AdmissionPolicy) -> Self {
        Self {
            classifier: LayerClassifier::new(),
            sink,
            policy,
            max_retries: 2,
            pacing: true,
            idle_poll: Duration::from_millis(100),
            stats: RouterStats::default(),
        }
    }

    /// Builds a router with the admission, retry and pacing settings of `config`.
    pub fn from_config(sink: R, config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(sink, AdmissionPolicy::from_config(config)?)
            .with_max_retries(config.replay.max_retries)
            .with_pacing(config.replay.pacing)
            .with_idle_poll(config.idle_poll()))
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_pacing(mut self, pacing: bool) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_idle_poll(mut self, idle_poll: Duration) -> Self {
        self.idle_poll = idle_poll;
        self
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Routes one frame to its terminal state and records it in the pipeline context.
    ///
    /// Dropped frames are counted but never reach a terminal queue. Admitted frames end up in
    /// exactly one of the replay or backup queues.
    pub fn route(&mut self, frame: Frame, ctx: &PipelineContext) -> RouteOutcome {
        let layers = self.classifier.classify(&frame);
        info!("[#] Dissection layers for frame #{}: {}", frame.id(), layers);

        let outcome = match self.policy.admit(&frame) {
            Err(reason) => {
                warn!("[!] Dropping frame #{}: {}", frame.id(), reason);
                ctx.record_dropped();
                RouteOutcome::Dropped(reason)
            }
            Ok(()) => self.replay(frame, ctx),
        };

        self.stats.record(&outcome);
        outcome
    }

    fn replay(&mut self, frame: Frame, ctx: &PipelineContext) -> RouteOutcome {
        info!("[>] Replaying frame #{} via {}", frame.id(), self.sink.name());
        let max_attempts = self.max_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            match self.sink.replay(&frame) {
                Ok(()) => {
                    debug!("Frame #{} replayed on attempt {}", frame.id(), attempt);
                    settle(&ctx.replay_queue, frame);
                    return RouteOutcome::Replayed { attempts: attempt };
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        "[x] Replay failed for #{} (retry {}/{}): {}",
                        frame.id(),
                        attempt,
                        self.max_retries,
                        e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        "[!] Moved frame #{} to backup after {} attempts: {}",
                        frame.id(),
                        attempt,
                        e
                    );
                    settle(&ctx.backup_queue, frame);
                    return RouteOutcome::BackedUp { attempts: attempt };
                }
            }
        }
    }

    /// Routing loop. Returns once [`PipelineContext::is_drained`] holds.
    ///
    /// Blocks the calling thread. If the loop exits early, unwinding included, the pipeline is
    /// stopped and the capture queue closed.
    pub fn run(mut self, ctx: &PipelineContext) -> RouterStats {
        let _consumer = ctx.router_guard();
        info!("[{}] Router started", ctx.run_id);

        loop {
            let Some(frame) = ctx.capture_queue.try_pop() else {
                if ctx.is_drained() {
                    break;
                }
                thread::sleep(self.idle_poll);
                continue;
            };

            let len = frame.len();
            let outcome = self.route(frame, ctx);

            let delay = pacing_delay(len);
            if outcome.is_admitted() && self.pacing && !delay.is_zero() {
                thread::sleep(delay);
            }
        }

        info!(
            "[{}] Router drained: replayed={}, backed_up={}, dropped={}",
            ctx.run_id, self.stats.replayed, self.stats.backed_up, self.stats.dropped
        );
        self.stats
    }
}

fn settle(queue: &BoundedFrameQueue, frame: Frame) {
    // terminal queues are unbounded and never closed
    if let Err(frame) = queue.push(frame) {
        error!("[x] Terminal queue closed, frame #{} lost", frame.id());
    }
}

/// Pacing delay after an admitted frame: one millisecond per full thousand payload bytes.
pub fn pacing_delay(payload_len: usize) -> Duration {
    Duration::from_millis((payload_len / 1000) as u64)
}
