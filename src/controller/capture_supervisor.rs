//! # Capture Supervisor
//!
//! Owns the lifecycle of one capture run:
//!
//! ```text
//! ┌──────────────┐  stop flag   ┌──────────────┐   capture    ┌──────────────┐
//! │ Deadline     │─────────────▶│ Capture loop │────queue────▶│ Replay       │──▶ replay queue
//! │ timer (task) │              │ (blocking)   │              │ router (blk) │──▶ backup queue
//! └──────────────┘              └──────────────┘              └──────────────┘
//! ```
//!
//! The source is bound before anything is spawned, so an interface that cannot be opened aborts
//! the run without a single frame being produced. Once the deadline fires, capture stops at its
//! next poll and the router keeps going until the capture queue is empty. If the router dies
//! first, its guard stops the run and closes the capture queue so capture cannot wait on it
//! forever. The summary is only built after both workers have been joined and the timer has been
//! cancelled or has fired.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{error, info};
use uuid::Uuid;

use super::pipeline_context::PipelineContext;
use super::types::{CompletionStatus, PipelineRun, SummaryReport};
use crate::data_capture::frame_capture::FrameCapture;
use crate::data_capture::frame_source::FrameSource;
use crate::data_capture::types::CaptureStats;
use crate::error_handling::types::ControllerError;
use crate::replay::replay_router::ReplayRouter;
use crate::replay::replay_sink::ReplaySink;
use crate::replay::types::RouterStats;

pub struct CaptureSupervisor<S: FrameSource, R: ReplaySink> {
    source: S,
    router: ReplayRouter<R>,
    queue_capacity: usize,
}

impl<S, R> CaptureSupervisor<S, R>
where
    S: FrameSource + 'static,
    R: ReplaySink + 'static,
{
    pub fn new(source: S, router: ReplayRouter<R>, queue_capacity: usize) -> Self {
        Self {
            source,
            router,
            queue_capacity,
        }
    }

    /// Captures on `interface` for `duration`, drains the pipeline and reports.
    ///
    /// # Errors
    ///
    /// Only a failed bind is returned as an error. Worker failures after start are logged and
    /// reflected in [`CompletionStatus::Incomplete`].
    pub async fn run(
        self,
        interface: &str,
        duration: Duration,
    ) -> Result<PipelineRun, ControllerError> {
        let run_id = Uuid::new_v4();
        info!("[{}] Binding interface {}", run_id, interface);

        let mut capture = FrameCapture::new(self.source);
        capture.bind(interface).map_err(|e| {
            error!("[{}] {}", run_id, e);
            ControllerError::CaptureError(e)
        })?;

        let ctx = Arc::new(PipelineContext::new(run_id, self.queue_capacity));
        let started_at = Utc::now();
        let started = Instant::now();
        info!("[{}] Capturing for {:?}", run_id, duration);

        let timer = {
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                info!("[!] Timer expired, stopping capture after {:?}", duration);
                ctx.request_stop();
            })
        };

        let capture_task = {
            let ctx = Arc::clone(&ctx);
            tokio::task::spawn_blocking(move || {
                let stats = capture.run(&ctx);
                (stats, started.elapsed())
            })
        };

        let router_task = {
            let ctx = Arc::clone(&ctx);
            let router = self.router;
            tokio::task::spawn_blocking(move || router.run(&ctx))
        };

        let (capture_result, router_result) = tokio::join!(capture_task, router_task);
        timer.abort();
        let _ = timer.await;
        let elapsed = started.elapsed();

        let mut healthy = true;
        let (capture_stats, capture_duration) = match capture_result {
            Ok(result) => result,
            Err(e) => {
                error!("[{}] Capture worker failed: {}", run_id, e);
                healthy = false;
                (CaptureStats::default(), elapsed)
            }
        };
        let router_stats = match router_result {
            Ok(stats) => stats,
            Err(e) => {
                error!("[{}] Router worker failed: {}", run_id, e);
                healthy = false;
                RouterStats::default()
            }
        };

        let mut report = SummaryReport {
            run_id,
            interface: interface.to_string(),
            started_at,
            captured: ctx.captured(),
            replayed: ctx.replay_queue.len() as u64,
            backed_up: ctx.backup_queue.len() as u64,
            dropped: ctx.dropped(),
            read_errors: capture_stats.read_errors,
            replay_attempts: router_stats.replay_attempts,
            capture_duration,
            elapsed,
            status: CompletionStatus::Completed,
        };

        if !healthy || !report.is_balanced() {
            error!(
                "[{}] Run incomplete: captured={}, replayed={}, backed_up={}, dropped={}, unrouted={}",
                run_id,
                report.captured,
                report.replayed,
                report.backed_up,
                report.dropped,
                report.unrouted()
            );
            report.status = CompletionStatus::Incomplete;
        }

        info!(
            "[{}] Run finished in {:?}: {} captured",
            run_id, elapsed, report.captured
        );

        Ok(PipelineRun {
            report,
            replayed: ctx.replay_queue.drain(),
            backed_up: ctx.backup_queue.drain(),
        })
    }
}
