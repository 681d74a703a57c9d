use log::{error, info};

use super::capture_supervisor::CaptureSupervisor;
use super::types::PipelineRun;
use crate::configuration::config::Config;
use crate::data_capture::frame_source::{FrameSource, RawSocketSource};
use crate::error_handling::types::*;
use crate::replay::replay_router::ReplayRouter;
use crate::replay::replay_sink::{build_sink, ReplaySink};

/// Wires a validated [`Config`] to the concrete capture source and replay sink.
pub struct Controller {
    pub config: Config,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        info!("[+] Validating configuration");
        match config.validate() {
            Ok(()) => Ok(Self { config }),
            Err(err) => {
                error!("[!] Invalid configuration: {}", err);
                Err(ControllerError::ConfigurationError(err))
            }
        }
    }

    /// Runs one capture on `interface` with a raw socket source and the configured sink.
    pub async fn run(&self, interface: &str) -> Result<PipelineRun, ControllerError> {
        let source = RawSocketSource::new(self.config.read_timeout());
        let sink = build_sink(&self.config.replay)?;
        self.run_with(source, sink, interface).await
    }

    /// Same as [`Controller::run`] with caller-supplied source and sink.
    pub async fn run_with<S, R>(
        &self,
        source: S,
        sink: R,
        interface: &str,
    ) -> Result<PipelineRun, ControllerError>
    where
        S: FrameSource + 'static,
        R: ReplaySink + 'static,
    {
        let router = ReplayRouter::from_config(sink, &self.config)?;
        CaptureSupervisor::new(source, router, self.config.queue_capacity)
            .run(interface, self.config.capture_duration())
            .await
    }
}
