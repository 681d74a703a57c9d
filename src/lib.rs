pub mod configuration;
pub mod controller;
pub mod data_capture;
pub mod error_handling;
pub mod network;
pub mod replay;

#[cfg(test)]
pub(crate) mod testing;

pub use configuration::Config;
pub use controller::{CaptureSupervisor, Controller, PipelineRun, SummaryReport};
pub use data_capture::{Frame, FrameSource};
pub use network::{LayerClassifier, LayerStack};
pub use replay::{ReplayRouter, ReplaySink};
