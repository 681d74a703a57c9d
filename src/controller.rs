pub mod capture_supervisor;
pub mod controller_handler;
pub mod pipeline_context;
pub mod types;


pub use capture_supervisor::CaptureSupervisor;
pub use controller_handler::Controller;
pub use pipeline_context::PipelineContext;
pub use types::{CompletionStatus, PipelineRun, SummaryReport};
