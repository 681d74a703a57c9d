pub mod replay_router;
pub mod replay_sink;
pub mod types;

pub use replay_router::ReplayRouter;
pub use replay_sink::{build_sink, DiscardSink, FaultInjector, InterfaceSink, ReplaySink};
pub use types::{AdmissionPolicy, DropReason, RouteOutcome, RouterStats};
