pub mod frame_capture;
pub mod frame_queue;
pub mod frame_source;
pub mod types;

pub use frame_capture::FrameCapture;
pub use frame_queue::BoundedFrameQueue;
pub use frame_source::{FrameSource, RawSocketSource};
pub use types::{CaptureStats, Frame};
