pub mod layer_classifier;
pub mod packet_socket;
pub mod types;

pub use layer_classifier::LayerClassifier;
pub use types::{Layer, LayerStack};
