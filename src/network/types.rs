use serde::Serialize;
use std::fmt;

/// A protocol level recognised by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Layer {
    Ethernet,
    IPv4,
    IPv6,
    TCP,
    UDP,
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Ethernet => "Ethernet",
            Layer::IPv4 => "IPv4",
            Layer::IPv6 => "IPv6",
            Layer::TCP => "TCP",
            Layer::UDP => "UDP",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Layers identified in one frame, ordered from the innermost identified layer to the outermost.
///
/// A TCP segment inside IPv4 inside Ethernet reads `[TCP, IPv4, Ethernet]`. This is a
/// presentation order only: it is the reverse of the on-wire encapsulation order, and consumers
/// must not read the first element as the link layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayerStack(Vec<Layer>);

impl LayerStack {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn from_innermost(layers: Vec<Layer>) -> Self {
        Self(layers)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.0
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(Layer::name).collect()
    }

    pub fn innermost(&self) -> Option<Layer> {
        self.0.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for LayerStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<none>");
        }
        f.write_str(&self.names().join(" "))
    }
}
