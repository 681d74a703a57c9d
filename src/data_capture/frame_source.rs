use std::io::Read;
use std::time::Duration;

use log::{debug, trace};
use socket2::Socket;

use crate::error_handling::types::CaptureError;
use crate::network::packet_socket::{is_timeout, open_packet_socket};

/// Acquisition boundary between the pipeline and whatever delivers raw frames.
///
/// A source is bound exactly once, before any frame is requested. A failed bind is fatal for the
/// run. After that, `receive` is called in a loop from the capture thread:
/// - `Ok(Some(n))`: `n` bytes of one frame were written into `buf`
/// - `Ok(None)`: nothing arrived before the source's poll timeout, the caller re-checks its stop
/// signal and calls again
/// - `Err(CaptureError::Read(_))`: this acquisition failed, the caller skips it and continues
pub trait FrameSource: Send {
    fn bind(&mut self, interface: &str) -> Result<(), CaptureError>;

    fn receive(&mut self, buf: &mut [u8]) -> Result<Option<usize>, CaptureError>;

    /// Interface the source is bound to, if any.
    fn interface(&self) -> Option<&str>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn bind(&mut self, interface: &str) -> Result<(), CaptureError> {
        (**self).bind(interface)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<Option<usize>, CaptureError> {
        (**self).receive(buf)
    }

    fn interface(&self) -> Option<&str> {
        (**self).interface()
    }
}

/// Frame source reading every ethertype from a Linux `AF_PACKET` raw socket.
///
/// Requires `CAP_NET_RAW`. Each receive blocks for at most `read_timeout`.
#[derive(Debug)]
pub struct RawSocketSource {
    interface: Option<String>,
    socket: Option<Socket>,
    read_timeout: Duration,
}

impl RawSocketSource {
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            interface: None,
            socket: None,
            read_timeout,
        }
    }
}

impl FrameSource for RawSocketSource {
    fn bind(&mut self, interface: &str) -> Result<(), CaptureError> {
        let socket = open_packet_socket(interface, Some(self.read_timeout))
            .map_err(|e| CaptureError::Bind(interface.to_string(), e))?;

        debug!("Raw socket bound to {}", interface);
        self.socket = Some(socket);
        self.interface = Some(interface.to_string());
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<Option<usize>, CaptureError> {
        let mut socket: &Socket = self.socket.as_ref().ok_or(CaptureError::NotBound)?;

        match socket.read(buf) {
            Ok(0) => Ok(None),
            Ok(n) => Ok(Some(n)),
            Err(e) if is_timeout(&e) => {
                trace!("Receive timed out on {:?}", self.interface);
                Ok(None)
            }
            Err(e) => Err(CaptureError::Read(e)),
        }
    }

    fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }
}
