//! `AF_PACKET` raw sockets shared by the capture source and the interface replay sink.

use std::io;
use std::time::Duration;

use socket2::Socket;

/// Opens a raw link-layer socket receiving every ethertype and binds it to `interface`.
///
/// `read_timeout` bounds each blocking receive; `None` blocks indefinitely.
#[cfg(target_os = "linux")]
pub fn open_packet_socket(interface: &str, read_timeout: Option<Duration>) -> io::Result<Socket> {
    use socket2::{Domain, Protocol, Type};

    let ifindex = interface_index(interface)?;
    let protocol = (libc::ETH_P_ALL as u16).to_be();

    let socket = Socket::new(
        Domain::PACKET,
        Type::RAW,
        Some(Protocol::from(protocol as i32)),
    )?;
    socket.bind(&link_layer_address(ifindex, protocol))?;
    socket.set_read_timeout(read_timeout)?;

    Ok(socket)
}

#[cfg(not(target_os = "linux"))]
pub fn open_packet_socket(_interface: &str, _read_timeout: Option<Duration>) -> io::Result<Socket> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "raw link-layer sockets are only available on Linux",
    ))
}

#[cfg(target_os = "linux")]
fn interface_index(interface: &str) -> io::Result<libc::c_int> {
    use std::ffi::CString;

    let name = CString::new(interface).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "interface name contains a NUL byte",
        )
    })?;

    // SAFETY: `name` is a valid NUL-terminated string that outlives the call.
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    if index == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(index as libc::c_int)
}

#[cfg(target_os = "linux")]
fn link_layer_address(ifindex: libc::c_int, protocol: u16) -> socket2::SockAddr {
    use std::mem;

    // SAFETY: an all-zero sockaddr_storage is a valid value; sockaddr_ll fits inside it and is
    // only written through a correctly aligned pointer to that storage.
    unsafe {
        let mut storage: libc::sockaddr_storage = mem::zeroed();
        let sll = &mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr_ll;
        (*sll).sll_family = libc::AF_PACKET as libc::c_ushort;
        (*sll).sll_protocol = protocol;
        (*sll).sll_ifindex = ifindex;

        socket2::SockAddr::new(
            storage,
            mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
        )
    }
}

/// True for the error kinds a timed-out or interrupted receive produces.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
