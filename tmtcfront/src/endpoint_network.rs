//! Network endpoint implementation
//!
//! Datagram endpoints for the telemetry and command links. Sockets are
//! built with socket2 so address reuse and the receive buffer can be set
//! before binding.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tmtclibgs::{TmtcError, TmtcResult};

use crate::config::constants::UDP_RECV_BUFFER_SIZE;
use crate::endpoint::{FrameSink, FrameSource, PacketSink};
use crate::preprocessor::PreprocessedPacket;

/// UDP endpoint. Receives on its bound address and, when it has a peer,
/// sends every frame to that peer.
pub struct UdpEndpoint {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
}

impl UdpEndpoint {
    /// Bind a receiving endpoint. Receives give up after `poll_interval`.
    pub fn bind(addr: SocketAddr, poll_interval: Duration) -> TmtcResult<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_recv_buffer_size(UDP_RECV_BUFFER_SIZE)?;
        socket.bind(&addr.into())?;

        let socket: UdpSocket = socket.into();
        socket.set_read_timeout(Some(poll_interval))?;

        Ok(Self { socket, peer: None })
    }

    /// An endpoint on an ephemeral port that sends to `peer`
    pub fn sender(peer: SocketAddr) -> TmtcResult<Self> {
        let local = match peer {
            SocketAddr::V4(_) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
            SocketAddr::V6(_) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
        };
        let socket = UdpSocket::bind(local)?;
        Ok(Self {
            socket,
            peer: Some(peer),
        })
    }

    pub fn local_addr(&self) -> TmtcResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl FrameSource for UdpEndpoint {
    fn recv_frame(&mut self, buf: &mut [u8]) -> TmtcResult<Option<usize>> {
        match self.socket.recv_from(buf) {
            Ok((n, _)) => Ok(Some(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(TmtcError::Io(e)),
        }
    }
}

impl FrameSink for UdpEndpoint {
    fn send_frame(&mut self, frame: &[u8]) -> TmtcResult<usize> {
        let peer = self
            .peer
            .ok_or_else(|| TmtcError::link("UDP endpoint has no destination"))?;
        Ok(self.socket.send_to(frame, peer)?)
    }
}

impl PacketSink for UdpEndpoint {
    fn deliver(&mut self, packet: PreprocessedPacket) -> TmtcResult<()> {
        self.send_frame(&packet.binary).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udp_loopback() {
        let mut receiver = UdpEndpoint::bind("127.0.0.1:0".parse().unwrap(), Duration::from_secs(2)).unwrap();
        let mut sender = UdpEndpoint::sender(receiver.local_addr().unwrap()).unwrap();

        assert_eq!(sender.send_frame(&[0x08, 0x64, 0xC0, 0x00, 0x00, 0x00]).unwrap(), 6);

        let mut buf = [0u8; 64];
        assert_eq!(receiver.recv_frame(&mut buf).unwrap(), Some(6));
        assert_eq!(&buf[..2], &[0x08, 0x64]);
    }

    #[test]
    fn test_receive_times_out() {
        let mut receiver = UdpEndpoint::bind("127.0.0.1:0".parse().unwrap(), Duration::from_millis(20)).unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(receiver.recv_frame(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_send_without_peer() {
        let mut endpoint = UdpEndpoint::bind("127.0.0.1:0".parse().unwrap(), Duration::from_millis(20)).unwrap();
        assert!(matches!(endpoint.send_frame(&[1]), Err(TmtcError::Link(_))));
    }
}
