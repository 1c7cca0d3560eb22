use crate::communication::TransportProtocol;
use std::io;
use std::net::SocketAddr;

/// Connection with a KDC. Each request opens a new one, so the channel
/// is just the address and the way to reach it.
pub trait KrbChannel {
    /// Sends a message and waits for the reply
    fn send_recv(&self, raw: &[u8]) -> io::Result<Vec<u8>>;
    fn protocol(&self) -> TransportProtocol;
    fn dst_addr(&self) -> SocketAddr;
}
