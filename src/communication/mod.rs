//! Module to provide means to transport Kerberos messages
//!

use std::net::SocketAddr;

mod channel_trait;
pub use channel_trait::KrbChannel;

mod tcp_channel;
pub use tcp_channel::TcpChannel;

mod udp_channel;
pub use udp_channel::UdpChannel;

mod resolver;
pub use resolver::resolve_host;

mod kdc_comm;
pub use kdc_comm::{KdcComm, KdcTransport, Kdcs, DEFAULT_KDC_PORT};

/// Transport protocols available to send Kerberos messages
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum TransportProtocol {
    TCP,
    UDP,
}

/// Generates a channel given and address and transport protocol
pub fn new_krb_channel(
    dst_address: SocketAddr,
    transport_protocol: TransportProtocol,
) -> Box<dyn KrbChannel> {
    match transport_protocol {
        TransportProtocol::TCP => {
            return Box::new(TcpChannel::new(dst_address));
        }
        TransportProtocol::UDP => {
            return Box::new(UdpChannel::new(dst_address));
        }
    }
}
