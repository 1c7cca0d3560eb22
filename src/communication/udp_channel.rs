use crate::communication::{KrbChannel, TransportProtocol};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// Send Kerberos messages over UDP
#[derive(Debug)]
pub struct UdpChannel {
    dst_addr: SocketAddr,
}

impl UdpChannel {
    pub fn new(dst_addr: SocketAddr) -> Self {
        return Self { dst_addr };
    }
}

impl KrbChannel for UdpChannel {
    fn send_recv(&self, raw: &[u8]) -> io::Result<Vec<u8>> {
        return send_recv_udp(&self.dst_addr, raw);
    }

    fn protocol(&self) -> TransportProtocol {
        return TransportProtocol::UDP;
    }

    fn dst_addr(&self) -> SocketAddr {
        return self.dst_addr;
    }
}

pub fn send_recv_udp(
    dst_addr: &SocketAddr,
    raw_request: &[u8],
) -> io::Result<Vec<u8>> {
    let bind_addr = match dst_addr {
        SocketAddr::V4(_) => "0.0.0.0:0",
        SocketAddr::V6(_) => "[::]:0",
    };
    let udp_socket = UdpSocket::bind(bind_addr)?;
    udp_socket.set_read_timeout(Some(Duration::new(5, 0)))?;
    udp_socket.connect(dst_addr)?;

    udp_socket.send(raw_request)?;

    let data_length = calculate_response_size(&udp_socket)?;

    let mut raw_response = vec![0; data_length as usize];
    udp_socket.recv(&mut raw_response)?;

    return Ok(raw_response);
}

fn calculate_response_size(udp_socket: &UdpSocket) -> io::Result<usize> {
    let mut raw_response = vec![0; 2048];
    let mut data_length = udp_socket.peek(&mut raw_response)?;
    while data_length == raw_response.len() {
        raw_response.append(&mut raw_response.clone());
        data_length = udp_socket.peek(&mut raw_response)?;
    }
    return Ok(data_length);
}
