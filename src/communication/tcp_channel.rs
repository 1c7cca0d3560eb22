use std::io;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use crate::communication::{KrbChannel, TransportProtocol};

/// Send Kerberos messages over TCP
#[derive(Debug)]
pub struct TcpChannel {
    dst_addr: SocketAddr,
}

impl TcpChannel {
    pub fn new(dst_addr: SocketAddr) -> Self {
        return Self { dst_addr };
    }
}

impl KrbChannel for TcpChannel {
    fn send_recv(&self, raw: &[u8]) -> io::Result<Vec<u8>> {
        return send_recv_tcp(&self.dst_addr, raw);
    }

    fn protocol(&self) -> TransportProtocol {
        return TransportProtocol::TCP;
    }

    fn dst_addr(&self) -> SocketAddr {
        return self.dst_addr;
    }
}

pub fn send_recv_tcp(dst_addr: &SocketAddr, raw: &[u8]) -> io::Result<Vec<u8>> {
    let mut tcp_stream =
        TcpStream::connect_timeout(dst_addr, Duration::new(5, 0))?;
    tcp_stream.set_read_timeout(Some(Duration::new(10, 0)))?;

    let raw_sized_request = set_size_header_to_request(raw);
    tcp_stream.write_all(&raw_sized_request)?;

    let mut len_data_bytes = [0 as u8; 4];
    tcp_stream.read_exact(&mut len_data_bytes)?;
    let data_length = u32::from_be_bytes(len_data_bytes);

    let mut raw_response: Vec<u8> = vec![0; data_length as usize];
    tcp_stream.read_exact(&mut raw_response)?;

    return Ok(raw_response);
}

fn set_size_header_to_request(raw_request: &[u8]) -> Vec<u8> {
    let request_length = raw_request.len() as u32;
    let mut raw_sized_request: Vec<u8> = request_length.to_be_bytes().to_vec();
    raw_sized_request.extend_from_slice(raw_request);

    return raw_sized_request;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, TcpListener};
    use std::thread;

    #[test]
    fn test_size_header() {
        assert_eq!(
            vec![0, 0, 0, 3, 0xa, 0xb, 0xc],
            set_size_header_to_request(&[0xa, 0xb, 0xc])
        );
    }

    #[test]
    fn test_send_recv_framed_message() {
        let listener =
            TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();

        let kdc = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut len = [0; 4];
            stream.read_exact(&mut len).unwrap();
            let mut request = vec![0; u32::from_be_bytes(len) as usize];
            stream.read_exact(&mut request).unwrap();

            request.reverse();
            stream
                .write_all(&set_size_header_to_request(&request))
                .unwrap();
        });

        let channel = TcpChannel::new(addr);
        assert_eq!(vec![3, 2, 1], channel.send_recv(&[1, 2, 3]).unwrap());
        assert_eq!(TransportProtocol::TCP, channel.protocol());
        kdc.join().unwrap();
    }

    #[test]
    fn test_connection_refused() {
        let listener =
            TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let channel = TcpChannel::new(addr);
        assert!(channel.send_recv(&[1, 2, 3]).is_err());
    }
}
