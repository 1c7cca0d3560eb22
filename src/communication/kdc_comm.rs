use super::{new_krb_channel, resolve_host, KrbChannel, TransportProtocol};
use crate::core::KdcRequest;
use crate::error::{Error, Result};
use log::debug;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

/// KDC address of each realm
pub type Kdcs = HashMap<String, IpAddr>;

pub const DEFAULT_KDC_PORT: u16 = 88;

/// Delivers the requests of the exchanges to the KDC of the right realm.
pub trait KdcTransport {
    fn send_recv(&mut self, request: &KdcRequest) -> Result<Vec<u8>>;
}

/// Keeps the KDC address of every realm. Addresses not given beforehand
/// are resolved by using the realm name as hostname, and remembered.
#[derive(Debug, Clone)]
pub struct KdcComm {
    kdcs: Kdcs,
    protocol: TransportProtocol,
    port: u16,
    dns_servers: Vec<SocketAddr>,
}

impl KdcComm {
    pub fn new(kdcs: Kdcs, protocol: TransportProtocol) -> Self {
        let kdcs = kdcs
            .into_iter()
            .map(|(realm, ip)| (realm.to_uppercase(), ip))
            .collect();
        return Self {
            kdcs,
            protocol,
            port: DEFAULT_KDC_PORT,
            dns_servers: Vec::new(),
        };
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn dns_servers(mut self, dns_servers: Vec<SocketAddr>) -> Self {
        self.dns_servers = dns_servers;
        self
    }

    pub fn protocol(&self) -> TransportProtocol {
        return self.protocol;
    }

    pub fn insert(&mut self, realm: &str, ip: IpAddr) {
        self.kdcs.insert(realm.to_uppercase(), ip);
    }

    pub fn get(&self, realm: &str) -> Option<IpAddr> {
        return self.kdcs.get(&realm.to_uppercase()).cloned();
    }

    pub fn get_or_resolve(&mut self, realm: &str) -> Result<IpAddr> {
        if let Some(ip) = self.get(realm) {
            return Ok(ip);
        }

        let ip = resolve_host(realm, &self.dns_servers)?;
        debug!("KDC of {} resolved to {}", realm, ip);
        self.insert(realm, ip);
        return Ok(ip);
    }

    /// Channel to the KDC of the realm. With `tcp_only` TCP is used
    /// regardless of the configured protocol.
    pub fn create_channel(
        &mut self,
        realm: &str,
        tcp_only: bool,
    ) -> Result<Box<dyn KrbChannel>> {
        let ip = self.get_or_resolve(realm)?;
        let protocol = if tcp_only {
            TransportProtocol::TCP
        } else {
            self.protocol
        };
        return Ok(new_krb_channel(SocketAddr::new(ip, self.port), protocol));
    }
}

impl KdcTransport for KdcComm {
    fn send_recv(&mut self, request: &KdcRequest) -> Result<Vec<u8>> {
        let channel = self.create_channel(&request.realm, request.tcp_only)?;
        debug!(
            "Send {} bytes to {} ({:?}) for {}",
            request.data.len(),
            channel.dst_addr(),
            channel.protocol(),
            request.realm
        );
        return channel.send_recv(&request.data).map_err(|err| {
            Error::IOError(
                format!("Error sending request to KDC of {}", request.realm),
                err,
            )
        });
    }
}
