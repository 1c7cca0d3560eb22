use crate::error::Result;
use std::net::{IpAddr, SocketAddr};
use trust_dns_resolver::config::{
    NameServerConfig, Protocol, ResolverConfig, ResolverOpts,
};
use trust_dns_resolver::Resolver;

/// Resolves the address of a host (usually the realm name, which points
/// to the domain controllers in Active Directory). Without custom DNS
/// servers the system configuration is used.
pub fn resolve_host(
    host: &str,
    dns_servers: &[SocketAddr],
) -> Result<IpAddr> {
    let resolver;
    if dns_servers.is_empty() {
        resolver = Resolver::from_system_conf().map_err(|err| {
            format!("Unable to use dns system configuration: {}", err)
        })?;
    } else {
        let mut resolver_config = ResolverConfig::new();
        for server in dns_servers {
            resolver_config.add_name_server(NameServerConfig {
                socket_addr: *server,
                protocol: Protocol::Tcp,
                tls_dns_name: None,
                trust_nx_responses: false,
            });
        }
        resolver = Resolver::new(resolver_config, ResolverOpts::default())
            .map_err(|err| format!("Unable to create dns resolver: {}", err))?;
    }
    let ips = resolver
        .lookup_ip(host)
        .map_err(|err| format!("Error resolving '{}' : '{}'", host, err))?;

    let ip = ips
        .iter()
        .next()
        .ok_or(format!("Error resolving '{}': No entries found", host))?;

    return Ok(ip);
}
