use clap::ArgMatches;
use kerberos_crypto::Key;
use krbcreds::communication::Kdcs;
use krbcreds::core::Principal;
use std::convert::TryFrom;
use std::net::{IpAddr, SocketAddr};

pub fn is_principal(v: String) -> Result<(), String> {
    Principal::try_from(v).map_err(|err| err.to_string())?;
    return Ok(());
}

pub fn is_rc4_key(v: String) -> Result<(), String> {
    Key::from_rc4_key_string(&v).map_err(|_| {
        format!(
            "Invalid RC4 key '{}', must be a string of 32 hexadecimals",
            v
        )
    })?;

    return Ok(());
}

pub fn is_aes_key(v: String) -> Result<(), String> {
    if let Ok(_) = Key::from_aes_128_key_string(&v) {
        return Ok(());
    }

    Key::from_aes_256_key_string(&v).map_err(|_| {
        format!(
            "Invalid AES key '{}', must be a string of 64 or 32 hexadecimals",
            v
        )
    })?;

    return Ok(());
}

pub fn is_kdc_domain_ip(v: String) -> Result<(), String> {
    let parts: Vec<String> = v.split(":").map(|s| s.into()).collect();
    is_ip(parts[parts.len() - 1].clone())?;

    return Ok(());
}

pub fn is_ip(v: String) -> Result<(), String> {
    v.parse::<IpAddr>()
        .map_err(|_| format!("Invalid IP address '{}'", v))?;
    return Ok(());
}

pub fn is_u32(v: String) -> Result<(), String> {
    v.parse::<u32>().map_err(|_| {
        format!(
            "Incorrect value '{}' must be an unsigned integer of 32 bits (u32)",
            v
        )
    })?;

    return Ok(());
}

/// Parses the --kdc values, in the form [<realm>:]<ip>. Values without
/// realm are for the default realm.
pub fn parse_kdcs(matches: &ArgMatches, default_realm: &str) -> Kdcs {
    let mut kdcs = Kdcs::new();
    if let Some(kdcs_str) = matches.values_of("kdc") {
        for kdc_str in kdcs_str {
            let (kdc_realm, kdc_ip_str) = match kdc_str.rfind(':') {
                Some(pos) => (&kdc_str[..pos], &kdc_str[pos + 1..]),
                None => (default_realm, kdc_str),
            };

            // already checked by is_kdc_domain_ip
            if let Ok(kdc_ip) = kdc_ip_str.parse::<IpAddr>() {
                kdcs.insert(kdc_realm.to_string(), kdc_ip);
            }
        }
    }
    return kdcs;
}

pub fn parse_dns_servers(matches: &ArgMatches) -> Vec<SocketAddr> {
    return matches
        .values_of("dns")
        .map(|values| {
            values
                .filter_map(|v| v.parse::<IpAddr>().ok())
                .map(|ip| SocketAddr::new(ip, 53))
                .collect()
        })
        .unwrap_or_default();
}
