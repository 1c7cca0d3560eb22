use super::credential::Credential;
use super::crypto::Secret;
use chrono::Duration;
use kerberos_asn1::{PaData, Ticket};
use std::collections::HashMap;

/// When the requests are armored with FAST.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FastPolicy {
    /// Never use FAST, even if the KDC supports it.
    Never,

    /// Use FAST when an armor is available or the KDC advertises it.
    IfAvailable,

    /// Fail if the request cannot be armored.
    Required,
}

/// Library wide policy shared by all the exchanges.
#[derive(Debug, Clone)]
pub struct Config {
    pub clockskew: Duration,
    pub kdc_timesync: bool,
    pub max_as_loops: u32,
    pub referral_max_hops: u32,
    pub offpath_max_hops: u32,
    pub default_etypes: Option<Vec<i32>>,
    pub preferred_preauth_types: Vec<i32>,

    /// Client realm -> server realm -> intermediate realms
    pub capaths: HashMap<String, HashMap<String, Vec<String>>>,
    pub dns_fallback: bool,
    pub fast_policy: FastPolicy,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            clockskew: Duration::seconds(300),
            kdc_timesync: true,
            max_as_loops: 16,
            referral_max_hops: 10,
            offpath_max_hops: 10,
            default_etypes: None,
            // PKINIT variants first
            preferred_preauth_types: vec![17, 16, 15, 14],
            capaths: HashMap::new(),
            dns_fallback: true,
            fast_policy: FastPolicy::IfAvailable,
        };
    }
}

impl Config {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn clockskew(mut self, clockskew: Duration) -> Self {
        self.clockskew = clockskew;
        self
    }

    pub fn kdc_timesync(mut self, kdc_timesync: bool) -> Self {
        self.kdc_timesync = kdc_timesync;
        self
    }

    pub fn max_as_loops(mut self, max_as_loops: u32) -> Self {
        self.max_as_loops = max_as_loops;
        self
    }

    pub fn referral_max_hops(mut self, hops: u32) -> Self {
        self.referral_max_hops = hops;
        self
    }

    pub fn offpath_max_hops(mut self, hops: u32) -> Self {
        self.offpath_max_hops = hops;
        self
    }

    pub fn default_etypes(mut self, etypes: Vec<i32>) -> Self {
        self.default_etypes = Some(etypes);
        self
    }

    pub fn preferred_preauth_types(mut self, types: Vec<i32>) -> Self {
        self.preferred_preauth_types = types;
        self
    }

    pub fn capath(
        mut self,
        client_realm: &str,
        server_realm: &str,
        intermediates: Vec<String>,
    ) -> Self {
        self.capaths
            .entry(client_realm.to_string())
            .or_insert_with(HashMap::new)
            .insert(server_realm.to_string(), intermediates);
        self
    }

    pub fn dns_fallback(mut self, dns_fallback: bool) -> Self {
        self.dns_fallback = dns_fallback;
        self
    }

    pub fn fast_policy(mut self, fast_policy: FastPolicy) -> Self {
        self.fast_policy = fast_policy;
        self
    }
}

/// Options of an initial credentials request.
#[derive(Debug, Clone)]
pub struct InitCredsOptions {
    pub secret: Option<Secret>,

    /// Service to request, krbtgt/REALM@REALM by default.
    pub service: Option<String>,
    pub tkt_life: Option<Duration>,
    pub renew_life: Option<Duration>,
    pub forwardable: bool,
    pub proxiable: bool,
    pub canonicalize: bool,
    pub anonymous: bool,
    pub etypes: Option<Vec<i32>>,

    /// Preauthentication types allowed, all the registered by default.
    pub preauth_list: Option<Vec<i32>>,
    pub request_pac: Option<bool>,
    pub armor: Option<Credential>,
    pub salt: Option<Vec<u8>>,

    /// Extra padata sent in every request.
    pub padata: Vec<PaData>,
}

impl Default for InitCredsOptions {
    fn default() -> Self {
        return Self {
            secret: None,
            service: None,
            tkt_life: None,
            renew_life: None,
            forwardable: true,
            proxiable: false,
            canonicalize: true,
            anonymous: false,
            etypes: None,
            preauth_list: None,
            request_pac: None,
            armor: None,
            salt: None,
            padata: Vec::new(),
        };
    }
}

impl InitCredsOptions {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn secret(mut self, secret: Secret) -> Self {
        self.secret = Some(secret);
        self
    }

    pub fn password(self, password: &str) -> Self {
        self.secret(Secret::Password(password.to_string()))
    }

    pub fn service(mut self, service: &str) -> Self {
        self.service = Some(service.to_string());
        self
    }

    pub fn tkt_life(mut self, tkt_life: Duration) -> Self {
        self.tkt_life = Some(tkt_life);
        self
    }

    pub fn renew_life(mut self, renew_life: Duration) -> Self {
        self.renew_life = Some(renew_life);
        self
    }

    pub fn forwardable(mut self, forwardable: bool) -> Self {
        self.forwardable = forwardable;
        self
    }

    pub fn proxiable(mut self, proxiable: bool) -> Self {
        self.proxiable = proxiable;
        self
    }

    pub fn canonicalize(mut self, canonicalize: bool) -> Self {
        self.canonicalize = canonicalize;
        self
    }

    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    pub fn etypes(mut self, etypes: Vec<i32>) -> Self {
        self.etypes = Some(etypes);
        self
    }

    pub fn preauth_list(mut self, types: Vec<i32>) -> Self {
        self.preauth_list = Some(types);
        self
    }

    pub fn request_pac(mut self, request_pac: bool) -> Self {
        self.request_pac = Some(request_pac);
        self
    }

    pub fn armor(mut self, armor: Credential) -> Self {
        self.armor = Some(armor);
        self
    }

    pub fn salt(mut self, salt: Vec<u8>) -> Self {
        self.salt = Some(salt);
        self
    }

    pub fn push_padata(mut self, padata: PaData) -> Self {
        self.padata.push(padata);
        self
    }
}

/// Options of a service ticket request.
#[derive(Debug, Clone, Default)]
pub struct TktCredsOptions {
    /// Extra KDC options added to the request.
    pub kdc_options: u32,
    pub no_store: bool,

    /// Only look in the cache, never contact a KDC.
    pub cache_only: bool,

    /// S4U2Proxy: the second ticket is the evidence ticket.
    pub constrained_delegation: bool,

    /// User to user: the second ticket is the TGT of the target user.
    pub user_to_user: bool,
    pub second_ticket: Option<Ticket>,
    pub etypes: Option<Vec<i32>>,
    pub padata: Vec<PaData>,
}

impl TktCredsOptions {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn kdc_options(mut self, kdc_options: u32) -> Self {
        self.kdc_options |= kdc_options;
        self
    }

    pub fn no_store(mut self, no_store: bool) -> Self {
        self.no_store = no_store;
        self
    }

    pub fn cache_only(mut self, cache_only: bool) -> Self {
        self.cache_only = cache_only;
        self
    }

    pub fn constrained_delegation(mut self, evidence: Ticket) -> Self {
        self.constrained_delegation = true;
        self.second_ticket = Some(evidence);
        self
    }

    pub fn user_to_user(mut self, tgt: Ticket) -> Self {
        self.user_to_user = true;
        self.second_ticket = Some(tgt);
        self
    }

    pub fn etypes(mut self, etypes: Vec<i32>) -> Self {
        self.etypes = Some(etypes);
        self
    }

    pub fn push_padata(mut self, padata: PaData) -> Self {
        self.padata.push(padata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(Duration::seconds(300), config.clockskew);
        assert!(config.kdc_timesync);
        assert_eq!(16, config.max_as_loops);
        assert_eq!(10, config.referral_max_hops);
        assert_eq!(10, config.offpath_max_hops);
        assert_eq!(vec![17, 16, 15, 14], config.preferred_preauth_types);
        assert_eq!(FastPolicy::IfAvailable, config.fast_policy);
    }

    #[test]
    fn test_capaths_builder() {
        let config = Config::new()
            .capath("A.COM", "C.COM", vec!["B.COM".into()])
            .capath("A.COM", "D.COM", vec![]);
        let paths = &config.capaths["A.COM"];
        assert_eq!(vec!["B.COM".to_string()], paths["C.COM"]);
        assert!(paths["D.COM"].is_empty());
    }
}
