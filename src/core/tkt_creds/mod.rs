//! TGS exchange. [TktCredsContext] obtains a service ticket with a TGT of
//! the client, first getting the cross-realm TGTs required to reach the
//! realm of the service and then following the referrals of the KDCs.

mod realm_path;
pub use realm_path::{fallback_realm, realm_path};

use crate::core::codec::{decode_reply, Rep};
use crate::core::config::{FastPolicy, TktCredsOptions};
use crate::core::constants::kdc_options as ext_kdc_options;
use crate::core::constants::CONF_FAST_AVAIL;
use crate::core::env::{Env, KdcRequest, Step};
use crate::core::fast::FastState;
use crate::core::forge::{
    build_tgs_req, decrypt_tgs_rep_enc_part, TgsReqParams, TgsRequest,
};
use crate::core::init_creds::{verify_reply, ExpectedReply, ReplyKind};
use crate::core::vault::MatchFlags;
use crate::core::{Credential, Principal};
use crate::error::{Error, Result};
use kerberos_asn1::TgsRep;
use kerberos_constants::error_codes::KRB_ERR_RESPONSE_TOO_BIG;
use kerberos_constants::{kdc_options, ticket_flags};
use log::{debug, info, warn};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Begin,
    GetTgt,
    GetTgtOffpath,
    Referrals,
    NonReferral,
    Complete,
}

/// State of a TGS exchange.
pub struct TktCredsContext<'a> {
    env: Env<'a>,
    options: TktCredsOptions,
    state: State,
    client: Principal,

    /// Server as requested by the caller
    server: Principal,

    /// Server with the realm currently tried
    req_server: Principal,
    unqualified_realm: bool,
    fallback_tried: bool,

    local_tgt: Option<Credential>,
    cur_tgt: Option<Credential>,

    path: Vec<String>,
    path_cur: usize,
    path_next: usize,
    realms_seen: Vec<String>,
    offpath_count: u32,

    referral_count: u32,
    referral_realms: Vec<String>,
    restricted_retry: bool,

    fast: FastState,
    request: Option<TgsRequest>,
    request_server: Option<Principal>,
    used_nonces: Vec<u32>,
    last_request: Option<KdcRequest>,
    cred: Option<Credential>,
}

impl<'a> TktCredsContext<'a> {
    pub fn new(
        env: Env<'a>,
        client: Principal,
        server: Principal,
        options: TktCredsOptions,
    ) -> Self {
        let unqualified_realm = !server.has_realm();
        return Self {
            env,
            options,
            state: State::Begin,
            req_server: server.clone(),
            server,
            unqualified_realm,
            fallback_tried: false,
            local_tgt: None,
            cur_tgt: None,
            path: Vec::new(),
            path_cur: 0,
            path_next: 0,
            realms_seen: vec![client.realm.clone()],
            offpath_count: 0,
            referral_count: 0,
            referral_realms: Vec::new(),
            restricted_retry: false,
            fast: FastState::new(),
            request: None,
            request_server: None,
            used_nonces: Vec::new(),
            last_request: None,
            cred: None,
            client,
        };
    }

    /// Uses the given TGT instead of looking for it in the vault.
    pub fn tgt(mut self, tgt: Credential) -> Self {
        self.local_tgt = Some(tgt);
        self
    }

    pub fn is_complete(&self) -> bool {
        return self.state == State::Complete;
    }

    pub fn credential(&self) -> Option<&Credential> {
        return self.cred.as_ref();
    }

    pub fn take_credential(&mut self) -> Option<Credential> {
        return self.cred.take();
    }

    /// Advances the exchange. The first call receives no input, the rest
    /// receive the reply of the KDC to the last request.
    pub fn step(&mut self, input: &[u8]) -> Result<Step> {
        match self.state {
            State::Complete => return Ok(Step::Done),
            State::Begin => return self.begin(),
            _ => {}
        }

        if input.is_empty() {
            return Err(Error::String(
                "A KDC reply is required to continue".into(),
            ));
        }

        let reply = match decode_reply(input)? {
            Rep::KrbError(krb_error) => {
                let env = self.env;
                let (krb_error, _) = self.fast.unwrap_error(&env, krb_error)?;
                if krb_error.error_code == KRB_ERR_RESPONSE_TOO_BIG {
                    return self.resend_tcp();
                }
                debug!(
                    "KDC error {} in state {:?}",
                    krb_error.error_code, self.state
                );
                Err(Error::KrbError(krb_error))
            }
            Rep::TgsRep(tgs_rep) => self.process_tgs_rep(tgs_rep),
            rep => {
                return Err(Error::Modified(format!(
                    "Unexpected {} in TGS exchange",
                    rep.name()
                )))
            }
        };

        match self.state {
            State::GetTgt => return self.step_get_tgt(reply),
            State::GetTgtOffpath => return self.step_get_tgt_offpath(reply),
            State::Referrals => return self.step_referrals(reply),
            State::NonReferral => {
                let cred = reply.map_err(|e| e.for_principal(&self.server))?;
                return self.complete(cred);
            }
            State::Begin | State::Complete => {
                return Err(Error::String("No request in progress".into()))
            }
        }
    }

    fn resend_tcp(&mut self) -> Result<Step> {
        let mut request = self.last_request.clone().ok_or_else(|| {
            Error::String("No request to send again".into())
        })?;
        if request.tcp_only {
            return Err(Error::Loop(format!(
                "Response of {} too big even over TCP",
                request.realm
            )));
        }
        info!("Response too big, retrying over TCP");
        request.tcp_only = true;
        self.last_request = Some(request.clone());
        return Ok(Step::Request(request));
    }

    fn begin(&mut self) -> Result<Step> {
        let now = self.env.clock.now();

        // the result of constrained delegation depends on the evidence
        // ticket, so it cannot be taken from the cache
        if !self.options.constrained_delegation {
            if let Some(vault) = self.env.vault {
                let flags = MatchFlags::new()
                    .valid_at(now)
                    .etypes(self.options.etypes.clone())
                    .second_ticket(self.options.second_ticket.clone());
                if let Some(cred) =
                    vault.lookup(&self.client, &self.server, &flags)?
                {
                    info!("{} found in {} vault", self.server, vault.id());
                    self.cred = Some(cred);
                    self.state = State::Complete;
                    return Ok(Step::Done);
                }
                debug!("{} not found in {} vault", self.server, vault.id());
            }
        }

        if self.options.cache_only {
            return Err(Error::IOError(
                format!("No credential for {} in the vault", self.server),
                io::ErrorKind::NotFound.into(),
            ));
        }

        if self.unqualified_realm {
            self.req_server = self.server.with_realm(&self.client.realm);
        }

        if self.local_tgt.is_none() {
            self.local_tgt = Some(self.lookup_local_tgt()?);
        }

        return self.begin_get_tgt();
    }

    fn lookup_local_tgt(&self) -> Result<Credential> {
        let realm = &self.client.realm;
        let tgs = Principal::tgs(realm, realm);
        let vault = self.env.vault.ok_or_else(|| {
            Error::Config(format!("No vault to look for {}", tgs))
        })?;

        let flags = MatchFlags::new().valid_at(self.env.clock.now());
        return vault.lookup(&self.client, &tgs, &flags)?.ok_or_else(|| {
            Error::IOError(
                format!("No valid TGT {} in {} vault", tgs, vault.id()),
                io::ErrorKind::NotFound.into(),
            )
        });
    }

    /// Starts to look for a TGT of the service realm.
    fn begin_get_tgt(&mut self) -> Result<Step> {
        self.state = State::GetTgt;
        self.cur_tgt = self.local_tgt.clone();
        self.realms_seen = vec![self.client.realm.clone()];
        self.offpath_count = 0;

        let target = self.req_server.realm.clone();
        if target == self.client.realm {
            debug!("{} is in the client realm", self.req_server);
            return self.begin_referrals();
        }

        self.path = realm_path(self.env.config, &self.client.realm, &target);
        info!("Realm path to {}: {}", target, self.path.join(" -> "));
        self.path_cur = 0;
        self.path_next = self.path.len() - 1;
        return self.get_tgt_request();
    }

    /// Uses a cached TGT for the next realm of the path or asks the KDC
    /// for it.
    fn get_tgt_request(&mut self) -> Result<Step> {
        let next = Principal::tgs(
            &self.path[self.path_next],
            &self.path[self.path_cur],
        );

        if let Some(vault) = self.env.vault {
            let flags = MatchFlags::new().valid_at(self.env.clock.now());
            if let Some(tgt) = vault.lookup(&self.client, &next, &flags)? {
                debug!("Cached TGT {}", next);
                return self.handle_path_tgt(tgt, false);
            }
        }

        let options = self.tgt_kdc_options();
        return self.send_request(next, options, false);
    }

    fn step_get_tgt(&mut self, reply: Result<Credential>) -> Result<Step> {
        let tgt = match reply {
            Ok(tgt) => tgt,
            Err(error) => {
                if error.krb_error().is_none() {
                    return Err(error);
                }
                warn!(
                    "Unable to get TGT for {}: {}",
                    self.path[self.path_next], error
                );
                if self.path_next <= self.path_cur + 1 {
                    return Err(error.for_principal(&self.server));
                }
                self.path_next -= 1;
                return self.get_tgt_request();
            }
        };
        return self.handle_path_tgt(tgt, true);
    }

    /// Moves forward with a TGT received while walking the realm path.
    fn handle_path_tgt(&mut self, tgt: Credential, store: bool) -> Result<Step> {
        let realm = tgt
            .tgt_realm()
            .ok_or_else(|| {
                Error::Modified(format!("Expected a TGT but got {}", tgt.server))
            })?
            .to_string();

        if store {
            self.store_tgt(&tgt)?;
        }

        if realm == self.req_server.realm {
            self.cur_tgt = Some(tgt);
            return self.begin_referrals();
        }

        match self.path.iter().position(|r| r == &realm) {
            Some(i) if i > self.path_cur => {
                debug!("Got TGT for path realm {}", realm);
                self.path_cur = i;
                self.path_next = self.path.len() - 1;
                self.realms_seen.push(realm);
                self.cur_tgt = Some(tgt);
                return self.get_tgt_request();
            }
            Some(_) => {
                return Err(Error::Loop(format!(
                    "TGT for {} goes back in the realm path",
                    realm
                )));
            }
            None => {
                if self.realms_seen.contains(&realm) {
                    return Err(Error::Loop(format!(
                        "TGT for already visited realm {}",
                        realm
                    )));
                }
                info!("TGT for {} is off the realm path", realm);
                self.realms_seen.push(realm);
                self.cur_tgt = Some(tgt);
                self.state = State::GetTgtOffpath;
                return self.offpath_request();
            }
        }
    }

    /// Asks the KDC of the last TGT for a TGT of the service realm.
    fn offpath_request(&mut self) -> Result<Step> {
        self.offpath_count += 1;
        if self.offpath_count > self.env.config.offpath_max_hops {
            return Err(Error::Modified(format!(
                "Too many off-path referrals looking for realm {}",
                self.req_server.realm
            )));
        }

        let issuer = self.current_realm()?;
        let server = Principal::tgs(&self.req_server.realm, &issuer);
        let options = self.tgt_kdc_options();
        return self.send_request(server, options, false);
    }

    fn step_get_tgt_offpath(
        &mut self,
        reply: Result<Credential>,
    ) -> Result<Step> {
        let tgt = reply.map_err(|e| e.for_principal(&self.server))?;
        let realm = tgt
            .tgt_realm()
            .ok_or_else(|| {
                Error::Modified(format!("Expected a TGT but got {}", tgt.server))
            })?
            .to_string();

        self.store_tgt(&tgt)?;
        if realm == self.req_server.realm {
            self.cur_tgt = Some(tgt);
            return self.begin_referrals();
        }

        if self.realms_seen.contains(&realm) {
            return Err(Error::Loop(format!(
                "Off-path referral back to realm {}",
                realm
            )));
        }

        debug!("Off-path TGT for {}", realm);
        self.realms_seen.push(realm);
        self.cur_tgt = Some(tgt);
        return self.offpath_request();
    }

    fn begin_referrals(&mut self) -> Result<Step> {
        self.state = State::Referrals;
        self.referral_count = 0;
        self.referral_realms = vec![self.current_realm()?];
        return self.referral_request();
    }

    fn referral_request(&mut self) -> Result<Step> {
        let realm = self.current_realm()?;
        let server = self.req_server.with_realm(&realm);
        let options = self.service_kdc_options() | kdc_options::CANONICALIZE;
        return self.send_request(server, options, true);
    }

    fn step_referrals(&mut self, reply: Result<Credential>) -> Result<Step> {
        let cred = match reply {
            Ok(cred) => cred,
            Err(error) => {
                if error.krb_error().is_some() && self.referral_count == 0 {
                    if let Some(realm) = self.fallback_realm() {
                        self.fallback_tried = true;
                        if realm == self.req_server.realm {
                            return self.begin_non_referral();
                        }
                        info!("Trying fallback realm {}", realm);
                        self.req_server = self.req_server.with_realm(&realm);
                        return self.begin_get_tgt();
                    }
                }
                return Err(error.for_principal(&self.server));
            }
        };

        if self.req_server.name_matches(&cred.server.name) {
            if let Some(etypes) = &self.options.etypes {
                let etype = cred.key.keytype;
                if !etypes.contains(&etype) && !self.restricted_retry {
                    info!("Session key etype {} not allowed, asking again", etype);
                    self.restricted_retry = true;
                    return self.referral_request();
                }
            }
            return self.complete(cred);
        }

        let realm = match cred.tgt_realm() {
            Some(realm) => realm.to_string(),
            None => {
                debug!("KDC returned {} instead of a referral", cred.server);
                return self.begin_non_referral();
            }
        };

        if realm == self.current_realm()? {
            return self.begin_non_referral();
        }

        self.referral_count += 1;
        if self.referral_count > self.env.config.referral_max_hops {
            return Err(Error::Loop(format!(
                "Too many referrals looking for {}",
                self.server
            )));
        }
        if self.referral_realms.contains(&realm) {
            return Err(Error::Loop(format!(
                "Referral back to realm {}",
                realm
            )));
        }

        info!("Referral to realm {}", realm);
        if self.referral_count == 1 {
            self.store_tgt(&cred)?;
        }
        self.referral_realms.push(realm);
        self.cur_tgt = Some(cred);
        return self.referral_request();
    }

    fn begin_non_referral(&mut self) -> Result<Step> {
        self.state = State::NonReferral;
        let realm = self.current_realm()?;
        let server = self.req_server.with_realm(&realm);
        let options = self.service_kdc_options();
        return self.send_request(server, options, true);
    }

    /// Realm to try when the KDC does not find the service, if the caller
    /// did not give it.
    fn fallback_realm(&self) -> Option<String> {
        if !self.unqualified_realm
            || self.fallback_tried
            || !self.env.config.dns_fallback
        {
            return None;
        }
        return self.server.host().and_then(fallback_realm);
    }

    fn complete(&mut self, mut cred: Credential) -> Result<Step> {
        if self.options.constrained_delegation
            && !cred.has_flags(ticket_flags::FORWARDABLE)
        {
            return Err(Error::String(format!(
                "Delegation to {} was not granted, ticket is not forwardable",
                self.server
            )));
        }

        if let Some(second_ticket) = &self.options.second_ticket {
            cred.second_ticket = Some(second_ticket.clone());
            cred.is_skey = self.options.user_to_user;
        }
        cred.server = self.server.clone();

        if !self.options.no_store {
            if let Some(vault) = self.env.vault {
                debug!("Storing {} in {} vault", cred.server, vault.id());
                vault.store(cred.clone())?;
            }
        }

        info!("Received {} for {}", self.server, cred.client);
        self.cred = Some(cred);
        self.state = State::Complete;
        return Ok(Step::Done);
    }

    fn store_tgt(&self, tgt: &Credential) -> Result<()> {
        if self.options.no_store {
            return Ok(());
        }
        if let Some(vault) = self.env.vault {
            debug!("Storing {} in {} vault", tgt.server, vault.id());
            vault.store(tgt.clone())?;
        }
        return Ok(());
    }

    fn current_tgt(&self) -> Result<&Credential> {
        return self
            .cur_tgt
            .as_ref()
            .ok_or_else(|| Error::String("No TGT to continue".into()));
    }

    /// Realm of the KDC which accepts the current TGT.
    fn current_realm(&self) -> Result<String> {
        let tgt = self.current_tgt()?;
        return Ok(tgt.tgt_realm().unwrap_or(&tgt.server.realm).to_string());
    }

    fn tgt_kdc_options(&self) -> u32 {
        let delegation =
            kdc_options::CONSTRAINED_DELEGATION | ext_kdc_options::ENC_TKT_IN_SKEY;
        return (self.options.kdc_options & !delegation)
            | kdc_options::CANONICALIZE;
    }

    fn service_kdc_options(&self) -> u32 {
        let mut options = self.options.kdc_options;
        if self.options.constrained_delegation {
            options |= kdc_options::CONSTRAINED_DELEGATION;
        }
        if self.options.user_to_user {
            options |= ext_kdc_options::ENC_TKT_IN_SKEY;
        }
        return options;
    }

    /// Whether the TGS request for `realm` must be armored.
    fn use_fast(&self, realm: &str) -> Result<bool> {
        let policy = self.env.config.fast_policy;
        if policy == FastPolicy::Never || !FastState::is_available(&self.env) {
            if policy == FastPolicy::Required {
                return Err(Error::Config(
                    "FAST is required but no codec is available".into(),
                ));
            }
            return Ok(false);
        }
        if policy == FastPolicy::Required {
            return Ok(true);
        }

        let tgs = Principal::tgs(realm, realm);
        return match self.env.vault {
            Some(vault) => Ok(vault.get_config(Some(&tgs), CONF_FAST_AVAIL)?
                == Some("yes".to_string())),
            None => Ok(false),
        };
    }

    fn request_etypes(&self) -> Vec<i32> {
        if self.restricted_retry {
            if let Some(etypes) = &self.options.etypes {
                return etypes.clone();
            }
        }
        let crypto = self.env.crypto;
        return self
            .env
            .config
            .default_etypes
            .clone()
            .unwrap_or_else(|| crypto.supported_etypes());
    }

    fn send_request(
        &mut self,
        server: Principal,
        kdc_options: u32,
        is_service: bool,
    ) -> Result<Step> {
        let env = self.env;
        let tgt = self.current_tgt()?.clone();
        let realm = tgt.tgt_realm().unwrap_or(&tgt.server.realm).to_string();

        let params = TgsReqParams {
            kdc_options,
            etypes: self.request_etypes(),
            second_ticket: if is_service {
                self.options.second_ticket.clone()
            } else {
                None
            },
            padata: self.options.padata.clone(),
        };

        let use_fast = self.use_fast(&realm)?;
        let request = loop {
            self.fast = FastState::new();
            let fast = if use_fast { Some(&mut self.fast) } else { None };
            let request = build_tgs_req(&env, &tgt, &server, &params, fast)?;
            if !self.used_nonces.contains(&request.nonce) {
                break request;
            }
        };
        self.used_nonces.push(request.nonce);

        info!(
            "TGS-REQ for {} to {} (nonce {}{})",
            server,
            request.realm,
            request.nonce,
            if use_fast { ", FAST" } else { "" }
        );
        let kdc_request = KdcRequest {
            data: request.data.clone(),
            realm: request.realm.clone(),
            tcp_only: false,
        };
        self.request = Some(request);
        self.request_server = Some(server);
        self.last_request = Some(kdc_request.clone());
        return Ok(Step::Request(kdc_request));
    }

    /// Decrypts and verifies the reply to the last request.
    fn process_tgs_rep(&self, tgs_rep: TgsRep) -> Result<Credential> {
        let env = self.env;
        let request = self
            .request
            .as_ref()
            .ok_or_else(|| Error::String("No request in progress".into()))?;
        let server = self
            .request_server
            .as_ref()
            .ok_or_else(|| Error::String("No request in progress".into()))?;
        let tgt = self.current_tgt()?;

        let mut subkey = request.subkey.clone();
        if let Some(response) = self.fast.unwrap_reply(
            &env,
            tgs_rep.padata.as_ref(),
            &tgs_rep.ticket,
        )? {
            subkey = self.fast.strengthen_key(
                &env,
                &subkey,
                response.strengthen_key.as_ref(),
            )?;
        }

        let enc_part = decrypt_tgs_rep_enc_part(
            env.crypto,
            &subkey,
            &request.session_key,
            &tgs_rep.enc_part,
        )?;

        let reply_client =
            Principal::new(tgs_rep.cname.clone(), tgs_rep.crealm.clone());
        let expected = ExpectedReply {
            nonce: request.nonce,
            client: &tgt.client,
            server,
            kdc_options: request.kdc_options,
            till: request.till,
            rtime: None,
            request_time: request.timestamp,
        };
        let mut clock = env.clock;
        verify_reply(
            env.config,
            &mut clock,
            ReplyKind::Subsequent,
            &expected,
            &reply_client,
            &tgs_rep.ticket,
            &enc_part,
        )?;

        let mut cred =
            Credential::from_kdc_rep(reply_client, tgs_rep.ticket, &enc_part);

        // a foreign realm cannot grant delegation that the path to it
        // was not trusted with
        let cross_realm = tgt.tgt_realm() != Some(self.client.realm.as_str());
        if cross_realm
            && !tgt.has_flags(ticket_flags::OK_AS_DELEGATE)
            && cred.has_flags(ticket_flags::OK_AS_DELEGATE)
        {
            debug!("Removing ok-as-delegate of {}", cred.server);
            cred.flags &= !ticket_flags::OK_AS_DELEGATE;
        }

        return Ok(cred);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::Crypto;
    use crate::core::fast::KrbFastResponse;
    use crate::core::testkit::{
        answer_tgs_req, armored_padata, build_tgs_rep, enc_part_for,
        krb_error, new_credential, parse_tgs_req, tgs_req_armor_key,
        tgs_req_keys, FakeCodec, FakeCrypto,
    };
    use crate::core::vault::{MemoryVault, Vault};
    use crate::core::Config;
    use kerberos_asn1::{Asn1Object, PaData};
    use kerberos_constants::error_codes::{
        KDC_ERR_BADOPTION, KDC_ERR_S_PRINCIPAL_UNKNOWN, KRB_ERR_GENERIC,
    };
    use kerberos_constants::etypes::{AES256_CTS_HMAC_SHA1_96, RC4_HMAC};
    use kerberos_constants::pa_data_types::{PA_FX_ERROR, PA_FX_FAST};

    fn request_of(step: Step) -> KdcRequest {
        match step {
            Step::Request(request) => request,
            step => panic!("Expected a request, got {:?}", step),
        }
    }

    fn requested_server(request: &KdcRequest) -> Principal {
        let tgs_req = parse_tgs_req(&request.data);
        return Principal::new(
            tgs_req.req_body.sname.unwrap(),
            tgs_req.req_body.realm,
        );
    }

    fn alice() -> Principal {
        return Principal::user("alice", "A.COM");
    }

    fn vault_with_tgt() -> MemoryVault {
        let vault = MemoryVault::new();
        vault
            .store(new_credential(alice(), Principal::tgs("A.COM", "A.COM")))
            .unwrap();
        return vault;
    }

    #[test]
    fn test_same_realm_uses_local_tgt() {
        let crypto = FakeCrypto::new();
        let config = Config::default();
        let vault = vault_with_tgt();
        let env = Env::new(&crypto, &config).vault(&vault);
        let server = Principal::service("cifs/fs.a.com", "A.COM");
        let mut ctx = TktCredsContext::new(
            env,
            alice(),
            server.clone(),
            TktCredsOptions::new(),
        );

        let request = request_of(ctx.step(&[]).unwrap());
        assert_eq!("A.COM", request.realm);
        assert_eq!(server, requested_server(&request));

        let reply = answer_tgs_req(&crypto, &request.data, &server, 0);
        assert_eq!(Step::Done, ctx.step(&reply).unwrap());
        assert_eq!(server, ctx.credential().unwrap().server);

        // the next time it comes from the vault
        let mut ctx =
            TktCredsContext::new(env, alice(), server, TktCredsOptions::new());
        assert_eq!(Step::Done, ctx.step(&[]).unwrap());
    }

    #[test]
    fn test_cache_only_not_found() {
        let crypto = FakeCrypto::new();
        let config = Config::default();
        let vault = vault_with_tgt();
        let env = Env::new(&crypto, &config).vault(&vault);
        let mut ctx = TktCredsContext::new(
            env,
            alice(),
            Principal::service("cifs/fs.a.com", "A.COM"),
            TktCredsOptions::new().cache_only(true),
        );

        assert!(ctx.step(&[]).unwrap_err().is_not_found_error());
    }

    #[test]
    fn test_referral_to_other_realm() {
        let crypto = FakeCrypto::new();
        let config = Config::default();
        let vault = vault_with_tgt();
        let env = Env::new(&crypto, &config).vault(&vault);
        let server = Principal::service("cifs/fs.b.com", "A.COM");
        let mut ctx = TktCredsContext::new(
            env,
            alice(),
            server.clone(),
            TktCredsOptions::new(),
        );

        let first = request_of(ctx.step(&[]).unwrap());
        let referral = Principal::tgs("B.COM", "A.COM");
        let reply = answer_tgs_req(&crypto, &first.data, &referral, 0);

        let second = request_of(ctx.step(&reply).unwrap());
        assert_eq!("B.COM", second.realm);
        assert_eq!(server.with_realm("B.COM"), requested_server(&second));

        let canonical = Principal::service("cifs/fs.b.com", "B.COM");
        let reply = answer_tgs_req(&crypto, &second.data, &canonical, 0);
        assert_eq!(Step::Done, ctx.step(&reply).unwrap());

        // the server is the requested one, not the canonical one
        assert_eq!(server, ctx.credential().unwrap().server);

        // the first referral TGT is cached
        let flags = MatchFlags::new();
        assert!(vault.lookup(&alice(), &referral, &flags).unwrap().is_some());
    }

    #[test]
    fn test_referral_loop() {
        let crypto = FakeCrypto::new();
        let config = Config::default();
        let vault = vault_with_tgt();
        let env = Env::new(&crypto, &config).vault(&vault);
        let server = Principal::service("cifs/fs.b.com", "A.COM");
        let mut ctx =
            TktCredsContext::new(env, alice(), server, TktCredsOptions::new());

        let first = request_of(ctx.step(&[]).unwrap());
        let to_b = Principal::tgs("B.COM", "A.COM");
        let reply = answer_tgs_req(&crypto, &first.data, &to_b, 0);
        let second = request_of(ctx.step(&reply).unwrap());

        let back_to_a = Principal::tgs("A.COM", "B.COM");
        let reply = answer_tgs_req(&crypto, &second.data, &back_to_a, 0);
        assert!(matches!(ctx.step(&reply), Err(Error::Loop(_))));
    }

    #[test]
    fn test_cross_realm_path() {
        let crypto = FakeCrypto::new();
        let config = Config::default();
        let vault = MemoryVault::new();
        let client = Principal::user("alice", "A.EXAMPLE.COM");
        vault
            .store(new_credential(
                client.clone(),
                Principal::tgs("A.EXAMPLE.COM", "A.EXAMPLE.COM"),
            ))
            .unwrap();
        let env = Env::new(&crypto, &config).vault(&vault);
        let server = Principal::service("host/h.b.example.com", "B.EXAMPLE.COM");
        let mut ctx = TktCredsContext::new(
            env,
            client.clone(),
            server.clone(),
            TktCredsOptions::new(),
        );

        // the most distant realm is asked first
        let first = request_of(ctx.step(&[]).unwrap());
        assert_eq!(
            Principal::tgs("B.EXAMPLE.COM", "A.EXAMPLE.COM"),
            requested_server(&first)
        );

        // the KDC only knows its parent
        let error = krb_error(KDC_ERR_S_PRINCIPAL_UNKNOWN, "A.EXAMPLE.COM", None);
        let second = request_of(ctx.step(&error).unwrap());
        let parent = Principal::tgs("EXAMPLE.COM", "A.EXAMPLE.COM");
        assert_eq!(parent, requested_server(&second));

        let reply = answer_tgs_req(&crypto, &second.data, &parent, 0);
        let third = request_of(ctx.step(&reply).unwrap());
        assert_eq!("EXAMPLE.COM", third.realm);
        let target = Principal::tgs("B.EXAMPLE.COM", "EXAMPLE.COM");
        assert_eq!(target, requested_server(&third));

        let reply = answer_tgs_req(&crypto, &third.data, &target, 0);
        let fourth = request_of(ctx.step(&reply).unwrap());
        assert_eq!("B.EXAMPLE.COM", fourth.realm);
        assert_eq!(server, requested_server(&fourth));

        let reply = answer_tgs_req(
            &crypto,
            &fourth.data,
            &server,
            ticket_flags::OK_AS_DELEGATE,
        );
        assert_eq!(Step::Done, ctx.step(&reply).unwrap());

        // the foreign TGT was not ok-as-delegate
        let cred = ctx.credential().unwrap();
        assert!(!cred.has_flags(ticket_flags::OK_AS_DELEGATE));
        assert_eq!(server, cred.server);
    }

    #[test]
    fn test_offpath_bound() {
        let crypto = FakeCrypto::new();
        let config = Config::default().offpath_max_hops(2);
        let vault = vault_with_tgt();
        let env = Env::new(&crypto, &config).vault(&vault);
        let server = Principal::service("host/h.z.com", "Z.COM");
        let mut ctx =
            TktCredsContext::new(env, alice(), server, TktCredsOptions::new());

        let mut request = request_of(ctx.step(&[]).unwrap());
        let mut issuer = "A.COM".to_string();
        let mut result = Ok(Step::Done);
        for realm in ["X1.ORG", "X2.ORG", "X3.ORG"].iter() {
            let offpath = Principal::tgs(realm, &issuer);
            let reply = answer_tgs_req(&crypto, &request.data, &offpath, 0);
            result = ctx.step(&reply);
            match &result {
                Ok(Step::Request(next)) => request = next.clone(),
                _ => break,
            }
            issuer = realm.to_string();
        }

        assert!(matches!(result, Err(Error::Modified(_))));
    }

    #[test]
    fn test_fallback_realm_on_unknown_server() {
        let crypto = FakeCrypto::new();
        let config = Config::default();
        let vault = vault_with_tgt();
        let env = Env::new(&crypto, &config).vault(&vault);
        let server = Principal::service("cifs/fs.b.com", "");
        let mut ctx = TktCredsContext::new(
            env,
            alice(),
            server.clone(),
            TktCredsOptions::new(),
        );

        let first = request_of(ctx.step(&[]).unwrap());
        assert_eq!(server.with_realm("A.COM"), requested_server(&first));

        let error = krb_error(KDC_ERR_S_PRINCIPAL_UNKNOWN, "A.COM", None);
        let second = request_of(ctx.step(&error).unwrap());
        assert_eq!(Principal::tgs("B.COM", "A.COM"), requested_server(&second));
    }

    #[test]
    fn test_constrained_delegation_requires_forwardable() {
        let crypto = FakeCrypto::new();
        let config = Config::default();
        let vault = vault_with_tgt();
        let env = Env::new(&crypto, &config).vault(&vault);
        let server = Principal::service("cifs/fs.a.com", "A.COM");
        let evidence =
            new_credential(Principal::user("bob", "A.COM"), alice()).ticket;
        let mut ctx = TktCredsContext::new(
            env,
            alice(),
            server.clone(),
            TktCredsOptions::new().constrained_delegation(evidence),
        );

        let request = request_of(ctx.step(&[]).unwrap());
        let tgs_req = parse_tgs_req(&request.data);
        assert_ne!(
            0,
            tgs_req.req_body.kdc_options.flags
                & kdc_options::CONSTRAINED_DELEGATION
        );
        assert_eq!(1, tgs_req.req_body.additional_tickets.unwrap().len());

        let reply = answer_tgs_req(&crypto, &request.data, &server, 0);
        assert!(ctx.step(&reply).is_err());
    }

    #[test]
    fn test_etype_restriction_checks_session_key() {
        let crypto = FakeCrypto::new();
        let config = Config::default();
        let vault = vault_with_tgt();
        let env = Env::new(&crypto, &config).vault(&vault);
        let server = Principal::service("cifs/fs.a.com", "A.COM");
        let mut ctx = TktCredsContext::new(
            env,
            alice(),
            server.clone(),
            TktCredsOptions::new().etypes(vec![AES256_CTS_HMAC_SHA1_96]),
        );

        // RC4 session key in a ticket encrypted with AES256
        let first = request_of(ctx.step(&[]).unwrap());
        let tgs_req = parse_tgs_req(&first.data);
        let (client, subkey, session_key) = tgs_req_keys(&crypto, &tgs_req);
        let rc4_key = crypto.random_key(RC4_HMAC).unwrap();
        let enc_part = enc_part_for(&tgs_req.req_body, &server, &rc4_key);
        let raw = build_tgs_rep(
            &crypto,
            &client,
            &enc_part,
            subkey.as_ref(),
            &session_key,
        );
        let (_, mut tgs_rep) = TgsRep::parse(&raw).unwrap();
        tgs_rep.ticket.enc_part.etype = AES256_CTS_HMAC_SHA1_96;

        let second = request_of(ctx.step(&tgs_rep.build()).unwrap());
        assert_eq!(
            vec![AES256_CTS_HMAC_SHA1_96],
            parse_tgs_req(&second.data).req_body.etypes
        );

        let reply = answer_tgs_req(&crypto, &second.data, &server, 0);
        assert_eq!(Step::Done, ctx.step(&reply).unwrap());
        assert_eq!(
            AES256_CTS_HMAC_SHA1_96,
            ctx.credential().unwrap().key.keytype
        );
    }

    #[test]
    fn test_response_too_big_over_tcp_fails() {
        let crypto = FakeCrypto::new();
        let config = Config::default();
        let vault = vault_with_tgt();
        let env = Env::new(&crypto, &config).vault(&vault);
        let mut ctx = TktCredsContext::new(
            env,
            alice(),
            Principal::service("cifs/fs.a.com", "A.COM"),
            TktCredsOptions::new(),
        );

        let first = request_of(ctx.step(&[]).unwrap());
        let too_big = krb_error(KRB_ERR_RESPONSE_TOO_BIG, "A.COM", None);
        let retry = request_of(ctx.step(&too_big).unwrap());
        assert!(retry.tcp_only);
        assert_eq!(first.data, retry.data);

        assert!(matches!(ctx.step(&too_big), Err(Error::Loop(_))));
    }

    #[test]
    fn test_armored_error_is_unwrapped() {
        let crypto = FakeCrypto::new();
        let codec = FakeCodec::new();
        let config = Config::default();
        let vault = vault_with_tgt();
        let tgs = Principal::tgs("A.COM", "A.COM");
        vault.set_config(Some(&tgs), CONF_FAST_AVAIL, "yes").unwrap();
        let env = Env::new(&crypto, &config).codec(&codec).vault(&vault);
        let mut ctx = TktCredsContext::new(
            env,
            alice(),
            Principal::service("cifs/fs.a.com", "A.COM"),
            TktCredsOptions::new(),
        );

        let request = request_of(ctx.step(&[]).unwrap());
        let tgs_req = parse_tgs_req(&request.data);
        let outer_types: Vec<i32> = tgs_req
            .padata
            .as_ref()
            .unwrap()
            .iter()
            .map(|pa| pa.padata_type)
            .collect();
        assert!(outer_types.contains(&PA_FX_FAST));

        let armor_key = tgs_req_armor_key(&crypto, &tgs_req);
        let inner = krb_error(KDC_ERR_BADOPTION, "A.COM", None);
        let response = KrbFastResponse {
            padata: vec![PaData::new(PA_FX_ERROR, inner)],
            strengthen_key: None,
            finished: None,
            nonce: tgs_req.req_body.nonce,
        };
        let outer = krb_error(
            KRB_ERR_GENERIC,
            "A.COM",
            Some(vec![armored_padata(&crypto, &codec, &armor_key, &response)]),
        );

        let error = ctx.step(&outer).unwrap_err();
        assert_eq!(Some(KDC_ERR_BADOPTION), error.krb_error_code());
    }
}
