//! AS exchange. [InitCredsContext] is advanced by the caller with the
//! replies of the KDC until it returns [Step::Done], restarting the
//! exchange internally when the KDC asks for preauthentication, FAST or
//! another client realm.

mod as_key;
pub use as_key::{AsKey, KeySource};

mod verify;
pub use verify::{verify_reply, ExpectedReply, ReplyKind};

use crate::core::clock::Clock;
use crate::core::codec::{
    decode_etype_info, decode_etype_info2, decode_reply, find_padata, Rep,
};
use crate::core::config::{FastPolicy, InitCredsOptions};
use crate::core::constants::error_codes::{
    KDC_ERR_MORE_PREAUTH_DATA_REQUIRED, KDC_ERR_PREAUTH_EXPIRED,
    KDC_ERR_WRONG_REALM,
};
use crate::core::constants::key_usages::{
    KEY_USAGE_AS_REQ, KEY_USAGE_PA_PKINIT_KX,
};
use crate::core::constants::pa_data_types::{PA_PKINIT_KX, PA_REQ_ENC_PA_REP};
use crate::core::constants::{
    kdc_options as ext_kdc_options, ticket_flags as ext_ticket_flags,
    CONF_FAST_AVAIL, CONF_PA_CONFIG_DATA, CONF_PA_TYPE,
};
use crate::core::crypto::default_salt;
use crate::core::env::{Env, KdcRequest, Step};
use crate::core::fast::FastState;
use crate::core::forge::{decrypt_as_rep_enc_part, KdcReqBuilder};
use crate::core::preauth::{
    sort_padata, Answers, PaConfig, PreauthContext, PreauthState,
    Questions, QUESTION_PASSWORD,
};
use crate::core::{Credential, Principal};
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use kerberos_asn1::{
    AsRep, AsReq, Asn1Object, Checksum, EncKdcRepPart, EncryptedData,
    EncryptionKey, KdcReq, KrbError, PaData,
};
use kerberos_constants::error_codes::{
    KDC_ERR_PADATA_TYPE_NOSUPP, KDC_ERR_PREAUTH_FAILED,
    KDC_ERR_PREAUTH_REQUIRED, KRB_ERR_RESPONSE_TOO_BIG,
};
use kerberos_constants::kdc_options;
use kerberos_constants::pa_data_types::{
    PA_ETYPE_INFO, PA_ETYPE_INFO2, PA_PW_SALT,
};
use log::{debug, info, warn};
use std::convert::TryFrom;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Begin,
    RequestSent,
    Complete,
}

/// Work interrupted to ask the caller, resumed by `step` with no input.
#[derive(Debug, Clone)]
enum Pending {
    Preauth,
    Reply(AsRep),
}

/// Values of the current request that the preauthentication mechanisms
/// can read or modify.
struct Exchange {
    client: Principal,
    request: KdcReq,
    as_key: AsKey,
    fast: FastState,
    questions: Questions,
    answers: Answers,
    config_in: PaConfig,
    config_out: PaConfig,
    request_pac: Option<bool>,
}

impl Exchange {
    fn preauth_context<'b>(
        &'b mut self,
        env: Env<'b>,
        now: DateTime<Utc>,
    ) -> PreauthContext<'b> {
        return PreauthContext {
            env,
            client: &self.client,
            request: &self.request,
            as_key: &mut self.as_key,
            fast: &self.fast,
            questions: &mut self.questions,
            answers: &self.answers,
            config_in: &self.config_in,
            config_out: &mut self.config_out,
            request_pac: self.request_pac,
            now,
        };
    }
}

/// State of an AS exchange.
pub struct InitCredsContext<'a> {
    env: Env<'a>,
    options: InitCredsOptions,
    state: State,
    clock: Clock,

    exchange: Exchange,
    server: Principal,
    preauth: PreauthState<'a>,
    pinned_type: Option<i32>,

    /// Hints of the last KDC error, sorted by preference.
    method_data: Vec<PaData>,
    preauth_padata: Vec<PaData>,

    etypes: Vec<i32>,
    kdc_options: u32,
    nonce: u32,
    used_nonces: Vec<u32>,
    request_time: DateTime<Utc>,
    till: DateTime<Utc>,
    rtime: Option<DateTime<Utc>>,
    loop_count: u32,

    fast_upgraded: bool,
    sent_optimistic: bool,
    no_optimistic: bool,

    /// The last request carried PA-REQ-ENC-PA-REP.
    enc_pa_rep_sent: bool,

    /// The KDC announced FAST in the encrypted padata of the reply.
    fast_avail: bool,

    last_request: Option<KdcRequest>,
    pending: Option<Pending>,
    cred: Option<Credential>,
}

impl<'a> InitCredsContext<'a> {
    pub fn new(
        env: Env<'a>,
        client: Principal,
        options: InitCredsOptions,
    ) -> Result<Self> {
        let crypto = env.crypto;
        let etypes = request_etypes(&env, &options)?;

        let client = if options.anonymous {
            Principal::new(Principal::anonymous().name, client.realm)
        } else {
            client
        };

        let mut as_key = AsKey::new(
            etypes[0],
            default_salt(&client.realm, client.components()),
            options.secret.clone(),
        );
        as_key.salt = options.salt.clone();

        let now = env.clock.now();
        let request_pac = options.request_pac;
        return Ok(Self {
            env,
            state: State::Begin,
            clock: env.clock,
            exchange: Exchange {
                client: client.clone(),
                request: KdcReq::default(),
                as_key,
                fast: FastState::new(),
                questions: Questions::new(),
                answers: Answers::new(),
                config_in: PaConfig::new(),
                config_out: PaConfig::new(),
                request_pac,
            },
            server: Principal::tgs(&client.realm, &client.realm),
            preauth: PreauthState::new(env.registry),
            pinned_type: None,
            method_data: Vec::new(),
            preauth_padata: Vec::new(),
            etypes,
            kdc_options: request_kdc_options(&options),
            nonce: crypto.nonce(),
            used_nonces: Vec::new(),
            request_time: now,
            till: now,
            rtime: None,
            loop_count: 0,
            fast_upgraded: false,
            sent_optimistic: false,
            no_optimistic: false,
            enc_pa_rep_sent: false,
            fast_avail: false,
            last_request: None,
            pending: None,
            cred: None,
            options,
        });
    }

    pub fn client(&self) -> &Principal {
        return &self.exchange.client;
    }

    pub fn is_complete(&self) -> bool {
        return self.state == State::Complete;
    }

    /// Clock corrected with the KDC time learned in the exchange.
    pub fn clock(&self) -> Clock {
        return self.clock;
    }

    pub fn questions(&self) -> &Questions {
        return &self.exchange.questions;
    }

    pub fn set_answer(&mut self, name: &str, value: &str) {
        self.exchange.answers.set(name, value);
    }

    pub fn answers_mut(&mut self) -> &mut Answers {
        return &mut self.exchange.answers;
    }

    pub fn credential(&self) -> Option<&Credential> {
        return self.cred.as_ref();
    }

    pub fn take_credential(&mut self) -> Option<Credential> {
        return self.cred.take();
    }

    /// Advances the exchange. The first call and the calls after answering
    /// questions receive no input, the rest receive the reply of the KDC
    /// to the last request.
    pub fn step(&mut self, input: &[u8]) -> Result<Step> {
        match self.state {
            State::Complete => return Ok(Step::Done),
            State::Begin => {
                self.restart(false)?;
                return self.send_request();
            }
            State::RequestSent => {}
        }

        if input.is_empty() {
            match self.pending.take() {
                Some(Pending::Preauth) => return self.continue_preauth(),
                Some(Pending::Reply(as_rep)) => {
                    return self.handle_as_rep(as_rep)
                }
                None => {
                    return Err(Error::String(
                        "A KDC reply is required to continue".into(),
                    ))
                }
            }
        }

        self.pending = None;
        match decode_reply(input)? {
            Rep::KrbError(krb_error) => return self.handle_error(krb_error),
            Rep::AsRep(as_rep) => return self.handle_as_rep(as_rep),
            rep => {
                return Err(Error::Modified(format!(
                    "Unexpected {} in AS exchange",
                    rep.name()
                )))
            }
        }
    }

    /// Starts the exchange from scratch, keeping only the client, the
    /// answers and the nonces already used.
    fn restart(&mut self, force_fast: bool) -> Result<()> {
        let env = self.env;
        let client = self.exchange.client.clone();
        debug!("Starting AS exchange for {}", client);

        self.server = match &self.options.service {
            Some(service) => {
                let server = Principal::try_from(service.as_str())?;
                if server.has_realm() {
                    server
                } else {
                    server.with_realm(&client.realm)
                }
            }
            None => Principal::tgs(&client.realm, &client.realm),
        };

        self.preauth = PreauthState::new(env.registry);
        self.preauth.allowed_list = self.options.preauth_list.clone();
        self.method_data.clear();
        self.preauth_padata.clear();
        self.no_optimistic = false;
        self.exchange
            .as_key
            .set_default_salt(default_salt(&client.realm, client.components()));
        self.exchange.config_out = PaConfig::new();

        let tgs = Principal::tgs(&client.realm, &client.realm);
        let mut fast_avail = false;
        self.pinned_type = None;
        self.exchange.config_in = PaConfig::new();
        if let Some(vault) = env.vault {
            self.pinned_type = vault
                .get_config(Some(&tgs), CONF_PA_TYPE)?
                .and_then(|t| t.parse().ok());
            fast_avail = vault.get_config(Some(&tgs), CONF_FAST_AVAIL)?
                == Some("yes".to_string());
            if let Some(raw) = vault.get_config(Some(&tgs), CONF_PA_CONFIG_DATA)?
            {
                self.exchange.config_in = PaConfig::parse(&raw);
            }
        }

        self.exchange.fast = FastState::new();
        let policy = env.config.fast_policy;
        if let Some(armor) = &self.options.armor {
            if FastState::is_available(&env)
                && (force_fast || fast_avail || policy == FastPolicy::Required)
            {
                let now = self.clock.now();
                self.exchange.fast.armor_as(&env, armor, now)?;
                info!("AS exchange for {} armored with FAST", client);
            }
        }

        if policy == FastPolicy::Required && !self.exchange.fast.is_active() {
            return Err(Error::Config(
                "FAST is required but no armor is available".into(),
            ));
        }

        return Ok(());
    }

    fn fresh_nonce(&mut self) -> u32 {
        let mut nonce = self.env.crypto.nonce();
        while self.used_nonces.contains(&nonce) {
            nonce = self.env.crypto.nonce();
        }
        self.used_nonces.push(nonce);
        return nonce;
    }

    fn send_request(&mut self) -> Result<Step> {
        self.loop_count += 1;
        if self.loop_count > self.env.config.max_as_loops {
            return Err(Error::Loop(format!(
                "{} AS requests sent for {} without success",
                self.loop_count - 1,
                self.exchange.client
            )));
        }

        self.nonce = self.fresh_nonce();
        let now = self.clock.now();
        self.request_time = now;
        self.till = now + self.options.tkt_life.unwrap_or(Duration::days(1));
        self.rtime = self.options.renew_life.map(|r| now + r);

        let client = self.exchange.client.clone();
        self.exchange.request =
            KdcReqBuilder::new(client.realm.clone(), self.nonce, self.till)
                .kdc_options(self.kdc_options)
                .cname(Some(client.name.clone()))
                .server(&self.server)
                .rtime(self.rtime)
                .etypes(self.etypes.clone())
                .build();

        let mut padata = self.preauth_padata.clone();
        self.sent_optimistic = false;
        if !self.no_optimistic {
            let mut ctx = self.exchange.preauth_context(self.env, now);
            let optimistic = self.preauth.optimistic(&mut ctx)?;
            self.sent_optimistic = !optimistic.is_empty();
            padata.extend(optimistic);
        }
        padata.extend(self.options.padata.iter().cloned());

        // out of FAST the KDC returns a checksum of the request in the
        // encrypted part of the reply
        self.enc_pa_rep_sent = !self.exchange.fast.is_active();
        if self.enc_pa_rep_sent {
            padata.push(PaData::new(PA_REQ_ENC_PA_REP, Vec::new()));
        }

        let mut req = self.exchange.request.clone();
        if !padata.is_empty() {
            req.padata = Some(padata);
        }
        if self.exchange.fast.is_active() {
            req = self.exchange.fast.wrap_request(&self.env, req)?;
        }

        info!(
            "AS-REQ for {} to {} (nonce {}, etypes {:?})",
            self.server, client.realm, self.nonce, self.etypes
        );
        let as_req: AsReq = req.into();
        let request = KdcRequest {
            data: as_req.build(),
            realm: client.realm,
            tcp_only: false,
        };
        self.last_request = Some(request.clone());
        self.state = State::RequestSent;
        return Ok(Step::Request(request));
    }

    fn handle_error(&mut self, krb_error: KrbError) -> Result<Step> {
        let env = self.env;
        let (error, padata) = self.exchange.fast.unwrap_error(&env, krb_error)?;
        let code = error.error_code;
        debug!("KDC error {} for {}", code, self.exchange.client);

        match code {
            KRB_ERR_RESPONSE_TOO_BIG => {
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
            KDC_ERR_PREAUTH_REQUIRED | KDC_ERR_MORE_PREAUTH_DATA_REQUIRED => {
                if FastState::is_advertised(&padata)
                    && !self.exchange.fast.is_active()
                    && !self.fast_upgraded
                    && self.options.armor.is_some()
                    && FastState::is_available(&env)
                {
                    info!("KDC supports FAST, restarting armored");
                    self.fast_upgraded = true;
                    self.restart(true)?;
                    return self.send_request();
                }

                self.method_data = padata;
                self.update_etype_info(None);
                sort_padata(
                    &mut self.method_data,
                    &env.config.preferred_preauth_types,
                );
                return self.continue_preauth();
            }
            KDC_ERR_PREAUTH_FAILED => {
                if let Some(failed_type) = self.preauth.selected_type {
                    warn!("Preauthentication type {} failed", failed_type);
                    self.preauth.mark_failed(failed_type);
                }
                if !padata.is_empty() {
                    self.method_data = padata;
                    sort_padata(
                        &mut self.method_data,
                        &env.config.preferred_preauth_types,
                    );
                }
                if self.preauth.has_candidates(&self.method_data) {
                    return self.continue_preauth();
                }
            }
            KDC_ERR_PADATA_TYPE_NOSUPP => {
                if self.sent_optimistic && !self.no_optimistic {
                    info!("KDC rejected optimistic padata, retrying without");
                    self.no_optimistic = true;
                    return self.send_request();
                }
            }
            KDC_ERR_WRONG_REALM => {
                let client = &self.exchange.client;
                if self.options.canonicalize || client.is_enterprise() {
                    if let Some(crealm) = &error.crealm {
                        if crealm != &client.realm {
                            info!("Client referral to realm {}", crealm);
                            self.exchange.client =
                                client.with_realm(crealm);
                            self.restart(false)?;
                            return self.send_request();
                        }
                    }
                }
            }
            KDC_ERR_PREAUTH_EXPIRED => {
                info!("Preauthentication expired, restarting");
                self.restart(false)?;
                return self.send_request();
            }
            _ => {
                let now = self.clock.now();
                let mut ctx = self.exchange.preauth_context(env, now);
                if let Some(out) =
                    self.preauth.try_again(&mut ctx, &error, &padata)?
                {
                    self.preauth_padata = out;
                    return self.send_request();
                }
            }
        }

        return Err(Error::KrbError(error).for_principal(&self.exchange.client));
    }

    /// Asks the mechanisms the questions they need, returning them to the
    /// caller if some are unanswered, and builds the padata of the next
    /// request.
    fn continue_preauth(&mut self) -> Result<Step> {
        let env = self.env;
        let now = self.clock.now();
        let hints = self.method_data.clone();

        self.preauth.allowed_type = match self.pinned_type {
            Some(pinned)
                if find_padata(&hints, pinned).is_some()
                    && !self.preauth.failed().contains(&pinned) =>
            {
                Some(pinned)
            }
            _ => None,
        };

        self.exchange.questions.clear();
        {
            let mut ctx = self.exchange.preauth_context(env, now);
            self.preauth.prepare_questions(&mut ctx, &hints)?;
        }

        if !self.exchange.answers.answer_all(&self.exchange.questions) {
            debug!("Preauthentication requires answers");
            self.pending = Some(Pending::Preauth);
            return Ok(Step::Questions(self.exchange.questions.clone()));
        }

        let mut ctx = self.exchange.preauth_context(env, now);
        self.preauth_padata = self.preauth.process(&mut ctx, &hints, true)?;
        return self.send_request();
    }

    /// Updates the reply key parameters with the ETYPE-INFO2, ETYPE-INFO
    /// or PW-SALT of the method data. If `etype` is given it is the etype of
    /// the key, otherwise the first requested etype announced by the KDC.
    fn update_etype_info(&mut self, etype: Option<i32>) {
        let padata = &self.method_data;
        let entries = if let Some(pa) = find_padata(padata, PA_ETYPE_INFO2) {
            decode_etype_info2(&pa.padata_value).unwrap_or_default()
        } else if let Some(pa) = find_padata(padata, PA_ETYPE_INFO) {
            decode_etype_info(&pa.padata_value).unwrap_or_default()
        } else {
            Vec::new()
        };

        let entry = match etype {
            Some(etype) => entries.into_iter().find(|e| e.etype == etype),
            None => self.etypes.iter().find_map(|etype| {
                entries.iter().find(|e| e.etype == *etype).cloned()
            }),
        };

        let pw_salt =
            find_padata(padata, PA_PW_SALT).map(|pa| pa.padata_value.clone());

        let as_key = &mut self.exchange.as_key;
        let (new_etype, salt, s2kparams) = match entry {
            Some(entry) => (entry.etype, entry.salt.or(pw_salt), entry.s2kparams),
            None => (etype.unwrap_or(as_key.etype), pw_salt, None),
        };

        // a salt given by the caller always wins
        let salt = self.options.salt.clone().or(salt);
        as_key.set_etype_info(new_etype, salt, s2kparams);
    }

    fn ask_password(&mut self, as_rep: AsRep) -> Result<Step> {
        self.exchange.questions.clear();
        self.exchange.questions.ask(QUESTION_PASSWORD, None);
        self.pending = Some(Pending::Reply(as_rep));
        return Ok(Step::Questions(self.exchange.questions.clone()));
    }

    fn handle_as_rep(&mut self, as_rep: AsRep) -> Result<Step> {
        let env = self.env;
        let crypto = env.crypto;
        let original = as_rep.clone();
        let mut as_rep = as_rep;

        let etype = as_rep.enc_part.etype;
        if !self.etypes.contains(&etype) {
            return Err(Error::Modified(format!(
                "Reply encrypted with etype {} which was not requested",
                etype
            )));
        }

        let mut reply_padata = as_rep.padata.clone().unwrap_or_default();
        let mut strengthen_key = None;
        if let Some(response) = self.exchange.fast.unwrap_reply(
            &env,
            as_rep.padata.as_ref(),
            &as_rep.ticket,
        )? {
            reply_padata = response.padata;
            strengthen_key = response.strengthen_key;
            if let Some(finished) = response.finished {
                as_rep.cname = finished.cname;
                as_rep.crealm = finished.crealm;
            }
        }

        self.method_data = reply_padata.clone();
        self.update_etype_info(Some(etype));

        let now = self.clock.now();
        {
            let mut ctx = self.exchange.preauth_context(env, now);
            self.preauth.process_reply(&mut ctx, &reply_padata)?;
        }

        if !self.exchange.as_key.can_derive(&self.exchange.answers) {
            return self.ask_password(original);
        }
        let key = self
            .exchange
            .as_key
            .derive(crypto, &self.exchange.answers)?;
        let reply_key = self.exchange.fast.strengthen_key(
            &env,
            &key,
            strengthen_key.as_ref(),
        )?;

        let enc_part = match decrypt_as_rep_enc_part(
            crypto,
            &reply_key,
            &as_rep.enc_part,
        ) {
            Ok(enc_part) => enc_part,
            Err(error) => {
                if self.exchange.as_key.source() == Some(KeySource::Answer) {
                    warn!("Unable to decrypt the reply, asking the password again");
                    self.exchange.as_key.clear();
                    self.exchange.answers.remove(QUESTION_PASSWORD);
                    return self.ask_password(original);
                }
                return Err(error.for_principal(&self.exchange.client));
            }
        };

        let reply_client =
            Principal::new(as_rep.cname.clone(), as_rep.crealm.clone());
        let expected = ExpectedReply {
            nonce: self.nonce,
            client: &self.exchange.client,
            server: &self.server,
            kdc_options: self.kdc_options,
            till: self.till,
            rtime: self.rtime,
            request_time: self.request_time,
        };
        verify_reply(
            env.config,
            &mut self.clock,
            ReplyKind::Initial,
            &expected,
            &reply_client,
            &as_rep.ticket,
            &enc_part,
        )?;
        self.verify_enc_pa_rep(&reply_key, &enc_part)?;

        if self.options.anonymous {
            verify_anonymous(&env, &reply_padata, &reply_key, &enc_part.key)?;
        }

        let cred = Credential::from_kdc_rep(reply_client, as_rep.ticket, &enc_part);
        info!("Received {} for {}", cred.server, cred.client);
        self.store_result(&cred)?;
        self.cred = Some(cred);
        self.state = State::Complete;
        return Ok(Step::Done);
    }

    /// Verifies the checksum of the request returned by the KDC in the
    /// encrypted padata. A PA-FX-FAST next to it means that the KDC
    /// supports FAST.
    fn verify_enc_pa_rep(
        &mut self,
        reply_key: &EncryptionKey,
        enc_part: &EncKdcRepPart,
    ) -> Result<()> {
        if !self.enc_pa_rep_sent {
            return Ok(());
        }

        let enc_padata = enc_part.encrypted_pa_data.clone().unwrap_or_default();
        let pa_rep = match find_padata(&enc_padata, PA_REQ_ENC_PA_REP) {
            Some(pa_rep) => pa_rep,
            None => {
                if enc_part.flags.flags & ext_ticket_flags::ENC_PA_REP != 0 {
                    return Err(Error::Modified(
                        "Reply without the checksum of the request".into(),
                    ));
                }
                debug!("KDC did not return the checksum of the request");
                return Ok(());
            }
        };

        let request = self
            .last_request
            .as_ref()
            .ok_or_else(|| Error::String("No request in progress".into()))?;
        let (_, checksum) = Checksum::parse(&pa_rep.padata_value).map_err(|_| {
            Error::DataError("Error parsing the checksum of the request".into())
        })?;
        if !self.env.crypto.verify_checksum(
            reply_key,
            KEY_USAGE_AS_REQ,
            &request.data,
            &checksum,
        )? {
            return Err(Error::Modified(
                "Checksum of the request does not match".into(),
            ));
        }

        if FastState::is_advertised(&enc_padata) {
            info!("KDC of {} supports FAST", self.exchange.client.realm);
            self.fast_avail = true;
        }
        return Ok(());
    }

    /// Records in the vault the preauthentication used, whether FAST is
    /// available and the credential.
    fn store_result(&self, cred: &Credential) -> Result<()> {
        let vault = match self.env.vault {
            Some(vault) => vault,
            None => return Ok(()),
        };

        let realm = &cred.client.realm;
        let tgs = Principal::tgs(realm, realm);
        if let Some(pa_type) = self.preauth.selected_type {
            vault.set_config(Some(&tgs), CONF_PA_TYPE, &pa_type.to_string())?;
        }
        if self.exchange.fast.is_active() || self.fast_avail {
            vault.set_config(Some(&tgs), CONF_FAST_AVAIL, "yes")?;
        }
        if !self.exchange.config_out.is_empty() {
            vault.set_config(
                Some(&tgs),
                CONF_PA_CONFIG_DATA,
                &self.exchange.config_out.to_raw(),
            )?;
        }

        debug!("Storing {} in {} vault", cred.server, vault.id());
        return vault.store(cred.clone());
    }
}

/// Etypes of the request: the ones of the options or the configuration,
/// restricted to the supported by the crypto, plus the ones the
/// mechanisms can use.
fn request_etypes(env: &Env, options: &InitCredsOptions) -> Result<Vec<i32>> {
    let crypto = env.crypto;
    let mut etypes: Vec<i32> = options
        .etypes
        .clone()
        .or_else(|| env.config.default_etypes.clone())
        .unwrap_or_else(|| crypto.supported_etypes())
        .into_iter()
        .filter(|e| crypto.is_supported(*e))
        .collect();

    for etype in env.registry.enctypes() {
        if crypto.is_supported(etype) && !etypes.contains(&etype) {
            etypes.push(etype);
        }
    }

    if etypes.is_empty() {
        return Err(Error::Config("No usable etypes for the request".into()));
    }
    return Ok(etypes);
}

fn request_kdc_options(options: &InitCredsOptions) -> u32 {
    let mut flags = 0;
    if options.forwardable {
        flags |= kdc_options::FORWARDABLE;
    }
    if options.proxiable {
        flags |= kdc_options::PROXIABLE;
    }
    if options.renew_life.is_some() {
        flags |= kdc_options::RENEWABLE;
    }
    if options.canonicalize {
        flags |= kdc_options::CANONICALIZE;
    }
    if options.anonymous {
        flags |= ext_kdc_options::REQUEST_ANONYMOUS;
    }
    return flags;
}

/// In anonymous exchanges the reply key does not authenticate the KDC, so
/// the session key must be the combination of the reply key and the key
/// of the PA-PKINIT-KX.
fn verify_anonymous(
    env: &Env,
    padata: &[PaData],
    reply_key: &EncryptionKey,
    session_key: &EncryptionKey,
) -> Result<()> {
    let pkinit_kx = find_padata(padata, PA_PKINIT_KX).ok_or_else(|| {
        Error::Modified("Anonymous reply without PA-PKINIT-KX".into())
    })?;

    let (_, enc_data) = EncryptedData::parse(&pkinit_kx.padata_value)
        .map_err(|_| Error::DataError("Error parsing PA-PKINIT-KX".into()))?;
    let raw = env
        .crypto
        .decrypt_data(reply_key, KEY_USAGE_PA_PKINIT_KX, &enc_data)?;
    let (_, kdc_key) = EncryptionKey::parse(&raw)
        .map_err(|_| Error::DataError("Error parsing PA-PKINIT-KX key".into()))?;

    let expected =
        env.crypto
            .cf2(&kdc_key, "PKINIT", reply_key, "KEYEXCHANGE")?;
    if &expected != session_key {
        return Err(Error::Modified(
            "Session key does not match the PKINIT key exchange".into(),
        ));
    }
    return Ok(());
}
