//! Deterministic collaborators for the tests: a fake crypto which detects
//! wrong keys and usages, an in-memory extension codec and a fake KDC that
//! answers the requests with real kerberos_asn1 messages.

use super::codec::{encode_method_data, find_padata, ExtensionCodec};
use super::config::Config;
use super::constants::key_usages::{
    KEY_USAGE_AP_REQ_AUTHEN, KEY_USAGE_AS_REQ, KEY_USAGE_FAST_FINISHED,
    KEY_USAGE_FAST_REP, KEY_USAGE_TGS_REP_ENC_PART_SUB_KEY,
};
use super::constants::pa_data_types::PA_REQ_ENC_PA_REP;
use super::crypto::{default_salt, Crypto, Secret};
use super::env::Env;
use super::fast::{
    FastState, KrbFastArmoredRep, KrbFastArmoredReq, KrbFastFinished,
    KrbFastReq, KrbFastResponse,
};
use super::init_creds::AsKey;
use super::preauth::sam2::{
    PaEncSamResponseEnc, PaSamChallenge2, PaSamResponse2,
};
use super::preauth::{Answers, PaConfig, PreauthContext, Questions};
use super::{Credential, Principal};
use crate::error::{Error, Result};
use chrono::{Duration, Utc};
use kerberos_asn1::{
    ApReq, AsRep, AsReq, Asn1Object, Authenticator, Checksum,
    EncAsRepPart, EncKdcRepPart, EncTgsRepPart, EncryptedData,
    EncryptionKey, KdcReq, KdcReqBody, KrbError, PaData, TgsRep, TgsReq,
    Ticket,
};
use kerberos_constants::key_usages::{
    KEY_USAGE_AS_REP_ENC_PART, KEY_USAGE_TGS_REP_ENC_PART_SESSION_KEY,
    KEY_USAGE_TGS_REQ_AUTHEN,
};
use kerberos_constants::{etypes, pa_data_types};
use std::cell::{Cell, RefCell};

const FAKE_CHECKSUM_TYPE: i32 = -1;

/// FNV-1a based digest, stretched to `len` bytes.
fn digest(parts: &[&[u8]], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + 8);
    let mut counter: u64 = 0;
    while out.len() < len {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ counter;
        for part in parts {
            for b in part.iter() {
                hash ^= *b as u64;
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            hash ^= 0xff;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        out.extend_from_slice(&hash.to_be_bytes());
        counter += 1;
    }
    out.truncate(len);
    return out;
}

fn key_len(etype: i32) -> usize {
    if etype == etypes::AES256_CTS_HMAC_SHA1_96 {
        return 32;
    }
    return 16;
}

/// Crypto without real algorithms. Ciphertexts carry a tag of the key and
/// usage, so decrypting with other key or usage fails like it would do
/// with real crypto.
#[derive(Debug, Default)]
pub struct FakeCrypto {
    counter: Cell<u64>,
}

impl FakeCrypto {
    pub fn new() -> Self {
        return Self::default();
    }

    fn next(&self) -> [u8; 8] {
        let value = self.counter.get() + 1;
        self.counter.set(value);
        return value.to_be_bytes();
    }

    fn tag(key: &EncryptionKey, key_usage: i32) -> Vec<u8> {
        return digest(
            &[
                &key.keytype.to_be_bytes(),
                &key.keyvalue,
                &key_usage.to_be_bytes(),
            ],
            8,
        );
    }
}

impl Crypto for FakeCrypto {
    fn supported_etypes(&self) -> Vec<i32> {
        return vec![
            etypes::AES256_CTS_HMAC_SHA1_96,
            etypes::AES128_CTS_HMAC_SHA1_96,
            etypes::RC4_HMAC,
        ];
    }

    fn encrypt(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let stream = digest(&[&key.keyvalue, b"stream"], plaintext.len());
        let mut cipher = Self::tag(key, key_usage);
        cipher.extend(plaintext.iter().zip(stream.iter()).map(|(p, s)| p ^ s));
        return Ok(cipher);
    }

    fn decrypt(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        if ciphertext.len() < 8 || ciphertext[..8] != Self::tag(key, key_usage)[..]
        {
            return Err(Error::CryptoError("Decryption integrity failed".into()));
        }
        let body = &ciphertext[8..];
        let stream = digest(&[&key.keyvalue, b"stream"], body.len());
        return Ok(body.iter().zip(stream.iter()).map(|(c, s)| c ^ s).collect());
    }

    fn checksum(
        &self,
        key: &EncryptionKey,
        key_usage: i32,
        data: &[u8],
    ) -> Result<Checksum> {
        return Ok(Checksum {
            cksumtype: FAKE_CHECKSUM_TYPE,
            checksum: digest(
                &[&key.keyvalue, &key_usage.to_be_bytes(), data],
                12,
            ),
        });
    }

    fn string_to_key(
        &self,
        etype: i32,
        password: &str,
        salt: &[u8],
        s2kparams: Option<&[u8]>,
    ) -> Result<EncryptionKey> {
        return Ok(EncryptionKey {
            keytype: etype,
            keyvalue: digest(
                &[password.as_bytes(), salt, s2kparams.unwrap_or(&[])],
                key_len(etype),
            ),
        });
    }

    fn random_key(&self, etype: i32) -> Result<EncryptionKey> {
        return Ok(EncryptionKey {
            keytype: etype,
            keyvalue: digest(&[b"key", &self.next()], key_len(etype)),
        });
    }

    fn random_bytes(&self, len: usize) -> Vec<u8> {
        return digest(&[b"bytes", &self.next()], len);
    }

    fn cf2(
        &self,
        key1: &EncryptionKey,
        pepper1: &str,
        key2: &EncryptionKey,
        pepper2: &str,
    ) -> Result<EncryptionKey> {
        return Ok(EncryptionKey {
            keytype: key1.keytype,
            keyvalue: digest(
                &[
                    &key1.keyvalue,
                    pepper1.as_bytes(),
                    &key2.keyvalue,
                    pepper2.as_bytes(),
                ],
                key_len(key1.keytype),
            ),
        });
    }
}

#[derive(Debug, Clone)]
enum Stored {
    ArmoredReq(KrbFastArmoredReq),
    FastReq(KrbFastReq),
    ArmoredRep(KrbFastArmoredRep),
    FastResponse(KrbFastResponse),
    SamChallenge(PaSamChallenge2),
    SamResponse(PaSamResponse2),
    EncSamResponse(PaEncSamResponseEnc),
}

/// Codec that keeps the values in memory and encodes a handle to them.
#[derive(Debug, Default)]
pub struct FakeCodec {
    store: RefCell<Vec<Stored>>,
}

impl FakeCodec {
    pub fn new() -> Self {
        return Self::default();
    }

    fn put(&self, value: Stored) -> Vec<u8> {
        let mut store = self.store.borrow_mut();
        store.push(value);
        let mut handle = b"FAKE".to_vec();
        handle.extend_from_slice(&((store.len() - 1) as u32).to_be_bytes());
        return handle;
    }

    fn get(&self, raw: &[u8]) -> Result<Stored> {
        if raw.len() != 8 || &raw[..4] != b"FAKE" {
            return Err(Error::DataError("Unknown fake handle".into()));
        }
        let mut index = [0; 4];
        index.copy_from_slice(&raw[4..]);
        return self
            .store
            .borrow()
            .get(u32::from_be_bytes(index) as usize)
            .cloned()
            .ok_or_else(|| Error::DataError("Unknown fake handle".into()));
    }

    pub fn encode_sam_challenge2(&self, challenge: &PaSamChallenge2) -> Vec<u8> {
        return self.put(Stored::SamChallenge(challenge.clone()));
    }

    pub fn decode_sam_response2(&self, raw: &[u8]) -> Result<PaSamResponse2> {
        match self.get(raw)? {
            Stored::SamResponse(v) => return Ok(v),
            _ => return Err(Error::DataError("Not a SAM response".into())),
        }
    }

    pub fn decode_enc_sam_response_enc(
        &self,
        raw: &[u8],
    ) -> Result<PaEncSamResponseEnc> {
        match self.get(raw)? {
            Stored::EncSamResponse(v) => return Ok(v),
            _ => {
                return Err(Error::DataError("Not an encrypted SAM response".into()))
            }
        }
    }
}

impl ExtensionCodec for FakeCodec {
    fn encode_fast_armored_req(
        &self,
        req: &KrbFastArmoredReq,
    ) -> Result<Vec<u8>> {
        return Ok(self.put(Stored::ArmoredReq(req.clone())));
    }

    fn decode_fast_armored_req(
        &self,
        raw: &[u8],
    ) -> Result<KrbFastArmoredReq> {
        match self.get(raw)? {
            Stored::ArmoredReq(v) => return Ok(v),
            _ => return Err(Error::DataError("Not an armored request".into())),
        }
    }

    fn encode_fast_req(&self, req: &KrbFastReq) -> Result<Vec<u8>> {
        return Ok(self.put(Stored::FastReq(req.clone())));
    }

    fn decode_fast_req(&self, raw: &[u8]) -> Result<KrbFastReq> {
        match self.get(raw)? {
            Stored::FastReq(v) => return Ok(v),
            _ => return Err(Error::DataError("Not a FAST request".into())),
        }
    }

    fn decode_fast_armored_rep(
        &self,
        raw: &[u8],
    ) -> Result<KrbFastArmoredRep> {
        match self.get(raw)? {
            Stored::ArmoredRep(v) => return Ok(v),
            _ => return Err(Error::DataError("Not an armored reply".into())),
        }
    }

    fn encode_fast_armored_rep(
        &self,
        rep: &KrbFastArmoredRep,
    ) -> Result<Vec<u8>> {
        return Ok(self.put(Stored::ArmoredRep(rep.clone())));
    }

    fn decode_fast_response(&self, raw: &[u8]) -> Result<KrbFastResponse> {
        match self.get(raw)? {
            Stored::FastResponse(v) => return Ok(v),
            _ => return Err(Error::DataError("Not a FAST response".into())),
        }
    }

    fn encode_fast_response(&self, rep: &KrbFastResponse) -> Result<Vec<u8>> {
        return Ok(self.put(Stored::FastResponse(rep.clone())));
    }

    fn decode_sam_challenge2(&self, raw: &[u8]) -> Result<PaSamChallenge2> {
        match self.get(raw)? {
            Stored::SamChallenge(v) => return Ok(v),
            _ => return Err(Error::DataError("Not a SAM challenge".into())),
        }
    }

    fn encode_sam_response2(&self, rep: &PaSamResponse2) -> Result<Vec<u8>> {
        return Ok(self.put(Stored::SamResponse(rep.clone())));
    }

    fn encode_enc_sam_response_enc(
        &self,
        enc: &PaEncSamResponseEnc,
    ) -> Result<Vec<u8>> {
        return Ok(self.put(Stored::EncSamResponse(enc.clone())));
    }
}

/// Fake tickets carry the session key in clear, so the fake KDC can read
/// it back from the AP-REQ of a TGS request.
pub fn new_ticket(server: &Principal, session_key: &EncryptionKey) -> Ticket {
    let mut ticket = Ticket::default();
    ticket.tkt_vno = 5;
    ticket.realm = server.realm.clone();
    ticket.sname = server.name.clone();
    ticket.enc_part = EncryptedData::new(
        session_key.keytype,
        None,
        session_key.keyvalue.clone(),
    );
    return ticket;
}

pub fn ticket_session_key(ticket: &Ticket) -> EncryptionKey {
    return EncryptionKey {
        keytype: ticket.enc_part.etype,
        keyvalue: ticket.enc_part.cipher.clone(),
    };
}

/// Credential valid from one hour ago for the next ten hours.
pub fn new_credential(client: Principal, server: Principal) -> Credential {
    let key = EncryptionKey {
        keytype: etypes::AES256_CTS_HMAC_SHA1_96,
        keyvalue: digest(&[server.to_string().as_bytes()], 32),
    };
    let now = Utc::now();
    return Credential {
        ticket: new_ticket(&server, &key),
        client,
        server,
        key,
        flags: 0,
        authtime: now - Duration::hours(1),
        starttime: None,
        endtime: now + Duration::hours(10),
        renew_till: None,
        second_ticket: None,
        authorization_data: None,
        is_skey: false,
    };
}

pub fn parse_as_req(raw: &[u8]) -> AsReq {
    let (_, as_req) = AsReq::parse(raw).unwrap();
    return as_req;
}

pub fn parse_tgs_req(raw: &[u8]) -> TgsReq {
    let (_, tgs_req) = TgsReq::parse(raw).unwrap();
    return tgs_req;
}

pub fn krb_error(code: i32, realm: &str, padata: Option<Vec<PaData>>) -> Vec<u8> {
    let mut krb_error = KrbError::default();
    krb_error.error_code = code;
    krb_error.realm = realm.to_string();
    krb_error.stime = Utc::now().into();
    krb_error.e_data = padata.map(|p| encode_method_data(&p));
    return krb_error.build();
}

/// Decrypted part of a reply to the request, valid from now until the
/// requested till.
pub fn enc_part_for(
    req_body: &KdcReqBody,
    server: &Principal,
    session_key: &EncryptionKey,
) -> EncKdcRepPart {
    let mut enc_part = EncKdcRepPart::default();
    enc_part.key = session_key.clone();
    enc_part.nonce = req_body.nonce;
    enc_part.authtime = Utc::now().into();
    enc_part.endtime = req_body.till.clone();
    enc_part.srealm = server.realm.clone();
    enc_part.sname = server.name.clone();
    return enc_part;
}

fn to_enc_as_rep_part(enc_part: &EncKdcRepPart) -> EncAsRepPart {
    let mut part = EncAsRepPart::default();
    part.key = enc_part.key.clone();
    part.last_req = enc_part.last_req.clone();
    part.nonce = enc_part.nonce;
    part.key_expiration = enc_part.key_expiration.clone();
    part.flags = enc_part.flags.clone();
    part.authtime = enc_part.authtime.clone();
    part.starttime = enc_part.starttime.clone();
    part.endtime = enc_part.endtime.clone();
    part.renew_till = enc_part.renew_till.clone();
    part.srealm = enc_part.srealm.clone();
    part.sname = enc_part.sname.clone();
    part.caddr = enc_part.caddr.clone();
    part.encrypted_pa_data = enc_part.encrypted_pa_data.clone();
    return part;
}

fn to_enc_tgs_rep_part(enc_part: &EncKdcRepPart) -> EncTgsRepPart {
    let mut part = EncTgsRepPart::default();
    part.key = enc_part.key.clone();
    part.last_req = enc_part.last_req.clone();
    part.nonce = enc_part.nonce;
    part.key_expiration = enc_part.key_expiration.clone();
    part.flags = enc_part.flags.clone();
    part.authtime = enc_part.authtime.clone();
    part.starttime = enc_part.starttime.clone();
    part.endtime = enc_part.endtime.clone();
    part.renew_till = enc_part.renew_till.clone();
    part.srealm = enc_part.srealm.clone();
    part.sname = enc_part.sname.clone();
    part.caddr = enc_part.caddr.clone();
    part.encrypted_pa_data = enc_part.encrypted_pa_data.clone();
    return part;
}

pub fn build_as_rep(
    crypto: &FakeCrypto,
    client: &Principal,
    enc_part: &EncKdcRepPart,
    reply_key: &EncryptionKey,
    padata: Option<Vec<PaData>>,
) -> Vec<u8> {
    let server = Principal::new(enc_part.sname.clone(), enc_part.srealm.clone());
    let mut as_rep = AsRep::default();
    as_rep.padata = padata;
    as_rep.crealm = client.realm.clone();
    as_rep.cname = client.name.clone();
    as_rep.ticket = new_ticket(&server, &enc_part.key);
    as_rep.enc_part = crypto
        .encrypt_data(
            reply_key,
            KEY_USAGE_AS_REP_ENC_PART,
            &to_enc_as_rep_part(enc_part).build(),
        )
        .unwrap();
    return as_rep.build();
}

/// Answers an AS-REQ with a ticket for the requested server.
pub fn answer_as_req(
    crypto: &FakeCrypto,
    raw_req: &[u8],
    reply_key: &EncryptionKey,
) -> Vec<u8> {
    let as_req = parse_as_req(raw_req);
    let body = &as_req.req_body;
    let client = Principal::new(body.cname.clone().unwrap(), body.realm.clone());
    let server = Principal::new(body.sname.clone().unwrap(), body.realm.clone());
    let session_key = crypto.random_key(body.etypes[0]).unwrap();
    let enc_part = enc_part_for(body, &server, &session_key);
    return build_as_rep(crypto, &client, &enc_part, reply_key, None);
}

/// Client, authenticator subkey and TGT session key of a TGS-REQ.
pub fn tgs_req_keys(
    crypto: &FakeCrypto,
    tgs_req: &TgsReq,
) -> (Principal, Option<EncryptionKey>, EncryptionKey) {
    let padata = tgs_req.padata.as_ref().unwrap();
    let pa_tgs_req = padata
        .iter()
        .find(|p| p.padata_type == pa_data_types::PA_TGS_REQ)
        .unwrap();
    let (_, ap_req) = ApReq::parse(&pa_tgs_req.padata_value).unwrap();
    let session_key = ticket_session_key(&ap_req.ticket);
    let raw = crypto
        .decrypt_data(&session_key, KEY_USAGE_TGS_REQ_AUTHEN, &ap_req.authenticator)
        .unwrap();
    let (_, authenticator) = Authenticator::parse(&raw).unwrap();
    let client = Principal::new(authenticator.cname, authenticator.crealm);
    return (client, authenticator.subkey, session_key);
}

pub fn build_tgs_rep(
    crypto: &FakeCrypto,
    client: &Principal,
    enc_part: &EncKdcRepPart,
    subkey: Option<&EncryptionKey>,
    session_key: &EncryptionKey,
) -> Vec<u8> {
    let server = Principal::new(enc_part.sname.clone(), enc_part.srealm.clone());
    let raw_part = to_enc_tgs_rep_part(enc_part).build();
    let mut tgs_rep = TgsRep::default();
    tgs_rep.crealm = client.realm.clone();
    tgs_rep.cname = client.name.clone();
    tgs_rep.ticket = new_ticket(&server, &enc_part.key);
    tgs_rep.enc_part = match subkey {
        Some(subkey) => crypto
            .encrypt_data(subkey, KEY_USAGE_TGS_REP_ENC_PART_SUB_KEY, &raw_part).unwrap(),
        None => crypto
            .encrypt_data(
                session_key,
                KEY_USAGE_TGS_REP_ENC_PART_SESSION_KEY,
                &raw_part,
            )
            .unwrap(),
    };
    return tgs_rep.build();
}

/// Answers a TGS-REQ with a ticket for `server`, which may differ from
/// the requested one, like in referrals.
pub fn answer_tgs_req(
    crypto: &FakeCrypto,
    raw_req: &[u8],
    server: &Principal,
    flags: u32,
) -> Vec<u8> {
    let tgs_req = parse_tgs_req(raw_req);
    let (client, subkey, session_key) = tgs_req_keys(crypto, &tgs_req);
    let new_key = crypto.random_key(etypes::AES256_CTS_HMAC_SHA1_96).unwrap();
    let mut enc_part = enc_part_for(&tgs_req.req_body, server, &new_key);
    enc_part.flags = flags.into();
    return build_tgs_rep(
        crypto,
        &client,
        &enc_part,
        subkey.as_ref(),
        &session_key,
    );
}

/// PA-REQ-ENC-PA-REP that a KDC puts in the encrypted part of the reply,
/// the checksum of the raw request with the reply key.
pub fn enc_pa_rep(
    crypto: &FakeCrypto,
    reply_key: &EncryptionKey,
    raw_req: &[u8],
) -> PaData {
    let checksum = crypto.checksum(reply_key, KEY_USAGE_AS_REQ, raw_req).unwrap();
    return PaData::new(PA_REQ_ENC_PA_REP, checksum.build());
}

/// Armor key of an AS-REQ armored with the AP-REQ of a fake ticket.
pub fn as_req_armor_key(
    crypto: &FakeCrypto,
    codec: &FakeCodec,
    as_req: &AsReq,
) -> EncryptionKey {
    let padata = as_req.padata.as_ref().unwrap();
    let fx_fast = find_padata(padata, pa_data_types::PA_FX_FAST).unwrap();
    let armored = codec.decode_fast_armored_req(&fx_fast.padata_value).unwrap();
    let (_, ap_req) = ApReq::parse(&armored.armor.unwrap().armor_value).unwrap();
    let session_key = ticket_session_key(&ap_req.ticket);
    let raw = crypto
        .decrypt_data(&session_key, KEY_USAGE_AP_REQ_AUTHEN, &ap_req.authenticator)
        .unwrap();
    let (_, authenticator) = Authenticator::parse(&raw).unwrap();
    return crypto
        .cf2(
            &authenticator.subkey.unwrap(),
            "subkeyarmor",
            &session_key,
            "ticketarmor",
        )
        .unwrap();
}

/// Implicit armor key of a TGS-REQ.
pub fn tgs_req_armor_key(crypto: &FakeCrypto, tgs_req: &TgsReq) -> EncryptionKey {
    let (_, subkey, session_key) = tgs_req_keys(crypto, tgs_req);
    return crypto
        .cf2(&subkey.unwrap(), "subkeyarmor", &session_key, "ticketarmor")
        .unwrap();
}

/// Finished of a FAST response, binding the ticket of the reply.
pub fn fast_finished(
    crypto: &FakeCrypto,
    armor_key: &EncryptionKey,
    client: &Principal,
    ticket: &Ticket,
) -> KrbFastFinished {
    return KrbFastFinished {
        timestamp: Utc::now().into(),
        usec: 0,
        crealm: client.realm.clone(),
        cname: client.name.clone(),
        ticket_checksum: crypto
            .checksum(armor_key, KEY_USAGE_FAST_FINISHED, &ticket.build())
            .unwrap(),
    };
}

/// PA-FX-FAST of an armored reply or error.
pub fn armored_padata(
    crypto: &FakeCrypto,
    codec: &FakeCodec,
    armor_key: &EncryptionKey,
    response: &KrbFastResponse,
) -> PaData {
    let enc_fast_rep = crypto
        .encrypt_data(
            armor_key,
            KEY_USAGE_FAST_REP,
            &codec.encode_fast_response(response).unwrap(),
        )
        .unwrap();
    let armored_rep = KrbFastArmoredRep { enc_fast_rep };
    return PaData::new(
        pa_data_types::PA_FX_FAST,
        codec.encode_fast_armored_rep(&armored_rep).unwrap(),
    );
}

/// Owner of everything that a [PreauthContext] borrows, for the tests of
/// the mechanisms. The client is alice@A.COM with AES256 keys.
pub struct PreauthFixture {
    pub crypto: FakeCrypto,
    pub codec: FakeCodec,
    pub config: Config,
    pub client: Principal,
    pub request: KdcReq,
    pub as_key: AsKey,
    pub fast: FastState,
    pub questions: Questions,
    pub answers: Answers,
    pub config_in: PaConfig,
    pub config_out: PaConfig,
}

impl PreauthFixture {
    pub fn new(secret: Option<Secret>) -> Self {
        let client = Principal::user("alice", "A.COM");
        let salt = default_salt(&client.realm, client.components());
        return Self {
            crypto: FakeCrypto::new(),
            codec: FakeCodec::new(),
            config: Config::default(),
            client,
            request: KdcReq::default(),
            as_key: AsKey::new(etypes::AES256_CTS_HMAC_SHA1_96, salt, secret),
            fast: FastState::new(),
            questions: Questions::new(),
            answers: Answers::new(),
            config_in: PaConfig::new(),
            config_out: PaConfig::new(),
        };
    }

    /// Armors the exchange with the ticket of an anonymous TGT.
    pub fn armored(mut self) -> Self {
        let armor_tgt = new_credential(
            Principal::anonymous(),
            Principal::tgs("A.COM", "A.COM"),
        );
        let env = Env::new(&self.crypto, &self.config).codec(&self.codec);
        self.fast.armor_as(&env, &armor_tgt, Utc::now()).unwrap();
        return self;
    }

    /// Key of the client derived from `password` with the default salt.
    pub fn long_term_key(&self, password: &str) -> EncryptionKey {
        return self
            .crypto
            .string_to_key(self.as_key.etype, password, self.as_key.salt(), None)
            .unwrap();
    }

    pub fn ctx(&mut self) -> PreauthContext<'_> {
        return PreauthContext {
            env: Env::new(&self.crypto, &self.config).codec(&self.codec),
            client: &self.client,
            request: &self.request,
            as_key: &mut self.as_key,
            fast: &self.fast,
            questions: &mut self.questions,
            answers: &self.answers,
            config_in: &self.config_in,
            config_out: &mut self.config_out,
            request_pac: None,
            now: Utc::now(),
        };
    }
}
