use crate::core::constants::key_usages::KEY_USAGE_TGS_REQ_AUTHEN_CKSUM;
use crate::core::crypto::Crypto;
use crate::core::Credential;
use crate::error::Result;
use chrono::{DateTime, Utc};
use kerberos_asn1::{
    ApReq, Asn1Object, Authenticator, Checksum, EncryptedData, EncryptionKey,
    KerbPaPacRequest, PaData, PaEncTsEnc, Ticket,
};
use kerberos_constants::pa_data_types;
use log::debug;

/// Helper to create a PA-DATA that contains an encrypted PA-ENC-TS-ENC
/// struct, used by encrypted timestamp and encrypted challenge.
pub fn new_pa_data_encrypted_timestamp(
    crypto: &dyn Crypto,
    key: &EncryptionKey,
    key_usage: i32,
    padata_type: i32,
    now: DateTime<Utc>,
) -> Result<PaData> {
    let timestamp = PaEncTsEnc::from(now);
    let encrypted_timestamp =
        crypto.encrypt_data(key, key_usage, &timestamp.build())?;
    return Ok(PaData::new(padata_type, encrypted_timestamp.build()));
}

/// Helper to create a PA-DATA that contains a PA-PAC-REQUEST struct
pub fn new_pa_data_pac_request(include_pac: bool) -> PaData {
    return PaData::new(
        pa_data_types::PA_PAC_REQUEST,
        KerbPaPacRequest::new(include_pac).build(),
    );
}

/// Keyed checksum of the request body for the authenticator of a TGS-REQ.
/// Not every crypto collaborator implements keyed checksums for every
/// etype, in that case the authenticator goes without it.
pub fn new_req_body_checksum(
    crypto: &dyn Crypto,
    session_key: &EncryptionKey,
    body: &[u8],
) -> Option<Checksum> {
    match crypto.checksum(session_key, KEY_USAGE_TGS_REQ_AUTHEN_CKSUM, body) {
        Ok(cksum) => return Some(cksum),
        Err(err) => {
            debug!("Authenticator without request checksum: {}", err);
            return None;
        }
    }
}

/// Helper to create an AP-REQ with the ticket of the credential and an
/// authenticator encrypted with its session key.
pub fn new_ap_req(
    crypto: &dyn Crypto,
    cred: &Credential,
    key_usage: i32,
    cksum: Option<Checksum>,
    subkey: Option<EncryptionKey>,
    now: DateTime<Utc>,
) -> Result<ApReq> {
    let authenticator = new_authenticator(cred, cksum, subkey, now);
    let encrypted_authenticator =
        crypto.encrypt_data(&cred.key, key_usage, &authenticator.build())?;

    return Ok(new_ap_req_from_parts(
        cred.ticket.clone(),
        encrypted_authenticator,
    ));
}

/// Helper to create a PA-DATA that contains an AP-REQ struct
pub fn new_pa_data_ap_req(ap_req: &ApReq) -> PaData {
    return PaData::new(pa_data_types::PA_TGS_REQ, ap_req.build());
}

/// Helper to create an Authenticator struct
fn new_authenticator(
    cred: &Credential,
    cksum: Option<Checksum>,
    subkey: Option<EncryptionKey>,
    now: DateTime<Utc>,
) -> Authenticator {
    let mut authenticator = Authenticator::default();
    authenticator.crealm = cred.client.realm.clone();
    authenticator.cname = cred.client.name.clone();
    authenticator.cksum = cksum;
    authenticator.ctime = now.into();
    authenticator.subkey = subkey;
    return authenticator;
}

/// Helper to create an AP-REQ struct
fn new_ap_req_from_parts(ticket: Ticket, authenticator: EncryptedData) -> ApReq {
    let mut ap_req = ApReq::default();
    ap_req.ticket = ticket;
    ap_req.authenticator = authenticator;
    return ap_req;
}
