use super::kdc_req::KdcReqBuilder;
use super::pa_data::{new_ap_req, new_pa_data_ap_req, new_req_body_checksum};
use crate::core::env::Env;
use crate::core::fast::FastState;
use crate::core::{Credential, Principal};
use crate::error::Result;
use chrono::{DateTime, Utc};
use kerberos_asn1::{Asn1Object, EncryptionKey, PaData, TgsReq, Ticket};
use kerberos_constants::key_usages::KEY_USAGE_TGS_REQ_AUTHEN;
use log::trace;

/// TGS-REQ ready to be sent, together with the values required to
/// process its reply.
#[derive(Debug, Clone)]
pub struct TgsRequest {
    pub data: Vec<u8>,
    pub nonce: u32,
    pub timestamp: DateTime<Utc>,
    pub subkey: EncryptionKey,
    pub session_key: EncryptionKey,
    pub kdc_options: u32,
    pub till: DateTime<Utc>,

    /// Realm of the KDC which must receive the request
    pub realm: String,
}

/// Parameters of a TGS-REQ apart from the TGT.
#[derive(Debug, Clone, Default)]
pub struct TgsReqParams {
    pub kdc_options: u32,
    pub etypes: Vec<i32>,
    pub second_ticket: Option<Ticket>,
    pub padata: Vec<PaData>,
}

/// Helper to craft a TGS-REQ for `server` with the TGT. The authenticator
/// carries a fresh subkey and, if the crypto is able to compute it, a
/// checksum of the request body. When `fast` is given the request is
/// armored with a key derived from the subkey and the TGT session key.
pub fn build_tgs_req(
    env: &Env,
    tgt: &Credential,
    server: &Principal,
    params: &TgsReqParams,
    fast: Option<&mut FastState>,
) -> Result<TgsRequest> {
    let crypto = env.crypto;
    let now = env.clock.now();
    let nonce = crypto.nonce();
    let subkey = crypto.random_key(tgt.key.keytype)?;
    let realm = tgt.tgt_realm().unwrap_or(&server.realm).to_string();

    let mut builder = KdcReqBuilder::new(realm.clone(), nonce, tgt.endtime)
        .kdc_options(params.kdc_options)
        .server(server)
        .etypes(params.etypes.clone());

    if let Some(second_ticket) = &params.second_ticket {
        builder = builder.push_ticket(second_ticket.clone());
    }

    let mut req = builder.build();
    let cksum = new_req_body_checksum(crypto, &tgt.key, &req.req_body.build());
    let ap_req = new_ap_req(
        crypto,
        tgt,
        KEY_USAGE_TGS_REQ_AUTHEN,
        cksum,
        Some(subkey.clone()),
        now,
    )?;

    let mut padata = vec![new_pa_data_ap_req(&ap_req)];
    padata.extend(params.padata.iter().cloned());
    req.padata = Some(padata);

    if let Some(fast) = fast {
        fast.armor_tgs(env, &subkey, &tgt.key)?;
        req = fast.wrap_request(env, req)?;
    }

    trace!("TGS-REQ for {} to realm {} with nonce {}", server, realm, nonce);
    let tgs_req: TgsReq = req.into();
    return Ok(TgsRequest {
        data: tgs_req.build(),
        nonce,
        timestamp: now,
        subkey,
        session_key: tgt.key.clone(),
        kdc_options: params.kdc_options,
        till: tgt.endtime,
        realm,
    });
}
