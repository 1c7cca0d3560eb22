//! FAST armored channel of RFC 6113. Once an armor key is established the
//! preauthentication data travels encrypted inside the PA-FX-FAST padata
//! and the replies are verified with the same key.

mod types;
pub use types::{
    KrbFastArmor, KrbFastArmoredRep, KrbFastArmoredReq, KrbFastFinished,
    KrbFastReq, KrbFastResponse,
};

use crate::core::codec::{decode_method_data, find_padata, ExtensionCodec};
use crate::core::constants::fast::{ARMOR_TYPE_AP_REQUEST, HIDE_CLIENT_NAMES};
use crate::core::constants::key_usages::{
    KEY_USAGE_AP_REQ_AUTHEN, KEY_USAGE_FAST_ENC, KEY_USAGE_FAST_FINISHED,
    KEY_USAGE_FAST_REP, KEY_USAGE_FAST_REQ_CHKSUM,
};
use crate::core::config::FastPolicy;
use crate::core::env::Env;
use crate::core::forge::new_ap_req;
use crate::core::{Credential, Principal};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use kerberos_asn1::{
    Asn1Object, EncryptionKey, KdcReq, KrbError, PaData, Ticket,
};
use kerberos_constants::pa_data_types::{PA_FX_ERROR, PA_FX_FAST, PA_TGS_REQ};
use log::{debug, trace};

/// FAST state of one exchange. The presence of the armor key means that
/// FAST is in use.
#[derive(Debug, Clone, Default)]
pub struct FastState {
    armor_key: Option<EncryptionKey>,
    armor: Option<KrbFastArmor>,
    pub fast_options: u32,

    /// Nonce of the last wrapped request, the KDC must return it in the
    /// armored reply.
    nonce: u32,
}

impl FastState {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn is_active(&self) -> bool {
        return self.armor_key.is_some();
    }

    pub fn armor_key(&self) -> Option<&EncryptionKey> {
        return self.armor_key.as_ref();
    }

    /// Whether the requests can be armored with the collaborators at hand.
    pub fn is_available(env: &Env) -> bool {
        return env.codec.is_some()
            && env.config.fast_policy != FastPolicy::Never;
    }

    /// Whether the KDC announces FAST support in the padata.
    pub fn is_advertised(padata: &[PaData]) -> bool {
        return find_padata(padata, PA_FX_FAST).is_some();
    }

    /// Explicit armor for AS requests: an AP-REQ with the armor TGT and a
    /// random subkey, combined with the TGT session key.
    pub fn armor_as(
        &mut self,
        env: &Env,
        armor_cred: &Credential,
        now: DateTime<Utc>,
    ) -> Result<()> {
        require_codec(env)?;
        let crypto = env.crypto;
        let subkey = crypto.random_key(armor_cred.key.keytype)?;
        let ap_req = new_ap_req(
            crypto,
            armor_cred,
            KEY_USAGE_AP_REQ_AUTHEN,
            None,
            Some(subkey.clone()),
            now,
        )?;

        let armor_key =
            crypto.cf2(&subkey, "subkeyarmor", &armor_cred.key, "ticketarmor")?;

        debug!("FAST armor with the ticket of {}", armor_cred.server);
        self.armor = Some(KrbFastArmor {
            armor_type: ARMOR_TYPE_AP_REQUEST,
            armor_value: ap_req.build(),
        });
        self.armor_key = Some(armor_key);
        return Ok(());
    }

    /// Implicit armor for TGS requests, derived from the authenticator
    /// subkey and the session key of the TGT.
    pub fn armor_tgs(
        &mut self,
        env: &Env,
        subkey: &EncryptionKey,
        session_key: &EncryptionKey,
    ) -> Result<()> {
        require_codec(env)?;
        let armor_key =
            env.crypto
                .cf2(subkey, "subkeyarmor", session_key, "ticketarmor")?;
        self.armor = None;
        self.armor_key = Some(armor_key);
        return Ok(());
    }

    /// Moves the padata of the request inside an armored FAST request.
    /// PA-TGS-REQ remains outside, since it is the armor of TGS requests.
    pub fn wrap_request(&mut self, env: &Env, mut req: KdcReq) -> Result<KdcReq> {
        let codec = require_codec(env)?;
        let armor_key = self.require_armor_key()?.clone();
        let crypto = env.crypto;

        let mut inner_padata = req.padata.take().unwrap_or_default();
        let mut outer_padata = Vec::new();

        // AS requests checksum the outer body, TGS requests the AP-REQ
        let checksummed = match inner_padata
            .iter()
            .position(|p| p.padata_type == PA_TGS_REQ)
        {
            Some(pos) => {
                let tgs_req = inner_padata.remove(pos);
                let ap_req = tgs_req.padata_value.clone();
                outer_padata.push(tgs_req);
                ap_req
            }
            None => req.req_body.build(),
        };

        self.nonce = req.req_body.nonce;
        let fast_req = KrbFastReq {
            fast_options: self.fast_options,
            padata: inner_padata,
            req_body: req.req_body.clone(),
        };

        let enc_fast_req = crypto.encrypt_data(
            &armor_key,
            KEY_USAGE_FAST_ENC,
            &codec.encode_fast_req(&fast_req)?,
        )?;
        let req_checksum =
            crypto.checksum(&armor_key, KEY_USAGE_FAST_REQ_CHKSUM, &checksummed)?;

        let armored_req = KrbFastArmoredReq {
            armor: self.armor.clone(),
            req_checksum,
            enc_fast_req,
        };
        outer_padata.push(PaData::new(
            PA_FX_FAST,
            codec.encode_fast_armored_req(&armored_req)?,
        ));

        if self.fast_options & HIDE_CLIENT_NAMES != 0 {
            if req.req_body.cname.is_some() {
                req.req_body.cname = Some(Principal::anonymous().name);
            }
        }

        trace!("Request wrapped in FAST with nonce {}", self.nonce);
        req.padata = Some(outer_padata);
        return Ok(req);
    }

    /// Extracts the KDC error and the method data. Inside FAST the real
    /// error comes encrypted in the PA-FX-ERROR of the armored reply.
    pub fn unwrap_error(
        &self,
        env: &Env,
        krb_error: KrbError,
    ) -> Result<(KrbError, Vec<PaData>)> {
        let padata = match &krb_error.e_data {
            Some(e_data) => decode_method_data(e_data).unwrap_or_default(),
            None => Vec::new(),
        };

        if !self.is_active() {
            return Ok((krb_error, padata));
        }

        let fx_fast = match find_padata(&padata, PA_FX_FAST) {
            Some(fx_fast) => fx_fast,
            None => {
                debug!("KDC error {} out of FAST", krb_error.error_code);
                return Ok((krb_error, padata));
            }
        };

        let response = self.decrypt_response(env, &fx_fast.padata_value)?;
        let inner_error = match find_padata(&response.padata, PA_FX_ERROR) {
            Some(fx_error) => {
                let (_, inner_error) = KrbError::parse(&fx_error.padata_value)
                    .map_err(|_| {
                        Error::DataError("Error parsing PA-FX-ERROR".into())
                    })?;
                inner_error
            }
            None => krb_error,
        };

        return Ok((inner_error, response.padata));
    }

    /// Verifies the armored reply of a successful exchange and returns its
    /// content, which replaces the outer padata of the reply.
    pub fn unwrap_reply(
        &self,
        env: &Env,
        padata: Option<&Vec<PaData>>,
        ticket: &Ticket,
    ) -> Result<Option<KrbFastResponse>> {
        if !self.is_active() {
            return Ok(None);
        }

        let fx_fast = padata
            .and_then(|p| find_padata(p, PA_FX_FAST))
            .ok_or_else(|| {
                Error::Modified("Reply without FAST response".into())
            })?;

        let response = self.decrypt_response(env, &fx_fast.padata_value)?;
        let finished = response.finished.as_ref().ok_or_else(|| {
            Error::Modified("FAST response without finished".into())
        })?;

        let armor_key = self.require_armor_key()?;
        let valid = env.crypto.verify_checksum(
            armor_key,
            KEY_USAGE_FAST_FINISHED,
            &ticket.build(),
            &finished.ticket_checksum,
        )?;
        if !valid {
            return Err(Error::Modified(
                "FAST finished ticket checksum does not match".into(),
            ));
        }

        return Ok(Some(response));
    }

    /// Combines the reply key with the strengthen key sent by the KDC.
    pub fn strengthen_key(
        &self,
        env: &Env,
        reply_key: &EncryptionKey,
        strengthen_key: Option<&EncryptionKey>,
    ) -> Result<EncryptionKey> {
        match strengthen_key {
            Some(strengthen_key) => {
                debug!("Reply key strengthened by FAST");
                return env.crypto.cf2(
                    strengthen_key,
                    "strengthenkey",
                    reply_key,
                    "replykey",
                );
            }
            None => return Ok(reply_key.clone()),
        }
    }

    fn decrypt_response(&self, env: &Env, raw: &[u8]) -> Result<KrbFastResponse> {
        let codec = require_codec(env)?;
        let armor_key = self.require_armor_key()?;
        let armored_rep = codec.decode_fast_armored_rep(raw)?;
        let plain = env.crypto.decrypt_data(
            armor_key,
            KEY_USAGE_FAST_REP,
            &armored_rep.enc_fast_rep,
        )?;
        let response = codec.decode_fast_response(&plain)?;

        if response.nonce != self.nonce {
            return Err(Error::Modified(format!(
                "FAST response nonce {} does not match request nonce {}",
                response.nonce, self.nonce
            )));
        }
        return Ok(response);
    }

    fn require_armor_key(&self) -> Result<&EncryptionKey> {
        return self
            .armor_key
            .as_ref()
            .ok_or_else(|| Error::Config("FAST armor key not established".into()));
    }
}

fn require_codec<'a>(env: &Env<'a>) -> Result<&'a dyn ExtensionCodec> {
    return env
        .codec
        .ok_or_else(|| Error::Config("FAST requires an extension codec".into()));
}
