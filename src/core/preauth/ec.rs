use super::{PreauthContext, PreauthMechanism, QUESTION_PASSWORD};
use crate::core::constants::key_usages::{
    KEY_USAGE_ENC_CHALLENGE_CLIENT, KEY_USAGE_ENC_CHALLENGE_KDC,
};
use crate::core::forge::new_pa_data_encrypted_timestamp;
use crate::error::{Error, Result};
use kerberos_asn1::{
    Asn1Object, EncryptedData, EncryptionKey, PaData, PaEncTsEnc,
};
use kerberos_constants::pa_data_types::PA_ENCRYPTED_CHALLENGE;
use log::debug;
use std::any::Any;

/// PA-ENCRYPTED-CHALLENGE of RFC 6113. Only available inside FAST, the
/// timestamp is encrypted with a key that combines the armor key and the
/// client key, and the KDC proves its knowledge of the client key in the
/// same way.
#[derive(Debug, Default)]
pub struct EncryptedChallenge {}

impl EncryptedChallenge {
    pub fn new() -> Self {
        return Self {};
    }
}

#[derive(Default)]
struct ChallengeState {
    long_term_key: Option<EncryptionKey>,
}

fn challenge_state(state: &mut dyn Any) -> Result<&mut ChallengeState> {
    return state.downcast_mut::<ChallengeState>().ok_or_else(|| {
        Error::String("Unexpected encrypted challenge state".into())
    });
}

impl PreauthMechanism for EncryptedChallenge {
    fn name(&self) -> &'static str {
        return "encrypted_challenge";
    }

    fn padata_types(&self) -> Vec<i32> {
        return vec![PA_ENCRYPTED_CHALLENGE];
    }

    fn request_init(&self) -> Box<dyn Any> {
        return Box::new(ChallengeState::default());
    }

    fn prepare_questions(
        &self,
        ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        _padata: &PaData,
    ) -> Result<()> {
        if ctx.fast.is_active() && ctx.need_as_key() {
            ctx.ask(QUESTION_PASSWORD, None);
        }
        return Ok(());
    }

    fn process(
        &self,
        ctx: &mut PreauthContext,
        state: &mut dyn Any,
        _padata: &PaData,
        out: &mut Vec<PaData>,
    ) -> Result<()> {
        let armor_key = ctx.fast.armor_key().cloned().ok_or_else(|| {
            Error::String("Encrypted challenge requires FAST".into())
        })?;

        let long_term_key = ctx.get_as_key()?;
        let crypto = ctx.env.crypto;
        let client_key = crypto.cf2(
            &armor_key,
            "clientchallengearmor",
            &long_term_key,
            "challengelongterm",
        )?;

        out.push(new_pa_data_encrypted_timestamp(
            crypto,
            &client_key,
            KEY_USAGE_ENC_CHALLENGE_CLIENT,
            PA_ENCRYPTED_CHALLENGE,
            ctx.now,
        )?);

        challenge_state(state)?.long_term_key = Some(long_term_key);
        ctx.set_as_key(armor_key);
        return Ok(());
    }

    fn process_reply(
        &self,
        ctx: &mut PreauthContext,
        state: &mut dyn Any,
        padata: &PaData,
    ) -> Result<()> {
        let long_term_key = match &challenge_state(state)?.long_term_key {
            Some(key) => key.clone(),
            None => return Ok(()),
        };
        let armor_key = ctx.fast.armor_key().cloned().ok_or_else(|| {
            Error::Modified("KDC challenge out of FAST".into())
        })?;

        let crypto = ctx.env.crypto;
        let kdc_key = crypto.cf2(
            &armor_key,
            "kdcchallengearmor",
            &long_term_key,
            "challengelongterm",
        )?;

        let (_, enc_data) = EncryptedData::parse(&padata.padata_value)
            .map_err(|_| {
                Error::DataError("Error parsing KDC challenge".into())
            })?;
        let raw = crypto
            .decrypt_data(&kdc_key, KEY_USAGE_ENC_CHALLENGE_KDC, &enc_data)
            .map_err(|_| {
                Error::Modified("KDC challenge cannot be decrypted".into())
            })?;
        PaEncTsEnc::parse(&raw).map_err(|_| {
            Error::Modified("Invalid timestamp in KDC challenge".into())
        })?;

        debug!("KDC challenge verified");
        return Ok(());
    }
}
