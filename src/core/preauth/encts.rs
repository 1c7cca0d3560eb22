use super::{PreauthContext, PreauthMechanism, QUESTION_PASSWORD};
use crate::core::forge::new_pa_data_encrypted_timestamp;
use crate::error::{Error, Result};
use kerberos_asn1::PaData;
use kerberos_constants::key_usages::KEY_USAGE_AS_REQ_TIMESTAMP;
use kerberos_constants::pa_data_types::PA_ENC_TIMESTAMP;
use std::any::Any;

/// PA-ENC-TIMESTAMP: the current time encrypted with the client key.
/// Inside FAST the encrypted challenge is used instead.
#[derive(Debug, Default)]
pub struct EncryptedTimestamp {}

impl EncryptedTimestamp {
    pub fn new() -> Self {
        return Self {};
    }
}

impl PreauthMechanism for EncryptedTimestamp {
    fn name(&self) -> &'static str {
        return "encrypted_timestamp";
    }

    fn padata_types(&self) -> Vec<i32> {
        return vec![PA_ENC_TIMESTAMP];
    }

    fn prepare_questions(
        &self,
        ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        _padata: &PaData,
    ) -> Result<()> {
        if !ctx.fast.is_active() && ctx.need_as_key() {
            ctx.ask(QUESTION_PASSWORD, None);
        }
        return Ok(());
    }

    fn process(
        &self,
        ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        _padata: &PaData,
        out: &mut Vec<PaData>,
    ) -> Result<()> {
        if ctx.fast.is_active() {
            return Err(Error::String(
                "Encrypted timestamp is not sent inside FAST".into(),
            ));
        }

        let key = ctx.get_as_key()?;
        out.push(new_pa_data_encrypted_timestamp(
            ctx.env.crypto,
            &key,
            KEY_USAGE_AS_REQ_TIMESTAMP,
            PA_ENC_TIMESTAMP,
            ctx.now,
        )?);
        return Ok(());
    }
}
