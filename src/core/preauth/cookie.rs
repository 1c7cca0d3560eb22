use super::{PreauthContext, PreauthMechanism};
use crate::Result;
use kerberos_asn1::PaData;
use kerberos_constants::pa_data_types::PA_FX_COOKIE;
use log::trace;
use std::any::Any;

/// PA-FX-COOKIE: KDC state that must be returned untouched in the next
/// request of the conversation.
#[derive(Debug, Default)]
pub struct FxCookie {}

impl FxCookie {
    pub fn new() -> Self {
        return Self {};
    }
}

impl PreauthMechanism for FxCookie {
    fn name(&self) -> &'static str {
        return "fx_cookie";
    }

    fn padata_types(&self) -> Vec<i32> {
        return vec![PA_FX_COOKIE];
    }

    fn is_informational(&self, _padata_type: i32) -> bool {
        return true;
    }

    fn process(
        &self,
        _ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        padata: &PaData,
        out: &mut Vec<PaData>,
    ) -> Result<()> {
        trace!("Echoing FX cookie of {} bytes", padata.padata_value.len());
        out.push(PaData::new(PA_FX_COOKIE, padata.padata_value.clone()));
        return Ok(());
    }
}
