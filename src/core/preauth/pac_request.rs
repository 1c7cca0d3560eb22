use super::{PreauthContext, PreauthMechanism};
use crate::core::forge::new_pa_data_pac_request;
use crate::Result;
use kerberos_asn1::PaData;
use kerberos_constants::pa_data_types::PA_PAC_REQUEST;
use std::any::Any;

/// PA-PAC-REQUEST, sent from the first request when the caller states
/// whether the ticket must include a PAC.
#[derive(Debug, Default)]
pub struct PacRequest {}

impl PacRequest {
    pub fn new() -> Self {
        return Self {};
    }
}

impl PreauthMechanism for PacRequest {
    fn name(&self) -> &'static str {
        return "pac_request";
    }

    fn padata_types(&self) -> Vec<i32> {
        return vec![PA_PAC_REQUEST];
    }

    fn is_informational(&self, _padata_type: i32) -> bool {
        return true;
    }

    fn optimistic(
        &self,
        ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        out: &mut Vec<PaData>,
    ) -> Result<()> {
        if let Some(include_pac) = ctx.request_pac {
            out.push(new_pa_data_pac_request(include_pac));
        }
        return Ok(());
    }

    fn process(
        &self,
        _ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        _padata: &PaData,
        _out: &mut Vec<PaData>,
    ) -> Result<()> {
        return Ok(());
    }
}
