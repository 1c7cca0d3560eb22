//! Preauthentication framework. Each mechanism handles some padata types
//! and is asked to answer the hints sent by the KDC. The mechanisms live in
//! a process wide [Registry], while each exchange keeps its own
//! [PreauthState] with the per request data of every mechanism.

mod responder;
pub use responder::{
    Answers, Question, Questions, QUESTION_PASSWORD, QUESTION_SAM2,
};

mod registry;
pub use registry::{register, registry, Registry};

mod pa_config;
pub use pa_config::PaConfig;

mod cookie;
mod ec;
mod encts;
mod pac_request;
pub mod sam2;

pub use cookie::FxCookie;
pub use ec::EncryptedChallenge;
pub use encts::EncryptedTimestamp;
pub use pac_request::PacRequest;
pub use sam2::Sam2;

use crate::core::env::Env;
use crate::core::fast::FastState;
use crate::core::init_creds::AsKey;
use crate::core::stringifier::padata_type_to_string;
use crate::core::Principal;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use kerberos_asn1::{EncryptionKey, KdcReq, KrbError, PaData};
use log::{debug, info, warn};
use std::any::Any;

/// Everything a mechanism can read or modify while processing padata.
pub struct PreauthContext<'a> {
    pub env: Env<'a>,
    pub client: &'a Principal,

    /// The request in progress
    pub request: &'a KdcReq,
    pub as_key: &'a mut AsKey,
    pub fast: &'a FastState,
    pub questions: &'a mut Questions,
    pub answers: &'a Answers,

    /// Values stored by the mechanisms in a previous exchange with the
    /// same server.
    pub config_in: &'a PaConfig,
    pub config_out: &'a mut PaConfig,
    pub request_pac: Option<bool>,
    pub now: DateTime<Utc>,
}

impl<'a> PreauthContext<'a> {
    /// Whether the client long-term key cannot be obtained without asking
    /// the user.
    pub fn need_as_key(&self) -> bool {
        return !self.as_key.can_derive(self.answers);
    }

    /// Returns the client long-term key
    pub fn get_as_key(&mut self) -> Result<EncryptionKey> {
        return self.as_key.derive(self.env.crypto, self.answers);
    }

    /// Replaces the reply key
    pub fn set_as_key(&mut self, key: EncryptionKey) {
        self.as_key.set(key);
    }

    pub fn ask(&mut self, question: &str, challenge: Option<String>) {
        self.questions.ask(question, challenge);
    }
}

/// A preauthentication mechanism. Mechanisms are shared by every exchange
/// of the process, so any per request data must be kept in the state
/// returned by `request_init`.
pub trait PreauthMechanism: Send + Sync {
    fn name(&self) -> &'static str;

    fn padata_types(&self) -> Vec<i32>;

    /// Informational mechanisms do not authenticate the client, they are
    /// applied whenever their hint is present.
    fn is_informational(&self, _padata_type: i32) -> bool {
        return false;
    }

    /// Extra etypes that the mechanism can use for the reply key.
    fn enctypes(&self) -> Vec<i32> {
        return Vec::new();
    }

    /// Called once, when the registry is built. A mechanism which fails is
    /// not registered.
    fn init(&self) -> Result<()> {
        return Ok(());
    }

    fn fini(&self) {}

    fn request_init(&self) -> Box<dyn Any> {
        return Box::new(());
    }

    fn request_fini(&self, _state: &mut dyn Any) {}

    /// Padata sent in the first request, before any hint of the KDC.
    fn optimistic(
        &self,
        _ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        _out: &mut Vec<PaData>,
    ) -> Result<()> {
        return Ok(());
    }

    /// Registers the questions required to process the hint.
    fn prepare_questions(
        &self,
        _ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        _padata: &PaData,
    ) -> Result<()> {
        return Ok(());
    }

    /// Processes a KDC hint, adding the padata for the next request.
    fn process(
        &self,
        ctx: &mut PreauthContext,
        state: &mut dyn Any,
        padata: &PaData,
        out: &mut Vec<PaData>,
    ) -> Result<()>;

    /// Processes the padata of the final reply.
    fn process_reply(
        &self,
        _ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        _padata: &PaData,
    ) -> Result<()> {
        return Ok(());
    }

    /// Gives the mechanism a chance to recover from a KDC error. Returns
    /// false if it cannot.
    fn try_again(
        &self,
        _ctx: &mut PreauthContext,
        _state: &mut dyn Any,
        _padata_type: i32,
        _error: &KrbError,
        _error_padata: &[PaData],
        _out: &mut Vec<PaData>,
    ) -> Result<bool> {
        return Ok(false);
    }
}

/// Preauthentication state of an exchange.
pub struct PreauthState<'a> {
    registry: &'a Registry,
    modules: Vec<Box<dyn Any>>,

    /// Types that failed in this exchange, never tried again.
    failed: Vec<i32>,

    /// Only this real type can be used, if set.
    pub allowed_type: Option<i32>,

    /// Types allowed by the caller, all of them if None.
    pub allowed_list: Option<Vec<i32>>,

    /// Real type that succeeded in the last processing.
    pub selected_type: Option<i32>,
}

impl<'a> PreauthState<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        let modules = registry.iter().map(|m| m.request_init()).collect();
        return Self {
            registry,
            modules,
            failed: Vec::new(),
            allowed_type: None,
            allowed_list: None,
            selected_type: None,
        };
    }

    pub fn failed(&self) -> &[i32] {
        return &self.failed;
    }

    pub fn mark_failed(&mut self, padata_type: i32) {
        if !self.failed.contains(&padata_type) {
            self.failed.push(padata_type);
        }
    }

    /// Whether the real type can be used in this exchange
    fn is_usable(&self, padata_type: i32) -> bool {
        if let Some(allowed_type) = self.allowed_type {
            if allowed_type != padata_type {
                return false;
            }
        }

        if let Some(allowed_list) = &self.allowed_list {
            if !allowed_list.contains(&padata_type) {
                return false;
            }
        }

        return !self.failed.contains(&padata_type);
    }

    /// Whether there is a hint that some real mechanism could still try.
    pub fn has_candidates(&self, padata: &[PaData]) -> bool {
        return padata.iter().any(|pa| {
            match self.registry.find(pa.padata_type) {
                Some((_, m)) => {
                    !m.is_informational(pa.padata_type)
                        && self.is_usable(pa.padata_type)
                }
                None => false,
            }
        });
    }

    /// Collects the padata that mechanisms send before any KDC hint.
    pub fn optimistic(&mut self, ctx: &mut PreauthContext) -> Result<Vec<PaData>> {
        let registry = self.registry;
        let mut out = Vec::new();
        for (i, mechanism) in registry.iter().enumerate() {
            if let Err(err) =
                mechanism.optimistic(ctx, self.modules[i].as_mut(), &mut out)
            {
                if let Error::Interrupted = err {
                    return Err(err);
                }
                warn!("Mechanism {} optimistic padata: {}", mechanism.name(), err);
            }
        }
        return Ok(out);
    }

    /// Lets the mechanisms that could handle the hints ask their questions.
    pub fn prepare_questions(
        &mut self,
        ctx: &mut PreauthContext,
        padata: &[PaData],
    ) -> Result<()> {
        let registry = self.registry;
        for pa in padata {
            let (i, mechanism) = match registry.find(pa.padata_type) {
                Some(found) => found,
                None => continue,
            };

            if !mechanism.is_informational(pa.padata_type)
                && !self.is_usable(pa.padata_type)
            {
                continue;
            }

            if let Err(err) =
                mechanism.prepare_questions(ctx, self.modules[i].as_mut(), pa)
            {
                if let Error::Interrupted = err {
                    return Err(err);
                }
                warn!("Mechanism {} questions: {}", mechanism.name(), err);
            }
        }
        return Ok(());
    }

    /// Processes the KDC hints. First every informational mechanism is
    /// applied, then real mechanisms are tried in the order of the hints
    /// until one succeeds.
    pub fn process(
        &mut self,
        ctx: &mut PreauthContext,
        padata: &[PaData],
        must_preauth: bool,
    ) -> Result<Vec<PaData>> {
        let registry = self.registry;
        let mut out = Vec::new();
        self.selected_type = None;

        for pa in padata {
            let (i, mechanism) = match registry.find(pa.padata_type) {
                Some(found) => found,
                None => continue,
            };
            if !mechanism.is_informational(pa.padata_type) {
                continue;
            }

            debug!(
                "Informational padata {}",
                padata_type_to_string(pa.padata_type)
            );
            if let Err(err) =
                mechanism.process(ctx, self.modules[i].as_mut(), pa, &mut out)
            {
                if let Error::Interrupted = err {
                    return Err(err);
                }
                warn!("Mechanism {} failed: {}", mechanism.name(), err);
            }
        }

        let mut first_error = None;
        for pa in padata {
            let (i, mechanism) = match registry.find(pa.padata_type) {
                Some(found) => found,
                None => continue,
            };
            if mechanism.is_informational(pa.padata_type)
                || !self.is_usable(pa.padata_type)
            {
                continue;
            }

            let mut mech_out = Vec::new();
            match mechanism.process(
                ctx,
                self.modules[i].as_mut(),
                pa,
                &mut mech_out,
            ) {
                Ok(()) => {
                    info!(
                        "Preauthentication with {} ({})",
                        mechanism.name(),
                        pa.padata_type
                    );
                    self.selected_type = Some(pa.padata_type);
                    out.append(&mut mech_out);
                    return Ok(out);
                }
                Err(Error::Interrupted) => return Err(Error::Interrupted),
                Err(err) => {
                    warn!("Mechanism {} failed: {}", mechanism.name(), err);
                    if first_error.is_none() {
                        first_error = Some((pa.padata_type, err));
                    }
                }
            }
        }

        if must_preauth {
            match first_error {
                Some((padata_type, error)) => {
                    return Err(Error::Preauth {
                        padata_type,
                        error: Box::new(error),
                    });
                }
                None => {
                    return Err(Error::String(
                        "No preauthentication mechanism available for the \
                         KDC hints"
                            .into(),
                    ));
                }
            }
        }

        return Ok(out);
    }

    /// Processes the padata of the final reply with every mechanism that
    /// handles it.
    pub fn process_reply(
        &mut self,
        ctx: &mut PreauthContext,
        padata: &[PaData],
    ) -> Result<()> {
        let registry = self.registry;
        for pa in padata {
            if let Some((i, mechanism)) = registry.find(pa.padata_type) {
                mechanism.process_reply(ctx, self.modules[i].as_mut(), pa)?;
            }
        }
        return Ok(());
    }

    /// Asks the selected mechanism to recover from a KDC error.
    pub fn try_again(
        &mut self,
        ctx: &mut PreauthContext,
        error: &KrbError,
        error_padata: &[PaData],
    ) -> Result<Option<Vec<PaData>>> {
        let padata_type = match self.selected_type {
            Some(padata_type) => padata_type,
            None => return Ok(None),
        };

        let registry = self.registry;
        let (i, mechanism) = match registry.find(padata_type) {
            Some(found) => found,
            None => return Ok(None),
        };

        let mut out = Vec::new();
        if mechanism.try_again(
            ctx,
            self.modules[i].as_mut(),
            padata_type,
            error,
            error_padata,
            &mut out,
        )? {
            debug!("Mechanism {} tries again", mechanism.name());
            return Ok(Some(out));
        }
        return Ok(None);
    }
}

impl<'a> Drop for PreauthState<'a> {
    fn drop(&mut self) {
        for (mechanism, state) in self.registry.iter().zip(self.modules.iter_mut())
        {
            mechanism.request_fini(state.as_mut());
        }
    }
}

/// Sorts the hints by the configured preference, keeping the KDC order
/// for the rest.
pub fn sort_padata(padata: &mut Vec<PaData>, preferred: &[i32]) {
    padata.sort_by_key(|pa| {
        preferred
            .iter()
            .position(|t| *t == pa.padata_type)
            .unwrap_or(preferred.len())
    });
}
