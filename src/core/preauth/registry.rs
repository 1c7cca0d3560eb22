use super::{
    EncryptedChallenge, EncryptedTimestamp, FxCookie, PacRequest,
    PreauthMechanism, Sam2,
};
use crate::error::{Error, Result};
use log::warn;
use std::sync::OnceLock;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Set of preauthentication mechanisms. It is immutable once built, so it
/// can be shared by every exchange of the process.
///
/// The `fini` of the mechanisms runs when the registry is dropped. The
/// process wide registry lives in a static which is never dropped, so its
/// mechanisms are not finalized.
pub struct Registry {
    mechanisms: Vec<Box<dyn PreauthMechanism>>,
}

impl Registry {
    /// Builds a registry, discarding the mechanisms that fail to init.
    pub fn new(mechanisms: Vec<Box<dyn PreauthMechanism>>) -> Self {
        let mechanisms = mechanisms
            .into_iter()
            .filter(|m| match m.init() {
                Ok(()) => true,
                Err(err) => {
                    warn!("Preauth mechanism {} disabled: {}", m.name(), err);
                    false
                }
            })
            .collect();
        return Self { mechanisms };
    }

    /// Registry with the built-in mechanisms
    pub fn builtin() -> Self {
        return Self::new(builtin_mechanisms());
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn PreauthMechanism> {
        return self.mechanisms.iter().map(|m| m.as_ref());
    }

    pub fn len(&self) -> usize {
        return self.mechanisms.len();
    }

    /// Index and mechanism which handles the padata type. The first
    /// registered wins.
    pub fn find(&self, padata_type: i32) -> Option<(usize, &dyn PreauthMechanism)> {
        return self
            .mechanisms
            .iter()
            .enumerate()
            .find(|(_, m)| m.padata_types().contains(&padata_type))
            .map(|(i, m)| (i, m.as_ref()));
    }

    /// Etypes that the mechanisms add to the request
    pub fn enctypes(&self) -> Vec<i32> {
        let mut etypes = Vec::new();
        for mechanism in self.iter() {
            for etype in mechanism.enctypes() {
                if !etypes.contains(&etype) {
                    etypes.push(etype);
                }
            }
        }
        return etypes;
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        for mechanism in self.mechanisms.iter() {
            mechanism.fini();
        }
    }
}

fn builtin_mechanisms() -> Vec<Box<dyn PreauthMechanism>> {
    return vec![
        Box::new(EncryptedChallenge::new()),
        Box::new(EncryptedTimestamp::new()),
        Box::new(Sam2::new()),
        Box::new(FxCookie::new()),
        Box::new(PacRequest::new()),
    ];
}

/// The process wide registry, built the first time it is used and kept
/// until the process ends.
pub fn registry() -> &'static Registry {
    return REGISTRY.get_or_init(Registry::builtin);
}

/// Registers extra mechanisms, like PKINIT, together with the built-in
/// ones. They take precedence over the built-in ones for the same types.
/// It must be called before any exchange starts.
pub fn register(extra: Vec<Box<dyn PreauthMechanism>>) -> Result<()> {
    let mut mechanisms = extra;
    mechanisms.append(&mut builtin_mechanisms());

    return REGISTRY.set(Registry::new(mechanisms)).map_err(|_| {
        Error::Config("Preauthentication registry already initialized".into())
    });
}
