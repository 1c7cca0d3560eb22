use crate::core::crypto::{Crypto, Secret};
use crate::core::preauth::{Answers, QUESTION_PASSWORD};
use crate::error::{Error, Result};
use kerberos_asn1::EncryptionKey;
use log::debug;

/// Where the current reply key comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeySource {
    /// Password or key given in the options.
    Options,

    /// Password answered by the user.
    Answer,

    /// Set by a preauthentication mechanism.
    Mechanism,
}

/// The key used to decrypt the AS-REP, derived on demand from the client
/// secret with the etype and salt announced by the KDC.
#[derive(Debug, Clone)]
pub struct AsKey {
    key: Option<(EncryptionKey, KeySource)>,
    pub etype: i32,
    pub salt: Option<Vec<u8>>,
    pub s2kparams: Option<Vec<u8>>,
    default_salt: Vec<u8>,
    secret: Option<Secret>,
}

impl AsKey {
    pub fn new(
        etype: i32,
        default_salt: Vec<u8>,
        secret: Option<Secret>,
    ) -> Self {
        return Self {
            key: None,
            etype,
            salt: None,
            s2kparams: None,
            default_salt,
            secret,
        };
    }

    pub fn get(&self) -> Option<&EncryptionKey> {
        return self.key.as_ref().map(|(k, _)| k);
    }

    pub fn source(&self) -> Option<KeySource> {
        return self.key.as_ref().map(|(_, s)| *s);
    }

    /// Replaces the reply key, used by mechanisms which change it.
    pub fn set(&mut self, key: EncryptionKey) {
        self.etype = key.keytype;
        self.key = Some((key, KeySource::Mechanism));
    }

    /// Discards the current key, it will be derived again if needed.
    pub fn clear(&mut self) {
        self.key = None;
    }

    pub fn salt(&self) -> &[u8] {
        return self.salt.as_ref().unwrap_or(&self.default_salt);
    }

    pub fn set_default_salt(&mut self, default_salt: Vec<u8>) {
        self.default_salt = default_salt;
    }

    /// Updates the etype info announced by the KDC. A key derived with
    /// other parameters is discarded.
    pub fn set_etype_info(
        &mut self,
        etype: i32,
        salt: Option<Vec<u8>>,
        s2kparams: Option<Vec<u8>>,
    ) {
        let changed = etype != self.etype
            || (salt.is_some() && salt != self.salt)
            || s2kparams != self.s2kparams;

        self.etype = etype;
        if salt.is_some() {
            self.salt = salt;
        }
        self.s2kparams = s2kparams;

        if changed && self.source() != Some(KeySource::Mechanism) {
            self.key = None;
        }
    }

    /// Whether a key can be derived without asking the user.
    pub fn can_derive(&self, answers: &Answers) -> bool {
        return self.key.is_some()
            || self.secret.is_some()
            || answers.get(QUESTION_PASSWORD).is_some();
    }

    /// Returns the reply key, deriving it from the client secret or the
    /// password answered by the user.
    pub fn derive(
        &mut self,
        crypto: &dyn Crypto,
        answers: &Answers,
    ) -> Result<EncryptionKey> {
        if let Some((key, _)) = &self.key {
            if key.keytype == self.etype {
                return Ok(key.clone());
            }
        }

        let (key, source) = match &self.secret {
            Some(Secret::Key(key)) => {
                if key.keytype != self.etype {
                    return Err(Error::Config(format!(
                        "The KDC requires a key of etype {}, but the given \
                         key is of etype {}",
                        self.etype, key.keytype
                    )));
                }
                (key.clone(), KeySource::Options)
            }
            Some(Secret::Password(password)) => (
                self.string_to_key(crypto, password)?,
                KeySource::Options,
            ),
            None => match answers.get(QUESTION_PASSWORD) {
                Some(password) => (
                    self.string_to_key(crypto, password)?,
                    KeySource::Answer,
                ),
                None => {
                    return Err(Error::Config(
                        "No password or key available for the client".into(),
                    ));
                }
            },
        };

        debug!("Derived reply key of etype {}", key.keytype);
        self.key = Some((key.clone(), source));
        return Ok(key);
    }

    fn string_to_key(
        &self,
        crypto: &dyn Crypto,
        password: &str,
    ) -> Result<EncryptionKey> {
        return crypto.string_to_key(
            self.etype,
            password,
            self.salt(),
            self.s2kparams.as_ref().map(|p| p.as_slice()),
        );
    }
}
