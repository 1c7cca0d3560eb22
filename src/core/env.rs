use super::clock::Clock;
use super::codec::ExtensionCodec;
use super::config::Config;
use super::crypto::Crypto;
use super::preauth::{registry, Questions, Registry};
use super::vault::Vault;

/// Collaborators used by the exchanges. Everything is borrowed, so the
/// same environment can drive several independent exchanges.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    pub crypto: &'a dyn Crypto,
    pub codec: Option<&'a dyn ExtensionCodec>,
    pub vault: Option<&'a dyn Vault>,
    pub config: &'a Config,
    pub clock: Clock,

    /// Preauthentication mechanisms, the process wide registry by default.
    pub registry: &'a Registry,
}

impl<'a> Env<'a> {
    pub fn new(crypto: &'a dyn Crypto, config: &'a Config) -> Self {
        return Self {
            crypto,
            codec: None,
            vault: None,
            config,
            clock: Clock::new(),
            registry: registry(),
        };
    }

    pub fn codec(mut self, codec: &'a dyn ExtensionCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn vault(mut self, vault: &'a dyn Vault) -> Self {
        self.vault = Some(vault);
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(mut self, registry: &'a Registry) -> Self {
        self.registry = registry;
        self
    }
}

/// Message that must be delivered to a KDC of `realm`.
#[derive(Debug, Clone, PartialEq)]
pub struct KdcRequest {
    pub data: Vec<u8>,
    pub realm: String,

    /// The KDC replied that the response is too big for UDP, so this
    /// must be sent over TCP.
    pub tcp_only: bool,
}

/// Result of advancing an exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Send the request and call `step` again with the reply.
    Request(KdcRequest),

    /// Answer the questions and call `step` again with no input.
    Questions(Questions),

    /// The exchange finished successfully, the credential is available.
    Done,
}
