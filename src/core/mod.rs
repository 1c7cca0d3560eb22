pub mod clock;
pub use clock::Clock;

pub mod codec;
pub use codec::ExtensionCodec;

mod config;
pub use config::{Config, FastPolicy, InitCredsOptions, TktCredsOptions};

pub mod constants;

mod credential;
pub use credential::{Credential, Credentials};

pub mod crypto;
pub use crypto::{Crypto, KerberosCrypto, Secret};

mod env;
pub use env::{Env, KdcRequest, Step};

pub mod fast;

pub mod forge;

pub mod init_creds;
pub use init_creds::InitCredsContext;

pub mod preauth;
pub use preauth::{Answers, Questions, QUESTION_PASSWORD, QUESTION_SAM2};

mod principal;
pub use principal::{spn_to_service_parts, Principal};

mod provider;
pub use provider::{
    get_creds, get_init_creds, get_service_creds, get_user_tgt, Responder,
};

pub mod stringifier;

pub mod tkt_creds;
pub use tkt_creds::TktCredsContext;

pub mod vault;
pub use vault::{CredFormat, FileVault, MatchFlags, MemoryVault, Vault};

#[cfg(test)]
pub mod testkit;
