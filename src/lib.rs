//! Client side Kerberos credential acquisition: AS and TGS exchanges as
//! resumable state machines, with preauthentication, FAST armor and
//! cross-realm referrals.

pub mod communication;
pub mod core;
pub mod error;

pub use crate::error::{Error, ErrorClass, Result};
