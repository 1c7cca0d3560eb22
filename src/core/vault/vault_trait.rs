use crate::core::{Credential, Credentials, Principal};
use crate::Result;
use chrono::{DateTime, Utc};
use kerberos_asn1::Ticket;

/// Conditions to match a credential in [Vault::lookup].
#[derive(Debug, Clone, Default)]
pub struct MatchFlags {
    /// Compare only the name of the server, ignoring its realm.
    pub srv_name_only: bool,

    /// Credential must be valid at this time.
    pub valid_at: Option<DateTime<Utc>>,

    /// Session key must be of one of these etypes.
    pub etypes: Option<Vec<i32>>,

    /// Credential must have been issued with this second ticket.
    pub second_ticket: Option<Ticket>,
}

impl MatchFlags {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn srv_name_only(mut self) -> Self {
        self.srv_name_only = true;
        self
    }

    pub fn valid_at(mut self, time: DateTime<Utc>) -> Self {
        self.valid_at = Some(time);
        self
    }

    pub fn etypes(mut self, etypes: Option<Vec<i32>>) -> Self {
        self.etypes = etypes;
        self
    }

    pub fn second_ticket(mut self, ticket: Option<Ticket>) -> Self {
        self.second_ticket = ticket;
        self
    }

    pub fn matches(&self, cred: &Credential) -> bool {
        if let Some(time) = self.valid_at {
            if !cred.is_valid_at(time) {
                return false;
            }
        }

        if let Some(etypes) = &self.etypes {
            if !etypes.contains(&cred.key.keytype) {
                return false;
            }
        }

        if let Some(second_ticket) = &self.second_ticket {
            if cred.second_ticket.as_ref() != Some(second_ticket) {
                return false;
            }
        }

        return true;
    }
}

/// Storage of credentials, plus small configuration values attached to
/// server principals. Implementations use interior mutability, so the
/// exchanges can share it by reference.
pub trait Vault {
    fn id(&self) -> &str;

    /// Retrieve all the credentials, without configuration entries.
    fn dump(&self) -> Result<Credentials>;

    /// Adds a credential, replacing the one with same client and server.
    fn store(&self, cred: Credential) -> Result<()>;

    /// Finds a credential of the client for the server. Not finding it is
    /// not an error.
    fn lookup(
        &self,
        client: &Principal,
        server: &Principal,
        flags: &MatchFlags,
    ) -> Result<Option<Credential>> {
        let creds = self
            .dump()?
            .client(client)
            .server(server, flags.srv_name_only);

        return Ok(creds.iter().find(|c| flags.matches(c)).cloned());
    }

    /// Retrieves a configuration value. If `server` is None the value
    /// applies to the whole vault.
    fn get_config(
        &self,
        server: Option<&Principal>,
        key: &str,
    ) -> Result<Option<String>>;

    fn set_config(
        &self,
        server: Option<&Principal>,
        key: &str,
        value: &str,
    ) -> Result<()>;
}
