use super::Vault;
use crate::core::{Credential, Credentials, Principal};
use crate::Result;
use std::cell::RefCell;
use std::collections::HashMap;

/// Vault that keeps the credentials in memory, lost at the end of the
/// process.
#[derive(Debug, Default)]
pub struct MemoryVault {
    creds: RefCell<Credentials>,
    config: RefCell<HashMap<(String, String), String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn with_creds(creds: Credentials) -> Self {
        return Self {
            creds: RefCell::new(creds),
            config: RefCell::new(HashMap::new()),
        };
    }
}

fn config_key(server: Option<&Principal>, key: &str) -> (String, String) {
    let server = server.map(|s| s.to_string()).unwrap_or_default();
    return (server, key.to_string());
}

impl Vault for MemoryVault {
    fn id(&self) -> &str {
        return "Memory";
    }

    fn dump(&self) -> Result<Credentials> {
        return Ok(self.creds.borrow().clone());
    }

    fn store(&self, cred: Credential) -> Result<()> {
        self.creds.borrow_mut().replace(cred);
        return Ok(());
    }

    fn get_config(
        &self,
        server: Option<&Principal>,
        key: &str,
    ) -> Result<Option<String>> {
        return Ok(self.config.borrow().get(&config_key(server, key)).cloned());
    }

    fn set_config(
        &self,
        server: Option<&Principal>,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.config
            .borrow_mut()
            .insert(config_key(server, key), value.to_string());
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::super::MatchFlags;
    use super::*;
    use crate::core::testkit::new_credential;
    use chrono::{Duration, Utc};

    #[test]
    fn test_lookup_not_found_is_none() {
        let vault = MemoryVault::new();
        let found = vault
            .lookup(
                &Principal::user("alice", "A.COM"),
                &Principal::tgs("A.COM", "A.COM"),
                &MatchFlags::new(),
            )
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_store_and_lookup() {
        let vault = MemoryVault::new();
        let alice = Principal::user("alice", "A.COM");
        vault
            .store(new_credential(alice.clone(), Principal::tgs("B.COM", "A.COM")))
            .unwrap();

        let flags = MatchFlags::new().srv_name_only().valid_at(Utc::now());
        let found = vault
            .lookup(&alice, &Principal::tgs("B.COM", ""), &flags)
            .unwrap()
            .unwrap();
        assert_eq!("A.COM", found.server.realm);

        let later = Utc::now() + Duration::days(30);
        let flags = MatchFlags::new().srv_name_only().valid_at(later);
        assert!(vault
            .lookup(&alice, &Principal::tgs("B.COM", ""), &flags)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_config_scoped_by_server() {
        let vault = MemoryVault::new();
        let tgs = Principal::tgs("A.COM", "A.COM");
        vault.set_config(Some(&tgs), "pa_type", "2").unwrap();

        assert_eq!(
            Some("2".to_string()),
            vault.get_config(Some(&tgs), "pa_type").unwrap()
        );
        assert_eq!(None, vault.get_config(None, "pa_type").unwrap());
    }
}
