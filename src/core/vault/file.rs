use super::Vault;
use crate::core::constants::{CACHE_CONF_NAME, CACHE_CONF_REALM};
use crate::core::{Credential, Credentials, Principal};
use crate::error::Error;
use crate::Result;
use chrono::{TimeZone, Utc};
use kerberos_asn1::{Asn1Object, EncryptionKey, KrbCred, PrincipalName, Ticket};
use kerberos_ccache::CCache;
use kerberos_constants::principal_names;
use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::fs;
use std::path::Path;

/// Formats of the credential files
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CredFormat {
    /// KRB-CRED message, as used by Windows tools
    Krb,
    /// MIT ccache
    Ccache,
}

impl CredFormat {
    pub fn from_file_extension(filename: &str) -> Option<Self> {
        let extension = Path::new(filename).extension()?.to_str()?;
        match extension {
            "krb" | "kirbi" => Some(Self::Krb),
            "ccache" => Some(Self::Ccache),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Krb => "krb",
            Self::Ccache => "ccache",
        }
    }
}

impl TryFrom<&str> for CredFormat {
    type Error = Error;

    fn try_from(name: &str) -> Result<Self> {
        match name {
            "krb" | "kirbi" => Ok(Self::Krb),
            "ccache" => Ok(Self::Ccache),
            _ => Err(Error::Config(format!(
                "Unknown credentials format '{}'",
                name
            ))),
        }
    }
}

impl fmt::Display for CredFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Vault backed by a ccache or krb (KRB-CRED) file. Configuration values
/// are stored as fake credentials in the realm `X-CACHECONF:`, like MIT
/// Kerberos does, so other tools ignore them.
pub struct FileVault {
    file_path: String,
    default_format: CredFormat,
}

impl FileVault {
    pub fn new(file_path: String) -> Self {
        return Self {
            file_path,
            default_format: CredFormat::Ccache,
        };
    }

    /// Format used to create the file when its current content or
    /// extension does not tell it.
    pub fn default_format(mut self, format: CredFormat) -> Self {
        self.default_format = format;
        self
    }

    fn get_cred_format(&self) -> Result<CredFormat> {
        return Ok(get_cred_format_by_file(&self.file_path)?
            .unwrap_or(self.default_format));
    }

    /// Credentials including the configuration entries
    fn load_all(&self) -> Result<Credentials> {
        return load_file_creds(&self.file_path);
    }

    fn save(&self, creds: Credentials) -> Result<()> {
        return save_file_creds(&self.file_path, creds, self.get_cred_format()?);
    }
}

impl Vault for FileVault {
    fn id(&self) -> &str {
        return &self.file_path;
    }

    fn dump(&self) -> Result<Credentials> {
        return Ok(self.load_all()?.filter(|c| !is_config_entry(c)));
    }

    fn store(&self, cred: Credential) -> Result<()> {
        let mut creds = self.load_all()?;
        creds.replace(cred);
        return self.save(creds);
    }

    fn get_config(
        &self,
        server: Option<&Principal>,
        key: &str,
    ) -> Result<Option<String>> {
        let conf_server = config_principal(server, key);
        let creds = self.load_all()?;
        let entry = creds.iter().find(|c| c.server.matches(&conf_server));

        match entry {
            Some(cred) => {
                let value = String::from_utf8(cred.ticket.enc_part.cipher.clone())
                    .map_err(|_| {
                        Error::DataError(format!(
                            "Invalid configuration value '{}' in {}",
                            key, self.file_path
                        ))
                    })?;
                return Ok(Some(value));
            }
            None => return Ok(None),
        }
    }

    fn set_config(
        &self,
        server: Option<&Principal>,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut creds = self.load_all()?;
        let client = creds
            .iter()
            .find(|c| !is_config_entry(c))
            .map(|c| c.client.clone())
            .unwrap_or_else(|| {
                Principal::new(PrincipalName::default(), String::new())
            });

        creds.replace(new_config_entry(
            client,
            config_principal(server, key),
            value,
        ));
        return self.save(creds);
    }
}

/// Server principal of a configuration entry:
/// krb5_ccache_conf_data/<key>[/<server>]@X-CACHECONF:
fn config_principal(server: Option<&Principal>, key: &str) -> Principal {
    let mut name_string = vec![CACHE_CONF_NAME.to_string(), key.to_string()];
    if let Some(server) = server {
        name_string.push(server.to_string());
    }

    return Principal::new(
        PrincipalName {
            name_type: principal_names::NT_UNKNOWN,
            name_string,
        },
        CACHE_CONF_REALM.to_string(),
    );
}

fn is_config_entry(cred: &Credential) -> bool {
    return cred.server.realm == CACHE_CONF_REALM;
}

fn new_config_entry(client: Principal, server: Principal, value: &str) -> Credential {
    let mut ticket = Ticket::default();
    ticket.realm = server.realm.clone();
    ticket.sname = server.name.clone();
    ticket.enc_part.cipher = value.as_bytes().to_vec();

    let epoch = Utc.timestamp(0, 0);
    return Credential {
        client,
        server,
        key: EncryptionKey::default(),
        ticket,
        flags: 0,
        authtime: epoch,
        starttime: None,
        endtime: epoch,
        renew_till: None,
        second_ticket: None,
        authorization_data: None,
        is_skey: false,
    };
}

pub fn load_file_creds(creds_file: &str) -> Result<Credentials> {
    match load_file_credentials(creds_file) {
        Ok((creds, _)) => return Ok(creds),
        Err(err) => {
            if err.is_not_found_error() || err.is_data_error() {
                return Ok(Credentials::empty());
            }
            return Err(err);
        }
    }
}

/// Deduce the credentials format based on the file content and file extension.
pub fn get_cred_format_by_file(creds_file: &str) -> Result<Option<CredFormat>> {
    match load_file_krb_cred(creds_file) {
        Ok((_, cred_format)) => return Ok(Some(cred_format)),
        Err(err) => {
            if err.is_not_found_error() || err.is_data_error() {
                return Ok(CredFormat::from_file_extension(creds_file));
            }

            return Err(err);
        }
    }
}

/// Load the credentials from a file
pub fn load_file_credentials(
    creds_file: &str,
) -> Result<(Credentials, CredFormat)> {
    let (krb_cred, format) = load_file_krb_cred(creds_file)?;

    // Kerberos credentials are usually stored in plain text so this
    // should work.
    let creds = Credentials::try_from(krb_cred)?;
    return Ok((creds, format));
}

/// Load the Kerberos credentials from a file.
pub fn load_file_krb_cred(creds_file: &str) -> Result<(KrbCred, CredFormat)> {
    let data = fs::read(creds_file).map_err(|err| {
        let message = format!("Unable to read the file '{}'", creds_file);
        (message, err)
    })?;

    match CCache::parse(&data) {
        Ok((_, ccache)) => {
            let krb_cred = ccache.try_into().map_err(|_| {
                Error::DataError(format!(
                    "Error parsing ccache data content of file '{}'",
                    creds_file
                ))
            })?;

            return Ok((krb_cred, CredFormat::Ccache));
        }
        Err(_) => {
            let (_, krb_cred) = KrbCred::parse(&data).map_err(|_| {
                Error::DataError(format!(
                    "Error parsing content of ccache/krb file '{}'",
                    creds_file
                ))
            })?;
            return Ok((krb_cred, CredFormat::Krb));
        }
    }
}

pub fn save_file_creds(
    creds_file: &str,
    creds: Credentials,
    cred_format: CredFormat,
) -> Result<()> {
    let krb_cred: KrbCred = creds.into();
    let raw_cred = match cred_format {
        CredFormat::Krb => krb_cred.build(),
        CredFormat::Ccache => {
            let ccache: CCache = krb_cred.try_into().map_err(|_| {
                Error::DataError(format!("Error converting KrbCred to CCache"))
            })?;
            ccache.build()
        }
    };

    fs::write(creds_file, raw_cred).map_err(|err| {
        let message =
            format!("Unable to write credentials in file {}", creds_file);
        (message, err)
    })?;

    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testkit::new_credential;
    use std::env;

    fn temp_file(name: &str) -> String {
        let mut path = env::temp_dir();
        path.push(format!("krbcreds-{}-{}.krb", name, std::process::id()));
        return path.to_string_lossy().to_string();
    }

    #[test]
    fn test_cred_format_names() {
        assert_eq!(
            Some(CredFormat::Krb),
            CredFormat::from_file_extension("/tmp/alice.kirbi")
        );
        assert_eq!(
            Some(CredFormat::Ccache),
            CredFormat::from_file_extension("alice.ccache")
        );
        assert_eq!(None, CredFormat::from_file_extension("ccache"));
        assert_eq!(CredFormat::Krb, CredFormat::try_from("krb").unwrap());
        assert!(CredFormat::try_from("keytab").is_err());
        assert_eq!("ccache", CredFormat::Ccache.to_string());
    }

    #[test]
    fn test_krb_file_round_trip() {
        let path = temp_file("roundtrip");
        let vault = FileVault::new(path.clone());
        let cred = new_credential(
            Principal::user("alice", "A.COM"),
            Principal::tgs("A.COM", "A.COM"),
        );
        vault.store(cred.clone()).unwrap();

        let (creds, format) = load_file_credentials(&path).unwrap();
        assert_eq!(CredFormat::Krb, format);
        assert_eq!(1, creds.len());
        assert_eq!(cred.server, creds.get(0).unwrap().server);
        assert_eq!(cred.key, creds.get(0).unwrap().key);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let vault = FileVault::new(temp_file("missing"));
        assert!(vault.dump().unwrap().is_empty());
    }

    #[test]
    fn test_config_entries_are_hidden() {
        let path = temp_file("config");
        let vault = FileVault::new(path.clone());
        let alice = Principal::user("alice", "A.COM");
        let tgs = Principal::tgs("A.COM", "A.COM");

        vault.store(new_credential(alice, tgs.clone())).unwrap();
        vault.set_config(Some(&tgs), "pa_type", "138").unwrap();
        vault.set_config(Some(&tgs), "pa_type", "2").unwrap();

        assert_eq!(1, vault.dump().unwrap().len());
        assert_eq!(
            Some("2".to_string()),
            vault.get_config(Some(&tgs), "pa_type").unwrap()
        );
        assert_eq!(None, vault.get_config(None, "pa_type").unwrap());

        let _ = fs::remove_file(path);
    }
}
