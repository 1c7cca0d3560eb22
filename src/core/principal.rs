use super::constants::{principal_names as ext_names, wellknown};
use crate::error::Error;
use kerberos_asn1::PrincipalName;
use kerberos_constants::principal_names;
use std::convert::TryFrom;
use std::fmt;

pub const TGS_NAME: &str = "krbtgt";

/// Struct to package a principal name with its realm
#[derive(Clone, Debug, PartialEq)]
pub struct Principal {
    pub name: PrincipalName,
    pub realm: String,
}

impl Principal {
    pub fn new(name: PrincipalName, realm: String) -> Self {
        return Self { name, realm };
    }

    /// Creates a NT-PRINCIPAL for a user
    pub fn user(name: &str, realm: &str) -> Self {
        return Self::new(new_nt_principal(name), realm.to_string());
    }

    /// Creates a NT-SRV-INST for a service name like `cifs/host`
    pub fn service(spn: &str, realm: &str) -> Self {
        return Self::new(new_nt_srv_inst(spn), realm.to_string());
    }

    /// Principal of the ticket-granting service of `target_realm`, as
    /// issued by the KDC of `issuer_realm`: krbtgt/TARGET@ISSUER
    pub fn tgs(target_realm: &str, issuer_realm: &str) -> Self {
        return Self::new(
            PrincipalName {
                name_type: principal_names::NT_SRV_INST,
                name_string: vec![TGS_NAME.into(), target_realm.into()],
            },
            issuer_realm.to_string(),
        );
    }

    /// The well-known anonymous principal of RFC 8062
    pub fn anonymous() -> Self {
        return Self::new(
            PrincipalName {
                name_type: ext_names::NT_WELLKNOWN,
                name_string: vec![
                    wellknown::WELLKNOWN.into(),
                    wellknown::ANONYMOUS.into(),
                ],
            },
            wellknown::ANONYMOUS_REALM.to_string(),
        );
    }

    pub fn with_realm(&self, realm: &str) -> Self {
        return Self::new(self.name.clone(), realm.to_string());
    }

    pub fn components(&self) -> &[String] {
        return &self.name.name_string;
    }

    pub fn has_realm(&self) -> bool {
        return !self.realm.is_empty();
    }

    pub fn is_tgs(&self) -> bool {
        return is_tgs_name(&self.name);
    }

    /// The realm a TGS principal gives access to, krbtgt/THIS@OTHER
    pub fn tgs_realm(&self) -> Option<&str> {
        if self.is_tgs() {
            return Some(&self.name.name_string[1]);
        }
        return None;
    }

    /// Whether is krbtgt/REALM@REALM
    pub fn is_local_tgs(&self) -> bool {
        return self.tgs_realm() == Some(self.realm.as_str());
    }

    pub fn is_anonymous(&self) -> bool {
        let parts = self.components();
        return parts.len() == 2
            && parts[0] == wellknown::WELLKNOWN
            && parts[1] == wellknown::ANONYMOUS;
    }

    pub fn is_enterprise(&self) -> bool {
        return self.name.name_type == principal_names::NT_ENTERPRISE;
    }

    /// Compares names and realms without taking into account the name
    /// type, as KDCs are free to change it.
    pub fn matches(&self, other: &Principal) -> bool {
        return self.realm == other.realm && self.name_matches(&other.name);
    }

    pub fn name_matches(&self, other: &PrincipalName) -> bool {
        return self.name.name_string == other.name_string;
    }

    /// Host component of a host based service principal, like the
    /// `host.example.com` of `cifs/host.example.com`.
    pub fn host(&self) -> Option<&str> {
        let parts = self.components();
        if parts.len() != 2 || self.is_tgs() {
            return None;
        }
        let name_type = self.name.name_type;
        if name_type != principal_names::NT_SRV_HST
            && name_type != principal_names::NT_SRV_INST
            && name_type != principal_names::NT_UNKNOWN
        {
            return None;
        }
        return Some(&parts[1]);
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.name.name_string.join("/"), self.realm)
    }
}

/// Parses principals in the form `name/instance@REALM`. The realm is
/// taken after the last `@`, so enterprise names like
/// `user@domain.com@REALM` are accepted. The realm can be omitted.
impl TryFrom<&str> for Principal {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (name, realm) = match value.rfind('@') {
            Some(pos) => (&value[..pos], &value[pos + 1..]),
            None => (value, ""),
        };

        if name.is_empty() || name.split('/').any(|part| part.is_empty()) {
            return Err(Error::DataError(format!(
                "Invalid principal '{}', it must be <name>[/<instance>][@<realm>]",
                value
            )));
        }

        let name_type = if name.contains('@') {
            principal_names::NT_ENTERPRISE
        } else if name.contains('/') {
            principal_names::NT_SRV_INST
        } else {
            principal_names::NT_PRINCIPAL
        };

        let name = if name_type == principal_names::NT_ENTERPRISE {
            PrincipalName {
                name_type,
                name_string: vec![name.to_string()],
            }
        } else {
            new_principal_name(name, name_type)
        };

        return Ok(Principal::new(name, realm.to_string()));
    }
}

impl TryFrom<&String> for Principal {
    type Error = Error;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        return Self::try_from(value.as_str());
    }
}

impl TryFrom<String> for Principal {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        return Self::try_from(&value);
    }
}

pub fn is_tgs_name(name: &PrincipalName) -> bool {
    return name.name_string.len() == 2 && name.name_string[0] == TGS_NAME;
}

pub fn new_nt_principal(name: &str) -> PrincipalName {
    return new_principal_name(name, principal_names::NT_PRINCIPAL);
}

pub fn new_nt_srv_inst(service: &str) -> PrincipalName {
    return new_principal_name(service, principal_names::NT_SRV_INST);
}

pub fn new_nt_enterprise(name: &str, realm: &str) -> PrincipalName {
    return PrincipalName {
        name_type: principal_names::NT_ENTERPRISE,
        name_string: vec![format!("{}@{}", name, realm)],
    };
}

pub fn new_principal_name(name: &str, name_type: i32) -> PrincipalName {
    return PrincipalName {
        name_type: name_type,
        name_string: spn_to_service_parts(name),
    };
}

pub fn spn_to_service_parts(spn: &str) -> Vec<String> {
    spn.split("/").map(|s| s.to_string()).collect()
}
