//! Structs to handle tickets together with their session key and the rest
//! of the information returned by the KDC.

use super::clock::krb_time_to_utc;
use super::principal::Principal;
use crate::error::Error;
use chrono::{DateTime, Utc};
use kerberos_asn1::{
    Asn1Object, AuthorizationDataEntry, EncKdcRepPart, EncKrbCredPart,
    EncryptedData, EncryptionKey, KrbCred, KrbCredInfo, Ticket,
};
use kerberos_constants::etypes::NO_ENCRYPTION;
use std::convert::TryFrom;
use std::slice::Iter;

/// Ticket with the related client info, like the session key. It is only
/// built once an exchange succeeds, so the ticket and its session key are
/// always set together.
#[derive(Debug, Clone)]
pub struct Credential {
    pub client: Principal,
    pub server: Principal,
    pub key: EncryptionKey,
    pub ticket: Ticket,
    pub flags: u32,
    pub authtime: DateTime<Utc>,
    pub starttime: Option<DateTime<Utc>>,
    pub endtime: DateTime<Utc>,
    pub renew_till: Option<DateTime<Utc>>,
    pub second_ticket: Option<Ticket>,
    pub authorization_data: Option<Vec<AuthorizationDataEntry>>,
    pub is_skey: bool,
}

impl Credential {
    /// Builds a credential from the ticket and the decrypted part of a
    /// KDC reply.
    pub fn from_kdc_rep(
        client: Principal,
        ticket: Ticket,
        enc_part: &EncKdcRepPart,
    ) -> Self {
        return Self {
            client,
            server: Principal::new(
                enc_part.sname.clone(),
                enc_part.srealm.clone(),
            ),
            key: enc_part.key.clone(),
            ticket,
            flags: enc_part.flags.flags,
            authtime: krb_time_to_utc(&enc_part.authtime),
            starttime: enc_part.starttime.as_ref().map(krb_time_to_utc),
            endtime: krb_time_to_utc(&enc_part.endtime),
            renew_till: enc_part.renew_till.as_ref().map(krb_time_to_utc),
            second_ticket: None,
            authorization_data: None,
            is_skey: false,
        };
    }

    pub fn is_tgt(&self) -> bool {
        return self.server.is_tgs();
    }

    /// Realm which the TGT gives access to.
    pub fn tgt_realm(&self) -> Option<&str> {
        return self.server.tgs_realm();
    }

    pub fn has_flags(&self, flags: u32) -> bool {
        return (self.flags & flags) == flags;
    }

    pub fn start(&self) -> DateTime<Utc> {
        return self.starttime.unwrap_or(self.authtime);
    }

    pub fn is_valid_at(&self, time: DateTime<Utc>) -> bool {
        return self.start() <= time && time < self.endtime;
    }

    pub fn etype(&self) -> i32 {
        return self.key.keytype;
    }

    pub fn cred_info(&self) -> KrbCredInfo {
        return KrbCredInfo {
            key: self.key.clone(),
            prealm: Some(self.client.realm.clone()),
            pname: Some(self.client.name.clone()),
            flags: Some(self.flags.into()),
            authtime: Some(self.authtime.into()),
            starttime: self.starttime.map(|t| t.into()),
            endtime: Some(self.endtime.into()),
            renew_till: self.renew_till.map(|t| t.into()),
            srealm: Some(self.server.realm.clone()),
            sname: Some(self.server.name.clone()),
            caddr: None,
        };
    }
}

impl TryFrom<(Ticket, KrbCredInfo)> for Credential {
    type Error = Error;

    fn try_from((ticket, info): (Ticket, KrbCredInfo)) -> Result<Self, Error> {
        let pname = info.pname.ok_or_else(|| {
            Error::DataError("Credential without client name".into())
        })?;
        let sname = info.sname.ok_or_else(|| {
            Error::DataError("Credential without server name".into())
        })?;
        let authtime = info
            .authtime
            .as_ref()
            .or(info.starttime.as_ref())
            .map(krb_time_to_utc)
            .ok_or_else(|| {
                Error::DataError("Credential without authtime".into())
            })?;
        let endtime =
            info.endtime.as_ref().map(krb_time_to_utc).ok_or_else(|| {
                Error::DataError("Credential without endtime".into())
            })?;

        return Ok(Self {
            client: Principal::new(pname, info.prealm.unwrap_or_default()),
            server: Principal::new(sname, info.srealm.unwrap_or_default()),
            key: info.key,
            ticket,
            flags: info.flags.map(|f| f.flags).unwrap_or(0),
            authtime,
            starttime: info.starttime.as_ref().map(krb_time_to_utc),
            endtime,
            renew_till: info.renew_till.as_ref().map(krb_time_to_utc),
            second_ticket: None,
            authorization_data: None,
            is_skey: false,
        });
    }
}

/// Collection of credentials, as stored in a credentials file.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub creds: Vec<Credential>,
}

impl Credentials {
    pub fn new(creds: Vec<Credential>) -> Self {
        return Self { creds };
    }

    pub fn empty() -> Self {
        return Self::new(Vec::new());
    }

    pub fn push(&mut self, cred: Credential) {
        self.creds.push(cred);
    }

    pub fn iter(&self) -> Iter<Credential> {
        return self.creds.iter();
    }

    pub fn len(&self) -> usize {
        return self.creds.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.creds.is_empty();
    }

    pub fn get(&self, index: usize) -> Option<&Credential> {
        return self.creds.get(index);
    }

    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&Credential) -> bool,
    {
        self.iter()
            .filter(|c| predicate(c))
            .cloned()
            .collect::<Vec<Credential>>()
            .into()
    }

    /// Filter credentials for the client.
    pub fn client(&self, client: &Principal) -> Self {
        self.filter(|c| c.client.matches(client))
    }

    /// Filter credentials for the server. Only the name is compared if
    /// `name_only` is set, which allows to look for a TGT without knowing
    /// the realm that issued it.
    pub fn server(&self, server: &Principal, name_only: bool) -> Self {
        self.filter(|c| {
            if name_only {
                return c.server.name_matches(&server.name);
            }
            return c.server.matches(server);
        })
    }

    /// Filter credentials for etype of the session key
    pub fn etype(&self, etype: i32) -> Self {
        self.filter(|c| c.key.keytype == etype)
    }

    /// Filter credentials valid at the given time
    pub fn valid_at(&self, time: DateTime<Utc>) -> Self {
        self.filter(|c| c.is_valid_at(time))
    }

    /// Filter to only returns TGTs.
    pub fn tgt(&self) -> Self {
        self.filter(|c| c.is_tgt())
    }

    /// Replaces the credentials with the same client and server, or
    /// appends the new one.
    pub fn replace(&mut self, cred: Credential) {
        self.creds.retain(|c| {
            !(c.client.matches(&cred.client) && c.server.matches(&cred.server))
        });
        self.creds.push(cred);
    }
}

impl Into<KrbCred> for Credentials {
    fn into(self) -> KrbCred {
        let mut krb_cred = KrbCred::default();
        let mut tickets = Vec::with_capacity(self.creds.len());
        let mut cred_infos = Vec::with_capacity(self.creds.len());

        for cred in self.creds {
            cred_infos.push(cred.cred_info());
            tickets.push(cred.ticket);
        }

        krb_cred.tickets = tickets;
        let mut cred_part = EncKrbCredPart::default();
        cred_part.ticket_info = cred_infos;
        krb_cred.enc_part =
            EncryptedData::new(NO_ENCRYPTION, None, cred_part.build());
        return krb_cred;
    }
}

/// Convert from Kerberos credentials in plain text, the usual way of storing
/// them in machines. In case the credentials are encrypted this will fail.
impl TryFrom<KrbCred> for Credentials {
    type Error = Error;

    fn try_from(krb_cred: KrbCred) -> Result<Self, Error> {
        if krb_cred.enc_part.etype != NO_ENCRYPTION {
            return Err(Error::DataError(format!(
                "Unable to decrypt the credentials"
            )));
        }

        let (_, cred_part) = EncKrbCredPart::parse(&krb_cred.enc_part.cipher)
            .map_err(|_| {
                Error::DataError(format!(
                    "Error parsing credentials: EncKrbCredPart"
                ))
            })?;

        let mut creds = Vec::with_capacity(krb_cred.tickets.len());
        for (ticket, cred_info) in krb_cred
            .tickets
            .into_iter()
            .zip(cred_part.ticket_info.into_iter())
        {
            creds.push(Credential::try_from((ticket, cred_info))?);
        }

        return Ok(Self::new(creds));
    }
}

impl From<Vec<Credential>> for Credentials {
    fn from(v: Vec<Credential>) -> Self {
        return Self::new(v);
    }
}

impl From<Credential> for Credentials {
    fn from(cred: Credential) -> Self {
        return Self::new(vec![cred]);
    }
}
