use crate::core::clock::{in_clock_skew, krb_time_to_utc, Clock};
use crate::core::{Config, Principal};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use kerberos_asn1::{EncKdcRepPart, Ticket};
use kerberos_constants::kdc_options;
use log::{debug, warn};

/// Whether the reply comes from an AS exchange or a TGS exchange. Only
/// initial replies are used to check or learn the KDC clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplyKind {
    Initial,
    Subsequent,
}

/// Values of the request that the reply must be consistent with.
#[derive(Debug, Clone)]
pub struct ExpectedReply<'a> {
    pub nonce: u32,
    pub client: &'a Principal,
    pub server: &'a Principal,
    pub kdc_options: u32,
    pub till: DateTime<Utc>,
    pub rtime: Option<DateTime<Utc>>,
    pub request_time: DateTime<Utc>,
}

impl<'a> ExpectedReply<'a> {
    fn canonicalize(&self) -> bool {
        return self.kdc_options & kdc_options::CANONICALIZE != 0;
    }
}

/// Checks the decrypted part of a KDC reply against the request.
pub fn verify_reply(
    config: &Config,
    clock: &mut Clock,
    kind: ReplyKind,
    expected: &ExpectedReply,
    reply_client: &Principal,
    ticket: &Ticket,
    enc_part: &EncKdcRepPart,
) -> Result<()> {
    if enc_part.nonce != expected.nonce {
        return Err(Error::Modified(format!(
            "Reply nonce {} does not match request nonce {}",
            enc_part.nonce, expected.nonce
        )));
    }

    let reply_server =
        Principal::new(enc_part.sname.clone(), enc_part.srealm.clone());
    let ticket_server = Principal::new(ticket.sname.clone(), ticket.realm.clone());
    if !ticket_server.matches(&reply_server) {
        return Err(Error::Modified(format!(
            "Ticket server {} differs from reply server {}",
            ticket_server, reply_server
        )));
    }

    if expected.canonicalize() {
        if kind == ReplyKind::Initial
            && expected.server.is_tgs()
            && !reply_server.is_tgs()
        {
            return Err(Error::Modified(format!(
                "Requested a TGT but received a ticket for {}",
                reply_server
            )));
        }
    } else {
        if !reply_client.matches(expected.client) {
            return Err(Error::Modified(format!(
                "Reply client {} differs from requested {}",
                reply_client, expected.client
            )));
        }
        if !reply_server.matches(expected.server) {
            return Err(Error::Modified(format!(
                "Reply server {} differs from requested {}",
                reply_server, expected.server
            )));
        }
    }

    let endtime = krb_time_to_utc(&enc_part.endtime);
    if endtime.timestamp() > expected.till.timestamp() {
        return Err(Error::Modified(format!(
            "Ticket end time {} is later than requested {}",
            endtime, expected.till
        )));
    }

    if let Some(renew_till) = enc_part.renew_till.as_ref().map(krb_time_to_utc)
    {
        let options = expected.kdc_options;
        if options & kdc_options::RENEWABLE != 0 {
            if let Some(rtime) = expected.rtime {
                if renew_till.timestamp() > rtime.timestamp() {
                    return Err(Error::Modified(format!(
                        "Renew till {} is later than requested {}",
                        renew_till, rtime
                    )));
                }
            }
        } else if options & kdc_options::RENEWABLE_OK != 0
            && renew_till.timestamp() > expected.till.timestamp()
        {
            return Err(Error::Modified(format!(
                "Renew till {} is later than requested end time {}",
                renew_till, expected.till
            )));
        }
    }

    if kind == ReplyKind::Initial {
        check_kdc_time(config, clock, expected.request_time, enc_part)?;
    }

    return Ok(());
}

/// Compares the time of the KDC with the local one. With time
/// synchronization the difference is learned instead of rejected.
fn check_kdc_time(
    config: &Config,
    clock: &mut Clock,
    request_time: DateTime<Utc>,
    enc_part: &EncKdcRepPart,
) -> Result<()> {
    let kdc_time = krb_time_to_utc(
        enc_part.starttime.as_ref().unwrap_or(&enc_part.authtime),
    );

    if config.kdc_timesync {
        let offset =
            kdc_time.signed_duration_since(request_time - clock.offset());
        debug!("KDC clock offset of {} seconds", offset.num_seconds());
        clock.set_offset(offset);
        return Ok(());
    }

    if !in_clock_skew(kdc_time, request_time, config.clockskew) {
        let diff = kdc_time.signed_duration_since(request_time).num_seconds();
        warn!("KDC time differs by {} seconds", diff);
        return Err(Error::Skew(diff));
    }

    return Ok(());
}
