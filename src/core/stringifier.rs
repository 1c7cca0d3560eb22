//! Human readable dumps of credentials and padata, for logs and the
//! command line.

use super::constants::pa_data_types as ext_pa_data_types;
use super::Credential;
use chrono::{DateTime, Local, Utc};
use kerberos_asn1::{EncryptionKey, PaData};
use kerberos_constants::etypes;
use kerberos_constants::pa_data_types;
use kerberos_constants::ticket_flags;

const NONE: &str = "-";
const UNKNOWN: &str = "???";

pub fn credential_to_string(cred: &Credential, indent_level: usize) -> String {
    let indentation = indent(indent_level);
    format!(
        "{}client: {}\n\
         {}server: {}\n\
         {}key:\n{}\n\
         {}flags: {}\n\
         {}authtime: {}\n\
         {}starttime: {}\n\
         {}endtime: {}\n\
         {}renew-till: {}\n\
         {}ticket etype: {}{}",
        indentation,
        cred.client,
        indentation,
        cred.server,
        indentation,
        encryption_key_to_string(&cred.key, indent_level + 2),
        indentation,
        kerberos_flags_to_string(cred.flags),
        indentation,
        datetime_to_string(&cred.authtime),
        indentation,
        cred.starttime
            .as_ref()
            .map(datetime_to_string)
            .unwrap_or(NONE.into()),
        indentation,
        datetime_to_string(&cred.endtime),
        indentation,
        cred.renew_till
            .as_ref()
            .map(datetime_to_string)
            .unwrap_or(NONE.into()),
        indentation,
        etype_to_string(cred.ticket.enc_part.etype),
        if cred.is_skey {
            format!("\n{}user-to-user: yes", indentation)
        } else {
            "".into()
        }
    )
}

pub fn padatas_to_string(padatas: &[PaData], indent_level: usize) -> String {
    let indentation = indent(indent_level);
    let mut vs = Vec::new();

    for (i, pd) in padatas.iter().enumerate() {
        vs.push(format!(
            "{}[{}]\n\
             {}",
            indentation,
            i,
            padata_to_string(pd, indent_level)
        ))
    }

    return vs.join("\n");
}

pub fn padata_to_string(padata: &PaData, indent_level: usize) -> String {
    let indentation = indent(indent_level);
    format!(
        "{}padata-type: {}\n\
         {}padata-value: {}",
        indentation,
        padata_type_to_string(padata.padata_type),
        indentation,
        octet_string_to_string(&padata.padata_value)
    )
}

pub fn padata_type_to_string(padata_type: i32) -> String {
    format!("{} -> {}", padata_type, padata_type_name(padata_type))
}

pub fn padata_type_name(padata_type: i32) -> &'static str {
    match padata_type {
        pa_data_types::PA_TGS_REQ => "pa-tgs-req",
        pa_data_types::PA_ENC_TIMESTAMP => "pa-enc-timestamp",
        pa_data_types::PA_PW_SALT => "pa-pw-salt",
        pa_data_types::PA_ETYPE_INFO => "pa-etype-info",
        pa_data_types::PA_SAM_CHALLENGE => "pa-sam-challenge",
        pa_data_types::PA_SAM_RESPONSE => "pa-sam-response",
        pa_data_types::PA_PK_AS_REQ_OLD => "pa-pk-as-req-old",
        pa_data_types::PA_PK_AS_REP_OLD => "pa-pk-as-rep-old",
        pa_data_types::PA_PK_AS_REQ => "pa-pk-as-req",
        pa_data_types::PA_PK_AS_REP => "pa-pk-as-rep",
        pa_data_types::PA_ETYPE_INFO2 => "pa-etype-info2",
        pa_data_types::PA_SAM_REDIRECT => "pa-sam-redirect",
        pa_data_types::PA_SAM_ETYPE_INFO => "pa-sam-etype-info",
        pa_data_types::PA_SAM_CHALLENGE2 => "pa-sam-challenge2",
        pa_data_types::PA_SAM_RESPONSE2 => "pa-sam-response2",
        pa_data_types::PA_PAC_REQUEST => "pa-pac-request",
        pa_data_types::PA_FOR_USER => "pa-for-user",
        pa_data_types::PA_FX_COOKIE => "pa-fx-cookie",
        pa_data_types::PA_FX_FAST => "pa-fx-fast",
        pa_data_types::PA_FX_ERROR => "pa-fx-error",
        pa_data_types::PA_ENCRYPTED_CHALLENGE => "pa-encrypted-challenge",
        ext_pa_data_types::PA_PKINIT_KX => "pa-pkinit-kx",
        ext_pa_data_types::PA_REQ_ENC_PA_REP => "pa-req-enc-pa-rep",
        pa_data_types::PA_SUPPORTED_ENCTYPES => "pa-supported-enctypes",
        pa_data_types::PA_PAC_OPTIONS => "pa-pac-options",
        _ => UNKNOWN,
    }
}

fn indent(level: usize) -> String {
    return " ".repeat(level);
}

pub fn encryption_key_to_string(
    ek: &EncryptionKey,
    indent_level: usize,
) -> String {
    let indentation = indent(indent_level);
    format!(
        "{}keytype: {}\n\
         {}keyvalue: {}",
        indentation,
        etype_to_string(ek.keytype),
        indentation,
        octet_string_to_string(&ek.keyvalue)
    )
}

pub fn octet_string_to_string(os: &[u8]) -> String {
    return os.iter().map(|o| format!("{:02x}", o)).collect();
}

pub fn datetime_to_string(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%m/%d/%Y %H:%M:%S")
        .to_string()
}

pub fn kerberos_flags_to_string(flags: u32) -> String {
    let names = [
        (ticket_flags::FORWARDABLE, "forwardable"),
        (ticket_flags::FORWARDED, "forwarded"),
        (ticket_flags::PROXIABLE, "proxiable"),
        (ticket_flags::PROXY, "proxy"),
        (ticket_flags::MAY_POSTDATE, "may_postdate"),
        (ticket_flags::POSTDATE, "postdate"),
        (ticket_flags::RENEWABLE, "renewable"),
        (ticket_flags::INITIAL, "initial"),
        (ticket_flags::INVALID, "invalid"),
        (ticket_flags::HW_AUTHENT, "hw_authent"),
        (ticket_flags::PRE_AUTHENT, "pre_authent"),
        (ticket_flags::TRANSITED_POLICY_CHECKED, "transited_policy_checked"),
        (ticket_flags::OK_AS_DELEGATE, "ok_as_delegate"),
        (ticket_flags::REQUEST_ANONYMOUS, "anonymous"),
        (ticket_flags::NAME_CANONICALIZE, "name_canonicalize"),
    ];

    let flags_strs: Vec<&str> = names
        .iter()
        .filter(|(flag, _)| flags & flag != 0)
        .map(|(_, name)| *name)
        .collect();

    return format!("{:#010x} -> {}", flags, flags_strs.join(" "));
}

pub fn etype_to_string(etype: i32) -> String {
    format!("{} -> {}", etype, etype_name(etype))
}

fn etype_name(etype: i32) -> &'static str {
    match etype {
        etypes::AES128_CTS_HMAC_SHA1_96 => "aes128-cts-hmac-sha1-96",
        etypes::AES256_CTS_HMAC_SHA1_96 => "aes256-cts-hmac-sha1-96",
        etypes::DES_CBC_CRC => "des-cbc-crc",
        etypes::DES_CBC_MD5 => "des-cbc-md5",
        etypes::NO_ENCRYPTION => "no encryption",
        etypes::RC4_HMAC => "rc4-hmac",
        etypes::RC4_HMAC_EXP => "rc4-hmac-exp",
        etypes::RC4_HMAC_OLD_EXP => "rc4-hmac-old-exp",
        _ => UNKNOWN,
    }
}
