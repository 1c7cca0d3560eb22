use crate::core::constants::key_usages::KEY_USAGE_TGS_REP_ENC_PART_SUB_KEY;
use crate::core::crypto::Crypto;
use crate::error::{Error, Result};
use kerberos_asn1::{
    Asn1Object, EncAsRepPart, EncKdcRepPart, EncTgsRepPart, EncryptedData,
    EncryptionKey,
};
use kerberos_constants::key_usages::{
    KEY_USAGE_AS_REP_ENC_PART, KEY_USAGE_TGS_REP_ENC_PART_SESSION_KEY,
};
use log::debug;

/// Decrypts the AS-REP enc-part with the reply key
pub fn decrypt_as_rep_enc_part(
    crypto: &dyn Crypto,
    reply_key: &EncryptionKey,
    enc_part: &EncryptedData,
) -> Result<EncKdcRepPart> {
    let raw = crypto
        .decrypt_data(reply_key, KEY_USAGE_AS_REP_ENC_PART, enc_part)
        .map_err(|error| {
            Error::CryptoError(format!(
                "Error decrypting KDC response AS-REP: {}",
                error
            ))
        })?;

    return parse_enc_kdc_rep_part(&raw);
}

/// Decrypts the TGS-REP enc-part by using the authenticator subkey. Some
/// KDCs ignore the subkey, so the session key of the TGT is tried next.
pub fn decrypt_tgs_rep_enc_part(
    crypto: &dyn Crypto,
    subkey: &EncryptionKey,
    session_key: &EncryptionKey,
    enc_part: &EncryptedData,
) -> Result<EncKdcRepPart> {
    let raw = match crypto.decrypt_data(
        subkey,
        KEY_USAGE_TGS_REP_ENC_PART_SUB_KEY,
        enc_part,
    ) {
        Ok(raw) => raw,
        Err(_) => {
            debug!("TGS-REP not encrypted with subkey, trying session key");
            crypto
                .decrypt_data(
                    session_key,
                    KEY_USAGE_TGS_REP_ENC_PART_SESSION_KEY,
                    enc_part,
                )
                .map_err(|error| {
                    Error::CryptoError(format!(
                        "Error decrypting TGS-REP: {}",
                        error
                    ))
                })?
        }
    };

    return parse_enc_kdc_rep_part(&raw);
}

/// Parses the decrypted part of a reply. KDCs do not agree on the tag of
/// the reply to each exchange, so both are accepted.
fn parse_enc_kdc_rep_part(raw: &[u8]) -> Result<EncKdcRepPart> {
    if let Ok((_, enc_part)) = EncTgsRepPart::parse(raw) {
        return Ok(enc_part.into());
    }

    let (_, enc_part) = EncAsRepPart::parse(raw).map_err(|_| {
        Error::DataError("Error parsing EncKdcRepPart".into())
    })?;
    return Ok(enc_part.into());
}
