use super::fast::{
    KrbFastArmoredRep, KrbFastArmoredReq, KrbFastReq, KrbFastResponse,
};
use super::preauth::sam2::{PaEncSamResponseEnc, PaSamChallenge2, PaSamResponse2};
use crate::error::{Error, Result};
use kerberos_asn1::{
    AsRep, Asn1Object, EtypeInfo, EtypeInfo2, KrbError, MethodData, PaData,
    TgsRep,
};
use log::trace;

/// Message received from a KDC.
#[derive(Debug, Clone)]
pub enum Rep {
    AsRep(AsRep),
    TgsRep(TgsRep),
    KrbError(KrbError),
}

impl Rep {
    pub fn name(&self) -> &'static str {
        match self {
            Rep::AsRep(_) => "AS-REP",
            Rep::TgsRep(_) => "TGS-REP",
            Rep::KrbError(_) => "KRB-ERROR",
        }
    }
}

/// Parses the bytes received from the KDC to a known Kerberos response.
pub fn decode_reply(raw: &[u8]) -> Result<Rep> {
    if let Ok((_, krb_error)) = KrbError::parse(raw) {
        return Ok(Rep::KrbError(krb_error));
    }

    if let Ok((_, as_rep)) = AsRep::parse(raw) {
        return Ok(Rep::AsRep(as_rep));
    }

    if let Ok((_, tgs_rep)) = TgsRep::parse(raw) {
        return Ok(Rep::TgsRep(tgs_rep));
    }

    trace!("Unknown KDC response of {} bytes", raw.len());
    return Err(Error::DataError("Error parsing KDC response".into()));
}

/// Method data sent by the KDC in the e-data of an error. Old KDCs send a
/// single PA-DATA instead of a sequence.
pub fn decode_method_data(e_data: &[u8]) -> Result<Vec<PaData>> {
    if let Ok((_, method_data)) = MethodData::parse(e_data) {
        return Ok(method_data);
    }

    let (_, padata) = PaData::parse(e_data).map_err(|_| {
        Error::DataError("Error parsing METHOD-DATA of KRB-ERROR".into())
    })?;
    return Ok(vec![padata]);
}

pub fn encode_method_data(padata: &Vec<PaData>) -> Vec<u8> {
    return padata.build();
}

pub fn find_padata(padata: &[PaData], padata_type: i32) -> Option<&PaData> {
    return padata.iter().find(|p| p.padata_type == padata_type);
}

/// Salt and string to key parameters announced by the KDC for an etype.
#[derive(Debug, Clone, PartialEq)]
pub struct EtypeInfoEntry {
    pub etype: i32,
    pub salt: Option<Vec<u8>>,
    pub s2kparams: Option<Vec<u8>>,
}

pub fn decode_etype_info2(data: &[u8]) -> Result<Vec<EtypeInfoEntry>> {
    let (_, entries) = EtypeInfo2::parse(data).map_err(|_| {
        Error::DataError("Error parsing ETYPE-INFO2".into())
    })?;

    return Ok(entries
        .into_iter()
        .map(|entry| EtypeInfoEntry {
            etype: entry.etype,
            salt: entry.salt.map(|s| s.into_bytes()),
            s2kparams: entry.s2kparams,
        })
        .collect());
}

pub fn decode_etype_info(data: &[u8]) -> Result<Vec<EtypeInfoEntry>> {
    let (_, entries) = EtypeInfo::parse(data).map_err(|_| {
        Error::DataError("Error parsing ETYPE-INFO".into())
    })?;

    return Ok(entries
        .into_iter()
        .map(|entry| EtypeInfoEntry {
            etype: entry.etype,
            salt: entry.salt,
            s2kparams: None,
        })
        .collect());
}

/// Encoder of the messages that have no representation in kerberos_asn1.
/// FAST and SAM-2 are only available when one is provided.
pub trait ExtensionCodec {
    /// Encodes the value of a PA-FX-FAST request padata
    fn encode_fast_armored_req(
        &self,
        req: &KrbFastArmoredReq,
    ) -> Result<Vec<u8>>;

    fn decode_fast_armored_req(&self, raw: &[u8])
        -> Result<KrbFastArmoredReq>;

    fn encode_fast_req(&self, req: &KrbFastReq) -> Result<Vec<u8>>;

    fn decode_fast_req(&self, raw: &[u8]) -> Result<KrbFastReq>;

    /// Decodes the value of a PA-FX-FAST reply padata
    fn decode_fast_armored_rep(&self, raw: &[u8])
        -> Result<KrbFastArmoredRep>;

    fn encode_fast_armored_rep(&self, rep: &KrbFastArmoredRep)
        -> Result<Vec<u8>>;

    fn decode_fast_response(&self, raw: &[u8]) -> Result<KrbFastResponse>;

    fn encode_fast_response(&self, rep: &KrbFastResponse) -> Result<Vec<u8>>;

    fn decode_sam_challenge2(&self, raw: &[u8]) -> Result<PaSamChallenge2>;

    fn encode_sam_response2(&self, rep: &PaSamResponse2) -> Result<Vec<u8>>;

    fn encode_enc_sam_response_enc(
        &self,
        enc: &PaEncSamResponseEnc,
    ) -> Result<Vec<u8>>;
}
