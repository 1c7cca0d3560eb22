//! FAST messages of RFC 6113. They are plain structs since they are encoded
//! by the [ExtensionCodec](crate::core::ExtensionCodec).

use kerberos_asn1::{
    Checksum, EncryptedData, EncryptionKey, KdcReqBody, KerberosTime, PaData,
    PrincipalName,
};

/// KrbFastArmor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KrbFastArmor {
    pub armor_type: i32,
    pub armor_value: Vec<u8>,
}

/// KrbFastArmoredReq, the content of the PA-FX-FAST padata of a request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KrbFastArmoredReq {
    pub armor: Option<KrbFastArmor>,

    /// Checksum of the outer request body, or the full outer request in
    /// TGS requests, with the armor key.
    pub req_checksum: Checksum,

    /// Encrypted KrbFastReq
    pub enc_fast_req: EncryptedData,
}

/// KrbFastReq, the inner request protected by the armor key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KrbFastReq {
    pub fast_options: u32,
    pub padata: Vec<PaData>,
    pub req_body: KdcReqBody,
}

/// KrbFastArmoredRep, the content of the PA-FX-FAST padata of a reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KrbFastArmoredRep {
    /// Encrypted KrbFastResponse
    pub enc_fast_rep: EncryptedData,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct KrbFastResponse {
    pub padata: Vec<PaData>,
    pub strengthen_key: Option<EncryptionKey>,
    pub finished: Option<KrbFastFinished>,
    pub nonce: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct KrbFastFinished {
    pub timestamp: KerberosTime,
    pub usec: i32,
    pub crealm: String,
    pub cname: PrincipalName,

    /// Checksum of the ticket of the reply with the armor key.
    pub ticket_checksum: Checksum,
}
