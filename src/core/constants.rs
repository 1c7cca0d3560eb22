//! Protocol numbers used by the engine which are not exported by
//! kerberos_constants (RFC 6113, RFC 6806, RFC 8062 and the SAM drafts).

pub mod key_usages {
    pub const KEY_USAGE_TGS_REQ_AUTHEN_CKSUM: i32 = 6;
    pub const KEY_USAGE_TGS_REP_ENC_PART_SUB_KEY: i32 = 9;
    pub const KEY_USAGE_AP_REQ_AUTHEN: i32 = 11;
    pub const KEY_USAGE_PA_SAM_CHALLENGE_CKSUM: i32 = 25;
    pub const KEY_USAGE_PA_SAM_RESPONSE: i32 = 27;
    pub const KEY_USAGE_PA_PKINIT_KX: i32 = 44;
    pub const KEY_USAGE_FAST_REQ_CHKSUM: i32 = 50;
    pub const KEY_USAGE_FAST_ENC: i32 = 51;
    pub const KEY_USAGE_FAST_REP: i32 = 52;
    pub const KEY_USAGE_FAST_FINISHED: i32 = 53;
    pub const KEY_USAGE_ENC_CHALLENGE_CLIENT: i32 = 54;
    pub const KEY_USAGE_ENC_CHALLENGE_KDC: i32 = 55;
    pub const KEY_USAGE_AS_REQ: i32 = 56;
}

pub mod error_codes {
    pub const KDC_ERR_WRONG_REALM: i32 = 68;
    pub const KDC_ERR_PREAUTH_EXPIRED: i32 = 90;
    pub const KDC_ERR_MORE_PREAUTH_DATA_REQUIRED: i32 = 91;
    pub const KDC_ERR_UNKNOWN_CRITICAL_FAST_OPTIONS: i32 = 93;
}

pub mod pa_data_types {
    pub const PA_PKINIT_KX: i32 = 147;
    pub const PA_REQ_ENC_PA_REP: i32 = 149;
}

pub mod kdc_options {
    pub const REQUEST_ANONYMOUS: u32 = 0x0000_8000;
    pub const ENC_TKT_IN_SKEY: u32 = 0x0000_0008;
}

pub mod ticket_flags {
    /// The KDC protected the AS request with the encrypted padata.
    pub const ENC_PA_REP: u32 = 0x0001_0000;
}

pub mod principal_names {
    pub const NT_WELLKNOWN: i32 = 11;
}

/// Well-known names of RFC 8062.
pub mod wellknown {
    pub const WELLKNOWN: &str = "WELLKNOWN";
    pub const ANONYMOUS: &str = "ANONYMOUS";
    pub const ANONYMOUS_REALM: &str = "WELLKNOWN:ANONYMOUS";
}

/// Armor types and FAST option bits of RFC 6113.
pub mod fast {
    pub const ARMOR_TYPE_AP_REQUEST: i32 = 1;

    /// Options with this bits are critical, the KDC must understand them.
    pub const CRITICAL_OPTIONS_MASK: u32 = 0xffff_0000;
    pub const HIDE_CLIENT_NAMES: u32 = 0x4000_0000;
}

/// SAM-2 flags, as defined in draft-ietf-krb-wg-kerberos-sam.
pub mod sam_flags {
    pub const USE_SAD_AS_KEY: u32 = 0x8000_0000;
    pub const SEND_ENCRYPTED_SAD: u32 = 0x4000_0000;
    pub const MUST_PK_ENCRYPT_SAD: u32 = 0x2000_0000;
}

/// Prefix of the server realm of the configuration entries stored in
/// credential caches.
pub const CACHE_CONF_REALM: &str = "X-CACHECONF:";
pub const CACHE_CONF_NAME: &str = "krb5_ccache_conf_data";

pub const CONF_PA_TYPE: &str = "pa_type";
pub const CONF_FAST_AVAIL: &str = "fast_avail";
pub const CONF_PA_CONFIG_DATA: &str = "pa_config_data";
