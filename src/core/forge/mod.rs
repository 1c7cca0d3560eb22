//! This module provide functionalities to create/parse kerberos structs

mod kdc_req;
pub use kdc_req::KdcReqBuilder;

mod pa_data;
pub use pa_data::{
    new_ap_req, new_pa_data_ap_req, new_pa_data_encrypted_timestamp,
    new_pa_data_pac_request, new_req_body_checksum,
};

mod build_req;
pub use build_req::{build_tgs_req, TgsReqParams, TgsRequest};

mod decrypters;
pub use decrypters::{decrypt_as_rep_enc_part, decrypt_tgs_rep_enc_part};
