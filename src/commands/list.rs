use crate::utils;
use krbcreds::core::constants::CACHE_CONF_REALM;
use krbcreds::core::stringifier::credential_to_string;
use krbcreds::core::vault::load_file_credentials;
use krbcreds::core::{CredFormat, Credentials};
use krbcreds::Result;

pub fn list(
    filepath: Option<String>,
    only_tgts: bool,
    srealm: Option<String>,
) -> Result<()> {
    let filepath = match filepath {
        Some(filepath) => filepath,
        None => utils::get_env_ticket_file()
            .ok_or("Specify file or set KRB5CCNAME")?,
    };

    let (creds, cred_format) = load_file_credentials(&filepath)?;
    list_creds(creds, cred_format, &filepath, only_tgts, srealm);
    return Ok(());
}

fn list_creds(
    creds: Credentials,
    cred_format: CredFormat,
    filepath: &str,
    only_tgts: bool,
    srealm: Option<String>,
) {
    println!("{} {}", cred_format, filepath);

    let creds = creds.filter(|c| {
        if c.server.realm == CACHE_CONF_REALM {
            return false;
        }
        if only_tgts && !c.is_tgt() {
            return false;
        }
        if let Some(srealm) = &srealm {
            return c.server.realm.eq_ignore_ascii_case(srealm);
        }
        return true;
    });

    for (i, cred) in creds.iter().enumerate() {
        println!("\n[{}]", i);
        println!("{}", credential_to_string(cred, 2));
    }
}
