use krbcreds::core::CredFormat;
use std::env;

/// File to store the credentials: the given one, the one in KRB5CCNAME,
/// or <username>.<format>.
pub fn get_ticket_file(
    args_file: Option<String>,
    username: &str,
    cred_format: &CredFormat,
) -> String {
    if let Some(file) = args_file {
        return file;
    }

    if let Some(file) = get_env_ticket_file() {
        return file;
    }

    return format!("{}.{}", username, cred_format);
}

pub fn get_env_ticket_file() -> Option<String> {
    return env::var("KRB5CCNAME").ok();
}
