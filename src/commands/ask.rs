use crate::utils;
use kerberos_crypto::Key;
use krbcreds::communication::{KdcComm, Kdcs, TransportProtocol};
use krbcreds::core::{
    get_creds, get_init_creds, get_service_creds, Answers, Config,
    CredFormat, Env, FileVault, InitCredsOptions, KerberosCrypto, Principal,
    Questions, Responder, Secret, TktCredsOptions, Vault,
};
use krbcreds::{Error, Result};
use log::info;
use std::io::{self, Write};
use std::net::SocketAddr;

/// Asks the answers in the terminal.
struct TerminalResponder {
    client: Principal,
}

impl Responder for TerminalResponder {
    fn respond(
        &mut self,
        questions: &Questions,
        answers: &mut Answers,
    ) -> Result<()> {
        for question in questions.iter() {
            match &question.challenge {
                Some(challenge) => eprint!(
                    "{} for {} ({}): ",
                    question.name, self.client, challenge
                ),
                None => eprint!("{} for {}: ", question.name, self.client),
            }
            io::stderr()
                .flush()
                .map_err(|err| ("Unable to write question", err))?;

            let mut answer = String::new();
            let read = io::stdin()
                .read_line(&mut answer)
                .map_err(|err| ("Unable to read answer", err))?;
            if read == 0 {
                return Err(Error::Interrupted);
            }

            let answer = answer.trim_end_matches(&['\r', '\n'][..]);
            answers.set(&question.name, answer);
        }
        return Ok(());
    }
}

/// Main function to ask a TGT or a service ticket
pub fn ask(
    user: Principal,
    user_key: Option<Key>,
    anonymous: bool,
    service: Option<Principal>,
    etypes: Option<Vec<i32>>,
    request_pac: bool,
    cache_only: bool,
    cred_file: Option<String>,
    cred_format: CredFormat,
    kdcs: Kdcs,
    dns_servers: Vec<SocketAddr>,
    transport_protocol: TransportProtocol,
) -> Result<()> {
    let cred_file =
        utils::get_ticket_file(cred_file, &user.to_string(), &cred_format);
    let vault = FileVault::new(cred_file).default_format(cred_format);
    let crypto = KerberosCrypto::new();
    let config = Config::default();
    let env = Env::new(&crypto, &config).vault(&vault);
    let mut kdccomm =
        KdcComm::new(kdcs, transport_protocol).dns_servers(dns_servers);
    let mut responder = TerminalResponder {
        client: user.clone(),
    };

    let mut init_options = InitCredsOptions::new()
        .anonymous(anonymous)
        .request_pac(request_pac);
    if let Some(key) = &user_key {
        init_options = init_options.secret(Secret::from_key(key));
    }
    if let Some(etypes) = &etypes {
        init_options = init_options.etypes(etypes.clone());
    }

    match service {
        Some(service) => {
            let mut options = TktCredsOptions::new().cache_only(cache_only);
            if let Some(etypes) = etypes {
                options = options.etypes(etypes);
            }
            let cred = if cache_only {
                get_creds(env, user, service, options, &mut kdccomm)?
            } else {
                get_service_creds(
                    env,
                    user,
                    service,
                    init_options,
                    options,
                    &mut kdccomm,
                    Some(&mut responder),
                )?
            };
            info!("Save {} credential in {}", cred.server, vault.id());
        }
        None => {
            if cache_only {
                return Err(Error::Config(
                    "Cache only mode requires a service".into(),
                ));
            }
            let cred = get_init_creds(
                env,
                user,
                init_options,
                &mut kdccomm,
                Some(&mut responder),
            )?;
            info!("Save {} TGT in {}", cred.client, vault.id());
        }
    }

    return Ok(());
}
