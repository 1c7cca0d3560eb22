//! Drivers which run the exchanges until the end, delivering their
//! requests through a [KdcTransport].

use super::clock::Clock;
use super::config::{InitCredsOptions, TktCredsOptions};
use super::env::{Env, Step};
use super::init_creds::InitCredsContext;
use super::preauth::{Answers, Questions};
use super::tkt_creds::TktCredsContext;
use super::vault::MatchFlags;
use super::{Credential, Principal};
use crate::communication::KdcTransport;
use crate::error::{Error, Result};
use log::{debug, info, warn};

/// Answers the questions of the exchanges, like the password prompt.
pub trait Responder {
    /// Fills the answers of the questions. Returning
    /// [Error::Interrupted] aborts the exchange.
    fn respond(&mut self, questions: &Questions, answers: &mut Answers)
        -> Result<()>;
}

/// Requests a TGT (or the credential of `options.service`) for the client.
pub fn get_init_creds(
    env: Env,
    client: Principal,
    options: InitCredsOptions,
    transport: &mut dyn KdcTransport,
    responder: Option<&mut dyn Responder>,
) -> Result<Credential> {
    let (cred, _) =
        run_init_creds(env, client, options, transport, responder)?;
    return Ok(cred);
}

fn run_init_creds(
    env: Env,
    client: Principal,
    options: InitCredsOptions,
    transport: &mut dyn KdcTransport,
    mut responder: Option<&mut dyn Responder>,
) -> Result<(Credential, Clock)> {
    info!("Request TGT for {}", client);
    let mut ctx = InitCredsContext::new(env, client, options)?;
    let mut input = Vec::new();

    loop {
        match ctx.step(&input)? {
            Step::Request(request) => {
                if request.tcp_only {
                    debug!("Resend request to {} over TCP", request.realm);
                }
                input = transport.send_recv(&request)?;
            }
            Step::Questions(questions) => {
                let responder = responder.as_mut().ok_or_else(|| {
                    Error::String(format!(
                        "Unable to answer '{}' without a responder",
                        question_names(&questions)
                    ))
                })?;
                responder.respond(&questions, ctx.answers_mut())?;
                input.clear();
            }
            Step::Done => break,
        }
    }

    let clock = ctx.clock();
    let cred = ctx
        .take_credential()
        .ok_or("AS exchange finished without credential")?;
    return Ok((cred, clock));
}

/// Requests the credential of `server` for the client, by using the TGT
/// stored in the vault of the environment.
pub fn get_creds(
    env: Env,
    client: Principal,
    server: Principal,
    options: TktCredsOptions,
    transport: &mut dyn KdcTransport,
) -> Result<Credential> {
    let ctx = TktCredsContext::new(env, client, server, options);
    return run_tkt_creds(ctx, transport);
}

fn run_tkt_creds(
    mut ctx: TktCredsContext,
    transport: &mut dyn KdcTransport,
) -> Result<Credential> {
    let mut input = Vec::new();
    loop {
        match ctx.step(&input)? {
            Step::Request(request) => {
                input = transport.send_recv(&request)?;
            }
            Step::Questions(questions) => {
                return Err(Error::String(format!(
                    "Unexpected questions in TGS exchange: {}",
                    question_names(&questions)
                )));
            }
            Step::Done => break,
        }
    }

    return Ok(ctx
        .take_credential()
        .ok_or("TGS exchange finished without credential")?);
}

/// Gets the TGT of the client from the vault, or requests it if it is
/// not there or has expired.
pub fn get_user_tgt(
    env: Env,
    client: Principal,
    options: InitCredsOptions,
    transport: &mut dyn KdcTransport,
    responder: Option<&mut dyn Responder>,
) -> Result<(Credential, Clock)> {
    if let Some(tgt) = get_user_tgt_from_vault(&env, &client)? {
        return Ok((tgt, env.clock));
    }

    return run_init_creds(env, client, options, transport, responder);
}

fn get_user_tgt_from_vault(
    env: &Env,
    client: &Principal,
) -> Result<Option<Credential>> {
    let vault = match env.vault {
        Some(vault) => vault,
        None => return Ok(None),
    };

    let tgs = Principal::tgs(&client.realm, &client.realm);
    let flags = MatchFlags::new().valid_at(env.clock.now());
    let tgt = vault.lookup(client, &tgs, &flags)?;
    match &tgt {
        Some(_) => debug!("TGT for {} found in {}", client, vault.id()),
        None => warn!("No TGT for {} in {}", client, vault.id()),
    }
    return Ok(tgt);
}

/// Requests the credential of `server`. A TGT is requested first when
/// the vault does not have a valid one.
pub fn get_service_creds(
    env: Env,
    client: Principal,
    server: Principal,
    init_options: InitCredsOptions,
    options: TktCredsOptions,
    transport: &mut dyn KdcTransport,
    responder: Option<&mut dyn Responder>,
) -> Result<Credential> {
    let (tgt, clock) =
        get_user_tgt(env, client.clone(), init_options, transport, responder)?;
    let env = env.clock(clock);

    info!("Request {} credential for {}", server, client);
    let ctx = TktCredsContext::new(env, client, server, options).tgt(tgt);
    return run_tkt_creds(ctx, transport);
}

fn question_names(questions: &Questions) -> String {
    return questions
        .iter()
        .map(|q| q.name.as_str())
        .collect::<Vec<&str>>()
        .join(", ");
}
