mod args;
mod commands;
mod utils;

use args::{args, Arguments, ArgumentsParser};
use krbcreds::Result;
use log::error;

fn init_log(verbosity: usize) {
    if let Err(err) = stderrlog::new()
        .module("krbcreds")
        .verbosity(verbosity + 1)
        .init()
    {
        eprintln!("Unable to initialize log: {}", err);
    }
}

fn main() {
    let args = ArgumentsParser::parse(&args().get_matches());

    if let Err(error) = main_inner(args) {
        error!("{}", error);
        std::process::exit(1);
    }
}

fn main_inner(args: Arguments) -> Result<()> {
    match args {
        Arguments::Ask(args) => {
            init_log(args.verbosity);
            return commands::ask(
                args.user,
                args.user_key,
                args.anonymous,
                args.service,
                args.etypes,
                args.request_pac,
                args.cache_only,
                args.out_file,
                args.credential_format,
                args.kdcs,
                args.dns_servers,
                args.transport_protocol,
            );
        }
        Arguments::List(args) => {
            init_log(args.verbosity);
            return commands::list(args.in_file, args.only_tgts, args.srealm);
        }
    }
}
