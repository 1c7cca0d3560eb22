pub mod ask;
pub mod list;
mod validators;

use clap::{App, AppSettings, ArgMatches};

pub fn args() -> App<'static, 'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .setting(AppSettings::SubcommandRequired)
        .subcommand(ask::command())
        .subcommand(list::command())
}

pub enum Arguments {
    Ask(ask::Arguments),
    List(list::Arguments),
}

pub struct ArgumentsParser {}

impl ArgumentsParser {
    pub fn parse<'a>(matches: &'a ArgMatches) -> Arguments {
        match matches.subcommand() {
            (ask::COMMAND_NAME, Some(matches)) => {
                return Arguments::Ask(ask::ArgumentsParser::parse(matches));
            }
            (list::COMMAND_NAME, Some(matches)) => {
                return Arguments::List(list::ArgumentsParser::parse(matches));
            }
            _ => unreachable!("Unknown command"),
        }
    }
}
