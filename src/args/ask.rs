use super::validators;
use clap::{App, Arg, ArgGroup, ArgMatches, SubCommand};
use kerberos_crypto::Key;
use krbcreds::communication::{Kdcs, TransportProtocol};
use krbcreds::core::{CredFormat, Principal};
use std::convert::TryFrom;
use std::net::SocketAddr;

pub const COMMAND_NAME: &str = "ask";

pub fn command() -> App<'static, 'static> {
    SubCommand::with_name(COMMAND_NAME)
        .about("Ask for tickets")
        .arg(
            Arg::with_name("realm")
                .long("realm")
                .alias("domain")
                .short("d")
                .takes_value(true)
                .help("Domain/Realm for request the ticket")
                .required(true),
        )
        .arg(
            Arg::with_name("user")
                .long("user")
                .short("u")
                .takes_value(true)
                .help("Username for request the ticket")
                .validator(validators::is_principal)
                .required_unless("anonymous"),
        )
        .arg(
            Arg::with_name("anonymous")
                .long("anonymous")
                .help("Request an anonymous ticket"),
        )
        .arg(
            Arg::with_name("password")
                .long("password")
                .short("p")
                .takes_value(true)
                .help("Password of user"),
        )
        .arg(
            Arg::with_name("rc4")
                .long("rc4")
                .alias("ntlm")
                .takes_value(true)
                .help("RC4 Kerberos key (NTLM hash of user)")
                .validator(validators::is_rc4_key),
        )
        .arg(
            Arg::with_name("aes")
                .long("aes")
                .takes_value(true)
                .help("AES 128 or 256 Kerberos key of user")
                .validator(validators::is_aes_key),
        )
        .group(
            ArgGroup::with_name("user_key")
                .args(&["password", "rc4", "aes"])
                .multiple(false),
        )
        .arg(
            Arg::with_name("kdc")
                .long("kdc")
                .alias("dc-ip")
                .short("k")
                .value_name("[realm:]ip")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("The address of the KDC of a realm (usually the Domain Controller)")
                .validator(validators::is_kdc_domain_ip),
        )
        .arg(
            Arg::with_name("dns")
                .long("dns")
                .value_name("ip")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("DNS server to resolve the KDC addresses")
                .validator(validators::is_ip),
        )
        .arg(
            Arg::with_name("service")
                .long("service")
                .alias("spn")
                .takes_value(true)
                .value_name("spn")
                .help("SPN of the desired service, like cifs/host[@REALM]"),
        )
        .arg(
            Arg::with_name("etype")
                .long("etype")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Encryption type to request")
                .validator(validators::is_u32),
        )
        .arg(
            Arg::with_name("cred-format")
                .long("cred-format")
                .alias("ticket-format")
                .takes_value(true)
                .possible_values(&["krb", "ccache"])
                .help("Format to save retrieved tickets.")
                .default_value("ccache"),
        )
        .arg(
            Arg::with_name("cred-file")
                .long("cred-file")
                .alias("ticket-file")
                .takes_value(true)
                .value_name("file")
                .help("File to save ticket"),
        )
        .arg(
            Arg::with_name("no-pac")
                .long("no-pac")
                .help("Ask the KDC to not include the PAC in the ticket"),
        )
        .arg(
            Arg::with_name("cache-only")
                .long("cache-only")
                .help("Only look for the service ticket in the credentials file"),
        )
        .arg(
            Arg::with_name("udp")
                .long("udp")
                .help("Use udp as transport protocol"),
        )
        .arg(
            Arg::with_name("verbosity")
                .short("v")
                .multiple(true)
                .help("Increase message verbosity"),
        )
}

#[derive(Debug)]
pub struct Arguments {
    pub user: Principal,
    pub anonymous: bool,
    pub user_key: Option<Key>,
    pub kdcs: Kdcs,
    pub dns_servers: Vec<SocketAddr>,
    pub credential_format: CredFormat,
    pub out_file: Option<String>,
    pub service: Option<Principal>,
    pub etypes: Option<Vec<i32>>,
    pub request_pac: bool,
    pub cache_only: bool,
    pub transport_protocol: TransportProtocol,
    pub verbosity: usize,
}

pub struct ArgumentsParser<'a> {
    matches: &'a ArgMatches<'a>,
}

impl<'a> ArgumentsParser<'a> {
    pub fn parse(matches: &'a ArgMatches) -> Arguments {
        let parser = Self { matches: matches };
        return parser._parse();
    }

    fn _parse(&self) -> Arguments {
        let realm = self.matches.value_of("realm").unwrap();

        return Arguments {
            user: self.parse_user(realm),
            anonymous: self.matches.is_present("anonymous"),
            user_key: self.parse_user_key(),
            kdcs: validators::parse_kdcs(&self.matches, realm),
            dns_servers: validators::parse_dns_servers(&self.matches),
            credential_format: self.parse_ticket_format(),
            out_file: self.parse_credentials_file(),
            service: self.parse_service(),
            etypes: self.parse_etypes(),
            request_pac: !self.matches.is_present("no-pac"),
            cache_only: self.matches.is_present("cache-only"),
            transport_protocol: self.parse_transport_protocol(),
            verbosity: self.matches.occurrences_of("verbosity") as usize,
        };
    }

    fn parse_user(&self, realm: &str) -> Principal {
        let user = match self.matches.value_of("user") {
            Some(user) => Principal::try_from(user).unwrap(),
            None => return Principal::anonymous().with_realm(realm),
        };

        if user.has_realm() {
            return user;
        }
        return user.with_realm(realm);
    }

    fn parse_user_key(&self) -> Option<Key> {
        if let Some(password) = self.matches.value_of("password") {
            return Some(Key::Secret(password.to_string()));
        } else if let Some(ntlm) = self.matches.value_of("rc4") {
            return Some(Key::from_rc4_key_string(ntlm).unwrap());
        } else if let Some(aes_key) = self.matches.value_of("aes") {
            if let Ok(key) = Key::from_aes_128_key_string(aes_key) {
                return Some(key);
            }
            return Some(Key::from_aes_256_key_string(aes_key).unwrap());
        }

        return None;
    }

    fn parse_ticket_format(&self) -> CredFormat {
        let format = self.matches.value_of("cred-format").unwrap();

        if format == "krb" {
            return CredFormat::Krb;
        }

        return CredFormat::Ccache;
    }

    fn parse_credentials_file(&self) -> Option<String> {
        return self.matches.value_of("cred-file").map(|s| s.into());
    }

    fn parse_service(&self) -> Option<Principal> {
        let service = self.matches.value_of("service")?;
        return Principal::try_from(service).ok();
    }

    fn parse_etypes(&self) -> Option<Vec<i32>> {
        let etypes = self.matches.values_of("etype")?;
        return Some(etypes.filter_map(|e| e.parse::<i32>().ok()).collect());
    }

    fn parse_transport_protocol(&self) -> TransportProtocol {
        if self.matches.is_present("udp") {
            return TransportProtocol::UDP;
        }

        return TransportProtocol::TCP;
    }
}
