use kerberos_asn1::KrbError;
use kerberos_constants::error_codes;
use std::fmt;
use std::io;
use std::result;

pub type Result<T> = result::Result<T, Error>;

/// Coarse classification of the errors, used by the exchanges to decide
/// whether they can recover locally or must give up.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorClass {
    /// The same request must be resent over a reliable transport.
    TransportRetryable,

    /// The exchange can continue with another round-trip.
    ProtocolRetryable,

    /// A preauthentication mechanism failed but another may succeed.
    MechanismRetryable,

    /// The reply failed integrity or consistency checks, or the KDC
    /// refused the request.
    FatalProtocol,

    /// The exchange cannot proceed with the current configuration.
    FatalConfiguration,

    /// The user cancelled an interactive question.
    CallerInterrupt,
}

#[derive(Debug)]
pub enum Error {
    String(String),
    KrbError(KrbError),

    /// Errors due to IO, such as failures in network or file operations.
    IOError(String, io::Error),

    /// Errors related to handling of raw data, such as parsing, encoding,
    /// etc.
    DataError(String),

    /// Errors returned by the crypto collaborator, for example a
    /// ciphertext which cannot be decrypted with the given key.
    CryptoError(String),

    /// The KDC reply does not match the request.
    Modified(String),

    /// The time reported by the KDC is too far from the local clock.
    Skew(i64),

    /// A loop or hop bound was exceeded.
    Loop(String),

    /// Missing or unusable configuration (enctypes, armor, codecs...).
    Config(String),

    /// The caller refused to answer a question.
    Interrupted,

    /// A preauthentication mechanism failed.
    Preauth { padata_type: i32, error: Box<Error> },

    /// Error with the principal it refers to.
    Principal(String, Box<Error>),
}

impl Error {
    pub fn is_not_found_error(&self) -> bool {
        if let Error::IOError(_, ref io_err) = self {
            return io_err.kind() == io::ErrorKind::NotFound;
        }
        return false;
    }

    pub fn is_data_error(&self) -> bool {
        if let Error::DataError(_) = self {
            return true;
        }
        return false;
    }

    /// Protocol error code of the KDC error behind this error, if any.
    pub fn krb_error_code(&self) -> Option<i32> {
        match self {
            Error::KrbError(krb_error) => Some(krb_error.error_code),
            Error::Preauth { error, .. } => error.krb_error_code(),
            Error::Principal(_, error) => error.krb_error_code(),
            _ => None,
        }
    }

    /// Returns the KDC error behind this error, if any.
    pub fn krb_error(&self) -> Option<&KrbError> {
        match self {
            Error::KrbError(krb_error) => Some(krb_error),
            Error::Preauth { error, .. } => error.krb_error(),
            Error::Principal(_, error) => error.krb_error(),
            _ => None,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::KrbError(krb_error) => match krb_error.error_code {
                error_codes::KRB_ERR_RESPONSE_TOO_BIG => {
                    ErrorClass::TransportRetryable
                }
                error_codes::KDC_ERR_PREAUTH_REQUIRED => {
                    ErrorClass::ProtocolRetryable
                }
                error_codes::KDC_ERR_PREAUTH_FAILED => {
                    ErrorClass::MechanismRetryable
                }
                _ => ErrorClass::FatalProtocol,
            },
            Error::Preauth { error, .. } => match error.class() {
                ErrorClass::CallerInterrupt => ErrorClass::CallerInterrupt,
                ErrorClass::FatalConfiguration => {
                    ErrorClass::FatalConfiguration
                }
                _ => ErrorClass::MechanismRetryable,
            },
            Error::Principal(_, error) => error.class(),
            Error::Interrupted => ErrorClass::CallerInterrupt,
            Error::Loop(_) | Error::Config(_) | Error::IOError(_, _) => {
                ErrorClass::FatalConfiguration
            }
            Error::Modified(_)
            | Error::Skew(_)
            | Error::CryptoError(_)
            | Error::DataError(_)
            | Error::String(_) => ErrorClass::FatalProtocol,
        }
    }

    /// Wraps the error with the name of the principal it refers to.
    pub fn for_principal<S: fmt::Display>(self, principal: S) -> Self {
        if let Error::Interrupted = self {
            return self;
        }
        return Error::Principal(principal.to_string(), Box::new(self));
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::String(s) => write!(f, "{}", s),
            Error::DataError(s) => write!(f, "{}", s),
            Error::CryptoError(s) => write!(f, "Crypto error: {}", s),
            Error::KrbError(krb_error) => {
                write!(f, "{}", create_krb_error_msg(&krb_error))
            }
            Error::IOError(desc, io_error) => {
                write!(f, "{}: {}", desc, io_error)
            }
            Error::Modified(s) => {
                write!(f, "KDC reply did not match expectations: {}", s)
            }
            Error::Skew(secs) => write!(
                f,
                "Clock skew too great: KDC time differs by {} seconds",
                secs
            ),
            Error::Loop(s) => write!(f, "Loop detected: {}", s),
            Error::Config(s) => write!(f, "Configuration error: {}", s),
            Error::Interrupted => write!(f, "Operation cancelled by user"),
            Error::Preauth { padata_type, error } => write!(
                f,
                "Preauthentication type {} failed: {}",
                padata_type, error
            ),
            Error::Principal(principal, error) => {
                write!(f, "{} while getting credentials for {}", error, principal)
            }
        }
    }
}

impl From<String> for Error {
    fn from(error: String) -> Self {
        return Self::String(error);
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        return Self::String(error.to_string());
    }
}

impl From<KrbError> for Error {
    fn from(error: KrbError) -> Self {
        return Self::KrbError(error);
    }
}

impl From<(&str, io::Error)> for Error {
    fn from(error: (&str, io::Error)) -> Self {
        return Self::IOError(error.0.into(), error.1);
    }
}

impl From<(String, io::Error)> for Error {
    fn from(error: (String, io::Error)) -> Self {
        return Self::IOError(error.0, error.1);
    }
}

fn create_krb_error_msg(krb_error: &KrbError) -> String {
    let error_string = error_codes::error_code_to_string(krb_error.error_code);
    match &krb_error.e_text {
        Some(e_text) => {
            return format!(
                "Error {}: {} ({})",
                krb_error.error_code, error_string, e_text
            );
        }
        None => {
            return format!("Error {}: {}", krb_error.error_code, error_string);
        }
    }
}
