use std::io;
use thiserror::Error;
use x509_parser::error::X509Error;
use x509_parser::nom;

/// Why a buffer could not be turned into a certification request.
///
/// Carried by [`ParseOutcome::DecodeError`](crate::ParseOutcome::DecodeError). Payloads are
/// plain strings so the outcome stays owned and comparable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("PEM decoding error: {0}")]
    Pem(String),

    #[error("Unexpected PEM label: {0}")]
    UnexpectedPemLabel(String),

    #[error("DER decoding error: {0}")]
    Der(String),

    #[error("Not a PKCS#10 certification request: {0}")]
    NotCertificationRequest(String),

    #[error("{0} trailing byte(s) after the request")]
    TrailingData(usize),

    #[error("ASN.1 nesting exceeds {0} levels")]
    NestingTooDeep(usize),
}

impl From<nom::Err<X509Error>> for DecodeError {
    fn from(err: nom::Err<X509Error>) -> Self {
        DecodeError::NotCertificationRequest(err.to_string())
    }
}

impl From<nom::Err<der_parser::error::Error>> for DecodeError {
    fn from(err: nom::Err<der_parser::error::Error>) -> Self {
        DecodeError::Der(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid CSR: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
