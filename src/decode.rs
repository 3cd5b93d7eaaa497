//! Turning an uploaded buffer into a [`DecodedCsr`].
//!
//! Decoding tries an ordered list of strategies. PEM comes first; when the buffer holds no
//! PEM envelope at all, the whole buffer is read as raw DER. A strategy either does not
//! apply, decodes the request, or fails with a reason, and the first one that applies
//! decides the outcome.

use crate::error::DecodeError;
use crate::types::{DecodedCsr, ParseOutcome, SourceEncoding};
use der_parser::asn1_rs::{Any, FromDer};
use log::debug;
use std::io::Cursor;
use x509_parser::error::PEMError;
use x509_parser::pem::Pem;
use x509_parser::prelude::X509CertificationRequest;

/// PEM labels accepted for a PKCS#10 request. The second is the older Netscape form.
pub const PEM_LABELS: &[&str] = &["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Limits applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest ASN.1 nesting accepted, counting the outer SEQUENCE as level 1.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    Pem,
    Der,
}

/// Order in which strategies are attempted.
pub const STRATEGIES: &[DecodeStrategy] = &[DecodeStrategy::Pem, DecodeStrategy::Der];

impl DecodeStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            DecodeStrategy::Pem => "PEM",
            DecodeStrategy::Der => "DER",
        }
    }

    pub fn attempt(&self, bytes: &[u8], options: &ParseOptions) -> Attempt {
        match self {
            DecodeStrategy::Pem => attempt_pem(bytes, options),
            DecodeStrategy::Der => match decode_der(bytes, SourceEncoding::Der, options) {
                Ok(csr) => Attempt::Decoded(csr),
                Err(err) => Attempt::Failed(err),
            },
        }
    }
}

/// What a single strategy made of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    NotApplicable(DecodeError),
    Decoded(DecodedCsr),
    Failed(DecodeError),
}

/// Decodes `bytes` with default options.
pub fn parse(bytes: &[u8]) -> ParseOutcome {
    parse_with(bytes, &ParseOptions::default())
}

pub fn parse_with(bytes: &[u8], options: &ParseOptions) -> ParseOutcome {
    let mut last_error = DecodeError::Der("empty input".to_string());

    for strategy in STRATEGIES {
        match strategy.attempt(bytes, options) {
            Attempt::Decoded(csr) => {
                debug!("decoded certification request as {}", strategy.name());
                return ParseOutcome::Success(csr);
            }
            Attempt::Failed(err) => {
                debug!("{} decoding failed: {}", strategy.name(), err);
                return ParseOutcome::DecodeError(err);
            }
            Attempt::NotApplicable(err) => {
                debug!("{} decoding not applicable: {}", strategy.name(), err);
                last_error = err;
            }
        }
    }

    ParseOutcome::DecodeError(last_error)
}

fn attempt_pem(bytes: &[u8], options: &ParseOptions) -> Attempt {
    // Stray non-UTF-8 bytes around the envelope are replaced, not fatal.
    let text = String::from_utf8_lossy(bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let pem = match Pem::read(Cursor::new(text.as_bytes())) {
        Ok((pem, _)) => pem,
        Err(err @ PEMError::MissingHeader) => {
            return Attempt::NotApplicable(DecodeError::Pem(err.to_string()))
        }
        Err(err) => return Attempt::Failed(DecodeError::Pem(err.to_string())),
    };

    if !PEM_LABELS.contains(&pem.label.as_str()) {
        return Attempt::Failed(DecodeError::UnexpectedPemLabel(pem.label));
    }

    match decode_der(&pem.contents, SourceEncoding::Pem, options) {
        Ok(csr) => Attempt::Decoded(csr),
        Err(err) => Attempt::Failed(err),
    }
}

/// Decodes one DER-encoded `CertificationRequest` occupying all of `der`.
pub fn decode_der(
    der: &[u8],
    encoding: SourceEncoding,
    options: &ParseOptions,
) -> Result<DecodedCsr, DecodeError> {
    let trailing = check_nesting(der, options.max_depth)?;
    if trailing > 0 {
        return Err(DecodeError::TrailingData(trailing));
    }

    let (rem, req) = X509CertificationRequest::from_der(der)?;
    if !rem.is_empty() {
        return Err(DecodeError::TrailingData(rem.len()));
    }

    Ok(DecodedCsr::from_x509(&req, der, encoding))
}

/// Walks every constructed element of the first DER object in `input` and fails once the
/// nesting goes past `max_depth`. Returns the number of bytes left after that object.
///
/// The walk uses an explicit stack so hostile input cannot exhaust the call stack.
fn check_nesting(input: &[u8], max_depth: usize) -> Result<usize, DecodeError> {
    let (rem, top) = Any::from_der(input)?;

    let mut stack = vec![(top, 1usize)];
    while let Some((any, depth)) = stack.pop() {
        if depth > max_depth {
            return Err(DecodeError::NestingTooDeep(max_depth));
        }
        if !any.header.is_constructed() {
            continue;
        }
        let mut data = any.data;
        while !data.is_empty() {
            let (rest, child) = Any::from_der(data)?;
            stack.push((child, depth + 1));
            data = rest;
        }
    }

    Ok(rem.len())
}
