//! csrview - inspect PKCS#10 certificate signing requests
//!
//! This library takes the raw bytes of an uploaded CSR and:
//!
//! - Decodes it from PEM, falling back to raw DER when no PEM envelope is present
//! - Verifies the request's self-signature against its embedded public key
//! - Projects the subject distinguished name into ordered label/value groups
//! - Extracts the requested Subject Alternative Names
//!
//! Each call is independent: no state is shared between parses, so requests can be
//! processed concurrently without synchronization.
//!
//! # Examples
//!
//! ## Decoding and verifying
//!
//! ```no_run
//! use csrview::{extract_alt_names, parse, project_subject_name, verify_signature, ParseOutcome};
//!
//! let bytes = std::fs::read("request.csr").unwrap();
//! match parse(&bytes) {
//!     ParseOutcome::Success(csr) => {
//!         println!("signature: {}", verify_signature(&csr).name());
//!         for group in project_subject_name(&csr).iter() {
//!             for (label, value) in group.iter() {
//!                 println!("{}={}", label, value);
//!             }
//!         }
//!         for name in extract_alt_names(&csr).names() {
//!             println!("{}", name);
//!         }
//!     }
//!     ParseOutcome::DecodeError(err) => eprintln!("not a CSR: {}", err),
//! }
//! ```
//!
//! ## Building a report
//!
//! ```no_run
//! use csrview::report::{inspect, OutputFormat};
//!
//! let bytes = std::fs::read("request.csr").unwrap();
//! let report = inspect(&bytes).unwrap();
//! println!("{}", report.display(OutputFormat::Pretty).unwrap());
//! ```

pub mod decode;
pub mod error;
pub mod extensions;
pub mod names;
pub mod report;
pub mod types;
pub mod verify;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{DecodeError, Error, Result};

pub use decode::{parse, parse_with, ParseOptions};
pub use extensions::{extract_alt_names, AltNames, GeneralName};
pub use names::{project_subject_name, subject_string, DistinguishedNameProjection, RdnGroup};
pub use report::{inspect, CsrReport};
pub use types::{DecodedCsr, ParseOutcome, SourceEncoding};
pub use verify::{verify_signature, SignatureAlgorithm, SignatureVerificationOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    static WIKIPEDIA_PEM: &[u8] = include_bytes!("../tests/data/wikipedia.csr");

    #[test]
    fn test_wikipedia_end_to_end() {
        let csr = match parse(WIKIPEDIA_PEM) {
            ParseOutcome::Success(csr) => csr,
            ParseOutcome::DecodeError(err) => panic!("decode failed: {}", err),
        };

        assert_eq!(
            SignatureAlgorithm::from_oid(&csr.signature_algorithm().oid),
            Some(SignatureAlgorithm::Md5WithRsa)
        );
        assert_eq!(verify_signature(&csr), SignatureVerificationOutcome::Valid);
        assert_eq!(project_subject_name(&csr).groups[0].get("C"), Some("EN"));
        assert!(extract_alt_names(&csr).is_empty());
        assert_eq!(
            subject_string(&csr),
            "C=EN,ST=none,L=none,O=Wikipedia,OU=none,CN=*.wikipedia.org,E=none@none.com"
        );
    }

    #[test]
    fn test_plain_text_is_decode_error() {
        assert!(matches!(
            parse(b"Hello, I am not a certificate signing request."),
            ParseOutcome::DecodeError(_)
        ));
    }

    #[test]
    fn test_types_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DecodedCsr>();
        assert_send_sync::<ParseOutcome>();
        assert_send_sync::<CsrReport>();
    }
}
