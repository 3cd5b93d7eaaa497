use crate::decode::{parse_with, ParseOptions};
use crate::error::{DecodeError, Error, Result};
use crate::extensions::{extract_alt_names, requested_extensions, AltNames, ExtensionSummary};
use crate::names::{
    attribute_label, attribute_value_string, project_subject_name, subject_string,
    DistinguishedNameProjection,
};
use crate::types::DecodedCsr;
use crate::verify::{
    algorithm_name, key_algorithm_name, key_size_bits, verify_signature,
    SignatureVerificationOutcome,
};
use colored::Colorize;

/// Notice shown when an upload cannot be decoded. No request data accompanies it.
pub const DECODE_FAILURE_NOTICE: &str =
    "The uploaded file is not a valid certificate signing request.";

/// Everything shown for one decoded request.
#[derive(Debug, Clone)]
pub struct CsrReport {
    pub csr: DecodedCsr,
    pub subject: String,
    pub subject_name: DistinguishedNameProjection,
    pub signature_algorithm: String,
    pub public_key_algorithm: String,
    pub public_key_size: Option<usize>,
    pub verification: SignatureVerificationOutcome,
    pub alt_names: AltNames,
    pub extensions: Vec<ExtensionSummary>,
}

impl CsrReport {
    /// Runs verification, name projection and SAN extraction. None of them can fail.
    pub fn from_csr(csr: DecodedCsr) -> Self {
        let verification = verify_signature(&csr);
        let subject_name = project_subject_name(&csr);
        let alt_names = extract_alt_names(&csr);

        CsrReport {
            subject: subject_string(&csr),
            signature_algorithm: algorithm_name(&csr.signature_algorithm().oid),
            public_key_algorithm: key_algorithm_name(csr.public_key()),
            public_key_size: key_size_bits(csr.public_key()),
            extensions: requested_extensions(&csr),
            csr,
            subject_name,
            verification,
            alt_names,
        }
    }

    pub fn display(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(display_pretty(self)),
            #[cfg(feature = "json")]
            OutputFormat::Json => display_json(self),
        }
    }
}

/// Decodes `bytes` and builds the full report.
pub fn inspect(bytes: &[u8]) -> std::result::Result<CsrReport, DecodeError> {
    inspect_with(bytes, &ParseOptions::default())
}

pub fn inspect_with(
    bytes: &[u8],
    options: &ParseOptions,
) -> std::result::Result<CsrReport, DecodeError> {
    let csr = parse_with(bytes, options).into_result()?;
    Ok(CsrReport::from_csr(csr))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    #[cfg(feature = "json")]
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(OutputFormat::Pretty),
            #[cfg(feature = "json")]
            "json" => Ok(OutputFormat::Json),
            _ => Err(Error::InvalidInput(format!("Invalid format: {}", s))),
        }
    }
}

fn display_pretty(report: &CsrReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n{}\n", "Certificate Signing Request".bold().cyan()));
    output.push_str(&format!("{}\n", "=".repeat(80)));

    output.push_str(&format!(
        "  {}: {}\n",
        "Subject".bold().yellow(),
        report.subject
    ));
    output.push_str(&format!(
        "  {}: {}\n",
        "Encoding".bold().yellow(),
        report.csr.encoding().name().dimmed()
    ));

    let status = if report.verification.is_valid() {
        report.verification.description().green()
    } else {
        report.verification.description().red()
    };
    output.push_str(&format!(
        "  {}: {} ({})\n",
        "Signature".bold().yellow(),
        status,
        report.verification.name()
    ));
    output.push_str(&format!(
        "  {}: {}\n",
        "Signature Algorithm".bold().yellow(),
        report.signature_algorithm.dimmed()
    ));

    let pk_info = match report.public_key_size {
        Some(size) => format!("{} ({} bits)", report.public_key_algorithm, size),
        None => report.public_key_algorithm.clone(),
    };
    output.push_str(&format!(
        "  {}: {}\n",
        "Public Key".bold().yellow(),
        pk_info.dimmed()
    ));

    output.push_str(&format!("\n{}\n", "Subject Name".bold()));
    output.push_str(&format!("{}\n", "-".repeat(80)));
    for (idx, rdn) in report.csr.subject().rdns.iter().enumerate() {
        output.push_str(&format!("  {}\n", format!("[{}]", idx).dimmed()));
        for attr in &rdn.attributes {
            let (label, description) = match attribute_label(&attr.oid) {
                Some((short, description)) => (short.to_string(), description.to_string()),
                None => (attr.oid.to_id_string(), "Unknown attribute".to_string()),
            };
            output.push_str(&format!(
                "    {} {}: {}\n",
                label.bold().yellow(),
                format!("({})", description).dimmed(),
                attribute_value_string(attr)
            ));
        }
    }

    output.push_str(&format!("\n{}\n", "Subject Alternative Names".bold()));
    output.push_str(&format!("{}\n", "-".repeat(80)));
    match &report.alt_names {
        AltNames::NotRequested => {
            output.push_str(&format!("  {}\n", "None requested".dimmed()));
        }
        AltNames::Present(names) if names.is_empty() => {
            output.push_str(&format!("  {}\n", "Empty".dimmed()));
        }
        AltNames::Present(names) => {
            for name in names {
                output.push_str(&format!("    - {}\n", name.to_string().cyan()));
            }
        }
        AltNames::Unavailable(reason) => {
            output.push_str(&format!(
                "  {}: {}\n",
                "Unavailable".red(),
                reason.dimmed()
            ));
        }
    }

    if !report.extensions.is_empty() {
        output.push_str(&format!("\n{}\n", "Requested Extensions".bold()));
        output.push_str(&format!("{}\n", "-".repeat(80)));
        for ext in &report.extensions {
            let name = ext.name.unwrap_or("unknown");
            let critical = if ext.critical { " critical" } else { "" };
            output.push_str(&format!(
                "    - {} {}{}\n",
                name.cyan(),
                format!("({})", ext.oid).dimmed(),
                critical.red()
            ));
        }
    }

    output.push_str(&format!("{}\n", "=".repeat(80)));
    output
}

/// Text shown in place of a report when decoding fails.
pub fn display_decode_failure(err: &DecodeError) -> String {
    format!(
        "{}\n  {}: {}\n",
        DECODE_FAILURE_NOTICE.red().bold(),
        "Reason".bold().yellow(),
        err
    )
}

#[cfg(feature = "json")]
fn display_json(report: &CsrReport) -> Result<String> {
    use serde::Serialize;

    #[derive(Serialize)]
    struct JsonAttribute {
        label: String,
        value: String,
    }

    #[derive(Serialize)]
    struct JsonExtension {
        oid: String,
        name: Option<&'static str>,
        critical: bool,
    }

    #[derive(Serialize)]
    struct JsonReport {
        encoding: &'static str,
        subject: String,
        subject_name: Vec<Vec<JsonAttribute>>,
        signature_algorithm: String,
        signature_algorithm_oid: String,
        public_key_algorithm: String,
        public_key_size: Option<usize>,
        signature_status: &'static str,
        signature_valid: bool,
        subject_alt_names_status: &'static str,
        subject_alt_names: Vec<String>,
        subject_alt_names_error: Option<String>,
        requested_extensions: Vec<JsonExtension>,
    }

    let (alt_status, alt_error) = match &report.alt_names {
        AltNames::NotRequested => ("not_requested", None),
        AltNames::Present(_) => ("present", None),
        AltNames::Unavailable(reason) => ("unavailable", Some(reason.clone())),
    };

    let json_report = JsonReport {
        encoding: report.csr.encoding().name(),
        subject: report.subject.clone(),
        subject_name: report
            .subject_name
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|(label, value)| JsonAttribute {
                        label: label.to_string(),
                        value: value.to_string(),
                    })
                    .collect()
            })
            .collect(),
        signature_algorithm: report.signature_algorithm.clone(),
        signature_algorithm_oid: report.csr.signature_algorithm().oid.to_id_string(),
        public_key_algorithm: report.public_key_algorithm.clone(),
        public_key_size: report.public_key_size,
        signature_status: report.verification.name(),
        signature_valid: report.verification.is_valid(),
        subject_alt_names_status: alt_status,
        subject_alt_names: report.alt_names.names().iter().map(|n| n.to_string()).collect(),
        subject_alt_names_error: alt_error,
        requested_extensions: report
            .extensions
            .iter()
            .map(|ext| JsonExtension {
                oid: ext.oid.clone(),
                name: ext.name,
                critical: ext.critical,
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&json_report)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    static WIKIPEDIA_PEM: &[u8] = include_bytes!("../tests/data/wikipedia.csr");
    static SAN_DER: &[u8] = include_bytes!("../tests/data/rsa_sha256_san.der");
    static MALFORMED_SAN_PEM: &[u8] = include_bytes!("../tests/data/malformed_san.csr");
    static PSS_PEM: &[u8] = include_bytes!("../tests/data/rsa_pss.csr");

    #[test]
    fn test_inspect_wikipedia() {
        let report = inspect(WIKIPEDIA_PEM).unwrap();

        assert_eq!(report.signature_algorithm, "MD5WITHRSA");
        assert_eq!(report.verification, SignatureVerificationOutcome::Valid);
        assert_eq!(report.subject_name.groups[0].get("C"), Some("EN"));
        assert!(report.alt_names.is_empty());
        assert!(report.extensions.is_empty());
        assert_eq!(report.public_key_size, Some(1024));
    }

    #[test]
    fn test_inspect_plain_text_fails() {
        assert!(inspect(b"hello, world").is_err());
    }

    #[test]
    fn test_invalid_signature_still_reports_contents() {
        let mut tampered = SAN_DER.to_vec();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x80;

        let report = inspect(&tampered).unwrap();
        assert_eq!(
            report.verification,
            SignatureVerificationOutcome::InvalidSignature
        );
        assert_eq!(report.alt_names.len(), 5);
        assert_eq!(report.subject_name.find("CN"), Some("www.example.com"));
    }

    #[test]
    fn test_unknown_algorithm_still_reports_contents() {
        let report = inspect(PSS_PEM).unwrap();
        assert_eq!(
            report.verification,
            SignatureVerificationOutcome::UnknownAlgorithm
        );
        assert_eq!(report.signature_algorithm, "RSASSA-PSS");
        assert!(!report.subject.is_empty());
    }

    #[test]
    fn test_pretty_output() {
        let report = inspect(SAN_DER).unwrap();
        let text = report.display(OutputFormat::Pretty).unwrap();
        assert!(text.contains("SHA256WITHRSA"));
        assert!(text.contains("www.example.com"));
        assert!(text.contains("IP:192.0.2.10"));
        assert!(text.contains("subjectAltName"));
    }

    #[test]
    fn test_pretty_output_unavailable_sans() {
        let report = inspect(MALFORMED_SAN_PEM).unwrap();
        let text = report.display(OutputFormat::Pretty).unwrap();
        assert!(text.contains("Unavailable"));
    }

    #[test]
    fn test_decode_failure_notice() {
        let text = display_decode_failure(&DecodeError::TrailingData(4));
        assert!(text.contains(DECODE_FAILURE_NOTICE));
        assert!(text.contains("4 trailing byte(s)"));
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("pretty".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_output() {
        let report = inspect(MALFORMED_SAN_PEM).unwrap();
        let json = report.display(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["signature_status"], "VALID");
        assert_eq!(value["signature_algorithm"], "SHA256WITHECDSA");
        assert_eq!(value["subject_alt_names_status"], "unavailable");
        assert!(value["subject_alt_names_error"].is_string());
        assert_eq!(value["subject_name"][0][0]["label"], "CN");
    }
}
