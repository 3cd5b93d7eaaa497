#[cfg(feature = "cli")]
use crate::decode::{ParseOptions, DEFAULT_MAX_DEPTH};
#[cfg(feature = "cli")]
use crate::error::{Error, Result};
#[cfg(feature = "cli")]
use crate::report::{display_decode_failure, inspect_with, OutputFormat};
#[cfg(feature = "cli")]
use crate::verify::SignatureVerificationOutcome;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use colored::Colorize;
#[cfg(feature = "cli")]
use std::io::Read;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

/// Default upload ceiling: 1 MiB.
#[cfg(feature = "cli")]
pub const DEFAULT_MAX_BYTES: usize = 1024 * 1024;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "csrview")]
#[command(version, about = "Inspect PKCS#10 certificate signing requests", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        env = "CSRVIEW_MAX_BYTES",
        default_value_t = DEFAULT_MAX_BYTES,
        help = "Reject inputs larger than this many bytes"
    )]
    pub max_bytes: usize,

    #[arg(
        long,
        global = true,
        env = "CSRVIEW_MAX_DEPTH",
        default_value_t = DEFAULT_MAX_DEPTH,
        help = "Maximum ASN.1 nesting depth"
    )]
    pub max_depth: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Decode a CSR and show its subject, signature status and SANs")]
    Inspect {
        #[arg(help = "CSR file in PEM or DER form, or - for stdin")]
        input: PathBuf,

        #[arg(short, long, default_value = "pretty", help = "Output format: pretty, json")]
        format: String,
    },

    #[command(about = "Only check the CSR self-signature")]
    Verify {
        #[arg(help = "CSR file in PEM or DER form, or - for stdin")]
        input: PathBuf,
    },
}

/// Exit status of a completed command.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    DecodeFailed,
    SignatureNotValid,
}

#[cfg(feature = "cli")]
impl Status {
    pub fn code(&self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::DecodeFailed => 1,
            Status::SignatureNotValid => 2,
        }
    }
}

#[cfg(feature = "cli")]
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level),
    )
    .format_timestamp_micros()
    .try_init();
}

/// Reads the whole upload, enforcing the non-empty and size constraints.
#[cfg(feature = "cli")]
pub fn read_input(path: &Path, max_bytes: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    // One byte past the limit is enough to tell that it was exceeded.
    let limit = (max_bytes as u64).saturating_add(1);
    if path.as_os_str() == "-" {
        std::io::stdin().take(limit).read_to_end(&mut bytes)?;
    } else {
        std::fs::File::open(path)?
            .take(limit)
            .read_to_end(&mut bytes)?;
    }

    if bytes.is_empty() {
        return Err(Error::InvalidInput("Input is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(Error::InvalidInput(format!(
            "Input exceeds the {} byte limit",
            max_bytes
        )));
    }

    Ok(bytes)
}

#[cfg(feature = "cli")]
pub fn run_cli() -> Result<Status> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = ParseOptions::default().with_max_depth(cli.max_depth);

    match cli.command {
        Commands::Inspect { input, format } => {
            let output_format: OutputFormat = format.parse()?;
            let bytes = read_input(&input, cli.max_bytes)?;
            log::debug!("read {} bytes from {}", bytes.len(), input.display());

            let report = match inspect_with(&bytes, &options) {
                Ok(report) => report,
                Err(err) => {
                    eprint!("{}", display_decode_failure(&err));
                    return Ok(Status::DecodeFailed);
                }
            };

            println!("{}", report.display(output_format)?);
            Ok(Status::Ok)
        }

        Commands::Verify { input } => {
            let bytes = read_input(&input, cli.max_bytes)?;

            let report = match inspect_with(&bytes, &options) {
                Ok(report) => report,
                Err(err) => {
                    eprint!("{}", display_decode_failure(&err));
                    return Ok(Status::DecodeFailed);
                }
            };

            let outcome = report.verification;
            let label = match outcome {
                SignatureVerificationOutcome::Valid => outcome.name().green().bold(),
                _ => outcome.name().red().bold(),
            };
            println!("{}: {}", label, outcome.description());
            println!("  {}: {}", "Subject".cyan(), report.subject);
            println!("  {}: {}", "Algorithm".cyan(), report.signature_algorithm);

            if outcome.is_valid() {
                Ok(Status::Ok)
            } else {
                Ok(Status::SignatureNotValid)
            }
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("csrview-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_inspect_args() {
        let cli = Cli::try_parse_from([
            "csrview",
            "--max-depth",
            "16",
            "inspect",
            "req.csr",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.max_depth, 16);
        assert!(matches!(cli.command, Commands::Inspect { ref format, .. } if format == "json"));
    }

    #[test]
    fn test_read_input_rejects_empty() {
        let path = temp_file("empty.csr", b"");
        let result = read_input(&path, DEFAULT_MAX_BYTES);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_input_enforces_limit() {
        let path = temp_file("big.csr", &[0x30; 64]);
        assert!(matches!(read_input(&path, 63), Err(Error::InvalidInput(_))));
        assert_eq!(read_input(&path, 64).unwrap().len(), 64);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_input_unbounded_limit() {
        let path = temp_file("unbounded.csr", &[0x30; 16]);
        assert_eq!(read_input(&path, usize::MAX).unwrap().len(), 16);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_input_missing_file() {
        let result = read_input(Path::new("/nonexistent/csrview/input.csr"), DEFAULT_MAX_BYTES);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::DecodeFailed.code(), 1);
        assert_eq!(Status::SignatureNotValid.code(), 2);
    }
}
