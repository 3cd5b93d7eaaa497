#[cfg(feature = "cli")]
use colored::Colorize;
#[cfg(feature = "cli")]
use csrview::cli::run_cli;

#[cfg(feature = "cli")]
fn main() {
    match run_cli() {
        Ok(status) => std::process::exit(status.code()),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature to be enabled.");
    eprintln!("Build with: cargo build --features cli");
    std::process::exit(1);
}
