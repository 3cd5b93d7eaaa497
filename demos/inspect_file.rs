use csrview::report::{display_decode_failure, inspect, OutputFormat};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <request.csr>", args[0]);
        std::process::exit(1);
    }

    let bytes = std::fs::read(&args[1])?;
    println!("Inspecting {} ({} bytes)...\n", args[1], bytes.len());

    match inspect(&bytes) {
        Ok(report) => {
            println!("{}", report.display(OutputFormat::Pretty)?);
            println!("\nSignature status: {}", report.verification.name());
        }
        Err(err) => {
            eprint!("{}", display_decode_failure(&err));
            std::process::exit(1);
        }
    }

    Ok(())
}
