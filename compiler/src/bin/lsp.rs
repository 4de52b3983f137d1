//! Sable Language Server binary
//!
//! Starts the LSP server for IDE integration.
//!
//! # Usage
//!
//! ```bash
//! # Standard I/O mode (for editors)
//! sable-lsp --stdio
//!
//! # Show version
//! sable-lsp --version
//! ```

use std::io;
use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sable::lsp::{IoTransport, LanguageServer};

/// Command line arguments
#[derive(Debug)]
struct Args {
    stdio: bool,
    version: bool,
    help: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();

        Self {
            stdio: args.contains(&"--stdio".to_string()),
            version: args.contains(&"--version".to_string()) || args.contains(&"-V".to_string()),
            help: args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()),
        }
    }
}

fn print_help() {
    eprintln!(
        r#"Sable Language Server

USAGE:
    sable-lsp [OPTIONS]

OPTIONS:
    --stdio         Use stdio for communication (required for editors)
    --version, -V   Print version information
    --help, -h      Print this help message

DESCRIPTION:
    The Sable Language Server provides IDE features through the Language
    Server Protocol (LSP). It communicates with editors via standard
    input/output; trace output goes to standard error (see RUST_LOG).

SUPPORTED FEATURES:
    - Diagnostics on open and change
    - Hover information (types, documentation)
    - Go to definition / implementation
    - Find all references
    - Document highlight
"#
    );
}

fn print_version() {
    eprintln!("sable-lsp {} (Sable Language Server)", sable::VERSION);
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    if !args.stdio {
        eprintln!("Sable Language Server v{}", sable::VERSION);
        eprintln!();
        eprintln!("This server communicates via Language Server Protocol over stdin/stdout.");
        eprintln!();
        eprintln!("Usage: sable-lsp --stdio");
        return ExitCode::FAILURE;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let transport = IoTransport::new(stdin.lock(), stdout.lock());
    let mut server = LanguageServer::new(transport);

    let shutdown_requested = server.run();
    if shutdown_requested {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
