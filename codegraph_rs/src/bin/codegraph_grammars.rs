//! Grammar-asset fetcher.
//!
//! Usage: `codegraph-grammars [--strict|-s] [--help|-h]`
//!
//! Verifies `dist/services/tree-sitter/` and fetches missing blobs when
//! `CODEGRAPH_GRAMMAR_BASE_URL` is set. Exit code 0 when the core runtime
//! plus at least two language grammars are present; `--strict` exits
//! non-zero on any individual failure as well.

use std::process::ExitCode;

use colored::Colorize;

use codegraph::grammars::{self, AssetStatus};

const HELP: &str = "\
codegraph-grammars - verify and fetch tree-sitter grammar assets

USAGE:
    codegraph-grammars [--strict|-s] [--help|-h]

OPTIONS:
    -s, --strict    Exit non-zero on any fetch or verification failure
    -h, --help      Show this help

ENVIRONMENT:
    CODEGRAPH_GRAMMAR_BASE_URL   HTTPS base URL to fetch missing blobs from
    CODEGRAPH_GRAMMAR_DIR        Asset directory (default: dist/services/tree-sitter)
";

fn main() -> ExitCode {
    let mut strict = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--strict" | "-s" => strict = true,
            "--help" | "-h" => {
                print!("{HELP}");
                return ExitCode::SUCCESS;
            }
            other => {
                eprintln!("unknown argument: {other}");
                print!("{HELP}");
                return ExitCode::FAILURE;
            }
        }
    }

    let dir = std::env::var("CODEGRAPH_GRAMMAR_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| grammars::grammar_dir(std::path::Path::new(".")));

    let mut fetch_errors: Vec<String> = Vec::new();
    if let Ok(base_url) = std::env::var("CODEGRAPH_GRAMMAR_BASE_URL") {
        match grammars::build_client() {
            Ok(client) => {
                let (fetched, errors) = grammars::fetch_missing(&client, &base_url, &dir);
                if fetched > 0 {
                    println!("fetched {fetched} blobs into {}", dir.display());
                }
                fetch_errors = errors;
            }
            Err(e) => fetch_errors.push(e.to_string()),
        }
    }

    let status = grammars::check_assets(&dir);
    report(&status, &dir);
    for error in &fetch_errors {
        eprintln!("fetch error: {error}");
    }

    let satisfied = status.is_satisfied();
    if satisfied && (!strict || fetch_errors.is_empty()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn report(status: &AssetStatus, dir: &std::path::Path) {
    println!("grammar directory: {}", dir.display());
    let core = if !status.core_present {
        "missing".red().to_string()
    } else if !status.core_size_ok {
        "present (unexpected size)".yellow().to_string()
    } else {
        "ok".green().to_string()
    };
    println!("core runtime: {core}");
    println!(
        "language grammars: {} present, {} missing",
        status.present.len(),
        status.missing.len()
    );
    if !status.present.is_empty() {
        println!("  present: {}", status.present.join(", "));
    }
}
