//! `imphash` command line tool.

use anyhow::{Context, Result};
use clap::Parser;
use imphash::logging::{init_tracing_json_with_level, init_tracing_with_level};
use imphash::{imphash_from_path, ImpHashResult, ImphashConfig};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Compute import hashes of PE, ELF and Mach-O binaries
#[derive(Parser, Debug)]
#[command(name = "imphash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compute ImpHash, ImpFuzzy and ImpString of executable files")]
#[command(long_about = r#"
imphash reduces the import table of each file to a canonical string and prints
its MD5 digest. PE, ELF, Mach-O and fat Mach-O files are supported.

Examples:
  imphash ./sample.exe                   # path: ImpHash
  imphash --fuzzy ./a.out ./lib.so       # also print ImpFuzzy
  imphash --json ./sample.dylib          # one JSON object per file
"#)]
struct Args {
    /// Files to hash
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Also print the fuzzy import hash
    #[arg(long)]
    fuzzy: bool,

    /// Also print the canonical import string
    #[arg(long = "imp-string")]
    imp_string: bool,

    /// Print one JSON object per file
    #[arg(long)]
    json: bool,

    /// Load configuration from a JSON file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long = "log-json")]
    log_json: bool,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    path: String,
    #[serde(flatten)]
    result: &'a ImpHashResult,
}

fn hash_file(path: &Path, config: &ImphashConfig) -> Result<ImpHashResult> {
    imphash_from_path(path, config).with_context(|| format!("failed to hash {}", path.display()))
}

fn render(args: &Args, path: &Path, result: &ImpHashResult) -> Result<String> {
    if args.json {
        let record = JsonRecord {
            path: path.display().to_string(),
            result,
        };
        return Ok(serde_json::to_string(&record)?);
    }
    let mut out = format!("{}: {}", path.display(), result.imp_hash);
    if args.fuzzy {
        out.push_str(&format!("\nImpFuzzy: {}", result.imp_fuzzy));
    }
    if args.imp_string {
        out.push_str(&format!("\nImpString: {}", result.imp_string));
    }
    Ok(out)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    if args.log_json {
        init_tracing_json_with_level(level);
    } else {
        init_tracing_with_level(level);
    }

    let config = match &args.config {
        Some(path) => ImphashConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ImphashConfig::default(),
    };

    // Hash in parallel; print in argument order
    let results: Vec<Result<ImpHashResult>> = args
        .paths
        .par_iter()
        .map(|path| hash_file(path, &config))
        .collect();

    for (path, result) in args.paths.iter().zip(results) {
        match result.and_then(|r| render(&args, path, &r)) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("warning: {:#}", e),
        }
    }
    Ok(())
}
