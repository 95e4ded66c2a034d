//! # Matchbook CLI
//!
//! Reads one JSON report document from stdin and runs one of four flows:
//!
//! | Invocation | Flow |
//! |------------|------|
//! | (no flags) | match the chain against stored patterns, print matched issues |
//! | `--update-patterns` | upsert/withdraw stored patterns from the document's issues |
//! | `--generate-incidents` | match, then print a JSON incidents document |
//! | `--check-test-id` / `--check-build-id` | resolve the chain externally, then match |
//!
//! ```bash
//! # Update patterns from an issue dump
//! kcidb-query -i "$ISSUE" -d "$DB_OPTS" | matchbook --update-patterns
//!
//! # Generate incidents for a report
//! kcidb-query -t "$TEST" -d "$DB_OPTS" --parents | matchbook --generate-incidents
//!
//! # Check a test id against inline issues
//! cat issue.json | matchbook --check-test-id "$TEST" -d "$DB_OPTS"
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use matchbook::config::{self, Config};
use matchbook::incidents;
use matchbook::ingest;
use matchbook::lookup::{self, NodeIdKind};
use matchbook::matcher;
use matchbook::models::Report;
use matchbook::store::PatternStore;

const DEFAULT_CONFIG_PATH: &str = "matchbook.toml";

#[derive(Parser)]
#[command(
    name = "matchbook",
    about = "Match CI report chains against known-issue patterns and generate incidents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). When omitted, `./matchbook.toml`
    /// is used if present, otherwise built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Update the pattern store from the issues in the input document.
    /// Other flags are ignored.
    #[arg(long)]
    update_patterns: bool,

    /// Emit a JSON incidents document for matched issues instead of
    /// human-readable match lines.
    #[arg(long)]
    generate_incidents: bool,

    /// Source candidate patterns from the input document's own `issues`
    /// array instead of the pattern store.
    #[arg(long)]
    ignore_db: bool,

    /// Test id to check; implies --ignore-db. Expects a document with
    /// issues on stdin.
    #[arg(long, value_name = "ID", conflicts_with = "check_build_id", requires = "db_conn")]
    check_test_id: Option<String>,

    /// Build id to check; implies --ignore-db. Expects a document with
    /// issues on stdin.
    #[arg(long, value_name = "ID", requires = "db_conn")]
    check_build_id: Option<String>,

    /// Connection string handed to the external query tool. Required with
    /// --check-test-id or --check-build-id.
    #[arg(short = 'd', long, value_name = "CONN")]
    db_conn: Option<String>,
}

fn load_config(cli_path: Option<&Path>) -> Result<Config> {
    match cli_path {
        Some(path) => config::load_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                config::load_config(default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn read_input() -> Result<Report> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;
    serde_json::from_str(&input).context("Failed to parse input document")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;

    let input = read_input()?;

    if cli.update_patterns {
        let store = PatternStore::open(&cfg.store.path).await?;
        let summary = ingest::update_patterns(&store, &input).await?;
        store.close().await;

        // Stdout stays silent in ingest mode so the binary can sit in a
        // pipeline; the summary is diagnostic output.
        for failure in &summary.failures {
            eprintln!("{}", failure);
        }
        eprintln!("update patterns");
        eprintln!("  issues seen: {}", summary.seen);
        eprintln!("  patterns upserted: {}", summary.upserted);
        eprintln!("  patterns deleted: {}", summary.deleted);
        if !summary.failures.is_empty() {
            eprintln!("  patterns rejected: {}", summary.failures.len());
        }
        eprintln!("ok");
        return Ok(());
    }

    let by_id = cli
        .check_test_id
        .as_deref()
        .map(|id| (NodeIdKind::Test, id))
        .or_else(|| cli.check_build_id.as_deref().map(|id| (NodeIdKind::Build, id)));

    // By-id mode replaces the input chain with the externally resolved one,
    // keeping the input's issues as the candidate source.
    let (report, ignore_db) = match by_id {
        Some((kind, node_id)) => {
            let db_conn = cli
                .db_conn
                .as_deref()
                .context("--db-conn is required for by-id checks")?;
            let mut resolved = lookup::resolve(&cfg.lookup.command, kind, node_id, db_conn)?;
            resolved.issues = input.issues;
            (resolved, true)
        }
        None => (input, cli.ignore_db),
    };

    report.ensure_matchable()?;

    let candidates = if ignore_db {
        matcher::candidates_from_issues(&report.issues)
    } else {
        let store = PatternStore::open(&cfg.store.path).await?;
        let records = store.all().await?;
        store.close().await;
        matcher::candidates_from_records(&records)
    };

    let hits = matcher::run_match(&report, &candidates).await;

    if cli.generate_incidents {
        let document = incidents::emit(&cfg.submit.origin, &hits, &report.chain());
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        for hit in &hits {
            println!("Matched issue ID: {} Version: {}", hit.issue_id, hit.issue_version);
        }
    }

    Ok(())
}
