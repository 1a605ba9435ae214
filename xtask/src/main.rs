use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use data_runtime::document::PersistedDocument;
use std::path::PathBuf;
use std::process::{Command, Stdio};

#[derive(Parser)]
#[command(author, version, about = "Workspace automation tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// fmt + clippy -D warnings + tests (workspace)
    Ci,
    /// Validate a persisted players.json and report what a load would do
    SchemaCheck {
        /// Path to the document (defaults to data/players.json)
        path: Option<PathBuf>,
        /// Fail when any entry would be skipped or clamped
        #[arg(long)]
        strict: bool,
    },
}

fn run(cmd: &mut Command) -> Result<()> {
    let status = cmd.status().context("spawn")?;
    if !status.success() {
        bail!("command failed: {:?}", cmd);
    }
    Ok(())
}

fn cargo(args: &[&str]) -> Result<()> {
    let mut c = Command::new("cargo");
    c.args(args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    run(&mut c)
}

fn ci() -> Result<()> {
    cargo(&["fmt", "--all", "--", "--check"])?;
    cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])?;
    cargo(&["test", "--workspace"])?;
    Ok(())
}

fn schema_check(path: Option<PathBuf>, strict: bool) -> Result<()> {
    let path = path.unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("data/players.json")
    });
    let doc = PersistedDocument::read(&path)
        .with_context(|| format!("load document: {}", path.display()))?;
    let resolved = doc.resolve();
    for (key, why) in &resolved.skipped {
        println!("xtask: skip {key}: {why:?}");
    }
    for (id, raw) in &resolved.clamped {
        println!("xtask: clamp {id}: {raw} -> 15");
    }
    println!(
        "xtask: {} ok ({} players, cooldown {} ms, pickup immediate {})",
        path.display(),
        resolved.entries.len(),
        resolved.cfg.cooldown_ms(),
        resolved.cfg.pickup_immediate
    );
    if strict && !(resolved.skipped.is_empty() && resolved.clamped.is_empty()) {
        bail!(
            "{} entries would be skipped, {} clamped",
            resolved.skipped.len(),
            resolved.clamped.len()
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Ci => ci(),
        Cmd::SchemaCheck { path, strict } => schema_check(path, strict),
    }
}
