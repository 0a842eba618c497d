use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for nebula")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// fmt, clippy, tests and a headless smoke run
    Check,
    /// cargo fmt --check on all crates
    Fmt,
    /// clippy with warnings denied
    Clippy,
    /// All workspace tests
    Test,
    /// Engine tick benchmarks (release)
    Bench,
    /// Rustdoc for the workspace
    Doc,
    /// Play a short scripted session through nebula-cli
    Smoke {
        #[arg(long, default_value = "300")]
        ticks: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            fmt()?;
            clippy()?;
            test()?;
            smoke(120)?;
        }
        Commands::Fmt => fmt()?,
        Commands::Clippy => clippy()?,
        Commands::Test => test()?,
        Commands::Bench => cargo(
            "engine benches",
            &["bench", "-p", "nebula-engine", "--bench", "bench_tick"],
        )?,
        Commands::Doc => cargo("cargo doc", &["doc", "--workspace", "--no-deps"])?,
        Commands::Smoke { ticks } => smoke(ticks)?,
    }

    Ok(())
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> {step}: cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{step} failed");
    }
    Ok(())
}

fn fmt() -> Result<()> {
    cargo("fmt check", &["fmt", "--all", "--", "--check"])
}

fn clippy() -> Result<()> {
    cargo(
        "clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn test() -> Result<()> {
    cargo("tests", &["test", "--workspace"])
}

fn smoke(ticks: u64) -> Result<()> {
    let ticks = ticks.to_string();
    cargo(
        "headless smoke run",
        &["run", "-p", "nebula-cli", "--", "run", "--fire", "--ticks", &ticks],
    )
}
