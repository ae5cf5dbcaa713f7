//! kura: read and write through a set of mirrored storage systems.
//!
//! Usage:
//!   # Members from ~/.config/kura/systems.ron
//!   kura ls-systems
//!
//!   # Ad-hoc members
//!   kura --system disk=file:///var/lib/kura --system node=mfs://localhost/kura \
//!       write notes/today.md --input today.md
//!   kura read notes/today.md --from node
//!
//!   # Content-addressed write (no path): prints the assigned id
//!   echo hello | kura --system scratch=mem://s write

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

use kura_system::{
    Encoding, ReadOptions, SharedSystem, System, WriteFlag, WriteOptions, select_system,
};

mod config;

use config::{MemberConfig, SystemsConfig};

#[derive(Parser, Debug)]
#[command(name = "kura", version)]
#[command(about = "Read and write through mirrored storage systems")]
struct Cli {
    /// RON config file (default: $XDG_CONFIG_HOME/kura/systems.ron)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Add or replace a member, as NAME=URL (repeatable)
    #[arg(long = "system", value_name = "NAME=URL", value_parser = MemberConfig::parse, global = true)]
    systems: Vec<MemberConfig>,

    /// Per-call timeout in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a file and write its bytes to stdout
    Read {
        path: String,
        /// Read from one member, as NAME or NAME/SUB
        #[arg(long)]
        from: Option<String>,
        /// Fail unless the payload is valid UTF-8
        #[arg(long)]
        utf8: bool,
    },
    /// Write stdin (or --input) and print the resolved identifier
    Write {
        /// Target path; omit to let the backend assign a content id
        path: Option<String>,
        #[arg(long)]
        input: Option<PathBuf>,
        /// Fail if the target already exists
        #[arg(long)]
        exclusive: bool,
        /// Permission bits for new files, in octal
        #[arg(long, value_parser = parse_mode)]
        mode: Option<u32>,
        /// Write to one member, as NAME or NAME/SUB
        #[arg(long)]
        to: Option<String>,
    },
    /// Get or set an environment value on one member
    Env {
        key: String,
        value: Option<String>,
        #[arg(long)]
        from: String,
    },
    /// List members whose name starts with a prefix
    Select { prefix: String },
    /// List members of the aggregate
    LsSystems,
}

fn parse_mode(arg: &str) -> Result<u32, String> {
    let digits = arg.strip_prefix("0o").unwrap_or(arg);
    u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal mode `{arg}`: {e}"))
}

/// Split `NAME/SUB` into its parts.
fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('/') {
        Some((name, sub)) => (name, Some(sub)),
        None => (target, None),
    }
}

fn pick(system: &SharedSystem, target: Option<&str>) -> Result<SharedSystem> {
    let (name, sub) = match target {
        Some(target) => {
            let (name, sub) = split_target(target);
            (Some(name), sub)
        }
        None => (None, None),
    };
    let system = match sub {
        Some(sub) => system.sub_system(sub)?,
        None => Arc::clone(system),
    };
    Ok(select_system(&system, name, sub)?)
}

async fn read_input(input: Option<&PathBuf>) -> Result<Vec<u8>> {
    match input {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut bytes = Vec::new();
            tokio::io::stdin().read_to_end(&mut bytes).await?;
            Ok(bytes)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config =
        SystemsConfig::discover(cli.config.as_deref()).context("loading systems config")?;
    config.apply_overrides(&cli.systems);
    let multi = config.build().context("building systems")?;
    info!(name = %multi.name(), members = multi.len(), "systems ready");
    let all: SharedSystem = Arc::new(multi);

    match cli.command {
        Command::Read { path, from, utf8 } => {
            let system = pick(&all, from.as_deref())?;
            let mut options = ReadOptions::default();
            options.timeout_millis = cli.timeout;
            if utf8 {
                options = options.with_encoding(Encoding::Utf8);
            }
            let bytes = system
                .read_file(&path, &options)
                .await
                .with_context(|| format!("reading {path}"))?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&bytes).await?;
            stdout.flush().await?;
        }
        Command::Write {
            path,
            input,
            exclusive,
            mode,
            to,
        } => {
            let system = pick(&all, to.as_deref())?;
            let bytes = read_input(input.as_ref()).await?;
            let options = WriteOptions {
                timeout_millis: cli.timeout,
                mode,
                flag: exclusive.then_some(WriteFlag::Exclusive),
            };
            let id = system
                .write_file(Arc::from(bytes), path.as_deref(), &options)
                .await
                .with_context(|| format!("writing {}", path.as_deref().unwrap_or("<content id>")))?;
            println!("{id}");
        }
        Command::Env { key, value, from } => {
            let system = pick(&all, Some(&from))?;
            match system.env(&key, value.as_deref())? {
                Some(value) => println!("{value}"),
                None => bail!("{key} is not set on {}", system.name()),
            }
        }
        Command::Select { prefix } => {
            for member in all.select_systems(&|s| s.name().starts_with(&prefix))? {
                println!("{}", member.name());
            }
        }
        Command::LsSystems => {
            for member in all.select_systems(&|_| true)? {
                println!("{}", member.name());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _telemetry = kura_telemetry::init("kura");
    run(cli).await
}
