use clap::{Parser, Subcommand, ValueEnum};
use schemachain::revision::DefaultPolicy;
use schemachain::{SchemaChain, SchemaChainBuilder, SchemaResult};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Applies, reverses and inspects schema revisions of a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "schemachain", version, about, long_about = None)]
struct CliArgs {
    /// Path of the target database file.
    #[arg(long, env = "SCHEMACHAIN_DATABASE")]
    database: PathBuf,

    /// JSON file with the authored revisions.
    #[arg(long, env = "SCHEMACHAIN_REVISIONS")]
    revisions: Option<PathBuf>,

    /// How long to wait for a concurrent run to release the migration lock.
    #[arg(long, env = "SCHEMACHAIN_LOCK_TIMEOUT_MS", default_value = "30000")]
    lock_timeout_ms: u64,

    /// Policy for existing rows when a column with a default is added.
    #[arg(long, value_enum, default_value = "backfill")]
    default_policy: PolicyArg,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending revisions up to a target (default: head).
    Upgrade { target: Option<String> },
    /// Reverse revisions down to a target (`base` reverses everything).
    Downgrade { target: String },
    /// Print the revision the database is at.
    Current,
    /// List tables, views, indexes and triggers matching a LIKE pattern.
    Inspect { pattern: Option<String> },
    /// Print the authored chain with applied revisions marked.
    History,
    /// Clear a migration lock left behind by a crashed run.
    Unlock,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    Backfill,
    LeaveNull,
}

impl From<PolicyArg> for DefaultPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Backfill => DefaultPolicy::Backfill,
            PolicyArg::LeaveNull => DefaultPolicy::LeaveNull,
        }
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command succeeded; a halted run is reported but not an error here.
fn run(args: &CliArgs) -> SchemaResult<bool> {
    let chain = open(args)?;

    match &args.command {
        Command::Upgrade { target } => {
            let report = chain.upgrade(target.as_deref())?;
            println!("{}", report);
            Ok(report.is_success())
        }
        Command::Downgrade { target } => {
            let report = chain.downgrade(target)?;
            println!("{}", report);
            Ok(report.is_success())
        }
        Command::Current => {
            println!("{}", chain.current()?);
            Ok(true)
        }
        Command::Inspect { pattern } => {
            let structures = match pattern {
                Some(pattern) => chain.list_structures(pattern)?,
                None => chain.list_all()?,
            };
            for structure in structures {
                if structure.table == structure.name {
                    println!("{:<8} {}", structure.kind, structure.name);
                } else {
                    println!("{:<8} {} on {}", structure.kind, structure.name, structure.table);
                }
            }
            Ok(true)
        }
        Command::History => {
            let status = chain.status()?;
            if status.is_empty() {
                println!("no revisions");
            }
            for entry in status.iter().rev() {
                let mark = if entry.current {
                    "*"
                } else if entry.applied {
                    "+"
                } else {
                    " "
                };
                let summary = entry
                    .revision
                    .label()
                    .map(str::to_string)
                    .unwrap_or_else(|| entry.revision.forward().to_string());
                println!(
                    "{} {} <- {}  {}",
                    mark,
                    entry.revision.id(),
                    entry.revision.parent(),
                    summary
                );
            }
            Ok(true)
        }
        Command::Unlock => {
            if chain.force_unlock()? {
                println!("released migration lock");
            } else {
                println!("no migration lock held");
            }
            Ok(true)
        }
    }
}

fn open(args: &CliArgs) -> SchemaResult<SchemaChain> {
    let mutating = mutates(&args.command);
    let mut builder = SchemaChainBuilder::new()
        .db_path(&args.database)
        .create_if_missing(mutating)
        .lock_timeout(Duration::from_millis(args.lock_timeout_ms))
        .default_policy(args.default_policy.into());

    // current, inspect and unlock never read the chain, so a bad file must not stop them
    if needs_revisions(&args.command) {
        match &args.revisions {
            Some(path) => builder = builder.revisions_file(path),
            None => log::warn!("No revision file given; the chain is empty"),
        }
    }
    builder.open()
}

fn needs_revisions(command: &Command) -> bool {
    matches!(
        command,
        Command::Upgrade { .. } | Command::Downgrade { .. } | Command::History
    )
}

fn mutates(command: &Command) -> bool {
    matches!(command, Command::Upgrade { .. } | Command::Downgrade { .. })
}
