//! Operator shell for managing relational, document, graph and key-value
//! stores through one set of operations.
//!
//! # Security Guarantees
//! - Passwords missing from a profile are prompted without echo
//! - Credentials never appear in output, logs or error messages
//! - Wiping requires an explicit `yes` or the `--yes` flag

mod menu;
mod output;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dbman_core::adapters::{DataStoreAdapter, WipeConfirmation, open_adapter};
use dbman_core::config::{ConnectionProfile, ProfileSet};
use dbman_core::dispatcher::{Operation, dispatch};
use dbman_core::logging::init_logging;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "dbman")]
#[command(about = "Multi-database data manager")]
#[command(version)]
#[command(long_about = "
dbman - one set of operations for several kinds of database

Every profile supports the same seven operations: list containers, create a
container, import a CSV file, export to a CSV file, delete all data,
describe a container and run a raw query.

SUPPORTED DATABASES:
- PostgreSQL, MySQL, SQLite (tables)
- MongoDB (collections)
- Neo4j (node labels)
- Redis (keys)

PROFILE FILE (db.ini):
  main.dbtype=postgresql
  main.host=localhost
  main.user=admin
  main.database=shop

EXAMPLES:
  dbman profiles
  dbman --profile main import users.csv
  dbman --profile main export users -o users.csv
  dbman --profile cache query 'GET user:1'
  dbman --profile main menu
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Profile file
    #[arg(
        long,
        env = "DBMAN_CONFIG",
        default_value = "db.ini",
        help = "Profile file with <label>.<key>=value lines"
    )]
    pub config: PathBuf,

    /// Profile to use
    #[arg(
        short,
        long,
        help = "Profile label (optional when the file defines only one)"
    )]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(
        short,
        long,
        global = true,
        help = "Suppress log output except errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List configured profiles
    Profiles,
    /// List tables, collections, labels or keys
    List,
    /// Create a container if it does not exist
    Create(CreateArgs),
    /// Import a CSV file
    Import(ImportArgs),
    /// Export a container to a CSV file
    Export(ExportArgs),
    /// Delete all data
    Wipe(WipeArgs),
    /// Describe a container's fields
    Describe(DescribeArgs),
    /// Run a native query
    Query(QueryArgs),
    /// Interactive menu
    Menu,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Container name
    pub name: String,

    /// Column names (relational stores only)
    #[arg(long, help = "Comma-separated column names")]
    pub columns: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// CSV file whose first line is the header
    pub file: PathBuf,

    /// Target container (defaults to the file's base name)
    #[arg(long)]
    pub container: Option<String>,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Container name, or a key pattern for Redis
    pub container: String,

    /// Output file (defaults to <container>.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct WipeArgs {
    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct DescribeArgs {
    /// Container name, or a key for Redis
    pub container: String,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Query text in the store's native language
    pub text: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    let profiles = ProfileSet::load(&cli.config)
        .await
        .with_context(|| format!("Cannot load profiles from {}", cli.config.display()))?;

    if matches!(cli.command, Command::Profiles) {
        if profiles.is_empty() {
            println!("No profiles defined in {}", cli.config.display());
        } else {
            println!("{}", output::render_profiles(&profiles));
            println!("{} profile(s)", profiles.len());
        }
        return Ok(());
    }

    let profile = resolve_profile(&profiles, cli.profile.as_deref())?;
    let profile = with_prompted_password(profile)?;

    info!("Using profile {}", profile);
    let adapter = open_adapter(&profile).await?;
    let result = run_command(adapter.as_ref(), &profile, cli.command).await;
    adapter.close().await;
    result
}

/// Picks the requested profile, or the only one defined.
fn resolve_profile(profiles: &ProfileSet, label: Option<&str>) -> anyhow::Result<ConnectionProfile> {
    match label {
        Some(label) => Ok(profiles.get(label)?.clone()),
        None => match profiles.iter().collect::<Vec<_>>().as_slice() {
            [only] => Ok((*only).clone()),
            [] => anyhow::bail!("No profiles defined"),
            _ => anyhow::bail!(
                "Several profiles defined ({}); choose one with --profile",
                profiles.labels().join(", ")
            ),
        },
    }
}

fn with_prompted_password(profile: ConnectionProfile) -> anyhow::Result<ConnectionProfile> {
    if !profile.needs_password() {
        return Ok(profile);
    }
    let password = rpassword::prompt_password(format!(
        "Password for {}@{}: ",
        profile.credentials().username(),
        profile.label()
    ))
    .context("Failed to read password")?;
    Ok(profile.with_password(password))
}

async fn run_command(
    adapter: &dyn DataStoreAdapter,
    profile: &ConnectionProfile,
    command: Command,
) -> anyhow::Result<()> {
    adapter.ping().await?;
    debug!("Profile '{}' is reachable", profile.label());

    let operation = match command {
        Command::Profiles => return Ok(()),
        Command::Menu => return menu::run(adapter, profile.label()).await,
        Command::List => Operation::ListContainers,
        Command::Create(args) => Operation::CreateContainer {
            name: args.name,
            columns: match args.columns {
                Some(spec) => menu::parse_columns(&spec)?,
                None => None,
            },
        },
        Command::Import(args) => Operation::ImportCsv {
            path: args.file,
            container: args.container,
        },
        Command::Export(args) => Operation::ExportCsv {
            container: args.container,
            path: args.output,
        },
        Command::Wipe(args) => {
            let confirmation = if args.yes {
                Some(WipeConfirmation::pre_approved())
            } else {
                menu::confirm_wipe(profile.label())?
            };
            match confirmation {
                Some(confirmation) => Operation::DeleteAllContainers { confirmation },
                None => {
                    println!("Operation cancelled.");
                    return Ok(());
                }
            }
        }
        Command::Describe(args) => Operation::DescribeStructure {
            container: args.container,
        },
        Command::Query(args) => Operation::ExecuteRawQuery { query: args.text },
    };

    let backend = adapter.backend_kind();
    let outcome = dispatch(adapter, operation).await?;
    if let Some(body) = output::render_outcome(&outcome, backend) {
        println!("{}", body);
    }
    println!("{}", outcome.summary_line(backend));
    Ok(())
}
