//! Configuration registry CLI.
//!
//! Operates directly on a file-backed repository: bootstrap new schema
//! versions from a JSON file, inspect stored versions, and change individual
//! values under the optimistic-concurrency rules.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::ConfigSetWrapper;
use client::app_config::ENV_VAR_OVERRIDE_PREFIX;
use cr_core::traits::ConfigSetRepository;
use cr_core::types::{ConfigItemType, ConfigValueChange, ConfigurationSet, FamilyKey};
use registry::ConfigSetAggregate;
use std::path::PathBuf;
use std::sync::Arc;
use storage::audit::TracingAuditEmitter;
use storage::events::TracingChangeNotifier;
use storage::file::FileConfigSetRepo;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "confreg", about = "Configuration registry", version)]
struct Cli {
    /// Path of the JSON data file backing the registry
    #[arg(long, global = true, env = "CONFREG_DATA_FILE", default_value = "configsets.json")]
    data_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a new schema version read from a configuration set JSON file
    Bootstrap {
        /// Path of the configuration set file
        file: PathBuf,
    },
    /// Print the latest iteration of the latest schema version
    Latest {
        #[arg(long)]
        environment: String,
        #[arg(long)]
        bounded_context: Option<String>,
    },
    /// Print the newest iteration recorded under a specific schema version
    Version {
        #[arg(long)]
        environment: String,
        #[arg(long)]
        bounded_context: Option<String>,
        schema_version: String,
    },
    /// Change one current value within the latest iteration
    SetValue {
        #[arg(long)]
        environment: String,
        #[arg(long)]
        bounded_context: Option<String>,
        /// Schema version the caller observed as current
        #[arg(long)]
        schema_version: String,
        /// Iteration number the caller observed as current
        #[arg(long)]
        iteration: u32,
        /// PARAMETER, FEATUREFLAG or SECRET
        #[arg(long, value_parser = parse_item_type)]
        item_type: ConfigItemType,
        name: String,
        /// New value, parsed as JSON when possible, else taken as a string
        value: String,
    },
    /// Print effective values with environment-variable overrides applied
    Resolve {
        #[arg(long)]
        environment: String,
        #[arg(long)]
        bounded_context: Option<String>,
    },
}

fn parse_item_type(raw: &str) -> Result<ConfigItemType, String> {
    raw.to_uppercase()
        .parse()
        .map_err(|_| format!("unknown item type: {raw}"))
}

fn family_key(environment: &str, bounded_context: Option<&str>) -> FamilyKey {
    match bounded_context {
        Some(bc) => FamilyKey::bounded_context(environment, bc),
        None => FamilyKey::global(environment),
    }
}

async fn open_aggregate(data_file: &PathBuf) -> Result<ConfigSetAggregate> {
    let repo = Arc::new(FileConfigSetRepo::new(data_file));
    repo.init()
        .await
        .with_context(|| format!("failed to open data file {}", data_file.display()))?;

    Ok(ConfigSetAggregate::new(
        repo,
        Arc::new(TracingAuditEmitter),
        Arc::new(TracingChangeNotifier),
    ))
}

fn print_set(set: &ConfigurationSet) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(set)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let agg = open_aggregate(&cli.data_file).await?;

    match cli.command {
        Commands::Bootstrap { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let set: ConfigurationSet =
                serde_json::from_str(&contents).context("configuration set file is not valid")?;

            let family = set.family_key();
            let schema_version = set.schema_version.clone();
            let iteration = agg.bootstrap(set).await?;
            println!("bootstrapped {family} {schema_version} at iteration {iteration}");
        }
        Commands::Latest {
            environment,
            bounded_context,
        } => {
            let family = family_key(&environment, bounded_context.as_deref());
            match agg.get_latest(&family).await? {
                Some(set) => print_set(&set)?,
                None => bail!("no configuration set found for {family}"),
            }
        }
        Commands::Version {
            environment,
            bounded_context,
            schema_version,
        } => {
            let family = family_key(&environment, bounded_context.as_deref());
            match agg.get_version(&family, &schema_version).await? {
                Some(set) => print_set(&set)?,
                None => bail!("no configuration set {schema_version} found for {family}"),
            }
        }
        Commands::SetValue {
            environment,
            bounded_context,
            schema_version,
            iteration,
            item_type,
            name,
            value,
        } => {
            let family = family_key(&environment, bounded_context.as_deref());
            let value = serde_json::from_str(&value)
                .unwrap_or_else(|_| serde_json::Value::String(value));
            let change = ConfigValueChange {
                item_type,
                name,
                value,
            };
            let new_iteration = agg
                .change_values(&family, &schema_version, iteration, &[change])
                .await?;
            println!("changed {family} {schema_version}, now at iteration {new_iteration}");
        }
        Commands::Resolve {
            environment,
            bounded_context,
        } => {
            let family = family_key(&environment, bounded_context.as_deref());
            let Some(set) = agg.get_latest(&family).await? else {
                bail!("no configuration set found for {family}");
            };

            let mut wrapper = ConfigSetWrapper::from_config_set(&set);
            wrapper.apply_env_var_overrides(ENV_VAR_OVERRIDE_PREFIX);

            println!(
                "# {family} {} iteration {}",
                wrapper.schema_version(),
                wrapper.iteration_number()
            );
            let resolved = wrapper.to_config_set();
            for param in &resolved.parameters {
                println!("{}={}", param.name, param.current_value);
            }
            for flag in &resolved.feature_flags {
                println!("{}={}", flag.name, flag.current_value);
            }
            for secret in &resolved.secrets {
                println!("{}=********", secret.name);
            }
        }
    }

    Ok(())
}
