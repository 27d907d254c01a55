//! elastic-migrate CLI
//!
//! Moves ingest pipelines and Kibana saved objects between two Elastic
//! deployments through a local directory tree.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use elastic_migrate::config::{CONFIG_TEMPLATE, DEFAULT_CONFIG_FILE};
use elastic_migrate::wizard::{Wizard, WizardUI};
use elastic_migrate::{report, CredentialStore, Error, MigrationConfig, Migrator, Scope};

#[derive(Parser)]
#[command(name = "elastic-migrate")]
#[command(version)]
#[command(
    about = "Migrate ingest pipelines and Kibana saved objects between Elastic deployments",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file, also used to store minted API keys
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Local storage directory (overrides storage.root)
    #[arg(short, long, value_name = "DIR", global = true)]
    storage: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive menu (default)
    Menu,

    /// Download from the source deployment into local storage
    Download {
        /// Restrict to one object class
        #[arg(long, value_enum)]
        only: Option<Only>,
    },

    /// Upload local storage to the target deployment
    Upload {
        /// Restrict to one object class
        #[arg(long, value_enum)]
        only: Option<Only>,
    },

    /// Download from the source, then upload to the target
    Migrate {
        /// Restrict to one object class
        #[arg(long, value_enum)]
        only: Option<Only>,
    },

    /// Show what is in local storage
    List,

    /// Generate example configuration
    Init {
        /// Output file path
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration file
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
enum Only {
    Pipelines,
    Dashboards,
}

fn scope(only: Option<Only>) -> Scope {
    match only {
        Some(Only::Pipelines) => Scope::Pipelines,
        Some(Only::Dashboards) => Scope::Dashboards,
        None => Scope::Both,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Err(err) = run(&cli).await {
        if let Some(e) = err.downcast_ref::<Error>() {
            if e.is_fatal_session_error() {
                error!("{}", e);
                WizardUI::new().print_error(&format!(
                    "Could not connect. Check the credentials in {} and try again.",
                    cli.config.display()
                ));
                std::process::exit(1);
            }
        }
        return Err(err);
    }

    Ok(())
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Some(Commands::Init { output, force }) => generate_config(output, *force),
        Some(Commands::Validate) => validate_config(&cli.config),
        Some(Commands::List) => {
            let migrator = build_migrator(cli)?;
            let local = migrator.local()?;
            report::print_local(&local);
            Ok(())
        }
        Some(Commands::Download { only }) => {
            let mut migrator = build_migrator(cli)?;
            let downloaded = migrator.download(scope(*only)).await?;
            report::print_download(&downloaded);
            info!(
                "Objects stored under {}",
                migrator.layout().root().display()
            );
            Ok(())
        }
        Some(Commands::Upload { only }) => {
            let mut migrator = build_migrator(cli)?;
            let written = migrator.upload(scope(*only)).await?;
            report::print_migration(&written);
            Ok(())
        }
        Some(Commands::Migrate { only }) => {
            let mut migrator = build_migrator(cli)?;
            let written = migrator.migrate(scope(*only)).await?;
            report::print_migration(&written);
            Ok(())
        }
        Some(Commands::Menu) | None => {
            let mut migrator = build_migrator(cli)?;
            Wizard::new().run(&mut migrator).await?;
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<MigrationConfig> {
    info!("Loading configuration from {:?}", cli.config);

    let mut config = MigrationConfig::load(&cli.config)?;
    if let Some(storage) = &cli.storage {
        config.storage.root = storage.clone();
    }
    config.validate_options()?;
    Ok(config)
}

fn build_migrator(cli: &Cli) -> anyhow::Result<Migrator> {
    let config = load_config(cli)?;
    Ok(Migrator::new(config, CredentialStore::open(&cli.config)))
}

fn validate_config(config_path: &Path) -> anyhow::Result<()> {
    info!("Validating configuration from {:?}", config_path);

    let config = MigrationConfig::load(config_path)?;
    config.validate()?;

    println!("✅ Configuration is valid!");
    println!("   Source:  {} / {}", config.source.es_url, config.source.kibana_url);
    println!("   Target:  {} / {}", config.target.es_url, config.target.kibana_url);
    println!("   Storage: {}", config.storage.root.display());
    for filter in &config.options.pipeline_filters {
        println!("   Filter:  {} -> {}", filter.pattern, filter.directory);
    }

    Ok(())
}

fn generate_config(output: &Path, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    std::fs::write(output, CONFIG_TEMPLATE)?;
    println!("✅ Generated configuration: {:?}", output);
    println!(
        "   Edit the file and run: elastic-migrate --config {:?} migrate",
        output
    );

    Ok(())
}
