use std::path::PathBuf;

use vmharvest::cli::{Cli, Commands, ConfigAction};
use vmharvest::config::Config;
use vmharvest::error::{HarvestError, Result};
use vmharvest::extract::{DnsExtractor, Extract, HttpExtractor, TlsExtractor};
use vmharvest::identity::IdentityStore;
use vmharvest::pipeline::{self, RunContext, SingleRun};
use vmharvest::{hypervisor, registry};

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Fatal errors end the process with a message naming the offending
    // path or machine
    if let Err(e) = run(cli) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "vmharvest=debug"
    } else {
        "vmharvest=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Dns {
            name,
            output,
            flows,
        } => cmd_extract(cli.config, &DnsExtractor, name, output, flows, false),
        Commands::Http {
            name,
            output,
            captures,
            append,
        } => cmd_extract(cli.config, &HttpExtractor, name, output, captures, append),
        Commands::Tls {
            name,
            output,
            flows,
        } => cmd_extract(cli.config, &TlsExtractor, name, output, flows, false),
        Commands::Machines { output } => cmd_machines(cli.config, output),
        Commands::Config { action } => cmd_config(cli.config, action),
    }
}

/// Shared driver for the three protocol subcommands: a named machine runs the
/// single-machine pipeline, an omitted name fans out fleet-wide.
fn cmd_extract<E: Extract>(
    config_path: Option<PathBuf>,
    extractor: &E,
    name: Option<String>,
    output: Option<PathBuf>,
    artifacts: Option<Vec<PathBuf>>,
    append: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let ctx = RunContext::new(&config);

    match name {
        Some(machine) => {
            let opts = SingleRun {
                machine,
                output,
                artifacts,
                append,
            };
            pipeline::run_single(&ctx, extractor, &opts)?;
        }
        None => {
            pipeline::run_fleet(&ctx, extractor, output)?;
        }
    }

    Ok(())
}

fn cmd_machines(config_path: Option<PathBuf>, output: PathBuf) -> Result<()> {
    let config = load_config(config_path)?;
    let store = IdentityStore::new(config.identity.dir.clone());

    let machines = hypervisor::list_machines(&config.hypervisor.list_command)?;
    let entries = registry::collect_entries(&machines, &store);
    registry::write_table(&entries, &output)?;

    println!(
        "✓ {} of {} machines written to {}",
        entries.len(),
        machines.len(),
        output.display()
    );
    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            Config::load(&path)?;
            println!("✓ Configuration is valid");
        }
        ConfigAction::Init { force } => {
            let path = Config::default_path()?;

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| HarvestError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'vmharvest config init' to create one."
        );
        return Ok(Config::default());
    }

    Config::load(&path)
}
