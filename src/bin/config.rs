//! Form Registry configuration CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use form_registry::FormsConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forms-config")]
#[command(about = "Inspect and write form registry configuration")]
struct Cli {
    /// Config file to load on top of the default locations
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration
    Show {
        #[arg(long, conflicts_with = "json")]
        toml: bool,
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    Init {
        #[arg(default_value = "forms.toml")]
        path: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check the effective configuration for problems
    Validate,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Show { json, .. } => {
            let config = FormsConfig::load_from(cli.config.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
            Ok(())
        }

        Commands::Init { path, force } => {
            if std::path::Path::new(&path).exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path);
            }
            FormsConfig::default()
                .save(&path)
                .with_context(|| format!("writing {}", path))?;
            println!("✅ Wrote {}", path);
            Ok(())
        }

        Commands::Validate => {
            let config = FormsConfig::load_from(cli.config.as_deref())?;
            let problems = config.validate();
            if problems.is_empty() {
                println!("✅ Configuration valid");
                return Ok(());
            }
            for problem in &problems {
                println!("❌ {}", problem);
            }
            anyhow::bail!("{} configuration problem(s)", problems.len())
        }
    }
}
