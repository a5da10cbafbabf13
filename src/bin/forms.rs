//! Form Registry CLI
//!
//! Create, inspect, update and audit form definitions.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use form_registry::config::{OutputFormat, StorageBackend};
use form_registry::{
    audit_registry, parse_field_list, resolve_field_list, validate_field_definition, DefinitionError,
    DefinitionFilter, DefinitionKind, DefinitionRegistry, DefinitionStore, FileStore, FormsConfig, MemoryNamespaces,
    MemoryStore,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forms")]
#[command(about = "Manage form field, layout and list-of-values definitions")]
struct Cli {
    /// Config file (defaults to forms.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Storage root, overriding the configured path
    #[arg(short, long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the storage root
    Init,

    /// Create a definition from a JSON file
    Create {
        /// collection, custom-field, form-layout, template or form
        kind: DefinitionKind,
        file: PathBuf,
    },

    /// Show one definition
    Get { kind: DefinitionKind, name: String },

    /// List definitions
    List {
        kind: DefinitionKind,
        #[arg(long)]
        category: Option<String>,
        /// Case-insensitive substring
        #[arg(long)]
        search: Option<String>,
        /// layoutType or dataType
        #[arg(long = "type")]
        kind_type: Option<String>,
        #[arg(long)]
        collection: Option<String>,
    },

    /// List the distinct categories of a kind
    Categories { kind: DefinitionKind },

    /// Apply a partial update from a JSON file
    Update {
        kind: DefinitionKind,
        name: String,
        patch: PathBuf,
    },

    /// Delete a definition
    Delete { kind: DefinitionKind, name: String },

    /// Validate a single field definition or a field list
    ValidateField { file: PathBuf },

    /// Resolve the options of every choice field in a field list
    ResolveOptions { file: PathBuf },

    /// Check stored forms, layouts and templates for stale references
    Audit,

    /// Record a submission against a form
    Submit { form: String, data: PathBuf },

    /// List submissions recorded against a form
    Submissions { form: String },
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
    let mut config = FormsConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = cli.store {
        config.storage.path = path;
    }

    match config.storage.backend {
        StorageBackend::File => {
            let store = FileStore::open(config.storage_path())?;
            let mut registry = DefinitionRegistry::new(store.clone());
            if config.collections.provision_namespaces {
                registry = registry.with_provisioner(Arc::new(store));
            }
            execute(&registry, &config, cli.command)
        }
        StorageBackend::Memory => {
            let mut registry = DefinitionRegistry::new(MemoryStore::new());
            if config.collections.provision_namespaces {
                registry = registry.with_provisioner(Arc::new(MemoryNamespaces::new()));
            }
            execute(&registry, &config, cli.command)
        }
    }
}

fn execute<S: DefinitionStore>(registry: &DefinitionRegistry<S>, config: &FormsConfig, command: Commands) -> Result<()> {
    let format = config.output.format;

    match command {
        Commands::Init => {
            println!("Storage ready at {}", config.storage_path().display());
            Ok(())
        }

        Commands::Create { kind, file } => {
            let created = registry.create_json(kind, &read_json(&file)?)?;
            print_json(&created, format)
        }

        Commands::Get { kind, name } => {
            let found = registry
                .get_json(kind, &name)
                .map_err(|e| with_suggestions(registry, config, kind, &name, e))?;
            print_json(&found, format)
        }

        Commands::List {
            kind,
            category,
            search,
            kind_type,
            collection,
        } => {
            let filter = DefinitionFilter {
                category,
                search,
                kind_type,
                collection_name: collection,
            };
            let found = registry.list_json(kind, &filter)?;
            print_json(&Value::Array(found), format)
        }

        Commands::Categories { kind } => {
            for category in registry.categories_of(kind)? {
                println!("{}", category);
            }
            Ok(())
        }

        Commands::Update { kind, name, patch } => {
            let updated = registry
                .update_json(kind, &name, &read_json(&patch)?)
                .map_err(|e| with_suggestions(registry, config, kind, &name, e))?;
            print_json(&updated, format)
        }

        Commands::Delete { kind, name } => {
            registry
                .delete(kind, &name)
                .map_err(|e| with_suggestions(registry, config, kind, &name, e))?;
            println!("Deleted {} {}", kind, name);
            Ok(())
        }

        Commands::ValidateField { file } => {
            let raw = read_json(&file)?;
            let count = match &raw {
                Value::Array(_) => parse_field_list(&raw, "fields")?.len(),
                _ => {
                    validate_field_definition(&raw)?;
                    1
                }
            };
            println!("✅ {} field definition(s) valid", count);
            Ok(())
        }

        Commands::ResolveOptions { file } => {
            let raw = read_json(&file)?;
            let fields = match &raw {
                Value::Array(_) => parse_field_list(&raw, "fields")?,
                _ => vec![validate_field_definition(&raw)?],
            };
            for resolved in resolve_field_list(&fields, registry)? {
                let marker = if resolved.options.is_dangling() { " (missing list)" } else { "" };
                println!("{}{}: {}", resolved.path, marker, resolved.options.values().join(", "));
            }
            Ok(())
        }

        Commands::Audit => {
            let results = audit_registry(registry)?;
            let mut failed = false;
            for result in &results {
                if result.is_clean() && !result.has_warnings() {
                    continue;
                }
                println!("{}", result.subject);
                for finding in &result.errors {
                    println!("  ❌ {} {}: {}", finding.code, finding.path, finding.message);
                }
                for finding in &result.warnings {
                    println!("  ⚠️  {} {}: {}", finding.code, finding.path, finding.message);
                }
                failed |= !result.is_clean();
            }
            println!("Audited {} definition(s)", results.len());
            if failed {
                anyhow::bail!("audit found errors");
            }
            Ok(())
        }

        Commands::Submit { form, data } => {
            let data = match read_json(&data)? {
                Value::Object(map) => map,
                _ => anyhow::bail!("submission data must be a JSON object"),
            };
            let submission = registry
                .submit(&form, data)
                .map_err(|e| with_suggestions(registry, config, DefinitionKind::Form, &form, e))?;
            print_json(&serde_json::to_value(submission)?, format)
        }

        Commands::Submissions { form } => {
            let submissions = registry
                .list_submissions(&form)
                .map_err(|e| with_suggestions(registry, config, DefinitionKind::Form, &form, e))?;
            print_json(&serde_json::to_value(submissions)?, format)
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn print_json(value: &Value, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };
    println!("{}", rendered);
    Ok(())
}

/// Attach "did you mean" names to a `NotFound`
fn with_suggestions<S: DefinitionStore>(
    registry: &DefinitionRegistry<S>,
    config: &FormsConfig,
    kind: DefinitionKind,
    name: &str,
    err: DefinitionError,
) -> anyhow::Error {
    if !matches!(err, DefinitionError::NotFound { .. }) || !config.listing.fuzzy_suggestions {
        return err.into();
    }
    match registry.suggest_names(kind, name, config.listing.suggestion_limit) {
        Ok(names) if !names.is_empty() => anyhow::anyhow!("{} (did you mean: {})", err, names.join(", ")),
        _ => err.into(),
    }
}
