//! SDF Tool CLI
//!
//! Resolves models, looks up definitions across namespaces and validates
//! values against data definitions.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use onedm_sdf::registry::Registry;
use onedm_sdf::{
    loader, Data, DataQualities, Definition, DirectoryRegistry, NullRegistry, Resolver, SdfConfig,
};

#[derive(Parser)]
#[command(name = "sdf-tool")]
#[command(about = "Resolve and validate SDF models")]
struct Cli {
    /// Config file (defaults to sdf.toml and the user config directory)
    #[arg(short, long)]
    config: Option<String>,

    /// Directory of models used for namespaced references
    #[arg(short, long)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve all references in a model
    Resolve {
        /// Model file
        file: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a definition by global URI, e.g. https://example.com/ns#/sdfData/Foo
    Lookup {
        uri: String,
    },

    /// Validate a JSON value against a data definition in a model
    Validate {
        /// Model file
        file: PathBuf,
        /// Pointer to the definition, e.g. #/sdfData/Temperature
        pointer: String,
        /// JSON value to validate (the default value is used if omitted)
        value: Option<String>,
    },

    /// List the models known to the registry
    Models,

    /// Show the effective configuration
    Config {
        /// Write it to this file instead of printing it
        #[arg(long)]
        save: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match cli.config.as_deref() {
        Some(path) => SdfConfig::load_from(Some(path)),
        None => SdfConfig::load(),
    }
    .context("Failed to load config")?;
    if let Some(path) = cli.registry {
        config.registry.path = Some(path);
    }

    if let Commands::Config { save } = &cli.command {
        match save {
            Some(path) => {
                config
                    .save(path)
                    .with_context(|| format!("Failed to write {}", path))?;
                println!("✅ Configuration saved to {}", path);
            }
            None => print!("{}", toml::to_string_pretty(&config)?),
        }
        return Ok(());
    }

    config.registry.path = config.registry_path();
    let directory = match &config.registry.path {
        Some(_) => Some(DirectoryRegistry::from_config(&config.registry)?),
        None => None,
    };
    let registry: &dyn Registry = match &directory {
        Some(directory) => directory,
        None => &NullRegistry,
    };
    let resolver = Resolver::from_config(registry, &config.resolver);

    match cli.command {
        Commands::Resolve { file, output } => {
            let model = load(&file)?;
            let resolved = resolver.resolve(&model)?;
            let json = serde_json::to_string_pretty(&resolved)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Resolved model written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Lookup { uri } => {
            let resolved = resolver.resolve_uri(&uri)?;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }

        Commands::Validate {
            file,
            pointer,
            value,
        } => {
            let model = load(&file)?;
            let target = resolver.deref(&model, &pointer)?;
            let definition = resolver.resolve_definition(&target.base, &target.definition)?;
            let data = Data::from_definition(&definition)?;

            let result = match value {
                Some(text) => {
                    let input: Value = serde_json::from_str(&text)
                        .with_context(|| format!("Value is not JSON: {}", text))?;
                    data.validate(&input)
                }
                None => data.validate_missing(),
            };

            match result {
                Ok(value) => println!("✅ {}", serde_json::to_string(&value)?),
                Err(e) => {
                    println!("❌ {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Models => {
            let directory = directory
                .as_ref()
                .ok_or_else(|| anyhow!("No registry configured; pass --registry or set registry.path"))?;

            let mut namespaces: Vec<&str> = directory.namespaces().collect();
            namespaces.sort_unstable();
            if namespaces.is_empty() {
                println!("No models found in {}", directory.root().display());
            }
            for ns in namespaces {
                println!("📦 {}", ns);
                for path in directory.paths(ns) {
                    println!("   └─ {}", path.display());
                }
            }
        }

        // Handled before the registry is opened
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn load(path: &Path) -> anyhow::Result<Definition> {
    if !path.is_file() {
        bail!("Model file not found: {}", path.display());
    }
    loader::load_file(path).with_context(|| format!("Failed to load {}", path.display()))
}
