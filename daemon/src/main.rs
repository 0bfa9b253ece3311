//! Delos forger CLI: key management and generator-store maintenance.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use delos_node::generator_store::{get_generator_keys, set_generator_keys};
use delos_node::{
    encrypt_generator_keys, init_logging, load_keys_file, save_keys_file, Endpoint,
    GeneratorConfig, GeneratorKeys, GeneratorMetrics, KeypairTable, KeysFile, KeysFileEntry,
    LogFormat, PlainGeneratorKeys,
};
use delos_store::GeneratorStore;
use delos_store_lmdb::environment::DEFAULT_MAP_SIZE;
use delos_store_lmdb::LmdbEnvironment;

#[derive(Parser)]
#[command(name = "delos-forger", about = "Delos block forger tooling")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "DELOS_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory holding the generator store.
    #[arg(long, env = "DELOS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DELOS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "DELOS_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Manage generator key files.
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Maintain the generator store.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(clap::Subcommand)]
enum KeysAction {
    /// Generate a fresh generator key set and add it to a keys file.
    Generate {
        #[arg(long)]
        output: PathBuf,
        /// Encrypt the new keys with this password.
        #[arg(long, env = "DELOS_KEYS_PASSWORD")]
        password: Option<String>,
    },
    /// Encrypt every plain entry of a keys file in place.
    Encrypt {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, env = "DELOS_KEYS_PASSWORD")]
        password: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Print the default configuration.
    Default,
    /// Print the effective configuration after file, env and flag overlays.
    Show,
}

#[derive(clap::Subcommand)]
enum StoreAction {
    /// Import the entries of a keys file into the generator store.
    ImportKeys {
        #[arg(long)]
        file: PathBuf,
        /// Replace keys already stored for an address.
        #[arg(long)]
        overwrite: bool,
    },
    /// Print the status of every configured generator as JSON.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = effective_config(&cli)?;

    let format: LogFormat = config
        .log_format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    init_logging(format, &config.log_level).map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Command::Keys { action } => match action {
            KeysAction::Generate { output, password } => {
                keys_generate(&output, password.as_deref())
            }
            KeysAction::Encrypt { file, password } => keys_encrypt(&file, &password),
        },
        Command::Config { action } => {
            match action {
                ConfigAction::Default => print!("{}", GeneratorConfig::default().to_toml_string()),
                ConfigAction::Show => print!("{}", config.to_toml_string()),
            }
            Ok(())
        }
        Command::Store { action } => {
            let env = LmdbEnvironment::open(&config.data_dir, 4, DEFAULT_MAP_SIZE)
                .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
            let store: Arc<dyn GeneratorStore> = Arc::new(env.generator_store());
            match action {
                StoreAction::ImportKeys { file, overwrite } => {
                    store_import_keys(store.as_ref(), &file, overwrite)
                }
                StoreAction::Status => store_status(store).await,
            }
        }
    }
}

fn effective_config(cli: &Cli) -> anyhow::Result<GeneratorConfig> {
    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::from_toml_file(&path.to_string_lossy())
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    config.validate()?;
    Ok(config)
}

fn keys_generate(output: &Path, password: Option<&str>) -> anyhow::Result<()> {
    let mut file = if output.exists() {
        load_keys_file(output)?
    } else {
        KeysFile::default()
    };

    let plain = PlainGeneratorKeys::generate()?;
    let address = plain.address();
    let keys = match password {
        Some(password) => GeneratorKeys::Encrypted(encrypt_generator_keys(&plain, password)?),
        None => GeneratorKeys::Plain(plain),
    };
    file.keys.push(KeysFileEntry { address, keys });
    save_keys_file(&file, output)?;

    tracing::info!(
        %address,
        path = %output.display(),
        encrypted = password.is_some(),
        "generated generator keys"
    );
    println!("{address}");
    Ok(())
}

fn keys_encrypt(path: &Path, password: &str) -> anyhow::Result<()> {
    if password.is_empty() {
        bail!("refusing to encrypt with an empty password");
    }
    let mut file = load_keys_file(path)?;
    let mut encrypted = 0usize;
    for entry in &mut file.keys {
        if let GeneratorKeys::Plain(plain) = &entry.keys {
            entry.keys = GeneratorKeys::Encrypted(encrypt_generator_keys(plain, password)?);
            encrypted += 1;
        }
    }
    save_keys_file(&file, path)?;
    tracing::info!(path = %path.display(), encrypted, "encrypted keys file");
    Ok(())
}

fn store_import_keys(
    store: &dyn GeneratorStore,
    path: &Path,
    overwrite: bool,
) -> anyhow::Result<()> {
    let file = load_keys_file(path)?;
    let mut imported = 0usize;
    for entry in file.keys {
        if let GeneratorKeys::Plain(plain) = &entry.keys {
            if plain.address() != entry.address {
                bail!("keys listed for {} belong to {}", entry.address, plain.address());
            }
        }
        if !overwrite && get_generator_keys(store, &entry.address)?.is_some() {
            tracing::warn!(address = %entry.address, "keys already stored, skipping");
            continue;
        }
        set_generator_keys(store, &entry.address, &entry.keys)?;
        imported += 1;
    }
    tracing::info!(path = %path.display(), imported, "imported generator keys");
    Ok(())
}

async fn store_status(store: Arc<dyn GeneratorStore>) -> anyhow::Result<()> {
    let endpoint = Endpoint::new(store, KeypairTable::new(), Arc::new(GeneratorMetrics::new()));
    let statuses = endpoint.get_status().await?;
    println!("{}", serde_json::to_string_pretty(&statuses)?);
    Ok(())
}
