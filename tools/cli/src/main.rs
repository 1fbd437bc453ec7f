//! credvault CLI - Command line interface for the credential vault.
//!
//! This tool stores, retrieves and removes credentials encrypted under
//! per-service keys in a file-backed software keystore.

mod entries;
mod terminal;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use credvault_common::SecurityLevel;
use credvault_keystore::SoftwareKeystore;
use credvault_vault::{CipherStorage, CredentialVault, VaultConfig, CONFIG_FILENAME};

use crate::entries::EntryStore;
use crate::terminal::TerminalAuthenticator;

/// Keystore file name in the data directory.
const KEYSTORE_FILENAME: &str = "keystore.json";

/// Entry directory name in the data directory.
const ENTRIES_DIRNAME: &str = "entries";

#[derive(Parser)]
#[command(name = "credvault")]
#[command(about = "credvault - Device-local credential vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Data directory (default: platform data dir + /credvault).
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a credential for a service.
    Store {
        /// Service identifier (empty for the default alias).
        #[arg(short, long, default_value = "")]
        service: String,

        /// Username to store.
        #[arg(short, long)]
        username: String,

        /// Require presence confirmation before every read.
        #[arg(long)]
        require_presence: bool,
    },

    /// Retrieve a stored credential.
    Get {
        /// Service identifier.
        #[arg(short, long, default_value = "")]
        service: String,
    },

    /// Remove a credential and its key.
    Remove {
        /// Service identifier.
        #[arg(short, long, default_value = "")]
        service: String,
    },

    /// Show vault information.
    Info,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
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
        .compact()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "credvault", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = resolve_data_dir(cli.data_dir)?;
    let context = VaultContext::open(&data_dir)?;

    match cli.command {
        Commands::Store {
            service,
            username,
            require_presence,
        } => cmd_store(&context, &service, &username, require_presence),

        Commands::Get { service } => cmd_get(&context, &service).await,

        Commands::Remove { service } => cmd_remove(&context, &service),

        Commands::Info => cmd_info(&context, &data_dir),

        Commands::Completions { .. } => Ok(()),
    }
}

/// Everything a command needs, opened from the data directory.
struct VaultContext {
    keystore: Arc<SoftwareKeystore>,
    vault: CredentialVault,
    entries: EntryStore,
}

impl VaultContext {
    fn open(data_dir: &Path) -> Result<Self> {
        let config = load_config(data_dir)?;

        let keystore = Arc::new(
            SoftwareKeystore::open(data_dir.join(KEYSTORE_FILENAME))
                .context("Failed to open keystore")?,
        );
        let vault = CredentialVault::new(keystore.clone(), config).context("Failed to open vault")?;
        vault.set_authenticator(Arc::new(TerminalAuthenticator::new(keystore.clone())));

        Ok(Self {
            keystore,
            vault,
            entries: EntryStore::new(data_dir.join(ENTRIES_DIRNAME)),
        })
    }
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir),
        None => dirs::data_dir()
            .map(|dir| dir.join("credvault"))
            .context("Could not determine a data directory; pass --data-dir"),
    }
}

fn load_config(data_dir: &Path) -> Result<VaultConfig> {
    let path = data_dir.join(CONFIG_FILENAME);
    if !path.exists() {
        return Ok(VaultConfig::default());
    }

    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    VaultConfig::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
}

/// Store a credential.
fn cmd_store(context: &VaultContext, service: &str, username: &str, require_presence: bool) -> Result<()> {
    let level = if require_presence {
        SecurityLevel::RequiresPresence
    } else {
        SecurityLevel::Any
    };

    let password = Zeroizing::new(
        rpassword::prompt_password("Password: ").context("Failed to read password")?,
    );

    let alias = context.vault.resolve_alias(service);
    let entry = context
        .vault
        .encrypt(service, username, &password, level)
        .context("Failed to encrypt credential")?;
    context.entries.save(&alias, &entry)?;

    info!("Stored credential for {}", alias);
    println!("Credential stored for {}", alias);
    Ok(())
}

/// Retrieve a credential, confirming presence if the key demands it.
async fn cmd_get(context: &VaultContext, service: &str) -> Result<()> {
    let alias = context.vault.resolve_alias(service);
    let entry = context
        .entries
        .load(&alias)?
        .with_context(|| format!("No credential stored for {}", alias))?;

    let outcome = context
        .vault
        .decrypt_entry(service, &entry)
        .context("Failed to decrypt credential")?;
    let result = outcome.resolve().await.context("Failed to decrypt credential")?;

    println!("Service:  {}", alias);
    println!("Username: {}", result.username());
    println!("Password: {}", result.password());
    println!("Security: {}", result.security_level());
    Ok(())
}

/// Remove a credential and its key.
fn cmd_remove(context: &VaultContext, service: &str) -> Result<()> {
    let alias = context.vault.resolve_alias(service);

    context.vault.remove_key(service).context("Failed to remove key")?;
    let existed = context.entries.remove(&alias)?;

    if existed {
        println!("Credential removed: {}", alias);
    } else {
        println!("No credential stored for {}", alias);
    }
    Ok(())
}

/// Show vault information.
fn cmd_info(context: &VaultContext, data_dir: &Path) -> Result<()> {
    let config = context.vault.config();

    println!("Vault Information:");
    println!("  Data directory: {}", data_dir.display());
    println!("  Version: {}.{}", config.version.major, config.version.minor);
    println!("  Storage: {}", context.vault.storage_name());
    println!("  Biometry supported: {}", context.vault.biometry_supported());
    println!("  Authorization validity: {:?}", config.auth_validity);
    println!("  Entries: {}", context.entries.dir().display());

    let aliases = context.keystore.aliases()?;
    if aliases.is_empty() {
        println!("  Keys: none");
    } else {
        println!("  Keys:");
        for alias in aliases {
            let key = context.vault.key_manager().fetch_key(&alias)?;
            let created = context
                .keystore
                .created_at(&alias)?
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "    {} ({}, {}, created {})",
                alias,
                key.family(),
                key.security_level(),
                created
            );
        }
    }

    Ok(())
}
