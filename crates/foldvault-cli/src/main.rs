//! FoldVault - adaptive compression vault
//!
//! Stores files as folded, indexed records in a local directory and reads
//! them back whole, by line range or by search term.

mod display;
mod json_output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use display::{
    display_error, display_info, display_metadata, display_receipt, display_search,
    display_stats, display_success,
};
use foldvault_config::{Config, ConfigLoader};
use foldvault_engine::{AllowAll, FsStorage, StoreRequest, VaultEngine};
use foldvault_types::{ContentClass, RecordId};
use json_output::{CommandOutput, DeleteJson, GetJson, RangeJson, SearchJson, StatsJson};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Owner used when a command does not name one
const LOCAL_OWNER: &str = "local";

/// FoldVault - adaptive compression vault
#[derive(Parser)]
#[command(
    name = "foldvault",
    version = env!("CARGO_PKG_VERSION"),
    about = "Adaptive multi-strategy compression vault",
    long_about = "FoldVault folds content through a learned pipeline of lossless codecs,\n\
                  indexes it for line range and term queries, and stores it as\n\
                  integrity-checked records in a local directory."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Vault directory, overriding the configured data directory
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold and store a file
    Store {
        /// Owner of the new record
        #[arg(long, default_value = LOCAL_OWNER)]
        owner: String,
        /// Collection the record belongs to
        #[arg(long, default_value = "default")]
        collection: String,
        /// Record name, defaults to the file name
        #[arg(long)]
        name: Option<String>,
        /// Content class hint (code, markup, json, text, binary)
        #[arg(long)]
        class: Option<ContentClass>,
        /// File to store
        file: PathBuf,
    },
    /// Retrieve a whole record
    Get {
        /// Record id
        id: RecordId,
        /// Write the content to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Requesting owner
        #[arg(long, default_value = LOCAL_OWNER)]
        owner: String,
    },
    /// Retrieve an inclusive range of lines
    Range {
        /// Record id
        id: RecordId,
        /// First line, zero based
        start: u64,
        /// Last line, inclusive
        end: u64,
        /// Requesting owner
        #[arg(long, default_value = LOCAL_OWNER)]
        owner: String,
    },
    /// Find occurrences of a term
    Search {
        /// Record id
        id: RecordId,
        /// Term to look for
        term: String,
        /// Maximum number of matches
        #[arg(short, long, default_value_t = 20)]
        max: usize,
        /// Requesting owner
        #[arg(long, default_value = LOCAL_OWNER)]
        owner: String,
    },
    /// Show a record's metadata
    Info {
        /// Record id
        id: RecordId,
        /// Requesting owner
        #[arg(long, default_value = LOCAL_OWNER)]
        owner: String,
    },
    /// Show vault statistics
    Stats {
        /// Only count records of this owner
        #[arg(long)]
        owner: Option<String>,
    },
    /// Delete a record
    Rm {
        /// Record id
        id: RecordId,
        /// Requesting owner
        #[arg(long, default_value = LOCAL_OWNER)]
        owner: String,
    },
    /// Show configuration
    Config {
        /// Show the built-in defaults instead of the loaded configuration
        #[arg(long)]
        default: bool,
        /// Write the configuration to this file (format from extension)
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::load(cli.config.as_deref(), cli.vault.as_deref())
        .context("Failed to load configuration")?;
    init_logging(&cli, &config)?;

    let output = Output {
        json: cli.json,
        quiet: cli.quiet,
        vault_dir: config.vault.data_dir.clone(),
    };

    match cli.command {
        Commands::Config { default, write } => config_command(&output, config, default, write),
        Commands::Store {
            owner,
            collection,
            name,
            class,
            file,
        } => {
            let engine = open_engine(config).await?;
            store_command(&output, &engine, owner, collection, name, class, &file).await
        }
        Commands::Get { id, out, owner } => {
            let engine = open_engine(config).await?;
            get_command(&output, &engine, &owner, &id, out).await
        }
        Commands::Range {
            id,
            start,
            end,
            owner,
        } => {
            let engine = open_engine(config).await?;
            range_command(&output, &engine, &owner, &id, start, end).await
        }
        Commands::Search {
            id,
            term,
            max,
            owner,
        } => {
            let engine = open_engine(config).await?;
            search_command(&output, &engine, &owner, &id, term, max).await
        }
        Commands::Info { id, owner } => {
            let engine = open_engine(config).await?;
            info_command(&output, &engine, &owner, &id).await
        }
        Commands::Stats { owner } => {
            let engine = open_engine(config).await?;
            stats_command(&output, &engine, owner).await
        }
        Commands::Rm { id, owner } => {
            let engine = open_engine(config).await?;
            rm_command(&output, &engine, &owner, &id).await
        }
    }
}

fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let installed = if config.logging.json_format {
        builder.json().try_init()
    } else {
        builder.with_ansi(config.logging.colored_output).try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))
}

async fn open_engine(config: Config) -> Result<VaultEngine> {
    let vault_dir = config.vault.data_dir.clone();
    let storage = FsStorage::open(&vault_dir)
        .await
        .with_context(|| format!("Failed to open vault at {}", vault_dir.display()))?;
    debug!("Opened vault at {}", storage.root().display());

    let engine = VaultEngine::builder()
        .with_config(config)
        .with_storage(Arc::new(storage))
        .with_authorizer(Arc::new(AllowAll))
        .build()
        .await?;
    Ok(engine)
}

/// Where and how command results are printed
struct Output {
    json: bool,
    quiet: bool,
    vault_dir: PathBuf,
}

impl Output {
    fn emit_json<T: Serialize>(&self, operation: &str, data: T) -> Result<()> {
        let output = CommandOutput::new(operation, &self.vault_dir, data);
        println!("{}", output.to_json()?);
        Ok(())
    }
}

async fn store_command(
    output: &Output,
    engine: &VaultEngine,
    owner: String,
    collection: String,
    name: Option<String>,
    class: Option<ContentClass>,
    file: &Path,
) -> Result<()> {
    let content = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let name = match name {
        Some(name) => name,
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("Cannot derive a record name from the path; pass --name")?,
    };

    info!("Storing {} ({} bytes)", file.display(), content.len());
    let mut request = StoreRequest::new(owner, collection, name, content);
    if let Some(class) = class {
        request = request.with_class_hint(class);
    }

    let receipt = engine.store(request).await?;
    engine.save_memory().await?;

    if output.json {
        output.emit_json("store", &receipt)
    } else if output.quiet {
        println!("{}", receipt.record_id);
        Ok(())
    } else {
        display_receipt(&receipt);
        Ok(())
    }
}

async fn get_command(
    output: &Output,
    engine: &VaultEngine,
    owner: &str,
    id: &RecordId,
    out: Option<PathBuf>,
) -> Result<()> {
    let retrieved = engine.retrieve(owner, id).await?;

    if let Some(path) = &out {
        tokio::fs::write(path, &retrieved.content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if output.json {
        let content = match out {
            Some(_) => None,
            None => String::from_utf8(retrieved.content).ok(),
        };
        return output.emit_json(
            "get",
            GetJson {
                record: retrieved.metadata,
                output_path: out.map(|p| p.display().to_string()),
                content,
            },
        );
    }

    match out {
        Some(path) => {
            if !output.quiet {
                display_success(&format!(
                    "Wrote {} bytes to {}",
                    retrieved.content.len(),
                    path.display()
                ));
            }
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&retrieved.content)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn range_command(
    output: &Output,
    engine: &VaultEngine,
    owner: &str,
    id: &RecordId,
    start: u64,
    end: u64,
) -> Result<()> {
    let range = engine.retrieve_range(owner, id, start, end).await?;

    if output.json {
        return output.emit_json("range", RangeJson::from(&range));
    }

    if !output.quiet {
        display_info(&format!(
            "Lines {}..={} at offset {}{}",
            range.start_line,
            range.end_line,
            range.offset,
            if range.from_segments {
                " (segments)"
            } else {
                ""
            }
        ));
    }
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&range.content)?;
    stdout.flush()?;
    Ok(())
}

async fn search_command(
    output: &Output,
    engine: &VaultEngine,
    owner: &str,
    id: &RecordId,
    term: String,
    max: usize,
) -> Result<()> {
    let result = engine.search(owner, id, &term, max).await?;

    if output.json {
        output.emit_json("search", SearchJson { term, result })
    } else {
        display_search(&term, &result);
        Ok(())
    }
}

async fn info_command(
    output: &Output,
    engine: &VaultEngine,
    owner: &str,
    id: &RecordId,
) -> Result<()> {
    let metadata = engine.metadata(owner, id).await?;

    if output.json {
        output.emit_json("info", &metadata)
    } else {
        display_metadata(&metadata);
        Ok(())
    }
}

async fn stats_command(output: &Output, engine: &VaultEngine, owner: Option<String>) -> Result<()> {
    let cataloged = engine.refresh_catalog().await?;
    debug!("Cataloged {} records", cataloged);
    let stats = engine.get_stats(owner.as_deref());

    if output.json {
        output.emit_json("stats", StatsJson::new(owner, stats))
    } else {
        display_stats(owner.as_deref(), &stats);
        Ok(())
    }
}

async fn rm_command(output: &Output, engine: &VaultEngine, owner: &str, id: &RecordId) -> Result<()> {
    engine.delete(owner, id).await?;

    if output.json {
        output.emit_json(
            "rm",
            DeleteJson {
                record_id: id.to_string(),
                deleted: true,
            },
        )
    } else {
        if !output.quiet {
            display_success(&format!("Deleted {}", id));
        }
        Ok(())
    }
}

fn config_command(
    output: &Output,
    config: Config,
    default: bool,
    write: Option<PathBuf>,
) -> Result<()> {
    let config = if default { Config::default() } else { config };

    if let Some(path) = write {
        if path.exists() {
            bail!("Refusing to overwrite {}", path.display());
        }
        ConfigLoader::save_to_file(&config, &path)?;
        if !output.quiet && !output.json {
            display_success(&format!("Wrote configuration to {}", path.display()));
        }
    }

    if output.json {
        return output.emit_json("config", &config);
    }

    let label = if default {
        "Default configuration:"
    } else {
        "Current configuration:"
    };
    println!("{} {}", style("⚙").blue().bold(), label);
    print!("{}", render_yaml(&config)?);
    Ok(())
}

fn render_yaml(config: &Config) -> Result<String> {
    serde_yaml::to_string(config).context("Failed to render configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use foldvault_config::{ConfigBuilder, SNAPSHOT_FILE};
    use rstest::rstest;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_store_arguments() {
        let cli = Cli::try_parse_from([
            "foldvault",
            "--vault",
            "/tmp/v",
            "store",
            "--owner",
            "alice",
            "--collection",
            "src",
            "--class",
            "code",
            "main.rs",
        ])
        .unwrap();

        assert_eq!(cli.vault, Some(PathBuf::from("/tmp/v")));
        match cli.command {
            Commands::Store {
                owner,
                collection,
                name,
                class,
                file,
            } => {
                assert_eq!(owner, "alice");
                assert_eq!(collection, "src");
                assert_eq!(name, None);
                assert_eq!(class, Some(ContentClass::Code));
                assert_eq!(file, PathBuf::from("main.rs"));
            }
            _ => panic!("expected store"),
        }
    }

    #[rstest]
    #[case(&["foldvault", "range", "not-a-uuid", "0", "1"])]
    #[case(&["foldvault", "store", "--class", "fractal", "x"])]
    #[case(&["foldvault", "range", "6f9619ff-8b86-4d01-b42d-00cf4fc964ff", "0"])]
    fn test_rejected_arguments(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["foldvault", "stats", "--json", "--owner", "bob"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Stats { owner: Some(ref o) } if o == "bob"));
    }

    #[tokio::test]
    async fn test_store_and_read_back_through_fs_vault() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let vault = temp_dir.path().join("vault");
        let config = || {
            ConfigBuilder::new()
                .data_dir(Some(vault.clone()))
                .build()
                .unwrap()
        };
        let engine = open_engine(config()).await.unwrap();

        let receipt = engine
            .store(StoreRequest::new(LOCAL_OWNER, "c", "n", b"hello\nvault\n".to_vec()))
            .await
            .unwrap();
        assert!(engine.save_memory().await.unwrap());
        assert!(vault.join(SNAPSHOT_FILE).exists());

        let reopened = open_engine(config()).await.unwrap();
        assert_eq!(reopened.refresh_catalog().await.unwrap(), 1);
        let retrieved = reopened
            .retrieve(LOCAL_OWNER, &receipt.record_id)
            .await
            .unwrap();
        assert_eq!(retrieved.content, b"hello\nvault\n");
    }

    #[test]
    fn test_render_yaml_mentions_sections() {
        let text = render_yaml(&Config::default()).unwrap();
        assert!(text.contains("selector"));
        assert!(text.contains("vault"));
    }
}
