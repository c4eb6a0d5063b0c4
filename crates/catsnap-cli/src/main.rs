use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use catsnap_catalog::{CatalogExtractor, ExtractError, PostgresSession};
use catsnap_core::{Config, ObjectKind};
use catsnap_graph::MetadataSnapshot;

const DEFAULT_CONFIG: &str = "catsnap.toml";

/// catsnap - dependency-ordered metadata snapshots of Greenplum catalogs
#[derive(Parser)]
#[command(name = "catsnap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: catsnap.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a snapshot from a live cluster
    Extract {
        /// Output file for the snapshot JSON
        #[arg(short, long, default_value = "snapshot.json")]
        output: PathBuf,

        /// Connection string (overrides config and PG* variables)
        #[arg(long)]
        connection: Option<String>,

        /// Number of concurrent catalog sessions
        #[arg(short, long)]
        sessions: Option<usize>,

        /// Abort the extraction after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Connect over TLS
        #[arg(long)]
        tls: bool,
    },

    /// Summarize a snapshot file
    Inspect {
        /// Snapshot JSON written by `extract`
        snapshot: PathBuf,

        /// Print every object in snapshot order
        #[arg(long)]
        order: bool,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    match cli.command {
        Commands::Extract {
            output,
            connection,
            sessions,
            timeout,
            tls,
        } => {
            let mut config = load_config(cli.config.as_deref(), cli.verbose)?;
            if let Some(sessions) = sessions {
                config.sessions = sessions;
            }
            if timeout.is_some() {
                config.query_timeout_secs = timeout;
            }
            extract_command(config, connection.as_deref(), &output, tls, cli.verbose).await
        }
        Commands::Inspect { snapshot, order } => inspect_command(&snapshot, order),
        Commands::Init { force } => init_command(&config_path, force),
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("catsnap_catalog=debug,catsnap_graph=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = if let Some(config_path) = path {
        Config::from_file(config_path)?
    } else if Path::new(DEFAULT_CONFIG).exists() {
        Config::from_file(Path::new(DEFAULT_CONFIG))?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    Ok(config)
}

/// Extract command - read the catalog, order it and write the snapshot
async fn extract_command(
    config: Config,
    connection: Option<&str>,
    output: &Path,
    tls: bool,
    verbose: bool,
) -> Result<()> {
    let conn_str = connection_string(connection, &config, |var| std::env::var(var).ok()).ok_or_else(|| {
        anyhow::anyhow!(
            "No connection configured. Pass --connection, set `connection` in {} \
             or export PGHOST/PGPORT/PGDATABASE/PGUSER.",
            DEFAULT_CONFIG
        )
    })?;

    if verbose {
        eprintln!(
            "{} {} sessions ({:?})",
            "Opening".cyan(),
            config.session_count(),
            config.catalog_version
        );
    }

    let pool = PostgresSession::open_pool(&conn_str, &config, tls)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open catalog sessions: {}", e))?;

    if verbose {
        if let Some(id) = pool.snapshot_id() {
            eprintln!("{} {}", "Pinned snapshot:".cyan(), id);
        }
        eprintln!("{}", "Reading catalog...".cyan());
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let extractor = CatalogExtractor::new(pool, config.clone());
    let contents = match extractor.extract(&cancel).await {
        Ok(contents) => contents,
        Err(ExtractError::Cancelled) => anyhow::bail!("Extraction interrupted"),
        Err(e) => return Err(e.into()),
    };

    if verbose {
        eprintln!("{}", "Resolving dependencies...".cyan());
    }

    let snapshot = MetadataSnapshot::assemble(contents, &config)?;
    std::fs::write(output, snapshot.to_json()?)?;

    print_summary(&snapshot)?;
    println!();
    println!("{} {}", "Snapshot written to:".green(), output.display());

    Ok(())
}

/// Inspect command - summarize a snapshot written earlier
fn inspect_command(path: &Path, order: bool) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let snapshot = MetadataSnapshot::from_json(&json)?;

    print_summary(&snapshot)?;

    if order {
        println!();
        println!("{}", "Order:".bold());
        for (i, object) in snapshot.objects.iter().enumerate() {
            println!("  {:>4}  {}", i + 1, object.key());
        }
    }

    Ok(())
}

/// Init command - write the default configuration
fn init_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists. Use --force to overwrite.", path.display());
    }

    Config::default().save_to_file(path)?;
    println!("{} {}", "✓ Wrote".green(), path.display());

    Ok(())
}

fn print_summary(snapshot: &MetadataSnapshot) -> Result<()> {
    let mut counts: BTreeMap<ObjectKind, usize> = BTreeMap::new();
    for object in &snapshot.objects {
        *counts.entry(object.kind()).or_default() += 1;
    }

    println!("{}", "Snapshot summary".bold());
    println!("  {} {}", "Database settings:".cyan(), snapshot.database_gucs.len());
    for (kind, count) in &counts {
        println!("  {:<18} {}", format!("{}:", kind).cyan(), count);
    }
    println!("  {} {}", "Fingerprint:".cyan(), snapshot.fingerprint()?);

    if snapshot.cycles.is_empty() {
        println!("{}", "✓ No dependency cycles".green());
    } else {
        println!(
            "{} {} dependency cycle(s)",
            "⚠".yellow(),
            snapshot.cycles.len()
        );
        for cycle in &snapshot.cycles {
            let members: Vec<String> = cycle.iter().map(ToString::to_string).collect();
            println!("    {}", members.join(", ").yellow());
        }
    }

    Ok(())
}

/// Connection string from, in order: the flag, the config file,
/// `CATSNAP_CONNECTION`, then the libpq `PG*` variables
fn connection_string(
    flag: Option<&str>,
    config: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    if let Some(conn) = flag {
        return Some(conn.to_string());
    }
    if let Some(conn) = &config.connection {
        return Some(conn.clone());
    }
    if let Some(conn) = env("CATSNAP_CONNECTION") {
        return Some(conn);
    }

    let host = env("PGHOST")?;
    let mut parts = vec![format!("host={}", host)];
    for (var, key) in [
        ("PGPORT", "port"),
        ("PGDATABASE", "dbname"),
        ("PGUSER", "user"),
        ("PGPASSWORD", "password"),
    ] {
        if let Some(value) = env(var) {
            parts.push(format!("{}={}", key, value));
        }
    }

    Some(parts.join(" "))
}
