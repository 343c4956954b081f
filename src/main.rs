//! # Larder CLI (`larder`)
//!
//! ## Usage
//!
//! ```bash
//! larder --config ./config/larder.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `larder init` | Create the SQLite database and run schema migrations |
//! | `larder seed` | Import recipes from the JSON seed fixture |
//! | `larder tag-fixture <in> <out>` | Generate tags for a raw fixture |
//! | `larder export` | Dump every stored recipe row as JSON |
//! | `larder serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use larder::{config, db, export, server, store, tag_cmd};

/// Larder — a self-hosted recipe box with LLM-assisted recipe generation.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/larder.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "larder",
    about = "Larder — a self-hosted recipe box with LLM-assisted recipe generation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/larder.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the recipes table. This
    /// command is idempotent — running it multiple times is safe.
    Init,

    /// Import recipes from a JSON seed fixture.
    ///
    /// Refuses to run against a non-empty store. The fixture path comes
    /// from `[seed].path` unless overridden with `--file`.
    Seed {
        /// Fixture to import instead of the configured seed path.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Generate tags for every recipe in a raw fixture.
    ///
    /// Reads `input`, calls the tag generator for each recipe, and writes
    /// the tagged fixture to `output`. Requires a configured generation
    /// provider and `OPENAI_API_KEY`.
    TagFixture {
        /// Raw fixture (array of recipes) to tag.
        input: PathBuf,
        /// Where to write the tagged fixture.
        output: PathBuf,
    },

    /// Dump every stored recipe row as pretty JSON.
    ///
    /// Includes superseded versions, so the output is a full backup.
    Export {
        /// Write to a file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Start the HTTP server.
    ///
    /// Runs migrations, seeds an empty store from the configured fixture,
    /// and serves the recipe UI on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            db::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Seed { file } => {
            let pool = db::connect(&cfg).await?;
            db::run_migrations(&pool).await?;
            if store::is_seeded(&pool).await? {
                anyhow::bail!("store already contains recipes; refusing to seed");
            }
            let path = file.as_deref().unwrap_or(&cfg.seed.path);
            let count = store::seed_from_file(&pool, path).await?;
            pool.close().await;
            println!("Seeded {} recipes from {}", count, path.display());
        }
        Commands::TagFixture { input, output } => {
            tag_cmd::run_tag_fixture(&cfg, &input, &output).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
