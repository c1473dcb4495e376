//! Artsync CLI - mirror and cache-fill tool for binary artifact repositories
//!
//! Discovers every artifact in a remote repository through its listing
//! APIs, then either triggers a cache fill on a proxying server or
//! downloads the bytes locally.

mod commands;
mod output;
mod progress;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Artsync - artifact repository mirror tool
#[derive(Parser)]
#[command(name = "artsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "human")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

/// Connection details for the source repository manager.
#[derive(Args, Clone, Debug)]
struct SourceArgs {
    /// Repository manager base URL
    #[arg(long, env = "NEXUS_URL", default_value = "http://localhost:8081")]
    nexus_url: String,

    /// Repository to read from
    #[arg(short, long, default_value = "maven-releases")]
    repository: String,

    /// Username for authentication
    #[arg(short, long)]
    username: Option<String>,

    /// Password for authentication (or set NEXUS_PASSWORD)
    #[arg(short, long, env = "NEXUS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Mode {
    /// Trigger a cache fill on the target server for each artifact
    Cache,
    /// Download each artifact to local storage
    Download,
    /// Probe the cache and download
    Both,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full export: discover every artifact, then probe or download each one
    Sync {
        #[command(flatten)]
        source: SourceArgs,

        /// What to do with each discovered artifact
        #[arg(long, value_enum, default_value_t = Mode::Cache)]
        mode: Mode,

        /// Cache server base URL (cache/both modes)
        #[arg(long)]
        target_url: Option<String>,

        /// Repository name on the cache server
        #[arg(long, default_value = "releases")]
        target_repository: String,

        /// Local destination directory (download/both modes)
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Put every file directly into the destination directory instead
        /// of mirroring the repository hierarchy
        #[arg(long)]
        flatten: bool,

        /// Outbound requests per second (0 = unlimited)
        #[arg(long, default_value_t = 5)]
        rate_limit: u32,

        /// Concurrent workers (1-20)
        #[arg(long, default_value_t = 4)]
        parallelism: usize,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List the repositories the server exposes
    Repos {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Test connectivity and credentials
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List unique group:artifact:version coordinates in the repository
    Gavs {
        #[command(flatten)]
        source: SourceArgs,

        /// Write to a file instead of stdout (a .json extension writes a JSON array)
        #[arg(long)]
        output_file: Option<PathBuf>,
    },

    /// Print the repository contents as a file tree
    Tree {
        #[command(flatten)]
        source: SourceArgs,

        /// Write to a file instead of stdout
        #[arg(long)]
        output_file: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "artsync=debug,artsync_core=debug"
    } else {
        "artsync=info,artsync_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let ok = match cli.command {
        Commands::Sync {
            source,
            mode,
            target_url,
            target_repository,
            dest,
            flatten,
            rate_limit,
            parallelism,
            yes,
        } => {
            commands::sync(
                commands::SyncArgs {
                    source,
                    mode,
                    target_url,
                    target_repository,
                    dest,
                    flatten,
                    rate_limit,
                    parallelism,
                    yes,
                },
                cli.output,
            )
            .await?
        }

        Commands::Repos { source } => commands::repos(&source, cli.output).await?,

        Commands::Check { source } => commands::check(&source).await?,

        Commands::Gavs {
            source,
            output_file,
        } => commands::gavs(&source, output_file, cli.output).await?,

        Commands::Tree {
            source,
            output_file,
        } => commands::tree(&source, output_file).await?,

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            clap_complete::generate(shell, &mut Cli::command(), "artsync", &mut std::io::stdout());
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
