//! Command implementations

use crate::output::print_summary;
use crate::progress::SyncProgress;
use crate::{Mode, OutputFormat, SourceArgs};
use anyhow::{bail, Context, Result};
use artsync_core::{maven, ArtsyncCore};
use artsync_types::{Credentials, SourceConfig, SyncConfig, SyncMode, TargetConfig};
use console::style;
use std::path::PathBuf;
use tabled::{Table, Tabled};
use url::Url;

pub struct SyncArgs {
    pub source: SourceArgs,
    pub mode: Mode,
    pub target_url: Option<String>,
    pub target_repository: String,
    pub dest: Option<PathBuf>,
    pub flatten: bool,
    pub rate_limit: u32,
    pub parallelism: usize,
    pub yes: bool,
}

fn source_config(args: &SourceArgs) -> Result<SourceConfig> {
    let base_url = Url::parse(&args.nexus_url)
        .with_context(|| format!("invalid repository manager URL: {}", args.nexus_url))?;

    let credentials = match (&args.username, &args.password) {
        (Some(username), Some(password)) => Some(Credentials {
            username: username.clone(),
            password: password.clone(),
        }),
        // No --password flag and no NEXUS_PASSWORD in the environment.
        (Some(username), None) => {
            let password = dialoguer::Password::new()
                .with_prompt(format!("Password for {username}"))
                .interact()
                .context("a password is required when --username is given")?;
            Some(Credentials {
                username: username.clone(),
                password,
            })
        }
        _ => None,
    };

    Ok(SourceConfig {
        base_url,
        repository: args.repository.clone(),
        credentials,
    })
}

/// Minimal configuration for commands that only discover.
fn discovery_config(timeout_secs: u64) -> SyncConfig {
    SyncConfig {
        rate_limit: 0,
        parallelism: 1,
        timeout_secs,
        preserve_structure: true,
        destination_root: PathBuf::from("."),
        mode: SyncMode::CacheOnly,
        target: None,
    }
}

fn default_destination() -> PathBuf {
    dirs::download_dir()
        .map(|dir| dir.join("artsync"))
        .unwrap_or_else(|| PathBuf::from("artsync-downloads"))
}

pub async fn sync(args: SyncArgs, format: OutputFormat) -> Result<bool> {
    let source = source_config(&args.source)?;
    let mode = match args.mode {
        Mode::Cache => SyncMode::CacheOnly,
        Mode::Download => SyncMode::DownloadOnly,
        Mode::Both => SyncMode::Both,
    };

    let target = match (&args.target_url, mode) {
        (Some(url), _) => Some(TargetConfig {
            base_url: Url::parse(url)
                .with_context(|| format!("invalid cache server URL: {url}"))?,
            repository: args.target_repository.clone(),
        }),
        (None, SyncMode::DownloadOnly) => None,
        (None, _) => bail!("--target-url is required in cache and both modes"),
    };

    let config = SyncConfig {
        rate_limit: args.rate_limit,
        parallelism: args.parallelism,
        timeout_secs: args.source.timeout,
        preserve_structure: !args.flatten,
        destination_root: args.dest.clone().unwrap_or_else(default_destination),
        mode,
        target,
    };

    if matches!(format, OutputFormat::Human) {
        println!("{}", style("Artsync full export").bold());
        println!(
            "  source:      {}repository/{}",
            source.base_url, source.repository
        );
        if let Some(target) = &config.target {
            println!("  target:      {}{}", target.base_url, target.repository);
        }
        if matches!(mode, SyncMode::DownloadOnly | SyncMode::Both) {
            println!("  destination: {}", config.destination_root.display());
        }
        println!(
            "  rate limit:  {} req/s, workers: {}",
            config.rate_limit, config.parallelism
        );
        println!();

        if !args.yes {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt("Start the full export? This may take a long time")
                .default(false)
                .interact()?;
            if !confirmed {
                println!("Export cancelled.");
                return Ok(true);
            }
        }
    }

    let actions = mode.actions().len();
    let core = ArtsyncCore::new(source, config)?;

    // Ctrl-C stops claiming new artifacts; in-flight operations finish and
    // the summary covers whatever was recorded.
    let cancel = core.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupt received; finishing in-flight artifacts");
            cancel.cancel();
        }
    });

    let events = core.subscribe();
    let render = matches!(format, OutputFormat::Human);
    let progress = tokio::spawn(SyncProgress::drive(events, render, actions));

    let summary = core.run().await?;
    let _ = progress.await;

    print_summary(&summary, format)?;
    Ok(summary.is_clean())
}

#[derive(Tabled)]
struct RepoRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "FORMAT")]
    format: String,
    #[tabled(rename = "TYPE")]
    repo_type: String,
    #[tabled(rename = "URL")]
    url: String,
}

pub async fn repos(source: &SourceArgs, format: OutputFormat) -> Result<bool> {
    let core = ArtsyncCore::new(source_config(source)?, discovery_config(source.timeout))?;
    let mut repositories = core.list_repositories().await?;

    // Maven2 repositories first, then everything else by name.
    repositories.sort_by(|a, b| {
        let a_maven = a.format.eq_ignore_ascii_case("maven2");
        let b_maven = b.format.eq_ignore_ascii_case("maven2");
        b_maven.cmp(&a_maven).then_with(|| a.name.cmp(&b.name))
    });

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&repositories)?),
        OutputFormat::Human => {
            let rows: Vec<RepoRow> = repositories
                .iter()
                .map(|repo| RepoRow {
                    name: repo.name.clone(),
                    format: repo.format.clone(),
                    repo_type: repo.repo_type.clone(),
                    url: repo.url.clone().unwrap_or_default(),
                })
                .collect();
            println!("{}", Table::new(rows));

            let maven = repositories
                .iter()
                .filter(|repo| repo.format.eq_ignore_ascii_case("maven2"))
                .count();
            println!("{} repositories, {maven} maven2", repositories.len());
        }
    }
    Ok(true)
}

pub async fn check(source: &SourceArgs) -> Result<bool> {
    let core = ArtsyncCore::new(source_config(source)?, discovery_config(source.timeout))?;
    match core.check_connectivity().await {
        Ok(true) => {
            println!("{} server is reachable", style("✓").green().bold());
            Ok(true)
        }
        Ok(false) => {
            println!(
                "{} authentication failed - check username/password",
                style("✗").red().bold()
            );
            Ok(false)
        }
        Err(err) => {
            println!("{} cannot connect: {err}", style("✗").red().bold());
            Ok(false)
        }
    }
}

pub async fn gavs(
    source: &SourceArgs,
    output_file: Option<PathBuf>,
    format: OutputFormat,
) -> Result<bool> {
    let core = ArtsyncCore::new(source_config(source)?, discovery_config(source.timeout))?;
    let records = core.discover().await?;
    let gavs = maven::collect_gavs(&records);

    match output_file {
        Some(path) => {
            let json = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
            let contents = if json {
                serde_json::to_string_pretty(&gavs)?
            } else {
                let mut lines = gavs
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n");
                lines.push('\n');
                lines
            };
            std::fs::write(&path, contents)
                .with_context(|| format!("write {}", path.display()))?;
            eprintln!("wrote {} coordinates to {}", gavs.len(), path.display());
        }
        None => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&gavs)?),
            OutputFormat::Human => {
                for gav in &gavs {
                    println!("{gav}");
                }
                eprintln!("{} unique coordinates", gavs.len());
            }
        },
    }
    Ok(true)
}

pub async fn tree(source: &SourceArgs, output_file: Option<PathBuf>) -> Result<bool> {
    let core = ArtsyncCore::new(source_config(source)?, discovery_config(source.timeout))?;
    let records = core.discover().await?;
    let rendered = maven::render_tree(records.iter().map(|record| record.path.as_str()));

    match output_file {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("write {}", path.display()))?;
            eprintln!(
                "tree for {} artifacts written to {}",
                records.len(),
                path.display()
            );
        }
        None => print!("{rendered}"),
    }
    Ok(true)
}
