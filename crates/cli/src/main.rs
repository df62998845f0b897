//! neocli: command-line client for Neocities sites
//!
//! Wraps the Neocities HTTP API:
//! - Directory tree upload with excludes and extension filtering
//! - Whole-site download into a local directory
//! - File list, deletion, site info, API key retrieval

mod progress;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand, ValueEnum, builder::Styles};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use dialoguer::Confirm;
use serde_json::Value;

use neocli_core::{BatchPolicy, BatchReport, Credentials, Error, NeocitiesApi, listing, sync};

use crate::progress::TransferProgress;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::Red.on_default());

#[derive(Parser)]
#[command(name = "neocli")]
#[command(version)]
#[command(styles = STYLES)]
#[command(about = "Upload, download and manage Neocities sites")]
#[command(long_about = r#"
neocli is a command-line client for the Neocities API.

Credentials come from --key (or --username/--password), falling back to
the NEOCITIES_API_KEY or NEOCITIES_USERNAME/NEOCITIES_PASSWORD
environment variables.

Examples:
  neocli upload --dir ./site              Upload a directory tree
  neocli download ./backup                Download the whole site
  neocli list                             Show the remote file list
  neocli delete blog/old-post.html        Delete one remote file
"#)]
struct Cli {
    /// API key (or set NEOCITIES_API_KEY)
    #[arg(long, global = true, value_name = "KEY")]
    key: Option<String>,

    /// User name (or set NEOCITIES_USERNAME)
    #[arg(long, global = true)]
    username: Option<String>,

    /// Password (or set NEOCITIES_PASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload local files to the site
    Upload {
        /// Local directory tree to upload
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Remote directory to upload into (default: the site root)
        #[arg(long, value_name = "PATH")]
        dir_on_server: Option<String>,

        /// Single file to upload, LOCAL or LOCAL:REMOTE (repeatable)
        #[arg(short, long, value_name = "LOCAL[:REMOTE]")]
        file: Vec<String>,

        /// Stop at the first failed file
        #[arg(long)]
        fail_fast: bool,
    },

    /// Download the whole site into a local directory
    Download {
        /// Existing directory to save into
        dir: PathBuf,

        /// Stop at the first failed file
        #[arg(long)]
        fail_fast: bool,
    },

    /// Show the remote file list
    List {
        /// Only list entries beneath this remote path
        #[arg(long)]
        path: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete files on the site
    Delete {
        /// Remote paths to delete
        paths: Vec<String>,

        /// Delete every file on the site
        #[arg(short = 'A', long)]
        all: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Stop at the first failed path
        #[arg(long)]
        fail_fast: bool,
    },

    /// Show site information
    Info {
        /// Query another site's public info instead of your own
        #[arg(long)]
        sitename: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the API key for the authenticated site
    Key,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let credentials = Credentials::resolve(
        cli.key.as_deref(),
        cli.username.as_deref(),
        cli.password.as_deref(),
    )?;
    let api = NeocitiesApi::new(credentials)?;

    match cli.command {
        Commands::Upload {
            dir,
            dir_on_server,
            file,
            fail_fast,
        } => upload_command(&api, dir, dir_on_server.as_deref(), &file, policy(fail_fast)),
        Commands::Download { dir, fail_fast } => download_command(&api, &dir, policy(fail_fast)),
        Commands::List { path, format } => list_command(&api, path.as_deref(), format),
        Commands::Delete {
            paths,
            all,
            yes,
            fail_fast,
        } => delete_command(&api, &paths, all, yes, policy(fail_fast)),
        Commands::Info { sitename, format } => info_command(&api, sitename.as_deref(), format),
        Commands::Key => key_command(&api),
    }
}

fn policy(fail_fast: bool) -> BatchPolicy {
    if fail_fast {
        BatchPolicy::fail_fast()
    } else {
        BatchPolicy::default()
    }
}

/// Print the batch summary, or the per-item failures for a partial batch.
fn finish_batch(
    progress: TransferProgress,
    done_verb: &str,
    result: neocli_core::Result<BatchReport>,
) -> Result<()> {
    match result {
        Ok(report) => {
            progress.finish(done_verb, &report);
            Ok(())
        }
        Err(Error::PartialBatch(report)) => {
            progress.fail(&report);
            Err(eyre!("{} files failed", report.failures.len()))
        }
        Err(err) => {
            progress.clear();
            Err(err.into())
        }
    }
}

fn upload_command(
    api: &NeocitiesApi,
    dir: Option<PathBuf>,
    dir_on_server: Option<&str>,
    files: &[String],
    policy: BatchPolicy,
) -> Result<()> {
    if dir.is_none() && files.is_empty() {
        return Err(eyre!("nothing to upload: pass --dir and/or --file"));
    }
    // Validate the explicit mappings before any request goes out.
    let file_map = parse_file_mappings(files)?;

    if let Some(dir) = dir {
        let progress = TransferProgress::uploading(&dir.display().to_string());
        let result = sync::upload_dir(api, &dir, dir_on_server, policy);
        finish_batch(progress, "Uploaded", result)?;
    }

    if !file_map.is_empty() {
        let progress = TransferProgress::uploading(&format!("{} files", file_map.len()));
        let result = sync::upload_files(api, &file_map, policy);
        finish_batch(progress, "Uploaded", result)?;
    }

    Ok(())
}

fn download_command(api: &NeocitiesApi, dir: &Path, policy: BatchPolicy) -> Result<()> {
    let progress = TransferProgress::downloading(&dir.display().to_string());
    let result = sync::download_site(api, dir, policy);
    finish_batch(progress, "Downloaded", result)
}

fn list_command(api: &NeocitiesApi, path: Option<&str>, format: OutputFormat) -> Result<()> {
    let listing = api.list(path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&listing.entries)?),
        OutputFormat::Text => {
            for path in listing.paths() {
                println!("{path}");
            }
        }
    }
    Ok(())
}

fn delete_command(
    api: &NeocitiesApi,
    paths: &[String],
    all: bool,
    yes: bool,
    policy: BatchPolicy,
) -> Result<()> {
    if all {
        if !yes && !confirm("Delete ALL files on the site. Continue?")? {
            return Ok(());
        }
        let progress = TransferProgress::deleting("everything");
        match sync::delete_all(api, Duration::from_secs(2)) {
            Ok(count) => {
                progress.finish_count("Deleted", count);
                Ok(())
            }
            Err(err) => {
                progress.clear();
                Err(err.into())
            }
        }
    } else {
        if paths.is_empty() {
            return Err(eyre!("nothing to delete: pass paths or --all"));
        }
        let prompt = format!("Delete {} remote paths. Continue?", paths.len());
        if !yes && !confirm(&prompt)? {
            return Ok(());
        }
        let progress = TransferProgress::deleting(&format!("{} paths", paths.len()));
        let result = sync::delete_paths(api, paths, policy);
        finish_batch(progress, "Deleted", result)
    }
}

fn info_command(api: &NeocitiesApi, sitename: Option<&str>, format: OutputFormat) -> Result<()> {
    let info = api.info(sitename)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        OutputFormat::Text => {
            let value = serde_json::to_value(&info)?;
            if let Some(fields) = value.as_object() {
                for (name, value) in fields {
                    match value {
                        Value::String(text) => println!("{name}: {text}"),
                        other => println!("{name}: {other}"),
                    }
                }
            }
        }
    }
    Ok(())
}

fn key_command(api: &NeocitiesApi) -> Result<()> {
    println!("{}", api.key()?);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Parse `LOCAL` or `LOCAL:REMOTE` mappings from repeated --file flags.
/// A bare local path is normalized to forward slashes and used as the
/// remote path too.
fn parse_file_mappings(specs: &[String]) -> Result<Vec<(PathBuf, String)>> {
    specs
        .iter()
        .map(|spec| {
            let parts: Vec<&str> = spec.split(':').collect();
            match parts[..] {
                [local] if !local.is_empty() => {
                    let local = PathBuf::from(local);
                    let remote = listing::to_remote(&local);
                    Ok((local, remote))
                }
                [local, remote] if !local.is_empty() && !remote.is_empty() => {
                    Ok((PathBuf::from(local), remote.to_string()))
                }
                _ => Err(eyre!(
                    "invalid --file mapping {spec:?}, expected LOCAL or LOCAL:REMOTE"
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_local_path() {
        let mappings = parse_file_mappings(&["site/index.html".to_string()]).unwrap();
        assert_eq!(
            mappings,
            vec![(PathBuf::from("site/index.html"), "site/index.html".to_string())]
        );
    }

    #[test]
    fn test_parse_local_to_remote_mapping() {
        let mappings = parse_file_mappings(&["./build/out.html:index.html".to_string()]).unwrap();
        assert_eq!(
            mappings,
            vec![(PathBuf::from("./build/out.html"), "index.html".to_string())]
        );
    }

    #[test]
    fn test_parse_rejects_extra_colons() {
        assert!(parse_file_mappings(&["a:b:c".to_string()]).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_sides() {
        assert!(parse_file_mappings(&[":remote.html".to_string()]).is_err());
        assert!(parse_file_mappings(&["local.html:".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory as _;
        Cli::command().debug_assert();
    }
}
