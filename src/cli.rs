use std::{io, path::PathBuf};

use clap::{Parser, Subcommand};
use reqwest::Client;
use tracing::{error, warn};

use crate::chapters::{extract_chapter_names, fetch_info_if_missing};
use crate::config::{
    Edition, Settings, BASE_URL, DATA_DIR, DB_DIR, DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONCURRENT,
    FIRST_PAGE, LAST_PAGE,
};
use crate::database::DatabaseBuilder;
use crate::download::{DownloadOptions, Downloader};
use crate::menu::select_edition;
use crate::{Error, Result};

#[derive(Parser, Debug)]
#[command(author, version, about = "Download Quran pages and build per-edition SQLite databases")]
pub struct Cli {
    /// Directory holding downloaded pages and chapter files
    #[arg(long, global = true, default_value = DATA_DIR)]
    pub data_dir: PathBuf,
    /// Directory the databases are written to
    #[arg(long, global = true, default_value = DB_DIR)]
    pub db_dir: PathBuf,
    /// Root of the Quran API
    #[arg(long, global = true, default_value = BASE_URL)]
    pub base_url: String,
    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download every page of an edition from the API
    Pages {
        /// Specify edition directly instead of selection menu
        #[arg(short, long)]
        edition: Option<String>,
        /// Batch size for downloads
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Maximum concurrent connections
        #[arg(short, long, default_value_t = DEFAULT_MAX_CONCURRENT)]
        max_concurrent: usize,
        #[arg(long, default_value_t = FIRST_PAGE)]
        first_page: u32,
        #[arg(long, default_value_t = LAST_PAGE)]
        last_page: u32,
    },
    /// Extract chapter names from the reference info file
    Chapters {
        /// Reference file, defaults to <data-dir>/quran_info.json
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output file, defaults to <data-dir>/quran_chapters_names.json
        #[arg(long)]
        output: Option<PathBuf>,
        /// Download the reference file from the API if it is missing
        #[arg(long)]
        fetch: bool,
    },
    /// Build the SQLite database of an edition
    Build {
        /// Specify edition directly instead of selection menu
        #[arg(short, long)]
        edition: Option<String>,
    },
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings::new(self.base_url.clone(), self.data_dir.clone(), self.db_dir.clone())
    }
}

/// Runs one pipeline step. The returned error is the one the process should exit with.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = cli.settings();
    match cli.command {
        Command::Pages {
            edition,
            batch_size,
            max_concurrent,
            first_page,
            last_page,
        } => {
            let Some(edition) = resolve_edition(edition)? else {
                return Ok(());
            };
            let options = DownloadOptions {
                batch_size,
                max_concurrent,
                pages: first_page..=last_page,
            };
            let report = Downloader::new(settings, &edition, options)?.download_all().await?;
            if !report.is_complete() {
                for failure in &report.failed {
                    warn!(page = failure.page, "{}", failure.reason);
                }
                return Err(Error::IncompleteDownload {
                    failed: report.failed.len(),
                });
            }
            Ok(())
        }
        Command::Chapters { input, output, fetch } => {
            let input = input.unwrap_or_else(|| settings.info_file());
            let output = output.unwrap_or_else(|| settings.chapter_names_file());
            if fetch {
                fetch_info_if_missing(&Client::new(), &settings.info_url(), &input).await?;
            }
            tokio::task::spawn_blocking(move || extract_chapter_names(&input, &output)).await??;
            Ok(())
        }
        Command::Build { edition } => {
            let Some(edition) = resolve_edition(edition)? else {
                return Ok(());
            };
            let builder = DatabaseBuilder::new(settings, &edition)?;
            let summary = tokio::task::spawn_blocking(move || builder.build()).await?;
            if let Err(Error::MissingInput(path)) = &summary {
                error!("Required input not found: {}", path.display());
                error!("Run `pages` and `chapters` first to produce the inputs for {edition}");
            }
            summary.map(|_| ())
        }
    }
}

/// The edition code from the flag, or from the interactive menu when the flag is absent.
fn resolve_edition(flag: Option<String>) -> Result<Option<String>> {
    match flag {
        Some(code) => Ok(Some(code)),
        None => {
            let choice = select_edition(io::stdin().lock(), io::stdout())?;
            Ok(choice.map(|e: Edition| e.code().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_defaults_match_config() {
        let cli = Cli::try_parse_from(["mushaf", "pages", "-e", "ara-quransimple"]).unwrap();
        match cli.command {
            Command::Pages {
                edition,
                batch_size,
                max_concurrent,
                first_page,
                last_page,
            } => {
                assert_eq!(edition.as_deref(), Some("ara-quransimple"));
                assert_eq!(batch_size, DEFAULT_BATCH_SIZE);
                assert_eq!(max_concurrent, DEFAULT_MAX_CONCURRENT);
                assert_eq!((first_page, last_page), (FIRST_PAGE, LAST_PAGE));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.data_dir, PathBuf::from(DATA_DIR));
    }

    #[test]
    fn short_flags_and_global_dirs() {
        let cli = Cli::try_parse_from([
            "mushaf", "pages", "-b", "20", "-m", "10", "--data-dir", "/tmp/q",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Pages { edition: None, batch_size: 20, max_concurrent: 10, .. }
        ));
        assert_eq!(
            cli.settings().edition_dir(Edition::QuranSimple),
            PathBuf::from("/tmp/q/ara-quransimple")
        );
    }

    #[test]
    fn build_takes_edition() {
        let cli =
            Cli::try_parse_from(["mushaf", "build", "--edition", "ara-quranuthmanihaf1"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Build { edition: Some(ref e) } if e == "ara-quranuthmanihaf1"
        ));
    }
}
