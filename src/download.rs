use std::{
    ops::RangeInclusive,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Local;
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::config::{
    page_file_in, Edition, Settings, DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONCURRENT, PAGE_RANGE,
};
use crate::macros::elapsed_secs;
use crate::request::request_batch;
use crate::{info_time, Error, Result};

/// Caller-tunable knobs of a download run.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub batch_size: usize,
    pub max_concurrent: usize,
    pub pages: RangeInclusive<u32>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            pages: PAGE_RANGE,
        }
    }
}

/// A page that could not be downloaded, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub page: u32,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub batches: usize,
    /// Pages written to disk, ascending.
    pub written: Vec<u32>,
    /// Pages that failed, ascending.
    pub failed: Vec<PageFailure>,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Downloads every page of one edition into `<data_dir>/<edition>/page_<n>.json`.
#[derive(Debug)]
pub struct Downloader {
    client: Client,
    settings: Settings,
    edition: Edition,
    options: DownloadOptions,
}

impl Downloader {
    /// Validates the edition and the options. Nothing touches the network or the disk here.
    pub fn new(settings: Settings, edition: &str, options: DownloadOptions) -> Result<Self> {
        let edition = edition.parse::<Edition>()?;
        if options.batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be at least 1".into()));
        }
        if options.max_concurrent == 0 {
            return Err(Error::InvalidArgument(
                "max concurrent connections must be at least 1".into(),
            ));
        }
        if options.pages.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "page range {}..={} is empty",
                options.pages.start(),
                options.pages.end()
            )));
        }
        Ok(Self {
            client: Client::new(),
            settings,
            edition,
            options,
        })
    }

    pub fn edition(&self) -> Edition {
        self.edition
    }

    pub fn output_dir(&self) -> PathBuf {
        self.settings.edition_dir(self.edition)
    }

    pub fn batches(&self) -> Vec<RangeInclusive<u32>> {
        partition(&self.options.pages, self.options.batch_size)
    }

    /// Downloads all pages batch by batch. A batch is fully awaited before the next one starts.
    /// Pages that fail are reported and skipped, never retried.
    pub async fn download_all(&self) -> Result<DownloadReport> {
        let start_time = Local::now();
        let dir = self.output_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let limit = Arc::new(Semaphore::new(self.options.max_concurrent));
        let mut report = DownloadReport::default();

        for batch in self.batches() {
            info_time!("Processing pages {} to {}...", batch.start(), batch.end());
            let mut batch_set = request_batch(&self.client, limit.clone(), batch, |page| {
                self.settings.page_url(self.edition, page)
            });

            while let Some(task) = batch_set.join_next().await {
                let (page, body) = task?;
                match store_page(&dir, page, body).await {
                    Ok(()) => report.written.push(page),
                    Err(e) => {
                        error!(page, "Error downloading page {page}: {e}");
                        report.failed.push(PageFailure {
                            page,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            report.batches += 1;

            let processed = report.written.len();
            info_time!(
                "Processed {} pages. Speed: {:.2} pages/second",
                processed,
                pages_per_second(processed, elapsed_secs(start_time))
            );
        }

        report.written.sort_unstable();
        report.failed.sort_unstable_by_key(|f| f.page);

        let total_time = elapsed_secs(start_time);
        info_time!(start_time, "Download complete!");
        info!(
            "Average speed: {:.2} pages/second",
            pages_per_second(report.written.len(), total_time)
        );
        info!("Individual pages saved in: {}", dir.display());
        info!(
            "Total pages written: {}, failed: {}",
            report.written.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

/// Splits `pages` into consecutive chunks of at most `batch_size` pages.
pub fn partition(pages: &RangeInclusive<u32>, batch_size: usize) -> Vec<RangeInclusive<u32>> {
    if pages.is_empty() || batch_size == 0 {
        return Vec::new();
    }
    let step = u32::try_from(batch_size).unwrap_or(u32::MAX);
    let (first, last) = (*pages.start(), *pages.end());
    let mut batches = Vec::new();
    let mut start = first;
    loop {
        let end = start.saturating_add(step - 1).min(last);
        batches.push(start..=end);
        if end == last {
            break;
        }
        start = end + 1;
    }
    batches
}

/// Validates and writes one page. Any failure here belongs to that page alone.
async fn store_page(dir: &Path, page: u32, body: Result<Vec<u8>>) -> Result<()> {
    let (path, body) = validate_page(dir, page, body?)?;
    tokio::fs::write(&path, &body).await?;
    Ok(())
}

/// Only checks that the body is JSON; the content itself is written untouched.
fn validate_page(dir: &Path, page: u32, body: Vec<u8>) -> Result<(PathBuf, Vec<u8>)> {
    let path = page_file_in(dir, page);
    serde_json::from_slice::<serde_json::Value>(&body).map_err(|e| Error::json(&path, e))?;
    Ok((path, body))
}

#[inline]
fn pages_per_second(pages: usize, secs: f64) -> f64 {
    if secs > 0.0 {
        pages as f64 / secs
    } else {
        0.0
    }
}
