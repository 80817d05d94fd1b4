//! Derives the compact chapter-number → chapter-name mapping from the API's `info.json`.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::request::request_page;
use crate::{Error, Result};

/// Chapter number → display (Arabic) name, ordered by chapter number.
pub type ChapterNames = BTreeMap<u32, String>;

#[derive(Debug, Deserialize)]
struct QuranInfo {
    chapters: Vec<ChapterInfo>,
}

#[derive(Debug, Deserialize)]
struct ChapterInfo {
    chapter: u32,
    arabicname: String,
}

/// Reads the reference file at `input`, writes the mapping to `output` and returns it.
pub fn extract_chapter_names(input: &Path, output: &Path) -> Result<ChapterNames> {
    let names = read_chapter_names(input)?;
    write_json(output, &names)?;
    info!(
        "Successfully extracted {} chapter names to {}",
        names.len(),
        output.display()
    );
    Ok(names)
}

/// Parses the chapter list out of an `info.json` style reference file.
pub fn read_chapter_names(input: &Path) -> Result<ChapterNames> {
    let raw = read_input(input)?;
    let info: QuranInfo = serde_json::from_str(&raw).map_err(|e| Error::json(input, e))?;
    Ok(info
        .chapters
        .into_iter()
        .map(|c| (c.chapter, c.arabicname))
        .collect())
}

/// Loads a mapping previously written by [`extract_chapter_names`].
pub fn load_chapter_names(path: &Path) -> Result<ChapterNames> {
    let raw = read_input(path)?;
    // JSON object keys are strings; serde parses them back into numbers.
    serde_json::from_str(&raw).map_err(|e| Error::json(path, e))
}

/// Downloads the reference file into `dest` unless it is already there.
/// The body is stored as served once it parses as JSON.
/// Returns `true` if a download happened.
pub async fn fetch_info_if_missing(client: &Client, url: &str, dest: &Path) -> Result<bool> {
    if tokio::fs::try_exists(dest).await? {
        return Ok(false);
    }
    info!("Input file not found at {}, downloading from API", dest.display());
    let body = request_page(client, url).await?;
    serde_json::from_slice::<serde_json::Value>(&body)
        .map_err(|e| Error::json(PathBuf::from(url), e))?;
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, &body).await?;
    Ok(true)
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::MissingInput(path.to_path_buf()),
        _ => Error::Io(e),
    })
}

/// Pretty prints with a two space indent, leaving non-ASCII text as is.
fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
