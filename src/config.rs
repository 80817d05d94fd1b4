//! Static configuration shared by every step of the pipeline, plus the
//! `Settings` that derive all on-disk paths and remote URLs from it.

use std::{
    fmt,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{Error, Result};

pub const BASE_URL: &str = "https://cdn.jsdelivr.net/gh/fawazahmed0/quran-api@1/";
pub const DATA_DIR: &str = "quran_data";
pub const DB_DIR: &str = "databases";

pub const FIRST_PAGE: u32 = 1;
pub const LAST_PAGE: u32 = 604;
pub const PAGE_RANGE: RangeInclusive<u32> = FIRST_PAGE..=LAST_PAGE;

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

pub const INFO_FILE: &str = "quran_info.json";
pub const CHAPTER_NAMES_FILE: &str = "quran_chapters_names.json";

/// Applied to every freshly built database, in order.
pub const DB_PRAGMAS: [(&str, &str); 4] = [
    ("foreign_keys", "ON"),
    ("synchronous", "OFF"),
    ("journal_mode", "MEMORY"),
    ("cache_size", "10000"),
];

/// A text variant of the Quran served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edition {
    QuranSimple,
    UthmaniEnc,
    UthmaniHafs,
    UthmaniHafs1,
}

impl Edition {
    pub const ALL: [Edition; 4] = [
        Edition::QuranSimple,
        Edition::UthmaniEnc,
        Edition::UthmaniHafs,
        Edition::UthmaniHafs1,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Edition::QuranSimple => "ara-quransimple",
            Edition::UthmaniEnc => "ara-quranuthmanienc",
            Edition::UthmaniHafs => "ara-quranuthmanihaf",
            Edition::UthmaniHafs1 => "ara-quranuthmanihaf1",
        }
    }

    /// Comma separated list of every accepted edition code.
    pub fn allowed() -> String {
        Self::ALL.map(Edition::code).join(", ")
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Edition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.code() == code)
            .ok_or_else(|| Error::InvalidEdition(code.to_string()))
    }
}

/// Where files live and where pages are fetched from.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub data_dir: PathBuf,
    pub db_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            data_dir: PathBuf::from(DATA_DIR),
            db_dir: PathBuf::from(DB_DIR),
        }
    }
}

impl Settings {
    pub fn new(
        base_url: impl Into<String>,
        data_dir: impl Into<PathBuf>,
        db_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            data_dir: data_dir.into(),
            db_dir: db_dir.into(),
        }
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn page_url(&self, edition: Edition, page: u32) -> String {
        format!("{}/editions/{edition}/pages/{page}.json", self.base())
    }

    pub fn info_url(&self) -> String {
        format!("{}/info.json", self.base())
    }

    pub fn edition_dir(&self, edition: Edition) -> PathBuf {
        self.data_dir.join(edition.code())
    }

    pub fn page_file(&self, edition: Edition, page: u32) -> PathBuf {
        page_file_in(&self.edition_dir(edition), page)
    }

    pub fn info_file(&self) -> PathBuf {
        self.data_dir.join(INFO_FILE)
    }

    pub fn chapter_names_file(&self) -> PathBuf {
        self.data_dir.join(CHAPTER_NAMES_FILE)
    }

    pub fn db_file(&self, edition: Edition) -> PathBuf {
        self.db_dir.join(format!("{edition}.db"))
    }
}

#[inline]
pub(crate) fn page_file_in(dir: &Path, page: u32) -> PathBuf {
    dir.join(format!("page_{page}.json"))
}
