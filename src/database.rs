//! Builds the per-edition SQLite database from downloaded pages and the chapter names file.
//!
//! The database holds nothing of its own: it is always rebuilt from scratch, so every
//! input is read and parsed before an existing database file is removed.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use rusqlite::{params, Connection, Transaction};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::chapters::{load_chapter_names, ChapterNames};
use crate::config::{Edition, Settings, DB_PRAGMAS, PAGE_RANGE};
use crate::{Error, Result};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chapters (
        chapter_id INTEGER PRIMARY KEY,
        chapter_name TEXT NOT NULL,
        total_verses INTEGER NOT NULL,
        CONSTRAINT valid_total_verses CHECK (total_verses > 0)
    );

    CREATE TABLE IF NOT EXISTS verses (
        verse_id INTEGER PRIMARY KEY AUTOINCREMENT,
        chapter_id INTEGER NOT NULL,
        verse_number INTEGER NOT NULL,
        verse_text TEXT NOT NULL,
        FOREIGN KEY (chapter_id) REFERENCES chapters(chapter_id),
        UNIQUE(chapter_id, verse_number),
        CONSTRAINT valid_verse_number CHECK (verse_number > 0)
    );

    CREATE TABLE IF NOT EXISTS pages (
        page_id INTEGER PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS page_verses (
        page_id INTEGER NOT NULL,
        verse_id INTEGER NOT NULL,
        verse_order INTEGER NOT NULL,
        starts_new_chapter BOOLEAN NOT NULL DEFAULT 0,
        FOREIGN KEY (page_id) REFERENCES pages(page_id),
        FOREIGN KEY (verse_id) REFERENCES verses(verse_id),
        PRIMARY KEY (page_id, verse_id),
        UNIQUE (page_id, verse_order)
    );

    CREATE INDEX IF NOT EXISTS idx_verses_chapter ON verses(chapter_id);
    CREATE INDEX IF NOT EXISTS idx_page_verses_order ON page_verses(page_id, verse_order);
"#;

/// One verse as it appears in a downloaded page body. Extra API fields are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PageVerse {
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    pages: Vec<PageVerse>,
}

/// A parsed page file.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub verses: Vec<PageVerse>,
}

impl Page {
    /// Reads and parses `page_<n>.json`. A missing file is a [`Error::MissingInput`].
    pub fn load(path: &Path, number: u32) -> Result<Self> {
        let raw = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::MissingInput(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let body: PageBody = serde_json::from_slice(&raw).map_err(|e| Error::json(path, e))?;
        Ok(Self {
            number,
            verses: body.pages,
        })
    }
}

/// Row counts of a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub chapters: usize,
    pub pages: usize,
    pub verses: usize,
}

pub struct DatabaseBuilder {
    settings: Settings,
    edition: Edition,
    pages: RangeInclusive<u32>,
}

impl DatabaseBuilder {
    pub fn new(settings: Settings, edition: &str) -> Result<Self> {
        Ok(Self {
            settings,
            edition: edition.parse()?,
            pages: PAGE_RANGE,
        })
    }

    /// Restricts the build to `pages` instead of the whole mushaf.
    pub fn with_pages(mut self, pages: RangeInclusive<u32>) -> Self {
        self.pages = pages;
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.settings.db_file(self.edition)
    }

    /// Full, destructive rebuild of `<db_dir>/<edition>.db`.
    #[instrument(skip(self), fields(edition = %self.edition))]
    pub fn build(&self) -> Result<BuildSummary> {
        let names = load_chapter_names(&self.settings.chapter_names_file())?;
        let pages = self.load_pages()?;

        let db_path = self.db_path();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        if db_path.exists() {
            fs::remove_file(&db_path)?;
        }

        let mut conn = Connection::open(&db_path)?;
        apply_pragmas(&conn)?;
        create_tables(&conn)?;
        let summary = load_rows(&mut conn, &names, &pages)?;
        verify_integrity(&conn)?;

        info!("Database '{}' created and populated successfully", db_path.display());
        Ok(summary)
    }

    fn load_pages(&self) -> Result<Vec<Page>> {
        self.pages
            .clone()
            .map(|n| Page::load(&self.settings.page_file(self.edition, n), n))
            .collect()
    }
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    for (name, value) in DB_PRAGMAS {
        conn.execute_batch(&format!("PRAGMA {name} = {value};"))?;
    }
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    info!("Database tables and indexes created successfully");
    Ok(())
}

/// Number of distinct verses per chapter across all pages.
fn count_verses(pages: &[Page]) -> BTreeMap<u32, usize> {
    let mut seen = BTreeMap::<u32, Vec<u32>>::new();
    for verse in pages.iter().flat_map(|p| &p.verses) {
        let verses = seen.entry(verse.chapter).or_default();
        if !verses.contains(&verse.verse) {
            verses.push(verse.verse);
        }
    }
    seen.into_iter().map(|(chapter, verses)| (chapter, verses.len())).collect()
}

fn load_rows(conn: &mut Connection, names: &ChapterNames, pages: &[Page]) -> Result<BuildSummary> {
    let tx = conn.transaction()?;
    let chapters = insert_chapters(&tx, names, &count_verses(pages))?;
    let verses = insert_pages_and_verses(&tx, pages)?;
    tx.commit()?;
    info!("Data loaded successfully");

    Ok(BuildSummary {
        chapters,
        pages: pages.len(),
        verses,
    })
}

fn insert_chapters(
    tx: &Transaction,
    names: &ChapterNames,
    counts: &BTreeMap<u32, usize>,
) -> Result<usize> {
    let mut stmt = tx.prepare(
        "INSERT INTO chapters (chapter_id, chapter_name, total_verses) VALUES (?1, ?2, ?3)",
    )?;
    let mut inserted = 0;
    for (&chapter_id, name) in names {
        let total = counts.get(&chapter_id).copied().unwrap_or(0);
        if total == 0 {
            warn!("No verses found for chapter {chapter_id}");
            continue;
        }
        stmt.execute(params![chapter_id, name, total as i64])?;
        inserted += 1;
    }
    Ok(inserted)
}

/// Inserts every page, every verse the first time it is seen, and the page ↔ verse links.
/// Returns the number of distinct verses inserted.
fn insert_pages_and_verses(tx: &Transaction, pages: &[Page]) -> Result<usize> {
    let mut insert_page = tx.prepare("INSERT OR IGNORE INTO pages (page_id) VALUES (?1)")?;
    let mut insert_verse = tx.prepare(
        "INSERT INTO verses (chapter_id, verse_number, verse_text) VALUES (?1, ?2, ?3)",
    )?;
    let mut link = tx.prepare(
        "INSERT INTO page_verses (page_id, verse_id, verse_order, starts_new_chapter)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    let mut verse_ids = HashMap::<(u32, u32), i64>::new();
    for page in pages {
        insert_page.execute([page.number])?;

        let mut current_chapter = None;
        for (order, verse) in page.verses.iter().enumerate() {
            let key = (verse.chapter, verse.verse);
            let verse_id = match verse_ids.get(&key) {
                Some(&id) => id,
                None => {
                    let id = insert_verse.insert(params![verse.chapter, verse.verse, verse.text])?;
                    verse_ids.insert(key, id);
                    id
                }
            };
            let starts_new_chapter = current_chapter != Some(verse.chapter);
            link.execute(params![page.number, verse_id, order as i64, starts_new_chapter])?;
            current_chapter = Some(verse.chapter);
        }
    }
    Ok(verse_ids.len())
}

/// Logs, but does not fail on, inconsistencies left after loading.
fn verify_integrity(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT c.chapter_id, c.total_verses, COUNT(v.verse_id) AS actual_verses
         FROM chapters c
         LEFT JOIN verses v ON c.chapter_id = v.chapter_id
         GROUP BY c.chapter_id
         HAVING c.total_verses != actual_verses",
    )?;
    let discrepancies = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if !discrepancies.is_empty() {
        warn!("Found verse count discrepancies in chapters: {discrepancies:?}");
    }

    let mut stmt = conn.prepare(
        "SELECT page_id, COUNT(*) AS duplicate_orders
         FROM page_verses
         GROUP BY page_id, verse_order
         HAVING duplicate_orders > 1",
    )?;
    let duplicates = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if !duplicates.is_empty() {
        warn!("Found duplicate verse orders on pages: {duplicates:?}");
    }
    Ok(())
}
