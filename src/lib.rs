//! Quran page downloader and per-edition SQLite builder.
//!
//! The pipeline runs in three manual steps that only share files on disk:
//! - [`download`] fetches every page of an edition from the API in batches,
//! - [`chapters`] extracts the chapter number → name mapping from `info.json`,
//! - [`database`] rebuilds `<edition>.db` from the two above.

pub mod chapters;
pub mod cli;
pub mod config;
pub mod database;
pub mod download;
mod error;
#[doc(hidden)]
pub mod macros;
pub mod menu;
mod request;

pub use config::{Edition, Settings};
pub use error::{Error, Result};
