//! Markdown and text files under a directory, one note per file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use walkdir::{DirEntry, WalkDir};
use webnotes_core::models::IncomingNote;

use super::NoteSource;
use crate::{Error, Result};

pub const SOURCE_TAG: &str = "directory";

const EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn is_note_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// First Markdown heading, else the file stem.
fn title_of(path: &Path, body: &str) -> String {
    body.lines()
        .find_map(|line| {
            let heading = line.trim_start().strip_prefix('#')?;
            let heading = heading.trim_start_matches('#').trim();
            (!heading.is_empty()).then(|| heading.to_string())
        })
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
}

#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_note(&self, path: &Path) -> Result<Option<IncomingNote>> {
        let body = fs::read_to_string(path)?;
        let body = body.trim();
        if body.is_empty() {
            return Ok(None);
        }
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| Error::Extraction(format!("{} escaped the root", path.display())))?;
        // Forward slashes keep identifiers stable across platforms.
        let identifier = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let meta = fs::metadata(path)?;
        let updated = meta.modified().ok().map(DateTime::<Utc>::from);
        let created = meta.created().ok().map(DateTime::<Utc>::from).or(updated);

        Ok(Some(IncomingNote {
            source: SOURCE_TAG.into(),
            source_identifier: identifier,
            title: title_of(path, body),
            body: body.to_string(),
            created_at: created,
            updated_at: updated,
            slug: None,
        }))
    }
}

impl NoteSource for DirectorySource {
    fn tag(&self) -> &'static str {
        SOURCE_TAG
    }

    fn extract(&self) -> Result<Vec<IncomingNote>> {
        if !self.root.is_dir() {
            return Err(Error::Extraction(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        let mut notes = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_note_file(entry.path()) {
                continue;
            }
            match self.read_note(entry.path()) {
                Ok(Some(note)) => notes.push(note),
                Ok(None) => debug!("skipping empty {}", entry.path().display()),
                Err(e) => warn!("skipping {}: {e}", entry.path().display()),
            }
        }
        Ok(notes)
    }
}
