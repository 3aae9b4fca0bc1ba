//! Apple Notes extraction through `osascript`.
//!
//! The script logs each note as a block of tagged header lines followed by
//! the body, closed by a terminator line. Tags and terminator embed a random
//! delimiter so note content cannot be mistaken for framing.

use std::process::Command;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};
use rand::Rng;
use webnotes_core::models::IncomingNote;

use super::NoteSource;
use crate::{Error, Result};

pub const SOURCE_TAG: &str = "apple_notes";

const DELETED_FOLDER: &str = "Recently Deleted";

fn script(delim: &str) -> String {
    format!(
        r#"
tell application "Notes"
	repeat with eachNote in every note
		set noteContainer to container of eachNote
		if the name of noteContainer is not "{DELETED_FOLDER}" then
			set noteCreated to (the creation date of eachNote as «class isot» as string)
			set noteUpdated to (the modification date of eachNote as «class isot» as string)
			log "{delim}-id: " & (the id of eachNote)
			log "{delim}-created: " & noteCreated
			log "{delim}-updated: " & noteUpdated
			log "{delim}-title: " & (the name of eachNote)
			log (the body of eachNote)
			log "{delim}{delim}"
		end if
	end repeat
end tell
"#
    )
}

/// AppleScript renders dates as local time without an offset.
fn parse_local_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[derive(Default)]
struct Draft {
    id: String,
    title: String,
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    body: Vec<String>,
}

impl Draft {
    /// Empty bodies are skipped; locked notes also read as empty.
    fn finish(self) -> Option<IncomingNote> {
        let body = self.body.join("\n").trim().to_string();
        if self.id.is_empty() || body.is_empty() {
            return None;
        }
        Some(IncomingNote {
            source: SOURCE_TAG.into(),
            source_identifier: self.id,
            title: self.title,
            body,
            created_at: self.created,
            updated_at: self.updated.or(self.created),
            slug: None,
        })
    }
}

/// Parse the framed script output.
pub fn parse(output: &str, delim: &str) -> Vec<IncomingNote> {
    let terminator = format!("{delim}{delim}");
    let tag = |field: &str| format!("{delim}-{field}: ");
    let (id_tag, created_tag, updated_tag, title_tag) =
        (tag("id"), tag("created"), tag("updated"), tag("title"));

    let mut notes = Vec::new();
    let mut draft = Draft::default();
    for line in output.lines() {
        let line = line.trim();
        if line == terminator {
            notes.extend(std::mem::take(&mut draft).finish());
        } else if let Some(id) = line.strip_prefix(&id_tag) {
            draft.id = id.to_string();
        } else if let Some(created) = line.strip_prefix(&created_tag) {
            draft.created = parse_local_timestamp(created);
        } else if let Some(updated) = line.strip_prefix(&updated_tag) {
            draft.updated = parse_local_timestamp(updated);
        } else if let Some(title) = line.strip_prefix(&title_tag) {
            draft.title = title.to_string();
        } else {
            draft.body.push(line.to_string());
        }
    }
    notes
}

/// Reads every note from the Notes app of the current user.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppleNotes;

impl NoteSource for AppleNotes {
    fn tag(&self) -> &'static str {
        SOURCE_TAG
    }

    fn extract(&self) -> Result<Vec<IncomingNote>> {
        let delim = hex::encode(rand::rng().random::<[u8; 8]>());
        let output = Command::new("osascript")
            .arg("-e")
            .arg(script(&delim))
            .output()
            .map_err(|e| Error::Extraction(format!("could not run osascript: {e}")))?;
        // `log` writes to stderr.
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            warn!("osascript exited with {}", output.status);
            return Err(Error::Extraction(stderr.trim().to_string()));
        }
        let notes = parse(&stderr, &delim);
        debug!("parsed {} notes from Apple Notes", notes.len());
        Ok(notes)
    }
}
