//! Choose-your-own-adventure game graph.
//!
//! Game scripts are outline files (see [`crate::outline`]): each top-level
//! record is a location whose body is markdown, and each child record is a
//! transition — the child's name is the target location, its body the choice
//! prompt. Locations are addressed by a qualified name `<file>/<local-name>`
//! so scripts can reference each other; a bare name refers to a location in
//! the same file.
//!
//! Every location also gets a `unique_id`: the first 16 hex characters of a
//! SHA-256 fingerprint over its content. The id doubles as the output
//! filename, so ids are stable across rebuilds unless the location's content
//! changes, and never collide — on the (astronomically rare) digest
//! collision an attempt counter is folded into the hash until an unused id
//! comes out.

use crate::document::{Document, DocumentError};
use crate::layout::Layout;
use crate::outline::{self, OutlineError, Record};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

/// Qualified name of the location the game opens at, unless configured.
pub const DEFAULT_START: &str = "menu/start";

#[derive(Error, Debug)]
pub enum AdventureError {
    #[error("in {file}: {source}")]
    Outline {
        file: String,
        #[source]
        source: OutlineError,
    },
    #[error("duplicate location name {0}")]
    DuplicateLocation(String),
    #[error("start location {0} does not exist")]
    UnknownStart(String),
    #[error("location {location} links to unknown target {target}")]
    UnknownTarget { location: String, target: String },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A directed edge out of a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Qualified name of the destination location.
    pub target: String,
    /// Markdown shown for this choice.
    pub prompt_text: String,
}

/// A node in the game graph. Immutable after construction except for the
/// `unique_id`, which is assigned once the whole graph is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Globally unique `<file>/<local-name>`.
    pub name: String,
    pub text: String,
    pub links: Vec<Transition>,
    pub unique_id: String,
}

/// The assembled game graph.
#[derive(Debug)]
pub struct GameData {
    pub locations: BTreeMap<String, Location>,
    /// Reverse index, unique_id → qualified name.
    pub ids: BTreeMap<String, String>,
    pub start_name: String,
}

/// Resolve a name appearing in `filename` to a qualified name. Names that
/// already carry a namespace separator pass through unchanged.
pub fn resolve_name(filename: &str, name: &str) -> String {
    if name.contains('/') {
        name.to_string()
    } else {
        format!("{filename}/{name}")
    }
}

/// Candidate unique id for a location: 16 hex chars of SHA-256 over its
/// content plus an attempt counter. Pure, so id assignment is deterministic
/// for unchanged content.
fn candidate_id(location: &Location, attempt: u32) -> String {
    let mut parts: Vec<&str> = vec![&location.name, &location.text];
    parts.extend(location.links.iter().map(|t| t.target.as_str()));
    parts.extend(location.links.iter().map(|t| t.prompt_text.as_str()));

    let mut hasher = Sha256::new();
    hasher.update(parts.join("@@"));
    hasher.update(format!("#{attempt}"));
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(16);
    hex
}

impl GameData {
    /// Build the graph from `(filename, raw outline text)` pairs.
    pub fn from_files(
        files: &[(String, String)],
        start_name: &str,
        marker: char,
    ) -> Result<GameData, AdventureError> {
        let mut game = GameData {
            locations: BTreeMap::new(),
            ids: BTreeMap::new(),
            start_name: start_name.to_string(),
        };

        for (filename, raw) in files {
            let records =
                outline::parse_outline(raw, marker).map_err(|source| AdventureError::Outline {
                    file: filename.clone(),
                    source,
                })?;
            for record in records {
                let location = location_from_record(&record, filename);
                if game.locations.contains_key(&location.name) {
                    return Err(AdventureError::DuplicateLocation(location.name));
                }
                game.locations.insert(location.name.clone(), location);
            }
        }

        game.assign_unique_ids();

        if !game.locations.contains_key(start_name) {
            return Err(AdventureError::UnknownStart(start_name.to_string()));
        }

        Ok(game)
    }

    /// Assign every location a distinct content-derived id. Retries with an
    /// incremented attempt counter on collision; given 64 bits of digest per
    /// candidate this terminates after at most a handful of attempts.
    fn assign_unique_ids(&mut self) {
        let names: Vec<String> = self.locations.keys().cloned().collect();
        for name in names {
            let location = &self.locations[&name];
            let mut attempt = 0;
            let id = loop {
                let id = candidate_id(location, attempt);
                if !self.ids.contains_key(&id) {
                    break id;
                }
                attempt += 1;
            };
            if attempt > 3 {
                eprintln!("unique id for {name} took {attempt} attempts");
            }
            self.ids.insert(id.clone(), name.clone());
            self.locations.get_mut(&name).unwrap().unique_id = id;
        }
    }

    pub fn start(&self) -> &Location {
        &self.locations[&self.start_name]
    }

    /// One markdown document per location, plus the redirect index.
    pub fn make_documents(&self, layout: &Layout) -> Result<Vec<Document>, AdventureError> {
        let title = "Choose your own adventure";

        let mut docs = Vec::new();
        for location in self.locations.values() {
            let has_links = !location.links.is_empty();

            let mut markdown = Vec::new();
            if has_links {
                // YAML metadata block: one keyed entry per choice, consumed
                // by the game template for keyboard navigation.
                markdown.push("---".to_string());
                markdown.push("link:".to_string());
                for (i, link) in location.links.iter().enumerate() {
                    let Some(key) = choice_key(i + 1) else {
                        break;
                    };
                    let target = self.locations.get(&link.target).ok_or_else(|| {
                        AdventureError::UnknownTarget {
                            location: location.name.clone(),
                            target: link.target.clone(),
                        }
                    })?;
                    markdown.push(format!("- key: {key}"));
                    markdown.push(format!("  target: {}", target.unique_id));
                    if link.prompt_text.contains('\n') {
                        markdown.push("  text: |".to_string());
                        for line in link.prompt_text.split('\n') {
                            markdown.push(format!("    {line}"));
                        }
                    } else {
                        markdown.push(format!("  text: {}", link.prompt_text));
                    }
                }
                markdown.push("...".to_string());
                markdown.push(String::new());
            }
            markdown.push(location.text.clone());

            let mut d = Document::new(&location.unique_id);
            d.source_data = Some(markdown.join("\n"));
            d.set_target_path(&layout.cyoa_target_path(&location.unique_id), layout)?;
            d.is_markdown = true;
            d.template = layout.template_cyoa();
            if has_links {
                d.add_flag("haslinks");
            }
            d.add_variable("pagetitle", title);
            docs.push(d);
        }

        docs.push(self.make_index(layout)?);
        Ok(docs)
    }

    /// `index.html`: a raw meta-refresh redirect to the start location.
    fn make_index(&self, layout: &Layout) -> Result<Document, AdventureError> {
        let html = [
            "<!DOCTYPE html>",
            "<html>",
            "<head>",
            &format!(
                "<meta http-equiv=\"refresh\" content=\"0; URL='{}'\" />",
                self.start().unique_id
            ),
            "</head>",
            "</html>",
        ]
        .join("\n");

        let mut d = Document::new("index.html");
        d.target_data = Some(html.into_bytes());
        d.set_target_path(&layout.output_cyoa_index(), layout)?;
        Ok(d)
    }
}

fn location_from_record(record: &Record, filename: &str) -> Location {
    let links = record
        .children
        .iter()
        .map(|child| Transition {
            target: resolve_name(filename, &child.name),
            prompt_text: child.text.clone(),
        })
        .collect();
    Location {
        name: resolve_name(filename, &record.name),
        text: record.text.clone(),
        links,
        unique_id: String::new(),
    }
}

/// Key assigned to the nth choice (1-based): digits `1`-`9`, then letters
/// `a`-`z`. Returns `None` past 35 choices.
fn choice_key(n: usize) -> Option<char> {
    match n {
        1..=9 => char::from_digit(n as u32, 10),
        10..=35 => char::from_u32(b'a' as u32 + n as u32 - 10),
        _ => None,
    }
}
