//! Parser for the indentation-marked outline format used by adventure scripts.
//!
//! A line starting with one or more marker characters (`;` by default) opens
//! a new record; the number of markers is the record's depth. Lines without a
//! marker are body text for the most recently opened record. Nesting is
//! expressed purely through marker count:
//!
//! ```text
//! ;start
//! Welcome to the cave.
//! ;;go
//! torchlit_passage
//! Go deeper
//! ;;leave
//! menu/start
//! Head back outside
//! ```
//!
//! parses to one `start` record with body "Welcome to the cave." and two
//! children. The remainder of a marker line is either a bare record name or,
//! when it contains `{`, a JSON object literal that must carry a `"name"`
//! field:
//!
//! ```text
//! ;{"name": "cellar door"}
//! ```
//!
//! Depth may grow by at most one per record; a deeper jump is a hard parse
//! error. Blank lines are preserved verbatim inside bodies. Body text before
//! the first record has nothing to attach to and is discarded.

use thiserror::Error;

/// Default marker character for outline files.
pub const DEFAULT_MARKER: char = ';';

#[derive(Error, Debug)]
pub enum OutlineError {
    #[error("indentation depth {depth} at line {line} exceeds current depth + 1: {content}")]
    MalformedIndentation {
        line: usize,
        depth: usize,
        content: String,
    },
    #[error("malformed object literal at line {line}: {source}")]
    BadLiteral {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("object literal at line {line} has no string \"name\" field")]
    MissingName { line: usize },
}

/// One parsed record: a name, a multi-line text body, and nested children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub text: String,
    pub children: Vec<Record>,
}

impl Record {
    pub fn named(name: impl Into<String>) -> Self {
        Record {
            name: name.into(),
            text: String::new(),
            children: Vec::new(),
        }
    }
}

/// Parse marker-indented text into a list of top-level records.
///
/// Records appear in source order. A record with no children is valid; a
/// record with no body lines has an empty `text`.
pub fn parse_outline(input: &str, marker: char) -> Result<Vec<Record>, OutlineError> {
    let mut roots: Vec<Record> = Vec::new();
    // Open records, innermost last. A record at stack index i has depth i + 1.
    let mut stack: Vec<Record> = Vec::new();
    let mut text_block: Vec<&str> = Vec::new();

    for (line_no, line) in input.split('\n').enumerate() {
        let depth = line.chars().take_while(|&c| c == marker).count();

        if depth == 0 {
            text_block.push(line);
            continue;
        }

        // A marker line closes the text body of whatever record was open.
        if let Some(open) = stack.last_mut() {
            open.text = text_block.join("\n");
        }
        text_block.clear();

        let rest = &line[depth * marker.len_utf8()..];
        let record = parse_record_line(rest, line_no + 1)?;

        if depth > stack.len() + 1 {
            return Err(OutlineError::MalformedIndentation {
                line: line_no + 1,
                depth,
                content: line.to_string(),
            });
        }

        // Close records deeper than the new record's parent level.
        while stack.len() >= depth {
            let finished = stack.pop().unwrap();
            attach(finished, &mut stack, &mut roots);
        }
        stack.push(record);
    }

    if let Some(open) = stack.last_mut() {
        open.text = text_block.join("\n");
    }
    while let Some(finished) = stack.pop() {
        attach(finished, &mut stack, &mut roots);
    }

    Ok(roots)
}

fn attach(record: Record, stack: &mut [Record], roots: &mut Vec<Record>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(record),
        None => roots.push(record),
    }
}

/// Parse the remainder of a marker line: a bare name, or a JSON object
/// literal when the line contains `{`.
fn parse_record_line(rest: &str, line_no: usize) -> Result<Record, OutlineError> {
    if !rest.contains('{') {
        return Ok(Record::named(rest.trim()));
    }

    let value: serde_json::Value =
        serde_json::from_str(rest).map_err(|source| OutlineError::BadLiteral {
            line: line_no,
            source,
        })?;
    let name = value
        .as_object()
        .and_then(|obj| obj.get("name"))
        .and_then(|name| name.as_str())
        .ok_or(OutlineError::MissingName { line: line_no })?;
    Ok(Record::named(name))
}

/// Canonical re-serialization of a record tree.
///
/// Inverse of [`parse_outline`] for trees whose names need no object literal
/// and whose bodies contain no marker-prefixed lines.
pub fn to_outline(records: &[Record], marker: char) -> String {
    let mut lines = Vec::new();
    for record in records {
        write_record(record, 1, marker, &mut lines);
    }
    lines.join("\n")
}

fn write_record(record: &Record, depth: usize, marker: char, lines: &mut Vec<String>) {
    let markers: String = std::iter::repeat_n(marker, depth).collect();
    lines.push(format!("{markers}{}", record.name));
    if !record.text.is_empty() {
        lines.push(record.text.clone());
    }
    for child in &record.children {
        write_record(child, depth + 1, marker, lines);
    }
}
