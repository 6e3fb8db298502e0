//! merge::conflict
//!
//! Conflict markers: writing, detecting, parsing and resolving them.
//!
//! A region looks like
//!
//! ```text
//! <<<<<<< HEAD
//! current side
//! =======
//! incoming side
//! >>>>>>> feature
//! ```
//!
//! A `|||||||` base section between the current side and `=======` is
//! accepted when parsing and dropped.

use thiserror::Error;

pub const CURRENT_MARKER: &str = "<<<<<<<";
pub const BASE_MARKER: &str = "|||||||";
pub const SEPARATOR: &str = "=======";
pub const INCOMING_MARKER: &str = ">>>>>>>";

/// Malformed marker structure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("conflict starting at line {line} is never closed")]
    Unterminated { line: usize },

    #[error("conflict starting at line {line} has no '=======' separator")]
    MissingSeparator { line: usize },

    #[error("unexpected '{marker}' marker at line {line}")]
    UnexpectedMarker { marker: &'static str, line: usize },
}

/// One conflicted region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRegion {
    /// Lines between `<<<<<<<` and `=======`, terminators included.
    pub current: String,
    /// Lines between `=======` and `>>>>>>>`.
    pub incoming: String,
    /// Text after `>>>>>>> `.
    pub label: String,
    /// 1-based line of the opening marker.
    pub line: usize,
}

/// A file split into plain text and conflicted regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Conflict(ConflictRegion),
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Append a conflict region to `out`.
pub fn write_region(out: &mut String, current: &str, incoming: &str, label: &str) {
    ensure_newline(out);
    out.push_str(CURRENT_MARKER);
    out.push_str(" HEAD\n");
    out.push_str(current);
    ensure_newline(out);
    out.push_str(SEPARATOR);
    out.push('\n');
    out.push_str(incoming);
    ensure_newline(out);
    out.push_str(INCOMING_MARKER);
    out.push(' ');
    out.push_str(label);
    out.push('\n');
}

/// A whole-file conflict between two versions.
pub fn render_conflict(current: &str, incoming: &str, label: &str) -> String {
    let mut out = String::new();
    write_region(&mut out, current, incoming, label);
    out
}

fn marker_kind(line: &str) -> Option<&'static str> {
    let bare = line.trim_end_matches(['\n', '\r']);
    if bare.starts_with(CURRENT_MARKER) {
        Some(CURRENT_MARKER)
    } else if bare.starts_with(INCOMING_MARKER) {
        Some(INCOMING_MARKER)
    } else if bare.starts_with(BASE_MARKER) {
        Some(BASE_MARKER)
    } else if bare == SEPARATOR {
        Some(SEPARATOR)
    } else {
        None
    }
}

/// Whether any line opens or closes a conflict region.
///
/// A lone `=======` is not enough: it is also a Markdown heading underline.
pub fn has_conflict_markers(text: &str) -> bool {
    text.split_inclusive('\n')
        .any(|line| matches!(marker_kind(line), Some(CURRENT_MARKER | INCOMING_MARKER)))
}

/// Inverse of [`has_conflict_markers`].
pub fn is_resolved(text: &str) -> bool {
    !has_conflict_markers(text)
}

enum Section {
    Outside,
    Current,
    Base,
    Incoming,
}

/// Split `text` into plain and conflicted segments.
pub fn parse_conflicts(text: &str) -> Result<Vec<Segment>, ConflictError> {
    let mut segments = Vec::new();
    let mut plain = String::new();
    let mut region = ConflictRegion {
        current: String::new(),
        incoming: String::new(),
        label: String::new(),
        line: 0,
    };
    let mut section = Section::Outside;

    for (index, line) in text.split_inclusive('\n').enumerate() {
        let number = index + 1;
        match (&section, marker_kind(line)) {
            (Section::Outside, Some(CURRENT_MARKER)) => {
                if !plain.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut plain)));
                }
                region = ConflictRegion {
                    current: String::new(),
                    incoming: String::new(),
                    label: String::new(),
                    line: number,
                };
                section = Section::Current;
            }
            (Section::Outside, Some(marker @ (INCOMING_MARKER | BASE_MARKER))) => {
                return Err(ConflictError::UnexpectedMarker { marker, line: number });
            }
            (Section::Outside, _) => plain.push_str(line),

            (Section::Current, Some(BASE_MARKER)) => section = Section::Base,
            (Section::Current | Section::Base, Some(SEPARATOR)) => section = Section::Incoming,
            (Section::Current | Section::Base, Some(INCOMING_MARKER)) => {
                return Err(ConflictError::MissingSeparator { line: region.line });
            }
            (Section::Current, Some(marker)) | (Section::Base, Some(marker)) => {
                return Err(ConflictError::UnexpectedMarker { marker, line: number });
            }
            (Section::Current, None) => region.current.push_str(line),
            (Section::Base, None) => {}

            (Section::Incoming, Some(INCOMING_MARKER)) => {
                let bare = line.trim_end_matches(['\n', '\r']);
                region.label = bare[INCOMING_MARKER.len()..].trim().to_string();
                segments.push(Segment::Conflict(std::mem::replace(
                    &mut region,
                    ConflictRegion {
                        current: String::new(),
                        incoming: String::new(),
                        label: String::new(),
                        line: 0,
                    },
                )));
                section = Section::Outside;
            }
            (Section::Incoming, Some(marker)) => {
                return Err(ConflictError::UnexpectedMarker { marker, line: number });
            }
            (Section::Incoming, None) => region.incoming.push_str(line),
        }
    }

    match section {
        Section::Outside => {
            if !plain.is_empty() {
                segments.push(Segment::Text(plain));
            }
            Ok(segments)
        }
        _ => Err(ConflictError::Unterminated { line: region.line }),
    }
}

/// Number of conflicted regions in `text`.
pub fn count_regions(text: &str) -> Result<usize, ConflictError> {
    Ok(parse_conflicts(text)?
        .iter()
        .filter(|s| matches!(s, Segment::Conflict(_)))
        .count())
}

fn resolve_with(
    text: &str,
    pick: impl Fn(&ConflictRegion) -> String,
) -> Result<String, ConflictError> {
    let mut out = String::with_capacity(text.len());
    for segment in parse_conflicts(text)? {
        match segment {
            Segment::Text(plain) => out.push_str(&plain),
            Segment::Conflict(region) => out.push_str(&pick(&region)),
        }
    }
    Ok(out)
}

/// Keep the HEAD side of every region.
pub fn accept_current(text: &str) -> Result<String, ConflictError> {
    resolve_with(text, |r| r.current.clone())
}

/// Keep the incoming side of every region.
pub fn accept_incoming(text: &str) -> Result<String, ConflictError> {
    resolve_with(text, |r| r.incoming.clone())
}

/// Keep both sides, current first.
pub fn accept_both(text: &str) -> Result<String, ConflictError> {
    resolve_with(text, |r| {
        let mut both = r.current.clone();
        ensure_newline(&mut both);
        both.push_str(&r.incoming);
        both
    })
}
