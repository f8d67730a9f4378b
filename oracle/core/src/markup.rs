//! Gesture-Tag Markup
//!
//! Generated speech may carry gesture cues inline:
//!
//! ```text
//! The stars ^start(animations/Stand/Gestures/ShowSky_1)are turning in
//! your favor^wait(animations/Stand/Gestures/ShowSky_1). Trust them.
//! ```
//!
//! A `^start(id)` must be followed, later in the same string, by a
//! `^wait(id)` with the identical id before any other marker appears. Any
//! number of such pairs may appear. Ids must come from a published vocabulary
//! (see [`crate::gesture::GestureLibrary::vocabulary`]).
//!
//! Backends with markup-aware playback hand valid text straight to the
//! speech engine. Everyone else calls [`strip`] first so tags are never read
//! out loud.

use thiserror::Error;

const START: &str = "start";
const WAIT: &str = "wait";

/// Reasons a string fails gesture-tag validation
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MarkupError {
    /// `^name(` without a closing parenthesis
    #[error("unterminated marker at byte {offset}")]
    Unterminated {
        /// Byte offset of the `^`
        offset: usize,
    },

    /// A marker kind other than `start` or `wait`
    #[error("unknown marker ^{kind}(...)")]
    UnknownMarker {
        /// The marker kind as written
        kind: String,
    },

    /// A gesture id outside the vocabulary
    #[error("unknown gesture id '{id}'")]
    UnknownId {
        /// The id as written
        id: String,
    },

    /// `^start(id)` never closed by `^wait(id)`
    #[error("^start({id}) has no matching ^wait")]
    UnmatchedStart {
        /// The open id
        id: String,
    },

    /// `^wait(id)` with no open `^start(id)`
    #[error("^wait({id}) has no matching ^start")]
    UnmatchedWait {
        /// The id of the stray wait
        id: String,
    },
}

/// One lexical piece of marked-up text
#[derive(Clone, Debug, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Marker { kind: &'a str, id: &'a str },
    Unterminated { offset: usize },
}

/// Split text into plain runs and `^kind(id)` markers
///
/// A `^` not followed by `letters(` is plain text.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;
    let bytes = text.as_bytes();

    while cursor < bytes.len() {
        if bytes[cursor] != b'^' {
            cursor += 1;
            continue;
        }

        let kind_start = cursor + 1;
        let mut kind_end = kind_start;
        while kind_end < bytes.len() && bytes[kind_end].is_ascii_alphabetic() {
            kind_end += 1;
        }

        if kind_end == kind_start || kind_end >= bytes.len() || bytes[kind_end] != b'(' {
            cursor += 1;
            continue;
        }

        if plain_start < cursor {
            tokens.push(Token::Text(&text[plain_start..cursor]));
        }

        match text[kind_end + 1..].find(')') {
            Some(rel) => {
                let id_end = kind_end + 1 + rel;
                tokens.push(Token::Marker {
                    kind: &text[kind_start..kind_end],
                    id: text[kind_end + 1..id_end].trim(),
                });
                cursor = id_end + 1;
                plain_start = cursor;
            }
            None => {
                // The marker swallows its id up to the next whitespace.
                tokens.push(Token::Unterminated { offset: cursor });
                cursor = text[kind_end + 1..]
                    .find(char::is_whitespace)
                    .map_or(bytes.len(), |rel| kind_end + 1 + rel);
                plain_start = cursor;
            }
        }
    }

    if plain_start < bytes.len() {
        tokens.push(Token::Text(&text[plain_start..]));
    }
    tokens
}

/// Validate gesture tags against a vocabulary
///
/// Returns the ids of the balanced pairs in order of appearance. Text with no
/// markers is valid and yields an empty list.
///
/// # Errors
///
/// Returns the first [`MarkupError`] encountered.
pub fn validate(text: &str, vocabulary: &[&str]) -> Result<Vec<String>, MarkupError> {
    let mut pairs = Vec::new();
    let mut open: Option<&str> = None;

    for token in tokenize(text) {
        match token {
            Token::Text(_) => {}
            Token::Unterminated { offset } => return Err(MarkupError::Unterminated { offset }),
            Token::Marker { kind, id } => {
                if kind != START && kind != WAIT {
                    return Err(MarkupError::UnknownMarker {
                        kind: kind.to_string(),
                    });
                }
                if !vocabulary.contains(&id) {
                    return Err(MarkupError::UnknownId { id: id.to_string() });
                }

                match (kind, open) {
                    (START, None) => open = Some(id),
                    (START, Some(pending)) => {
                        return Err(MarkupError::UnmatchedStart {
                            id: pending.to_string(),
                        })
                    }
                    (_, Some(pending)) if pending == id => {
                        pairs.push(id.to_string());
                        open = None;
                    }
                    (_, Some(pending)) => {
                        return Err(MarkupError::UnmatchedStart {
                            id: pending.to_string(),
                        })
                    }
                    (_, None) => return Err(MarkupError::UnmatchedWait { id: id.to_string() }),
                }
            }
        }
    }

    match open {
        Some(id) => Err(MarkupError::UnmatchedStart { id: id.to_string() }),
        None => Ok(pairs),
    }
}

/// Whether the text contains anything that looks like a marker
#[must_use]
pub fn has_markup(text: &str) -> bool {
    tokenize(text)
        .iter()
        .any(|t| !matches!(t, Token::Text(_)))
}

/// Remove every marker and collapse the whitespace left behind
///
/// An unterminated marker is dropped together with its id, which ends at the
/// next whitespace.
#[must_use]
pub fn strip(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    for token in tokenize(text) {
        match token {
            Token::Text(run) => plain.push_str(run),
            Token::Marker { .. } => plain.push(' '),
            Token::Unterminated { .. } => plain.push(' '),
        }
    }

    let collapsed = plain.split_whitespace().collect::<Vec<_>>().join(" ");
    // Tags placed right before punctuation leave a stray space.
    [" .", " ,", " !", " ?", " ;", " :"]
        .iter()
        .fold(collapsed, |acc, pat| acc.replace(pat, &pat[1..]))
}
