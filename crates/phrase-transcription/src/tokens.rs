//! Token tables and conversion of backend output to text.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{Result, ResultExt};

/// Spelling of the blank token, never emitted as text.
pub const BLANK_TOKEN: &str = "<blk>";
/// `SentencePiece` word-boundary marker.
pub const WORD_BOUNDARY: char = '\u{2581}';
/// Largest id accepted from a token file.
pub const MAX_TOKEN_ID: usize = 1 << 20;

/// Token strings indexed by id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenTable {
    symbols: Vec<String>,
}

impl TokenTable {
    /// Table from symbols already in id order.
    pub fn from_symbols(symbols: Vec<String>) -> Self {
        Self { symbols }
    }

    /// Parse `<symbol> <id>` lines.
    ///
    /// Blank lines, `#` comments, lines with fewer than two fields, and
    /// non-integer, negative, or out-of-range (above [`MAX_TOKEN_ID`]) ids
    /// are skipped. Ids missing from the file map to empty strings.
    pub fn parse(contents: &str) -> Self {
        let mut symbols: Vec<String> = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [symbol, .., id] = fields.as_slice() else {
                continue;
            };
            let Ok(id) = id.parse::<usize>() else {
                continue;
            };
            if id > MAX_TOKEN_ID {
                warn!(symbol = *symbol, id, "token id out of range, skipping");
                continue;
            }
            if id >= symbols.len() {
                symbols.resize(id + 1, String::new());
            }
            (*symbol).clone_into(&mut symbols[id]);
        }
        Self { symbols }
    }

    /// Load a token file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).load_failure(&format!("read {}", path.display()))?;
        let table = Self::parse(&contents);
        debug!(path = %path.display(), tokens = table.len(), "loaded token table");
        Ok(table)
    }

    /// Number of ids covered.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table has no tokens.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol for `id`, if in range.
    pub fn get(&self, id: i64) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.symbols.get(i))
            .map(String::as_str)
    }

    /// Concatenate the symbols for `ids`, turning word boundaries into spaces.
    ///
    /// Out-of-range ids and blanks are skipped. The result is trimmed.
    pub fn to_text(&self, ids: &[i64]) -> String {
        let joined: String = ids
            .iter()
            .filter_map(|&id| self.get(id))
            .filter(|symbol| *symbol != BLANK_TOKEN)
            .collect();
        joined.replace(WORD_BOUNDARY, " ").trim().to_string()
    }
}

/// Raw output of a text-producing backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawResult {
    /// A single transcript.
    Text(String),
    /// Ordered transcript segments.
    Segments(Vec<String>),
    /// Token ids to be resolved through a table.
    TokenIds(Vec<i64>),
}

impl RawResult {
    /// Flatten to text. Segments are joined with single spaces, skipping blank ones.
    pub fn into_text(self, tokens: Option<&TokenTable>) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Segments(segments) => segments
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            Self::TokenIds(ids) => tokens.map(|t| t.to_text(&ids)).unwrap_or_default(),
        }
    }

    /// Interpret loosely structured JSON decode output.
    ///
    /// A string is the transcript; an object contributes its string values
    /// in order; an array contributes strings, the `decode` field of objects,
    /// and scalars rendered as text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Segments(Vec::new()),
            Value::String(s) => Self::Text(s.clone()),
            Value::Object(map) => Self::Segments(
                map.values()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            Value::Array(items) => Self::Segments(items.iter().filter_map(segment_text).collect()),
            scalar => Self::Text(scalar.to_string()),
        }
    }
}

fn segment_text(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("decode").map(|d| match d {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
