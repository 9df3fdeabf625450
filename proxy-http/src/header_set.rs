//! Header block parsing, normalization and reserialization.

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// An ordered mapping from a normalized header name to an ordered list of
/// values, paired with the request-line or status-line it was parsed from.
///
/// Names are keyed case-insensitively and treat `-` and `_` as equivalent;
/// internally every name is stored lowercase with `-` replaced by `_`. Wire
/// serialization always re-capitalizes each `_`-separated word and rejoins
/// with `-`, so `x_cached_by_proxy` round-trips to `X-Cached-By-Proxy`.
///
/// Every mutating operation re-derives the raw byte form immediately, so
/// `raw()` always reflects a header block consistent with the parsed map.
#[derive(Debug, Clone)]
pub struct HeaderSet {
    start_line: String,
    entries: Vec<(String, Vec<String>)>,
    raw: Vec<u8>,
}

impl HeaderSet {
    /// Builds an empty header set with the given start line (request-line or
    /// status-line), with no headers.
    pub fn new(start_line: impl Into<String>) -> Self {
        let mut set = Self {
            start_line: start_line.into(),
            entries: Vec::new(),
            raw: Vec::new(),
        };
        set.rebuild_raw();
        set
    }

    /// Parses a raw header block, as returned by `read_headers`. `raw` is
    /// expected to end in a blank line (`\r\n\r\n` or `\n\n` once endings are
    /// normalized), but a missing terminator is tolerated here: the Stream
    /// Reader is responsible for failing on an incomplete block before this
    /// is ever called.
    pub fn from_raw(raw: &[u8]) -> Self {
        let decoded = String::from_utf8_lossy(raw).into_owned();
        let normalized = decoded.replace("\r\n", "\n");
        let lines: Vec<&str> = normalized.split('\n').collect();
        let unfolded = unfold_lines(&lines);

        let start_line = unfolded.first().cloned().unwrap_or_default();
        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        for line in unfolded.iter().skip(1) {
            if let Some((name, value)) = parse_header_line(line) {
                insert_into(&mut entries, name, value);
            }
        }

        let mut set = Self {
            start_line,
            entries,
            raw: Vec::new(),
        };
        set.rebuild_raw();
        set
    }

    pub fn start_line(&self) -> &str {
        &self.start_line
    }

    /// The raw, always-consistent byte form of this header block, terminated
    /// by a blank CRLF line.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Returns the value list for `name`, or `None` if absent. `name` is
    /// normalized before lookup, so any case/`-`/`_` spelling works.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        let normalized = normalize_name(name);
        self.entries
            .iter()
            .find(|(existing, _)| existing == &normalized)
            .map(|(_, values)| values.as_slice())
    }

    /// Appends `values` to the existing list for `name`, creating it if
    /// absent.
    pub fn insert(&mut self, name: &str, values: Vec<String>) {
        insert_into(&mut self.entries, normalize_name(name), values);
        self.rebuild_raw();
    }

    /// Overwrites the value list for `name` if present. Returns `false`
    /// without effect if `name` was not already set.
    pub fn replace(&mut self, name: &str, values: Vec<String>) -> bool {
        let normalized = normalize_name(name);
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing == &normalized)
        {
            Some((_, existing_values)) => {
                *existing_values = values;
                self.rebuild_raw();
                true
            }
            None => false,
        }
    }

    /// Removes `name` entirely. Returns `false` if it was not present.
    pub fn delete(&mut self, name: &str) -> bool {
        let normalized = normalize_name(name);
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| existing != &normalized);
        let removed = self.entries.len() != before;
        if removed {
            self.rebuild_raw();
        }
        removed
    }

    /// Ordered list of normalized header names, in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn rebuild_raw(&mut self) {
        let mut text = String::new();
        text.push_str(&self.start_line);
        text.push_str("\r\n");
        for (name, values) in &self.entries {
            let formatted = format_name(name);
            for value in values {
                text.push_str(&formatted);
                text.push_str(": ");
                text.push_str(value);
                text.push_str("\r\n");
            }
        }
        text.push_str("\r\n");
        self.raw = text.into_bytes();
    }
}

fn insert_into(entries: &mut Vec<(String, Vec<String>)>, name: String, values: Vec<String>) {
    match entries.iter_mut().find(|(existing, _)| existing == &name) {
        Some((_, existing_values)) => existing_values.extend(values),
        None => entries.push((name, values)),
    }
}

/// Lowercases and joins `-`-separated words with `_`, matching the wire-form
/// inverse performed by [`format_name`].
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .split('-')
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Capitalizes each `_`-separated word and rejoins with `-`, reproducing the
/// conventional wire spelling of a normalized header name.
fn format_name(name: &str) -> String {
    name.split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("-")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

fn unfold_lines(lines: &[&str]) -> Vec<String> {
    let mut unfolded: Vec<String> = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = unfolded.last_mut() {
                last.push(' ');
                last.push_str(line.trim());
            }
        } else {
            unfolded.push((*line).to_string());
        }
    }
    unfolded
}

/// Matches a single unfolded line against `([\w-]+):\s*(.*)`, returning the
/// normalized name and the trimmed value on success. Lines that don't start
/// with a token of word-characters/hyphens followed by a colon are silently
/// dropped, same as the reference parser.
fn parse_header_line(line: &str) -> Option<(String, Vec<String>)> {
    let colon = line.find(':')?;
    let (name_part, rest) = line.split_at(colon);
    if name_part.is_empty() || !name_part.chars().all(is_name_character) {
        return None;
    }
    let value = rest[1..].trim().to_string();
    Some((normalize_name(name_part), vec![value]))
}

fn is_name_character(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}
