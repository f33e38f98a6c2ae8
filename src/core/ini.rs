//! # INI Reader
//!
//! Reads INI-like files such as Godot's `project.godot`:
//!
//! ```ini
//! ; comment
//! config_version=4
//!
//! [application]
//! config/name="Demo"
//! ```
//!
//! Keys declared before the first header land in the default section, which every
//! other section falls back to on lookup. The reader is lenient: lines it does not
//! understand are skipped, never reported.

use crate::constants::{DEFAULT_LIST_SEPARATOR, DEFAULT_SECTION_NAME};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Errors raised while loading an INI file.
#[derive(Error, Debug)]
pub enum IniError {
    /// The file does not exist.
    #[error("File '{0}' not found.")]
    NotFound(PathBuf),
    /// Reading the file failed.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
}

/// Normalizes a section name or key according to the case-sensitivity policy.
fn normalize_key(key: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        key.trim().to_string()
    } else {
        key.trim().to_lowercase()
    }
}

/// Strips at most one leading and one trailing double quote.
/// The two are independent: `"abc` becomes `abc`.
fn clean_value(value: &str) -> String {
    let value = value.strip_prefix('"').unwrap_or(value);
    let value = value.strip_suffix('"').unwrap_or(value);
    value.to_string()
}

/// One line of input, classified.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Ignored,
    Header(&'a str),
    Pair(&'a str, &'a str),
    Continuation(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(';') {
        return Line::Ignored;
    }

    if let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        let name = inner.trim();
        return if name.is_empty() {
            Line::Ignored
        } else {
            Line::Header(name)
        };
    }

    match line.split_once('=') {
        Some((key, value)) => Line::Pair(key, value),
        None => Line::Continuation(line),
    }
}

/// A set of key/value pairs belonging to one `[header]` of a document.
#[derive(Debug)]
pub struct Section {
    values: HashMap<String, String>,
    case_sensitive: bool,
    fallback: Weak<Section>,
}

impl PartialEq for Section {
    fn eq(&self, other: &Self) -> bool {
        self.case_sensitive == other.case_sensitive && self.values == other.values
    }
}

impl Section {
    fn new(values: HashMap<String, String>, case_sensitive: bool, fallback: Weak<Self>) -> Self {
        Self {
            values,
            case_sensitive,
            fallback,
        }
    }

    /// Whether keys are compared case-sensitively.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// `true` when the section itself holds no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys stored directly in this section, already normalized.
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.values
    }

    /// Value stored in this section only, without falling back.
    pub fn get_local(&self, key: &str) -> Option<&str> {
        self.values
            .get(&normalize_key(key, self.case_sensitive))
            .map(String::as_str)
    }

    /// Value for `key`, falling back to the document's default section when the
    /// key is absent here.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.get_local(key) {
            return Some(value.to_string());
        }
        self.fallback
            .upgrade()
            .and_then(|default| default.get_local(key).map(str::to_string))
    }

    /// Like [`Section::get`] but with a caller-supplied default.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Checks for a key, optionally looking into the default section as well.
    pub fn contains_key(&self, key: &str, include_default: bool) -> bool {
        if include_default {
            self.get(key).is_some()
        } else {
            self.get_local(key).is_some()
        }
    }

    /// Normalized keys of this section, optionally merged with the default section's.
    pub fn keys(&self, include_default: bool) -> BTreeSet<String> {
        let mut keys: BTreeSet<String> = self.values.keys().cloned().collect();
        if include_default {
            if let Some(default) = self.fallback.upgrade() {
                keys.extend(default.values.keys().cloned());
            }
        }
        keys
    }

    /// Splits the resolved value on `separator` and trims each piece.
    /// Missing or empty values produce an empty list.
    pub fn get_list(&self, key: &str, separator: &str) -> Vec<String> {
        match self.get(key) {
            Some(value) if !value.is_empty() => value
                .split(separator)
                .map(|piece| piece.trim().to_string())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// [`Section::get_list`] with the default `,` separator.
    pub fn get_default_list(&self, key: &str) -> Vec<String> {
        self.get_list(key, DEFAULT_LIST_SEPARATOR)
    }

    fn parse_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Parses the value as `i32`, falling back to `default` when absent or malformed.
    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.parse_or(key, default)
    }

    /// Like [`Section::get_int`], for `i64`.
    pub fn get_long(&self, key: &str, default: i64) -> i64 {
        self.parse_or(key, default)
    }

    /// Like [`Section::get_int`], for `f32`.
    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.parse_or(key, default)
    }

    /// Like [`Section::get_int`], for `f64`.
    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        self.parse_or(key, default)
    }

    /// `true` only for a value equal to `true`, ignoring case.
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }
}

/// A parsed INI document.
///
/// The source text is retained so the case-sensitivity policy can be changed
/// later; doing so re-parses everything.
#[derive(Debug)]
pub struct ConfigDocument {
    source: String,
    case_sensitive: bool,
    default_section: Arc<Section>,
    sections: HashMap<String, Arc<Section>>,
}

impl PartialEq for ConfigDocument {
    fn eq(&self, other: &Self) -> bool {
        self.case_sensitive == other.case_sensitive && self.sections == other.sections
    }
}

impl ConfigDocument {
    /// Reads and parses a file. Invalid UTF-8 sequences are replaced, not rejected.
    pub fn load(path: &Path, case_sensitive: bool) -> Result<Self, IniError> {
        if !path.exists() {
            return Err(IniError::NotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        log::trace!("Parsing INI document at {}", path.display());
        Ok(Self::parse(
            &String::from_utf8_lossy(&bytes),
            case_sensitive,
        ))
    }

    /// Parses INI text.
    pub fn parse(source: &str, case_sensitive: bool) -> Self {
        let (default_section, sections) = build_sections(source, case_sensitive);
        Self {
            source: source.to_string(),
            case_sensitive,
            default_section,
            sections,
        }
    }

    /// Current case-sensitivity policy.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Changes the case-sensitivity policy and re-parses the retained source.
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        if self.case_sensitive == case_sensitive {
            return;
        }
        let (default_section, sections) = build_sections(&self.source, case_sensitive);
        self.case_sensitive = case_sensitive;
        self.default_section = default_section;
        self.sections = sections;
    }

    /// Keys declared before any header.
    pub fn default_section(&self) -> &Section {
        &self.default_section
    }

    /// Looks up a section by name, normalized with the current policy.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .get(&normalize_key(name, self.case_sensitive))
            .map(Arc::as_ref)
    }

    /// Normalized section names, including the default section's.
    pub fn section_names(&self) -> BTreeSet<&str> {
        self.sections.keys().map(String::as_str).collect()
    }

    /// Shortcut for `section(section).and_then(|s| s.get(key))`.
    pub fn value(&self, section: &str, key: &str) -> Option<String> {
        self.section(section).and_then(|s| s.get(key))
    }
}

fn build_sections(
    source: &str,
    case_sensitive: bool,
) -> (Arc<Section>, HashMap<String, Arc<Section>>) {
    let default_key = normalize_key(DEFAULT_SECTION_NAME, case_sensitive);
    let mut raw: HashMap<String, HashMap<String, String>> = HashMap::new();
    raw.insert(default_key.clone(), HashMap::new());

    let mut current = default_key.clone();
    let mut last_key: Option<String> = None;

    for line in source.lines() {
        match classify(line) {
            Line::Ignored => {}
            Line::Header(name) => {
                // First declaration wins; a repeated header re-selects the existing section.
                let key = normalize_key(name, case_sensitive);
                raw.entry(key.clone()).or_default();
                current = key;
                last_key = None;
            }
            Line::Pair(key, value) => {
                let key = normalize_key(key, case_sensitive);
                raw.entry(current.clone())
                    .or_default()
                    .insert(key.clone(), clean_value(value.trim()));
                last_key = Some(key);
            }
            Line::Continuation(text) => {
                let Some(key) = &last_key else {
                    continue;
                };
                if let Some(existing) = raw.get_mut(&current).and_then(|s| s.get_mut(key)) {
                    let joined = format!("{existing}{text}");
                    *existing = clean_value(&joined);
                }
            }
        }
    }

    let default_values = raw.remove(&default_key).unwrap_or_default();
    let default_section = Arc::new(Section::new(default_values, case_sensitive, Weak::new()));
    let fallback = Arc::downgrade(&default_section);

    let mut sections: HashMap<String, Arc<Section>> = raw
        .into_iter()
        .map(|(name, values)| {
            let section = Section::new(values, case_sensitive, fallback.clone());
            (name, Arc::new(section))
        })
        .collect();
    sections.insert(default_key, Arc::clone(&default_section));

    (default_section, sections)
}
