//! Section extraction from free-form LLM responses
//!
//! Agents ask the model to answer under fixed headers (`SUMMARY:`,
//! `## TIMELINE:`, ...). [`SectionParser`] recovers the text under each
//! expected header without ever failing: headers the model skipped keep the
//! [`NO_CONTENT`] placeholder.

use std::collections::BTreeMap;

/// Content of a header the response never filled in
pub const NO_CONTENT: &str = "No content available";

/// Parses responses into a fixed set of named sections
#[derive(Debug, Clone)]
pub struct SectionParser {
    headers: Vec<String>,
}

impl SectionParser {
    /// Create a parser for the given expected headers
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
        }
    }

    /// Expected headers, in declaration order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Split `text` into sections
    ///
    /// A trimmed line is a header when, after dropping an optional `# ` or
    /// `## ` prefix, it reads exactly `<HEADER>:`. Lines before the first
    /// header and blank lines are dropped.
    pub fn parse(&self, text: &str) -> Sections {
        let mut entries: BTreeMap<String, String> = self
            .headers
            .iter()
            .map(|h| (h.clone(), NO_CONTENT.to_string()))
            .collect();

        let mut current: Option<&str> = None;
        let mut lines: Vec<&str> = Vec::new();

        for line in text.lines().map(str::trim) {
            if let Some(header) = self.match_header(line) {
                if let Some(open) = current {
                    entries.insert(open.to_string(), lines.join("\n").trim().to_string());
                }
                current = Some(header);
                lines.clear();
            } else if current.is_some() && !line.is_empty() {
                lines.push(line);
            }
        }

        if let Some(open) = current
            && !lines.is_empty()
        {
            entries.insert(open.to_string(), lines.join("\n").trim().to_string());
        }

        Sections { entries }
    }

    fn match_header(&self, line: &str) -> Option<&str> {
        let stripped = line
            .strip_prefix("## ")
            .or_else(|| line.strip_prefix("# "))
            .unwrap_or(line);
        let name = stripped.strip_suffix(':')?;
        self.headers
            .iter()
            .find(|h| h.as_str() == name)
            .map(String::as_str)
    }
}

/// Parsed sections keyed by header
///
/// The key set always equals the parser's expected headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections {
    entries: BTreeMap<String, String>,
}

impl Sections {
    /// Content under `header`, or `None` if the header was not expected
    pub fn get(&self, header: &str) -> Option<&str> {
        self.entries.get(header).map(String::as_str)
    }

    /// Content under `header`, falling back to the placeholder
    pub fn content(&self, header: &str) -> String {
        self.get(header).unwrap_or(NO_CONTENT).to_string()
    }

    /// Whether the response filled in `header`
    pub fn is_filled(&self, header: &str) -> bool {
        self.get(header).is_some_and(|c| c != NO_CONTENT)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries
    }
}
