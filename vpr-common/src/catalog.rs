//! Prompt catalog
//!
//! Loads the fixed, server-known prompt sources once at startup:
//! - Per-language JSONL files of secret/question items
//! - Per-language, per-role warm-up instruction TXT files
//!
//! Missing files log a warning and yield an empty source; the sequencer
//! decides whether an empty source is acceptable for the configured quotas.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::model::{Language, Role};
use crate::Result;

/// One secret/question prompt pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub item_id: String,
    pub secret_text: String,
    pub question_for_secret: String,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    entry_id: Option<Value>,
    secret_text: String,
    question_for_secret: String,
}

/// Prompt sources for one language
#[derive(Debug, Clone, Default)]
pub struct LanguageCatalog {
    pub items: Vec<CatalogItem>,
    pub nobody: Vec<String>,
    pub onlyme: Vec<String>,
}

/// All prompt sources, keyed by language
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    languages: HashMap<Language, LanguageCatalog>,
}

/// JSONL file holding the secret/question items for `language`
pub fn items_file_name(language: Language) -> String {
    format!("deepseek_secret_filter_results_filtered_{}.jsonl", language.code())
}

/// TXT file holding the warm-up instructions for `language` and `role`
pub fn instructions_file_name(language: Language, role: Role) -> String {
    format!("instruction_{}_{}.txt", language.code(), role.as_str())
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every prompt source from `source_dir`
    pub fn load(source_dir: &Path) -> Result<Self> {
        let mut catalog = Catalog::new();

        for language in Language::ORDER {
            let items_path = source_dir.join(items_file_name(language));
            let items = match read_optional(&items_path)? {
                Some(content) => parse_items(&content),
                None => Vec::new(),
            };

            let mut warmup = HashMap::new();
            for role in [Role::Nobody, Role::OnlyMe] {
                let path = source_dir.join(instructions_file_name(language, role));
                let lines = match read_optional(&path)? {
                    Some(content) => parse_instructions(&content),
                    None => Vec::new(),
                };
                warmup.insert(role, lines);
            }

            info!(
                language = %language,
                items = items.len(),
                nobody = warmup.get(&Role::Nobody).map_or(0, Vec::len),
                onlyme = warmup.get(&Role::OnlyMe).map_or(0, Vec::len),
                "Loaded prompt catalog"
            );

            catalog = catalog.with_items(language, items);
            for (role, lines) in warmup {
                catalog = catalog.with_instructions(language, role, lines);
            }
        }

        Ok(catalog)
    }

    /// Replace the secret/question items for `language`
    pub fn with_items(mut self, language: Language, items: Vec<CatalogItem>) -> Self {
        self.languages.entry(language).or_default().items = items;
        self
    }

    /// Replace the warm-up lines for `language` and `role`
    ///
    /// Roles other than the two warm-up variants are ignored.
    pub fn with_instructions(mut self, language: Language, role: Role, lines: Vec<String>) -> Self {
        let entry = self.languages.entry(language).or_default();
        match role {
            Role::Nobody => entry.nobody = lines,
            Role::OnlyMe => entry.onlyme = lines,
            Role::Secret | Role::Question => {}
        }
        self
    }

    pub fn items(&self, language: Language) -> &[CatalogItem] {
        self.languages
            .get(&language)
            .map(|c| c.items.as_slice())
            .unwrap_or(&[])
    }

    pub fn instructions(&self, language: Language, role: Role) -> &[String] {
        match (self.languages.get(&language), role) {
            (Some(c), Role::Nobody) => &c.nobody,
            (Some(c), Role::OnlyMe) => &c.onlyme,
            _ => &[],
        }
    }

    /// Look up an item by id
    pub fn item(&self, language: Language, item_id: &str) -> Option<&CatalogItem> {
        self.items(language).iter().find(|item| item.item_id == item_id)
    }

    /// Item at a completed-count index; wraps when the source is exhausted
    pub fn item_at(&self, language: Language, index: u32) -> Option<&CatalogItem> {
        let items = self.items(language);
        if items.is_empty() {
            return None;
        }
        items.get(index as usize % items.len())
    }

    /// Warm-up line at a completed-count index, with its line index; wraps
    pub fn instruction_at(&self, language: Language, role: Role, index: u32) -> Option<(usize, &str)> {
        let lines = self.instructions(language, role);
        if lines.is_empty() {
            return None;
        }
        let idx = index as usize % lines.len();
        Some((idx, lines[idx].as_str()))
    }

    /// Whether `item_id` names a prompt of the given kind
    ///
    /// Warm-up item ids are line indices into the instruction file.
    pub fn contains(&self, language: Language, role: Role, item_id: &str) -> bool {
        match role {
            Role::Nobody | Role::OnlyMe => item_id
                .parse::<usize>()
                .map(|idx| idx < self.instructions(language, role).len())
                .unwrap_or(false),
            Role::Secret | Role::Question => self.item(language, item_id).is_some(),
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        warn!("Prompt source not found: {}", path.display());
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}

/// Parse JSONL items; `entry_id` defaults to the 0-based line number
pub fn parse_items(content: &str) -> Vec<CatalogItem> {
    let mut items = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<RawEntry>(line) {
            Ok(raw) => {
                let item_id = match raw.entry_id {
                    Some(Value::String(s)) => s,
                    Some(Value::Null) | None => line_num.to_string(),
                    Some(other) => other.to_string(),
                };
                items.push(CatalogItem {
                    item_id,
                    secret_text: raw.secret_text,
                    question_for_secret: raw.question_for_secret,
                });
            }
            Err(e) => {
                warn!("Skipping malformed catalog line {}: {}", line_num + 1, e);
            }
        }
    }

    items
}

/// Parse instruction lines: one trimmed, non-blank line per prompt
pub fn parse_instructions(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
