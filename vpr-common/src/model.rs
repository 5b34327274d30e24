//! Task data model
//!
//! Plain value records shared by the sequencer, the server and the client:
//! languages, task types, roles, tasks, per-user progress counters and the
//! per-category quotas they count towards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Recording language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    En,
}

impl Language {
    /// Fixed processing order: every `zh` phase completes before `en` starts
    pub const ORDER: [Language; 2] = [Language::Zh, Language::En];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }

    /// Human-readable name used in task descriptions
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Zh => "Chinese",
            Language::En => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zh" => Ok(Language::Zh),
            "en" => Ok(Language::En),
            _ => Err(Error::InvalidInput("Language must be 'zh' or 'en'".to_string())),
        }
    }
}

/// Kind of recording task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Warm-up reading of an instruction line
    Instruction,
    /// One half of a secret/question pair
    Pair,
    /// Standalone question unrelated to a pair
    ExtraQuestion,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Instruction => "instruction",
            TaskType::Pair => "pair",
            TaskType::ExtraQuestion => "extra_question",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "instruction" => Ok(TaskType::Instruction),
            "pair" => Ok(TaskType::Pair),
            "extra_question" => Ok(TaskType::ExtraQuestion),
            _ => Err(Error::InvalidInput(
                "Task type must be 'instruction', 'pair' or 'extra_question'".to_string(),
            )),
        }
    }
}

/// Role of a recording within its task type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Warm-up variant "Nobody"
    Nobody,
    /// Warm-up variant "OnlyMe"
    OnlyMe,
    Secret,
    Question,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Nobody => "nobody",
            Role::OnlyMe => "onlyme",
            Role::Secret => "secret",
            Role::Question => "question",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nobody" => Ok(Role::Nobody),
            "onlyme" => Ok(Role::OnlyMe),
            "secret" => Ok(Role::Secret),
            "question" => Ok(Role::Question),
            _ => Err(Error::InvalidInput(
                "Role must be 'nobody', 'onlyme', 'secret' or 'question'".to_string(),
            )),
        }
    }
}

/// Identity of a recording: what an upload claims to be
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub language: Language,
    pub task_type: TaskType,
    pub role: Role,
    pub item_id: String,
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.language, self.task_type, self.role, self.item_id
        )
    }
}

/// Immutable recording task drawn from the prompt catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub language: Language,
    pub task_type: TaskType,
    pub role: Role,
    pub item_id: String,
    /// Prompt text the participant reads aloud
    pub text: String,
}

impl Task {
    pub fn key(&self) -> TaskKey {
        TaskKey {
            language: self.language,
            task_type: self.task_type,
            role: self.role,
            item_id: self.item_id.clone(),
        }
    }

    /// Short heading shown above the prompt, e.g. "Chinese Pair - Secret Text"
    pub fn description(&self) -> String {
        let lang = self.language.display_name();
        match self.task_type {
            TaskType::Instruction => {
                let variant = if self.role == Role::Nobody { "Nobody" } else { "OnlyMe" };
                format!("{} Warm-up - {}", lang, variant)
            }
            TaskType::Pair | TaskType::ExtraQuestion => {
                let type_desc = if self.task_type == TaskType::Pair {
                    "Pair"
                } else {
                    "Extra Question"
                };
                let role_desc = if self.role == Role::Secret {
                    "Secret Text"
                } else {
                    "Question"
                };
                format!("{} {} - {}", lang, type_desc, role_desc)
            }
        }
    }
}

/// Completed-item counters for one language
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageProgress {
    pub nobody_done: u32,
    pub onlyme_done: u32,
    pub pairs_done: u32,
    pub extra_questions_done: u32,
    /// Pair whose secret half is recorded but whose question half is not
    pub pending_question: Option<String>,
}

impl LanguageProgress {
    pub fn total_done(&self) -> u32 {
        self.nobody_done + self.onlyme_done + self.pairs_done + self.extra_questions_done
    }
}

/// Per-user progress across both languages
///
/// Serialized as the flat `zh_*` / `en_*` record the HTTP API exchanges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProgressWire", into = "ProgressWire")]
pub struct Progress {
    pub zh: LanguageProgress,
    pub en: LanguageProgress,
}

impl Progress {
    pub fn language(&self, language: Language) -> &LanguageProgress {
        match language {
            Language::Zh => &self.zh,
            Language::En => &self.en,
        }
    }

    pub fn language_mut(&mut self, language: Language) -> &mut LanguageProgress {
        match language {
            Language::Zh => &mut self.zh,
            Language::En => &mut self.en,
        }
    }

    /// Completed categories across both languages (pairs count once)
    pub fn total_done(&self) -> u32 {
        self.zh.total_done() + self.en.total_done()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProgressWire {
    #[serde(default)]
    zh_nobody_done: u32,
    #[serde(default)]
    zh_onlyme_done: u32,
    #[serde(default)]
    zh_pairs_done: u32,
    #[serde(default)]
    zh_extra_questions_done: u32,
    #[serde(default)]
    zh_pending_question: Option<String>,
    #[serde(default)]
    en_nobody_done: u32,
    #[serde(default)]
    en_onlyme_done: u32,
    #[serde(default)]
    en_pairs_done: u32,
    #[serde(default)]
    en_extra_questions_done: u32,
    #[serde(default)]
    en_pending_question: Option<String>,
}

impl From<ProgressWire> for Progress {
    fn from(w: ProgressWire) -> Self {
        Progress {
            zh: LanguageProgress {
                nobody_done: w.zh_nobody_done,
                onlyme_done: w.zh_onlyme_done,
                pairs_done: w.zh_pairs_done,
                extra_questions_done: w.zh_extra_questions_done,
                pending_question: w.zh_pending_question,
            },
            en: LanguageProgress {
                nobody_done: w.en_nobody_done,
                onlyme_done: w.en_onlyme_done,
                pairs_done: w.en_pairs_done,
                extra_questions_done: w.en_extra_questions_done,
                pending_question: w.en_pending_question,
            },
        }
    }
}

impl From<Progress> for ProgressWire {
    fn from(p: Progress) -> Self {
        ProgressWire {
            zh_nobody_done: p.zh.nobody_done,
            zh_onlyme_done: p.zh.onlyme_done,
            zh_pairs_done: p.zh.pairs_done,
            zh_extra_questions_done: p.zh.extra_questions_done,
            zh_pending_question: p.zh.pending_question,
            en_nobody_done: p.en.nobody_done,
            en_onlyme_done: p.en.onlyme_done,
            en_pairs_done: p.en.pairs_done,
            en_extra_questions_done: p.en.extra_questions_done,
            en_pending_question: p.en.pending_question,
        }
    }
}

/// Category maxima for one language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageQuotas {
    /// Warm-up readings, "Nobody" variant
    #[serde(default)]
    pub nobody: u32,
    /// Warm-up readings, "OnlyMe" variant
    #[serde(default)]
    pub onlyme: u32,
    #[serde(default = "default_pairs_quota")]
    pub pairs: u32,
    #[serde(default = "default_extra_questions_quota")]
    pub extra_questions: u32,
}

fn default_pairs_quota() -> u32 {
    20
}

fn default_extra_questions_quota() -> u32 {
    10
}

impl Default for LanguageQuotas {
    fn default() -> Self {
        Self {
            nobody: 0,
            onlyme: 0,
            pairs: default_pairs_quota(),
            extra_questions: default_extra_questions_quota(),
        }
    }
}

impl LanguageQuotas {
    pub fn total(&self) -> u32 {
        self.nobody + self.onlyme + self.pairs + self.extra_questions
    }

    /// Whether every counter in `progress` has reached its maximum
    pub fn is_satisfied_by(&self, progress: &LanguageProgress) -> bool {
        progress.nobody_done >= self.nobody
            && progress.onlyme_done >= self.onlyme
            && progress.pairs_done >= self.pairs
            && progress.extra_questions_done >= self.extra_questions
    }
}

/// Category maxima for both languages
///
/// Defaults to the no-warm-up variant: 20 pairs + 10 extra questions per
/// language, 60 in total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotas {
    #[serde(default)]
    pub zh: LanguageQuotas,
    #[serde(default)]
    pub en: LanguageQuotas,
}

impl Quotas {
    pub fn language(&self, language: Language) -> &LanguageQuotas {
        match language {
            Language::Zh => &self.zh,
            Language::En => &self.en,
        }
    }

    pub fn total(&self) -> u32 {
        self.zh.total() + self.en.total()
    }

    pub fn is_satisfied_by(&self, progress: &Progress) -> bool {
        Language::ORDER
            .iter()
            .all(|&lang| self.language(lang).is_satisfied_by(progress.language(lang)))
    }
}
