//! Task sequencer
//!
//! Pure mapping from a user's progress to the next recording task, and the
//! single place where progress advances after an accepted upload.
//!
//! Per language (zh fully before en):
//! 1. Warm-up readings, `nobody` then `onlyme` (only when their quotas are non-zero)
//! 2. Secret/question pairs; secret first, question second, same item_id
//! 3. Extra standalone questions
//!
//! Item selection is by completed-count index, never random, so asking twice
//! without an intervening upload returns the same task.

use thiserror::Error;
use tracing::warn;

use crate::catalog::Catalog;
use crate::model::{Language, Progress, Quotas, Role, Task, TaskKey, TaskType};
use crate::{Error, Result};

/// Rejections raised when applying an upload to progress
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SequenceError {
    /// Upload does not match the task currently due
    #[error("Recording does not match the current task (expected {expected}, got {submitted})")]
    UnexpectedTask { expected: TaskKey, submitted: TaskKey },

    /// Every quota is already met
    #[error("All tasks already completed")]
    AllTasksComplete,
}

/// Deterministic task sequencer over a fixed catalog and quotas
#[derive(Debug, Clone)]
pub struct TaskSequencer {
    catalog: Catalog,
    quotas: Quotas,
}

impl TaskSequencer {
    /// Build a sequencer, rejecting quotas that an empty source can never satisfy
    pub fn new(catalog: Catalog, quotas: Quotas) -> Result<Self> {
        for language in Language::ORDER {
            let q = quotas.language(language);
            let checks = [
                ("nobody warm-up", q.nobody, catalog.instructions(language, Role::Nobody).len()),
                ("onlyme warm-up", q.onlyme, catalog.instructions(language, Role::OnlyMe).len()),
                ("pair", q.pairs, catalog.items(language).len()),
                ("extra question", q.extra_questions, catalog.items(language).len()),
            ];

            for (category, quota, available) in checks {
                if quota == 0 {
                    continue;
                }
                if available == 0 {
                    return Err(Error::Config(format!(
                        "{} {} quota is {} but no prompts are available",
                        language.display_name(),
                        category,
                        quota
                    )));
                }
                if (available as u32) < quota {
                    warn!(
                        language = %language,
                        category,
                        quota,
                        available,
                        "Fewer prompts than quota; prompts will be reused"
                    );
                }
            }
        }

        Ok(Self { catalog, quotas })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn quotas(&self) -> &Quotas {
        &self.quotas
    }

    /// Next task for `progress`, or `None` once every quota is met
    pub fn next_task(&self, progress: &Progress) -> Option<Task> {
        Language::ORDER
            .iter()
            .find_map(|&language| self.next_in_language(language, progress))
    }

    fn next_in_language(&self, language: Language, progress: &Progress) -> Option<Task> {
        let p = progress.language(language);
        let q = self.quotas.language(language);

        for (role, done, quota) in [
            (Role::Nobody, p.nobody_done, q.nobody),
            (Role::OnlyMe, p.onlyme_done, q.onlyme),
        ] {
            if done < quota {
                if let Some((idx, text)) = self.catalog.instruction_at(language, role, done) {
                    return Some(Task {
                        language,
                        task_type: TaskType::Instruction,
                        role,
                        item_id: idx.to_string(),
                        text: text.to_string(),
                    });
                }
            }
        }

        if p.pairs_done < q.pairs {
            let pending = p
                .pending_question
                .as_deref()
                .and_then(|id| self.catalog.item(language, id));

            if let Some(item) = pending {
                return Some(Task {
                    language,
                    task_type: TaskType::Pair,
                    role: Role::Question,
                    item_id: item.item_id.clone(),
                    text: item.question_for_secret.clone(),
                });
            }

            if let Some(item) = self.catalog.item_at(language, p.pairs_done) {
                return Some(Task {
                    language,
                    task_type: TaskType::Pair,
                    role: Role::Secret,
                    item_id: item.item_id.clone(),
                    text: item.secret_text.clone(),
                });
            }
        }

        if p.extra_questions_done < q.extra_questions {
            // Offset past the pair items so extras use fresh prompts while the catalog allows
            if let Some(item) = self
                .catalog
                .item_at(language, q.pairs + p.extra_questions_done)
            {
                return Some(Task {
                    language,
                    task_type: TaskType::ExtraQuestion,
                    role: Role::Question,
                    item_id: item.item_id.clone(),
                    text: item.question_for_secret.clone(),
                });
            }
        }

        None
    }

    /// Apply an accepted upload, returning the advanced progress
    ///
    /// The submitted key must be exactly the task `next_task` returns for
    /// `progress`; anything else leaves progress untouched.
    pub fn advance(
        &self,
        progress: &Progress,
        submitted: &TaskKey,
    ) -> std::result::Result<Progress, SequenceError> {
        let expected = self
            .next_task(progress)
            .ok_or(SequenceError::AllTasksComplete)?
            .key();

        if expected != *submitted {
            return Err(SequenceError::UnexpectedTask {
                expected,
                submitted: submitted.clone(),
            });
        }

        let mut next = progress.clone();
        let lp = next.language_mut(submitted.language);
        match (submitted.task_type, submitted.role) {
            (TaskType::Instruction, Role::Nobody) => lp.nobody_done += 1,
            (TaskType::Instruction, _) => lp.onlyme_done += 1,
            (TaskType::Pair, Role::Secret) => {
                lp.pending_question = Some(submitted.item_id.clone());
            }
            (TaskType::Pair, _) => {
                lp.pending_question = None;
                lp.pairs_done += 1;
            }
            (TaskType::ExtraQuestion, _) => lp.extra_questions_done += 1,
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;
    use crate::model::LanguageQuotas;

    fn items(prefix: &str, n: usize) -> Vec<CatalogItem> {
        (0..n)
            .map(|i| CatalogItem {
                item_id: format!("{}{}", prefix, i),
                secret_text: format!("secret {}{}", prefix, i),
                question_for_secret: format!("question {}{}", prefix, i),
            })
            .collect()
    }

    fn small_quotas() -> Quotas {
        let q = LanguageQuotas {
            nobody: 0,
            onlyme: 0,
            pairs: 2,
            extra_questions: 1,
        };
        Quotas { zh: q, en: q }
    }

    fn sequencer(quotas: Quotas) -> TaskSequencer {
        let catalog = Catalog::new()
            .with_items(Language::Zh, items("z", 5))
            .with_items(Language::En, items("e", 5))
            .with_instructions(Language::Zh, Role::Nobody, vec!["zn0".into(), "zn1".into()])
            .with_instructions(Language::Zh, Role::OnlyMe, vec!["zo0".into()])
            .with_instructions(Language::En, Role::Nobody, vec!["en0".into()])
            .with_instructions(Language::En, Role::OnlyMe, vec!["eo0".into()]);
        TaskSequencer::new(catalog, quotas).unwrap()
    }

    #[test]
    fn test_first_task_is_zh_secret() {
        let seq = sequencer(small_quotas());
        let task = seq.next_task(&Progress::default()).unwrap();

        assert_eq!(task.language, Language::Zh);
        assert_eq!(task.task_type, TaskType::Pair);
        assert_eq!(task.role, Role::Secret);
        assert_eq!(task.item_id, "z0");
        assert_eq!(task.text, "secret z0");
    }

    #[test]
    fn test_secret_sets_pending_question() {
        let seq = sequencer(small_quotas());
        let start = Progress::default();
        let secret = seq.next_task(&start).unwrap();

        let after = seq.advance(&start, &secret.key()).unwrap();
        assert_eq!(after.zh.pairs_done, 0);
        assert_eq!(after.zh.pending_question.as_deref(), Some("z0"));

        let question = seq.next_task(&after).unwrap();
        assert_eq!(question.role, Role::Question);
        assert_eq!(question.item_id, "z0");
        assert_eq!(question.text, "question z0");

        let done = seq.advance(&after, &question.key()).unwrap();
        assert_eq!(done.zh.pairs_done, 1);
        assert_eq!(done.zh.pending_question, None);
        assert_eq!(seq.next_task(&done).unwrap().item_id, "z1");
    }

    #[test]
    fn test_extra_questions_skip_pair_items() {
        let seq = sequencer(small_quotas());
        let mut progress = Progress::default();
        progress.zh.pairs_done = 2;

        let task = seq.next_task(&progress).unwrap();
        assert_eq!(task.task_type, TaskType::ExtraQuestion);
        assert_eq!(task.role, Role::Question);
        assert_eq!(task.item_id, "z2");
    }

    #[test]
    fn test_language_order_zh_before_en() {
        let seq = sequencer(small_quotas());
        let mut progress = Progress::default();
        progress.zh.pairs_done = 2;
        progress.zh.extra_questions_done = 1;

        let task = seq.next_task(&progress).unwrap();
        assert_eq!(task.language, Language::En);
        assert_eq!(task.item_id, "e0");
        assert_eq!(task.role, Role::Secret);
    }

    #[test]
    fn test_warmup_precedes_pairs() {
        let mut quotas = small_quotas();
        quotas.zh.nobody = 2;
        quotas.zh.onlyme = 1;
        let seq = sequencer(quotas);

        let mut progress = Progress::default();
        let first = seq.next_task(&progress).unwrap();
        assert_eq!(first.task_type, TaskType::Instruction);
        assert_eq!(first.role, Role::Nobody);
        assert_eq!(first.item_id, "0");
        assert_eq!(first.text, "zn0");

        progress = seq.advance(&progress, &first.key()).unwrap();
        progress = seq.advance(&progress, &seq.next_task(&progress).unwrap().key()).unwrap();
        assert_eq!(progress.zh.nobody_done, 2);

        let onlyme = seq.next_task(&progress).unwrap();
        assert_eq!(onlyme.role, Role::OnlyMe);
        progress = seq.advance(&progress, &onlyme.key()).unwrap();

        let pair = seq.next_task(&progress).unwrap();
        assert_eq!(pair.task_type, TaskType::Pair);
        assert_eq!(pair.role, Role::Secret);
    }

    #[test]
    fn test_unexpected_upload_rejected() {
        let seq = sequencer(small_quotas());
        let progress = Progress::default();
        let mut wrong = seq.next_task(&progress).unwrap().key();
        wrong.role = Role::Question;

        let err = seq.advance(&progress, &wrong).unwrap_err();
        assert!(matches!(err, SequenceError::UnexpectedTask { .. }));
    }

    #[test]
    fn test_complete_returns_none() {
        let seq = sequencer(small_quotas());
        let mut progress = Progress::default();
        for lang in [&mut progress.zh, &mut progress.en] {
            lang.pairs_done = 2;
            lang.extra_questions_done = 1;
        }

        assert!(seq.next_task(&progress).is_none());
        let key = TaskKey {
            language: Language::En,
            task_type: TaskType::ExtraQuestion,
            role: Role::Question,
            item_id: "e2".to_string(),
        };
        assert_eq!(seq.advance(&progress, &key), Err(SequenceError::AllTasksComplete));
    }

    #[test]
    fn test_stale_pending_marker_falls_back_to_secret() {
        let seq = sequencer(small_quotas());
        let mut progress = Progress::default();
        progress.zh.pending_question = Some("removed-item".to_string());

        let task = seq.next_task(&progress).unwrap();
        assert_eq!(task.role, Role::Secret);
        assert_eq!(task.item_id, "z0");
    }

    #[test]
    fn test_empty_source_with_quota_is_config_error() {
        let catalog = Catalog::new().with_items(Language::Zh, items("z", 3));
        let result = TaskSequencer::new(catalog, Quotas::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
