//! Decides which topics must not be reposted.

mod classifier;

pub use classifier::{Classifier, ClassifierError, CommandClassifier, WordListClassifier};

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::forum::Topic;

/// Why a topic was held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// The classifier flagged the title, author or a tag.
    Profanity,
    /// The topic's category is on the ignore list.
    IgnoredCategory,
    /// The classifier could not be run, so the topic is held back.
    ClassifierUnavailable,
}

/// Outcome of filtering one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub suppressed: bool,
    pub reason: Option<SuppressReason>,
    /// Inputs that triggered the suppression (flagged terms, or the category).
    pub matched_terms: Vec<String>,
}

impl Verdict {
    #[must_use]
    pub fn allow() -> Self {
        Self {
            suppressed: false,
            reason: None,
            matched_terms: Vec::new(),
        }
    }

    #[must_use]
    pub fn suppress(reason: SuppressReason, matched_terms: Vec<String>) -> Self {
        Self {
            suppressed: true,
            reason: Some(reason),
            matched_terms,
        }
    }
}

pub struct ContentFilter {
    classifier: Box<dyn Classifier>,
    ignore_categories: Vec<String>,
}

impl ContentFilter {
    #[must_use]
    pub fn new(classifier: Box<dyn Classifier>, ignore_categories: Vec<String>) -> Self {
        Self {
            classifier,
            ignore_categories,
        }
    }

    /// Build the filter described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured word list or classifier command is unusable.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let classifier: Box<dyn Classifier> =
            if let Some(cmdline) = config.profanity_classifier_cmd.as_deref() {
                info!(command = %cmdline, "Using external profanity classifier");
                Box::new(CommandClassifier::from_command_line(cmdline)?)
            } else if let Some(path) = config.profanity_words_file.as_deref() {
                Box::new(WordListClassifier::from_file(path).await?)
            } else {
                Box::new(WordListClassifier::new())
            };
        Ok(Self::new(classifier, config.ignore_categories.clone()))
    }

    /// Classify a topic's text, then decide. Profanity is checked before the category
    /// and the first match wins.
    pub async fn should_suppress(&self, topic: &Topic) -> Verdict {
        let terms = classified_terms(topic);

        let flags = match self.classifier.predict(&terms).await {
            Ok(flags) => flags,
            Err(e) => {
                warn!(tid = topic.id, "Profanity classifier failed: {e}");
                return Verdict::suppress(SuppressReason::ClassifierUnavailable, Vec::new());
            }
        };

        let flagged: Vec<String> = terms
            .into_iter()
            .zip(flags)
            .filter_map(|(term, flag)| flag.then_some(term))
            .collect();
        if !flagged.is_empty() {
            return Verdict::suppress(SuppressReason::Profanity, flagged);
        }

        if self.ignore_categories.iter().any(|c| *c == topic.category) {
            return Verdict::suppress(
                SuppressReason::IgnoredCategory,
                vec![topic.category.clone()],
            );
        }

        Verdict::allow()
    }
}

/// Title, author, then each tag, in that order.
fn classified_terms(topic: &Topic) -> Vec<String> {
    let mut terms = Vec::with_capacity(2 + topic.tags.len());
    terms.push(topic.title.clone());
    terms.push(topic.author.clone());
    terms.extend(topic.tags.iter().cloned());
    terms
}
