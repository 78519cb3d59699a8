//! Expense classification.
//!
//! A captured item is forwarded when it comes from a known financial source
//! OR its text contains expense vocabulary. Either signal alone is enough.

use crate::config::ClassifierConfig;
use crate::registry::{
    KeywordSet, BANKING_APPS, BANKING_SMS_SENDERS, EXPENSE_KEYWORDS, SMS_EXTRA_KEYWORDS,
};
use crate::types::SourceKind;

/// Outcome of classifying one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub known_source: bool,
    pub expense_vocabulary: bool,
}

impl Verdict {
    pub fn should_forward(&self) -> bool {
        self.known_source || self.expense_vocabulary
    }

    /// Short reason for log lines
    pub fn reason(&self) -> &'static str {
        match (self.known_source, self.expense_vocabulary) {
            (true, true) => "known source and expense vocabulary",
            (true, false) => "known source",
            (false, true) => "expense vocabulary",
            (false, false) => "no financial signal",
        }
    }
}

/// Stateless rule evaluator for one capture channel
#[derive(Debug, Clone)]
pub struct Classifier {
    kind: SourceKind,
    sources: KeywordSet,
    vocabulary: KeywordSet,
}

impl Classifier {
    pub fn new(kind: SourceKind, sources: KeywordSet, vocabulary: KeywordSet) -> Self {
        Self {
            kind,
            sources,
            vocabulary,
        }
    }

    /// Built-in tables for `kind` plus any configured extras
    pub fn for_kind(kind: SourceKind, config: &ClassifierConfig) -> Self {
        match kind {
            SourceKind::Notification => Self::for_notifications(config),
            SourceKind::Sms => Self::for_sms(config),
        }
    }

    /// Banking app package ids and the notification vocabulary
    pub fn for_notifications(config: &ClassifierConfig) -> Self {
        let mut sources = KeywordSet::new(BANKING_APPS);
        sources.extend(&config.extra_banking_apps);

        let mut vocabulary = KeywordSet::new(EXPENSE_KEYWORDS);
        vocabulary.extend(&config.extra_keywords);

        Self::new(SourceKind::Notification, sources, vocabulary)
    }

    /// Bank sender names and the notification vocabulary widened with
    /// card/account wording
    pub fn for_sms(config: &ClassifierConfig) -> Self {
        let mut sources = KeywordSet::new(BANKING_SMS_SENDERS);
        sources.extend(&config.extra_banking_senders);

        let mut vocabulary = KeywordSet::new(EXPENSE_KEYWORDS);
        vocabulary.extend(SMS_EXTRA_KEYWORDS);
        vocabulary.extend(&config.extra_keywords);

        Self::new(SourceKind::Sms, sources, vocabulary)
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn is_known_financial_source(&self, identifier: &str) -> bool {
        self.sources.matches(identifier)
    }

    pub fn contains_expense_vocabulary(&self, text: &str) -> bool {
        self.vocabulary.matches(text)
    }

    pub fn classify(&self, identifier: &str, text: &str) -> Verdict {
        Verdict {
            known_source: self.is_known_financial_source(identifier),
            expense_vocabulary: self.contains_expense_vocabulary(text),
        }
    }

    pub fn should_forward(&self, identifier: &str, text: &str) -> bool {
        self.classify(identifier, text).should_forward()
    }
}
