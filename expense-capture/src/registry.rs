//! Known financial sources and expense vocabulary.
//!
//! All matching is a case-insensitive substring test with no tokenization,
//! so an entry inside a longer word still counts.

use tracing::trace;

/// Package identifiers of banking apps whose notifications are always forwarded
pub const BANKING_APPS: &[&str] = &[
    "com.absa.mobile",
    "com.fnb.android",
    "com.standardbank.mobile",
    "com.nedbank.mobile",
    "com.capitec.mobile",
    "com.bidvestbank.mobile",
    "com.investec.mobile",
    "com.africanbank.mobile",
    "com.tyme.mobile",
    "com.discovery.mobile",
];

/// SMS sender names used by banks. "Bank" and "Banking" catch the rest.
pub const BANKING_SMS_SENDERS: &[&str] = &[
    "ABSA",
    "FNB",
    "Standard Bank",
    "Nedbank",
    "Capitec",
    "Bidvest Bank",
    "Investec",
    "African Bank",
    "Tyme",
    "Discovery Bank",
    "Bank",
    "Banking",
];

/// Words that mark notification text as expense-related.
/// `"r "` is the rand prefix as in "R 150.00".
pub const EXPENSE_KEYWORDS: &[&str] = &[
    "debit",
    "credit",
    "payment",
    "purchase",
    "transaction",
    "spent",
    "charged",
    "withdrawal",
    "deposit",
    "balance",
    "r ",
    "rand",
    "zar",
    "amount",
    "cost",
    "price",
];

/// Additional words that only apply to SMS bodies
pub const SMS_EXTRA_KEYWORDS: &[&str] = &["card", "account", "available"];

/// Case-fold for matching. `ſ` and `ẞ` only reach their ASCII form
/// through the uppercase mapping.
pub fn fold_case(text: &str) -> String {
    if text.is_ascii() {
        return text.to_ascii_lowercase();
    }
    text.to_lowercase().to_uppercase().to_lowercase()
}

/// Case-folded substring set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    entries: Vec<String>,
}

impl KeywordSet {
    /// Build a set from arbitrary entries.
    ///
    /// Entries are case-folded and deduplicated. Blank entries are dropped
    /// since they would match any text. Inner and trailing spaces are kept.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        set.extend(entries);
        set
    }

    /// Add more entries under the same normalization rules
    pub fn extend<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in entries {
            let entry = entry.as_ref();
            if entry.trim().is_empty() {
                trace!("Skipping blank keyword entry");
                continue;
            }
            let folded = fold_case(entry);
            if !self.entries.contains(&folded) {
                self.entries.push(folded);
            }
        }
    }

    /// First entry contained in `text`, if any
    pub fn find_in(&self, text: &str) -> Option<&str> {
        if text.is_empty() {
            return None;
        }
        let folded = fold_case(text);
        self.entries
            .iter()
            .find(|entry| folded.contains(entry.as_str()))
            .map(String::as_str)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.find_in(text).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}
