use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::normalize::normalize;
use crate::sheet::read_delimited;

/// One line of the chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEntry {
    pub code: String,
    pub classification: String,
    pub description: String,
}

/// Normalized description → entries sharing that description. Entries under
/// a key are kept most specific (longest classification) first; equal
/// lengths stay in file order.
#[derive(Debug, Default)]
pub struct AccountIndex {
    entries: HashMap<String, Vec<AccountEntry>>,
    keys: Vec<String>,
}

impl AccountIndex {
    /// Parse a `code;classification;description` export.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(ConvertError::Accounts("file is empty".to_string()));
        }
        let mut index = Self::default();
        let mut skipped = 0usize;
        for record in read_delimited(bytes) {
            if record.len() < 3 {
                skipped += 1;
                continue;
            }
            let description = record[2].trim();
            let Some(code) = account_code(&record[0]) else {
                skipped += 1;
                continue;
            };
            if description.is_empty() {
                skipped += 1;
                continue;
            }
            index.insert(AccountEntry {
                code,
                classification: record[1].trim().to_string(),
                description: description.to_string(),
            });
        }
        debug!(accounts = index.len(), keys = index.keys.len(), skipped, "chart of accounts loaded");
        Ok(index)
    }

    pub fn insert(&mut self, entry: AccountEntry) {
        let key = normalize(&entry.description);
        if key.is_empty() {
            return;
        }
        let list = self.entries.entry(key.clone()).or_insert_with(|| {
            self.keys.push(key);
            Vec::new()
        });
        // Insert after every entry at least as specific, keeping file order
        // among equal classification lengths.
        let at = list
            .iter()
            .position(|e| e.classification.len() < entry.classification.len())
            .unwrap_or(list.len());
        list.insert(at, entry);
    }

    pub fn get(&self, key: &str) -> Option<&[AccountEntry]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Distinct normalized descriptions in first-seen order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Total number of entries across all keys.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Every entry, keys in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AccountEntry)> {
        self.keys.iter().flat_map(move |k| {
            self.entries
                .get(k)
                .into_iter()
                .flatten()
                .map(move |e| (k.as_str(), e))
        })
    }
}

// The code column must be numeric once thousands formatting is removed.
fn account_code(raw: &str) -> Option<String> {
    let digits: String = raw.trim().chars().filter(|c| !matches!(c, '.' | ',')).collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits)
}

/// True when `classification` falls under any of `prefixes`.
pub fn in_scope(classification: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| classification.starts_with(p.as_str()))
}
