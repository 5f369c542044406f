use std::collections::HashMap;

use tracing::debug;

use crate::accounts::{in_scope, AccountEntry, AccountIndex};
use crate::normalize::normalize;

/// Account code written when nothing in scope matches.
pub const FALLBACK_CODE: &str = "99999999";

/// Substring lengths combined in the fuzzy index.
pub const NGRAM_SIZES: &[usize] = &[3, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Fuzzy,
    FilteredExact,
    FilteredFuzzy,
    None,
}

impl MatchType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::FilteredExact => "filtered-exact",
            Self::FilteredFuzzy => "filtered-fuzzy",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub code: String,
    pub matched_key: String,
    pub matched_classification: String,
    pub match_type: MatchType,
}

impl MatchResult {
    fn unresolved(fallback_code: &str) -> Self {
        Self {
            code: fallback_code.to_string(),
            matched_key: String::new(),
            matched_classification: String::new(),
            match_type: MatchType::None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.match_type != MatchType::None
    }
}

// ---------------------------------------------------------------------------
// N-gram index
// ---------------------------------------------------------------------------

fn ngram_bag(text: &str, sizes: &[usize]) -> HashMap<String, u32> {
    let chars: Vec<char> = text.chars().collect();
    let mut bag = HashMap::new();
    for &n in sizes {
        if n == 0 || chars.len() < n {
            continue;
        }
        for window in chars.windows(n) {
            *bag.entry(window.iter().collect::<String>()).or_insert(0) += 1;
        }
    }
    bag
}

/// Bag-of-substrings index over a fixed key list. Similarity is the
/// Sørensen–Dice overlap of the two n-gram multisets.
#[derive(Debug)]
pub struct NgramIndex {
    sizes: Vec<usize>,
    keys: Vec<String>,
    totals: Vec<u32>,
    postings: HashMap<String, Vec<(usize, u32)>>,
}

impl NgramIndex {
    pub fn new(keys: Vec<String>, sizes: &[usize]) -> Self {
        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        let mut totals = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            let bag = ngram_bag(key, sizes);
            totals.push(bag.values().sum());
            for (gram, count) in bag {
                postings.entry(gram).or_default().push((i, count));
            }
        }
        Self {
            sizes: sizes.to_vec(),
            keys,
            totals,
            postings,
        }
    }

    /// Closest key and its score in (0, 1]. Ties go to the earlier key.
    pub fn closest(&self, query: &str) -> Option<(&str, f64)> {
        let bag = ngram_bag(query, &self.sizes);
        let query_total: u32 = bag.values().sum();
        if query_total == 0 {
            return None;
        }
        let mut shared = vec![0u32; self.keys.len()];
        for (gram, q_count) in &bag {
            let Some(posting) = self.postings.get(gram) else {
                continue;
            };
            for &(key_idx, k_count) in posting {
                shared[key_idx] += (*q_count).min(k_count);
            }
        }

        let mut best: Option<(usize, f64)> = None;
        for (i, &overlap) in shared.iter().enumerate() {
            if overlap == 0 {
                continue;
            }
            let score = 2.0 * f64::from(overlap) / f64::from(query_total + self.totals[i]);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        best.map(|(i, score)| (self.keys[i].as_str(), score))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

// ---------------------------------------------------------------------------
// Scoped lookup
// ---------------------------------------------------------------------------

// The view of the index visible under one prefix set: for each surviving
// key, the most specific surviving entry.
#[derive(Debug)]
struct Scope {
    filtered: bool,
    best: HashMap<String, AccountEntry>,
    ngrams: NgramIndex,
}

impl Scope {
    fn build(index: &AccountIndex, prefixes: &[String]) -> Self {
        let filtered = !prefixes.is_empty();
        let mut best = HashMap::new();
        let mut keys = Vec::new();
        for key in index.keys() {
            let Some(entries) = index.get(key) else {
                continue;
            };
            // Entries are stored most specific first.
            let survivor = entries
                .iter()
                .find(|e| !filtered || in_scope(&e.classification, prefixes));
            if let Some(entry) = survivor {
                best.insert(key.clone(), entry.clone());
                keys.push(key.clone());
            }
        }
        let ngrams = NgramIndex::new(keys, NGRAM_SIZES);
        debug!(prefixes = ?prefixes, keys = ngrams.len(), "account scope built");
        Self {
            filtered,
            best,
            ngrams,
        }
    }

    fn resolve(&self, key: &str, fallback_code: &str) -> MatchResult {
        if self.best.is_empty() {
            return MatchResult::unresolved(fallback_code);
        }
        if let Some(entry) = self.best.get(key) {
            let match_type = if self.filtered {
                MatchType::FilteredExact
            } else {
                MatchType::Exact
            };
            return found(key, entry, match_type);
        }
        if let Some((closest, _)) = self.ngrams.closest(key) {
            if let Some(entry) = self.best.get(closest) {
                let match_type = if self.filtered {
                    MatchType::FilteredFuzzy
                } else {
                    MatchType::Fuzzy
                };
                return found(closest, entry, match_type);
            }
        }
        MatchResult::unresolved(fallback_code)
    }
}

fn found(key: &str, entry: &AccountEntry, match_type: MatchType) -> MatchResult {
    MatchResult {
        code: entry.code.clone(),
        matched_key: key.to_string(),
        matched_classification: entry.classification.clone(),
        match_type,
    }
}

/// Canonical prefix set: trimmed, blanks dropped, sorted, deduplicated.
pub fn prefix_set(prefixes: &[String]) -> Vec<String> {
    let mut set: Vec<String> = prefixes
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    set.sort();
    set.dedup();
    set
}

/// Resolve free text to an account without any caching.
pub fn resolve(
    free_text: &str,
    index: &AccountIndex,
    prefixes: &[String],
    fallback_code: &str,
) -> MatchResult {
    let key = normalize(free_text);
    if key.is_empty() {
        return MatchResult::unresolved(fallback_code);
    }
    Scope::build(index, &prefix_set(prefixes)).resolve(&key, fallback_code)
}

// ---------------------------------------------------------------------------
// Memoizing resolver
// ---------------------------------------------------------------------------

/// Per-conversion resolver. Scopes and their n-gram indexes are built once
/// per prefix set; answers are memoized per (normalized text, prefix set).
pub struct Resolver<'a> {
    index: &'a AccountIndex,
    fallback_code: String,
    scopes: HashMap<Vec<String>, Scope>,
    memo: HashMap<(String, Vec<String>), MatchResult>,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a AccountIndex, fallback_code: impl Into<String>) -> Self {
        Self {
            index,
            fallback_code: fallback_code.into(),
            scopes: HashMap::new(),
            memo: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, free_text: &str, prefixes: &[String]) -> MatchResult {
        let key = normalize(free_text);
        if key.is_empty() {
            return MatchResult::unresolved(&self.fallback_code);
        }
        let set = prefix_set(prefixes);
        let memo_key = (key, set);
        if let Some(hit) = self.memo.get(&memo_key) {
            return hit.clone();
        }

        let index = self.index;
        let scope = self
            .scopes
            .entry(memo_key.1.clone())
            .or_insert_with_key(|set| Scope::build(index, set));
        let result = scope.resolve(&memo_key.0, &self.fallback_code);
        if !result.is_resolved() {
            debug!(text = %memo_key.0, prefixes = ?memo_key.1, "no account in scope");
        }
        self.memo.insert(memo_key, result.clone());
        result
    }

    pub fn fallback_code(&self) -> &str {
        &self.fallback_code
    }

    pub fn memoized(&self) -> usize {
        self.memo.len()
    }
}
