//! Identifier normalization and per-build collision resolution.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize a display name into an identifier: trimmed, lowercased, and with
/// every internal whitespace run collapsed to a single underscore.
pub fn normalize_identifier(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    WHITESPACE_RUN.replace_all(&lowered, "_").into_owned()
}

/// Hands out unique identifiers within one snapshot build.
///
/// The first claim of a base name yields it unchanged; the Nth claim yields
/// `base__N`. A suffixed candidate that was already issued (for instance a
/// header literally named `total__2`) is skipped by bumping the counter again.
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    counts: FxHashMap<String, usize>,
    issued: FxHashSet<String>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize `name` and claim a unique identifier for it.
    pub fn register(&mut self, name: &str) -> String {
        self.claim(normalize_identifier(name))
    }

    /// Claim a unique identifier for an already-normalized base name.
    pub fn claim(&mut self, base: String) -> String {
        let count = self.counts.entry(base.clone()).or_insert(0);
        *count += 1;
        let mut candidate = if *count == 1 {
            base.clone()
        } else {
            format!("{base}__{count}")
        };
        while self.issued.contains(&candidate) {
            *count += 1;
            candidate = format!("{base}__{count}");
        }
        self.issued.insert(candidate.clone());
        candidate
    }

    /// Number of identifiers issued so far.
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}
