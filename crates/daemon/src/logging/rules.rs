// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Include/exclude filtering rules for log call sites.

use std::collections::HashMap;

use glob::Pattern;

/// What a matching rule does to the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Included,
    Excluded,
}

impl RuleAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Included => "included",
            Self::Excluded => "excluded",
        }
    }
}

struct LogRule {
    pattern: Pattern,
    action: RuleAction,
}

/// Ordered rule list with a memoizing resolution cache.
///
/// Rules are kept most-recent-first and the first match wins, so the rule
/// added last takes precedence. The cache maps already-evaluated
/// `"file:func"` keys straight to their resolved action and is flushed
/// whenever the rule list changes.
#[derive(Default)]
pub struct LogRules {
    rules: Vec<LogRule>,
    cache: HashMap<String, Option<RuleAction>>,
}

impl LogRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn add(&mut self, pattern: &str, action: RuleAction) -> Result<(), glob::PatternError> {
        let pattern = Pattern::new(pattern)?;
        self.cache.clear();
        self.rules.insert(0, LogRule { pattern, action });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.rules.clear();
        self.cache.clear();
    }

    /// Resolve a call site, consulting the cache.
    pub fn evaluate(&mut self, file: &str, func: &str) -> Option<RuleAction> {
        if self.rules.is_empty() {
            return None;
        }
        let key = format!("{file}:{func}");
        if let Some(hit) = self.cache.get(&key) {
            return *hit;
        }
        let resolved = self.resolve(&key);
        self.cache.insert(key, resolved);
        resolved
    }

    /// Resolve a call site directly against the rule list, bypassing the
    /// cache. The cached result must always agree with this.
    pub fn evaluate_uncached(&self, file: &str, func: &str) -> Option<RuleAction> {
        self.resolve(&format!("{file}:{func}"))
    }

    fn resolve(&self, key: &str) -> Option<RuleAction> {
        self.rules.iter().find(|rule| rule.pattern.matches(key)).map(|rule| rule.action)
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
