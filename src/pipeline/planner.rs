//! Query planning with progressive relaxation.
//!
//! A plan walks from the most specific query to the bare keyword:
//!
//! | Level | Query |
//! |-------|-------|
//! | 0 | `keyword AND (site:d1 OR site:d2 OR ...)` with every filter |
//! | 1 | same, with the filter list cut to the first `reduced_site_count` domains |
//! | 2 | `keyword` |
//!
//! Levels whose text would repeat an earlier variant are skipped, so a plan
//! without site filters is a single bare pass and a short filter list goes
//! straight from level 0 to level 2.

use crate::models::{QueryVariant, SearchOptions};

/// Default number of domains kept by the simplified site-scoped pass.
pub const DEFAULT_REDUCED_SITE_COUNT: usize = 5;

pub const LEVEL_FULL_SCOPE: u8 = 0;
pub const LEVEL_REDUCED_SCOPE: u8 = 1;
pub const LEVEL_BARE: u8 = 2;

/// Stateless generator of relaxed query variants.
#[derive(Debug, Clone, Copy)]
pub struct QueryPlanner {
    reduced_site_count: usize,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_REDUCED_SITE_COUNT)
    }
}

impl QueryPlanner {
    /// `reduced_site_count` is clamped to at least 1.
    pub fn new(reduced_site_count: usize) -> Self {
        Self {
            reduced_site_count: reduced_site_count.max(1),
        }
    }

    /// Lazily plan the variants for `keyword`.
    pub fn plan<'a>(&self, keyword: &'a str, options: &'a SearchOptions) -> QueryPlan<'a> {
        QueryPlan {
            keyword: keyword.trim(),
            sites: &options.site_filters,
            reduced_site_count: self.reduced_site_count,
            next_level: LEVEL_FULL_SCOPE,
            emitted: 0,
            last_text: None,
        }
    }
}

/// Iterator over the variants of one plan. Finite: at most three items.
#[derive(Debug, Clone)]
pub struct QueryPlan<'a> {
    keyword: &'a str,
    sites: &'a [String],
    reduced_site_count: usize,
    next_level: u8,
    emitted: usize,
    last_text: Option<String>,
}

impl QueryPlan<'_> {
    /// `None` for site-scoped levels when there is nothing to scope to.
    fn text_for(&self, level: u8) -> Option<String> {
        match level {
            LEVEL_BARE => Some(self.keyword.to_string()),
            _ if self.sites.is_empty() => None,
            LEVEL_FULL_SCOPE => Some(site_scoped(self.keyword, self.sites)),
            _ => {
                let keep = self.reduced_site_count.min(self.sites.len());
                Some(site_scoped(self.keyword, &self.sites[..keep]))
            }
        }
    }
}

impl Iterator for QueryPlan<'_> {
    type Item = QueryVariant;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_level <= LEVEL_BARE {
            let level = self.next_level;
            self.next_level += 1;

            let Some(text) = self.text_for(level) else {
                continue;
            };
            if self.last_text.as_deref() == Some(text.as_str()) {
                continue;
            }
            self.last_text = Some(text.clone());

            let variant = QueryVariant {
                text,
                pass_index: self.emitted,
                relaxation_level: level,
            };
            self.emitted += 1;
            return Some(variant);
        }
        None
    }
}

fn site_scoped(keyword: &str, sites: &[String]) -> String {
    let scope = sites
        .iter()
        .map(|s| format!("site:{s}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{keyword} AND ({scope})")
}
