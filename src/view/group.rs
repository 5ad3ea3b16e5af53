use crate::models::{DateGroup, GroupExpansion, ReportRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static ISO_DATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{4}-\d{2}-\d{2})").expect("valid iso date regex"));

/// Date portion of a record date, without any time-of-day component.
pub fn date_key(date: &str) -> &str {
    if let Some(found) = ISO_DATE_PREFIX.captures(date).and_then(|caps| caps.get(1)) {
        return found.as_str();
    }
    date.split(['T', ' ']).next().unwrap_or(date)
}

/// Partitions by date key; groups newest first, members in input order.
pub fn group_by_date(records: Vec<ReportRecord>) -> Vec<(String, Vec<ReportRecord>)> {
    let mut groups: BTreeMap<String, Vec<ReportRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(date_key(&record.date).to_string())
            .or_default()
            .push(record);
    }
    groups.into_iter().rev().collect()
}

pub fn build_groups(groups: Vec<(String, Vec<ReportRecord>)>, expansion: &GroupExpansion) -> Vec<DateGroup> {
    groups
        .into_iter()
        .map(|(date_key, reports)| {
            let expanded = expansion.is_expanded(&date_key);
            DateGroup {
                count: reports.len(),
                reports: if expanded { reports } else { Vec::new() },
                expanded,
                date_key,
            }
        })
        .collect()
}

impl GroupExpansion {
    pub fn is_expanded(&self, key: &str) -> bool {
        self.default_expanded != self.toggled.contains(key)
    }

    pub fn toggle(&self, key: &str) -> Self {
        let mut toggled = self.toggled.clone();
        if !toggled.remove(key) {
            toggled.insert(key.to_string());
        }
        Self {
            default_expanded: self.default_expanded,
            toggled,
        }
    }

    pub fn expand_all() -> Self {
        Self::uniform(true)
    }

    pub fn collapse_all() -> Self {
        Self::uniform(false)
    }

    fn uniform(expanded: bool) -> Self {
        Self {
            default_expanded: expanded,
            toggled: Default::default(),
        }
    }
}
