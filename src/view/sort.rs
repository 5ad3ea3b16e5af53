use crate::models::{ReportRecord, SortDirection, SortField, SortState};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;

impl SortDirection {
    /// Direction after clicking the already-sorted key again.
    pub fn cycle(self) -> Self {
        match self {
            Self::None => Self::Ascending,
            Self::Ascending => Self::Descending,
            Self::Descending => Self::None,
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Descending => ordering.reverse(),
            _ => ordering,
        }
    }
}

impl<K: PartialEq> SortState<K> {
    pub fn is_neutral(&self) -> bool {
        self.key.is_none() || self.direction == SortDirection::None
    }

    /// Same key cycles its direction; a different key starts ascending.
    pub fn click(&self, key: K) -> Self {
        if self.key.as_ref() == Some(&key) {
            let direction = self.direction.cycle();
            Self {
                key: (direction != SortDirection::None).then_some(key),
                direction,
            }
        } else {
            Self {
                key: Some(key),
                direction: SortDirection::Ascending,
            }
        }
    }
}

/// Stable in-place sort; neutral state leaves the order untouched.
pub fn sort_reports(records: &mut [ReportRecord], sort: &SortState<SortField>) {
    if sort.is_neutral() {
        return;
    }
    let Some(field) = sort.key else {
        return;
    };

    records.sort_by(|a, b| sort.direction.apply(compare_reports(a, b, field)));
}

fn compare_reports(a: &ReportRecord, b: &ReportRecord, field: SortField) -> Ordering {
    match field {
        SortField::Name => compare_names(&a.name, &b.name),
        SortField::Date => parse_timestamp(&a.date).cmp(&parse_timestamp(&b.date)),
        SortField::Status => a.is_active.cmp(&b.is_active),
    }
}

/// Case-folded order. Names equal under folding put lowercase first, so
/// "apple" precedes "Apple". Accented letters order by code point.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Milliseconds since the epoch. Unparseable dates yield `None`, which sorts
/// before every valid date.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
}
