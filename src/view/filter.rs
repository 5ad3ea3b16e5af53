use crate::models::ReportRecord;

/// Keeps records matching every set predicate, in input order.
pub fn filter_reports(
    records: &[ReportRecord],
    search: &str,
    tag_filter: Option<&str>,
    status_filter: Option<bool>,
) -> Vec<ReportRecord> {
    let needle = search.to_lowercase();
    records
        .iter()
        .filter(|record| needle.is_empty() || record.name.to_lowercase().contains(&needle))
        .filter(|record| tag_filter.map_or(true, |tag| record.tags.contains(tag)))
        .filter(|record| status_filter.map_or(true, |active| record.is_active == active))
        .cloned()
        .collect()
}
