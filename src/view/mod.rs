//! Pure view-model pipeline: filter, sort, group and paginate report records,
//! and the matching search/sort/paginate pass over an opened CSV table.
//!
//! Nothing here performs I/O or keeps state between calls; every render
//! passes the full record snapshot and an immutable control value.

pub mod controls;
pub mod filter;
pub mod group;
pub mod pagination;
pub mod sort;
pub mod table;

use crate::models::{ControlState, CsvControls, CsvTable, CsvView, ReportRecord, ReportView, ViewRows};

pub use controls::{ControlAction, CsvAction};

pub fn compute_view(records: &[ReportRecord], controls: &ControlState) -> ReportView {
    let mut selected = filter::filter_reports(
        records,
        &controls.search,
        controls.tag_filter.as_deref(),
        controls.status_filter,
    );
    sort::sort_reports(&mut selected, &controls.sort);
    let matched = selected.len();

    if controls.group_by_date {
        let groups = group::build_groups(group::group_by_date(selected), &controls.groups);
        let (page, pagination) = pagination::paginate(groups, controls.page_size, controls.page);
        return ReportView {
            rows: ViewRows::Grouped(page),
            pagination,
            matched,
        };
    }

    let (page, pagination) = pagination::paginate(selected, controls.page_size, controls.page);
    ReportView {
        rows: ViewRows::Flat(page),
        pagination,
        matched,
    }
}

pub fn compute_csv_view(table: &CsvTable, controls: &CsvControls) -> CsvView {
    let rows = table::reprocess(table, &controls.filter_text, &controls.sort);
    let (rows, pagination) = pagination::paginate(rows, controls.page_size, controls.page);
    CsvView {
        headers: table.headers.clone(),
        rows,
        pagination,
    }
}
