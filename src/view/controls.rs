use crate::models::{ControlState, CsvControls, GroupExpansion, PageNav, PageSize, SortField};
use crate::view::pagination::navigate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type", content = "value")]
pub enum ControlAction {
    SetSearch(String),
    SetTagFilter(Option<String>),
    SetStatusFilter(Option<bool>),
    ClickSort(SortField),
    SetGroupByDate(bool),
    ToggleGroup(String),
    ExpandAll,
    CollapseAll,
    SetPageSize(PageSize),
    Navigate(PageNav),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type", content = "value")]
pub enum CsvAction {
    SetFilter(String),
    ClickColumn(usize),
    SetPageSize(PageSize),
    Navigate(PageNav),
}

impl ControlState {
    /// Next control state. Anything that changes the result set or page shape
    /// goes back to page 1; `total_pages` bounds navigation.
    pub fn apply(&self, action: ControlAction, total_pages: usize) -> Self {
        let mut next = self.clone();
        match action {
            ControlAction::SetSearch(search) => {
                next.search = search;
                next.page = 1;
            }
            ControlAction::SetTagFilter(tag) => {
                next.tag_filter = normalize_choice(tag);
                next.page = 1;
            }
            ControlAction::SetStatusFilter(status) => {
                next.status_filter = status;
                next.page = 1;
            }
            ControlAction::ClickSort(field) => {
                next.sort = self.sort.click(field);
            }
            ControlAction::SetGroupByDate(enabled) => {
                next.group_by_date = enabled;
                next.page = 1;
            }
            ControlAction::ToggleGroup(key) => {
                next.groups = self.groups.toggle(&key);
            }
            ControlAction::ExpandAll => {
                next.groups = GroupExpansion::expand_all();
            }
            ControlAction::CollapseAll => {
                next.groups = GroupExpansion::collapse_all();
            }
            ControlAction::SetPageSize(page_size) => {
                next.page_size = page_size;
                next.page = 1;
            }
            ControlAction::Navigate(nav) => {
                next.page = navigate(self.page, nav, total_pages);
            }
        }
        next
    }
}

impl CsvControls {
    pub fn apply(&self, action: CsvAction, total_pages: usize) -> Self {
        let mut next = self.clone();
        match action {
            CsvAction::SetFilter(filter_text) => {
                next.filter_text = filter_text;
                next.page = 1;
            }
            CsvAction::ClickColumn(column) => {
                next.sort = self.sort.click(column);
            }
            CsvAction::SetPageSize(page_size) => {
                next.page_size = page_size;
                next.page = 1;
            }
            CsvAction::Navigate(nav) => {
                next.page = navigate(self.page, nav, total_pages);
            }
        }
        next
    }
}

// A select box sends "" or "none" for "no filter".
fn normalize_choice(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("none"))
}
