use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
}

/// Insertion-ordered tag list with set membership: no duplicates, no blanks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|existing| existing == tag)
    }

    /// Returns false when the tag was already present or blank.
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.contains(tag) {
            return false;
        }
        self.0.push(tag.to_string());
        true
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing != tag.trim());
        self.0.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for TagSet {
    fn from(values: Vec<String>) -> Self {
        let mut tags = TagSet::new();
        for value in values {
            tags.insert(&value);
        }
        tags
    }
}

impl From<TagSet> for Vec<String> {
    fn from(value: TagSet) -> Self {
        value.0
    }
}

impl<'a> FromIterator<&'a str> for TagSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut tags = TagSet::new();
        for value in iter {
            tags.insert(value);
        }
        tags
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub tags: TagSet,
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// ─── Controls ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    #[default]
    None,
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortField {
    Name,
    Date,
    Status,
}

/// One sort key at a time; `key: None` or `direction: None` is the neutral state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortState<K> {
    pub key: Option<K>,
    pub direction: SortDirection,
}

impl<K> Default for SortState<K> {
    fn default() -> Self {
        Self {
            key: None,
            direction: SortDirection::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "PageSizeRepr", into = "PageSizeRepr")]
pub enum PageSize {
    Limited(NonZeroUsize),
    #[default]
    Unbounded,
}

impl PageSize {
    pub fn limited(size: usize) -> Self {
        NonZeroUsize::new(size).map_or(Self::Unbounded, Self::Limited)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PageSizeRepr {
    Count(usize),
    Keyword(String),
}

impl TryFrom<PageSizeRepr> for PageSize {
    type Error = String;

    fn try_from(value: PageSizeRepr) -> Result<Self, Self::Error> {
        match value {
            PageSizeRepr::Count(count) => NonZeroUsize::new(count)
                .map(Self::Limited)
                .ok_or_else(|| "page size must be positive".to_string()),
            PageSizeRepr::Keyword(keyword) if keyword.eq_ignore_ascii_case("all") => Ok(Self::Unbounded),
            PageSizeRepr::Keyword(keyword) => Err(format!("unsupported page size '{}'", keyword)),
        }
    }
}

impl From<PageSize> for PageSizeRepr {
    fn from(value: PageSize) -> Self {
        match value {
            PageSize::Limited(size) => Self::Count(size.get()),
            PageSize::Unbounded => Self::Keyword("all".to_string()),
        }
    }
}

/// Expansion of date groups: a uniform default plus the keys flipped away from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupExpansion {
    pub default_expanded: bool,
    pub toggled: BTreeSet<String>,
}

impl Default for GroupExpansion {
    fn default() -> Self {
        Self {
            default_expanded: true,
            toggled: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlState {
    pub search: String,
    pub tag_filter: Option<String>,
    pub status_filter: Option<bool>,
    pub sort: SortState<SortField>,
    pub group_by_date: bool,
    pub groups: GroupExpansion,
    pub page_size: PageSize,
    pub page: usize,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            search: String::new(),
            tag_filter: None,
            status_filter: None,
            sort: SortState::default(),
            group_by_date: false,
            groups: GroupExpansion::default(),
            page_size: PageSize::Unbounded,
            page: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvControls {
    pub filter_text: String,
    pub sort: SortState<usize>,
    pub page_size: PageSize,
    pub page: usize,
}

impl Default for CsvControls {
    fn default() -> Self {
        Self {
            filter_text: String::new(),
            sort: SortState::default(),
            page_size: PageSize::Unbounded,
            page: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "page")]
pub enum PageNav {
    First,
    Previous,
    Next,
    Last,
    Goto(usize),
}

// ─── View output ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub page_size: PageSize,
    pub total_pages: usize,
    pub total_items: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateGroup {
    pub date_key: String,
    pub count: usize,
    pub expanded: bool,
    /// Empty when the group is collapsed.
    pub reports: Vec<ReportRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "items")]
pub enum ViewRows {
    Flat(Vec<ReportRecord>),
    Grouped(Vec<DateGroup>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub rows: ViewRows,
    pub pagination: Pagination,
    pub matched: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub pagination: Pagination,
}

// ─── Command payloads ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPayload {
    pub report_id: String,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReportPayload {
    pub folder_id: String,
    pub name: String,
    pub csv_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanResponse {
    pub success: bool,
}

// ─── Settings ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub default_page_size: PageSize,
    pub group_by_date: bool,
    pub reports_dir: Option<String>,
    pub export_dir: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_page_size: PageSize::limited(10),
            group_by_date: false,
            reports_dir: None,
            export_dir: None,
        }
    }
}

impl AppSettings {
    pub fn initial_controls(&self) -> ControlState {
        ControlState {
            group_by_date: self.group_by_date,
            page_size: self.default_page_size,
            ..ControlState::default()
        }
    }

    pub fn initial_csv_controls(&self) -> CsvControls {
        CsvControls {
            page_size: self.default_page_size,
            ..CsvControls::default()
        }
    }
}
