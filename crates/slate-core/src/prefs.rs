use tracing::warn;

use crate::query::BucketFilter;
use crate::storage::Storage;
use crate::store::TaskStore;

pub const THEME_KEY: &str = "theme";
pub const VIEW_MODE_KEY: &str = "view-mode";
pub const DATE_FILTER_KEY: &str = "date-filter";

pub const DEFAULT_THEME: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    List,
    Board,
}

impl ViewMode {
    pub fn name(self) -> &'static str {
        match self {
            ViewMode::List => "list",
            ViewMode::Board => "board",
        }
    }

    pub fn parse_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "list" => Some(ViewMode::List),
            "board" => Some(ViewMode::Board),
            _ => None,
        }
    }
}

pub fn theme<S: Storage>(store: &TaskStore<S>) -> String {
    store
        .preference(THEME_KEY)
        .unwrap_or_else(|| DEFAULT_THEME.to_string())
}

pub fn set_theme<S: Storage>(store: &TaskStore<S>, name: &str) {
    store.set_preference(THEME_KEY, name);
}

pub fn view_mode<S: Storage>(store: &TaskStore<S>) -> ViewMode {
    let Some(raw) = store.preference(VIEW_MODE_KEY) else {
        return ViewMode::List;
    };
    match ViewMode::parse_name(&raw) {
        Some(mode) => mode,
        None => {
            warn!(value = %raw, "unrecognized view mode preference; using list");
            ViewMode::List
        }
    }
}

pub fn set_view_mode<S: Storage>(store: &TaskStore<S>, mode: ViewMode) {
    store.set_preference(VIEW_MODE_KEY, mode.name());
}

pub fn date_filter<S: Storage>(store: &TaskStore<S>) -> Option<BucketFilter> {
    let raw = store.preference(DATE_FILTER_KEY)?;
    let parsed = BucketFilter::parse_name(&raw);
    if parsed.is_none() {
        warn!(value = %raw, "unrecognized date filter preference; ignoring");
    }
    parsed
}

pub fn set_date_filter<S: Storage>(store: &TaskStore<S>, bucket: BucketFilter) {
    store.set_preference(DATE_FILTER_KEY, bucket.name());
}
