//! Paging and ordering for per-owner resource listings.

use super::resource::{Resource, ResourceKind};

/// Column a history listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistorySort {
    #[default]
    CreatedAt,
    Hits,
}

impl HistorySort {
    /// Parses a `sort` parameter.
    ///
    /// Besides `created_at` and `hits`, the kind's own counter label
    /// (`clicks` or `scans`) is accepted as an alias for `hits`.
    pub fn parse(value: &str, kind: ResourceKind) -> Option<Self> {
        match value {
            "created_at" => Some(HistorySort::CreatedAt),
            "hits" => Some(HistorySort::Hits),
            label if label == kind.counter_label() => Some(HistorySort::Hits),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            HistorySort::CreatedAt => "created_at",
            HistorySort::Hits => "hits",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One page of one owner's resources of a single kind.
///
/// `page` starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub owner_id: i64,
    pub page: u32,
    pub limit: u32,
    pub sort: HistorySort,
    pub order: SortOrder,
}

impl HistoryQuery {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

/// A page of resources plus the owner's total for the kind.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub items: Vec<Resource>,
    pub total: i64,
}
