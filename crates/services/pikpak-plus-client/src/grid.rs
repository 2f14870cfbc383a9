//! Column definitions and row preparation for the search results grid.

use std::cmp::Ordering;

use serde::{Serialize, Serializer};

use crate::format::{compare_sizes, format_file_size_f64};
use crate::types::{SizeValue, TorrentRow};

/// Built-in grid sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

/// Column filter kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFilter {
    /// Free-text filter (`agTextColumnFilter`)
    Text,
    /// The grid's default filter for the column type (`true`)
    Default,
}

impl Serialize for ColumnFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text => serializer.serialize_str("agTextColumnFilter"),
            Self::Default => serializer.serialize_bool(true),
        }
    }
}

/// Custom ordering attached to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// Orders size strings by their byte value
    Size,
}

impl Comparator {
    /// Compares two cell values
    #[must_use]
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            Self::Size => compare_sizes(a, b),
        }
    }
}

/// One column of the results grid
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Header text
    pub header_name: &'static str,
    /// Row field shown in the column
    pub field: &'static str,
    /// Filter kind, if filterable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<ColumnFilter>,
    /// Fixed width in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Initial sort direction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
    /// Whether the user may resize the column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resizable: Option<bool>,
    /// Custom ordering; lives on the client side only
    #[serde(skip)]
    pub comparator: Option<Comparator>,
    /// Columns cannot be dragged to a new position
    pub suppress_movable: bool,
}

impl ColumnDef {
    const fn new(header_name: &'static str, field: &'static str) -> Self {
        Self {
            header_name,
            field,
            filter: None,
            width: None,
            sort: None,
            resizable: None,
            comparator: None,
            suppress_movable: true,
        }
    }
}

/// The five result columns: Title, Size, Seedr, Peers, Tracker.
///
/// Seeders sort descending by default and no column can be moved.
#[must_use]
pub fn build_column_definitions() -> Vec<ColumnDef> {
    vec![
        ColumnDef {
            filter: Some(ColumnFilter::Text),
            ..ColumnDef::new("Title", "Title")
        },
        ColumnDef {
            comparator: Some(Comparator::Size),
            ..ColumnDef::new("Size", "Size")
        },
        ColumnDef {
            width: Some(100),
            sort: Some(SortDirection::Desc),
            resizable: Some(false),
            ..ColumnDef::new("Seedr", "Seeders")
        },
        ColumnDef {
            width: Some(90),
            resizable: Some(false),
            ..ColumnDef::new("Peers", "Peers")
        },
        ColumnDef {
            filter: Some(ColumnFilter::Default),
            width: Some(150),
            ..ColumnDef::new("Tracker", "Tracker")
        },
    ]
}

/// Copies `rows` with each raw byte `Size` replaced by its display string.
#[must_use]
pub fn prepare_row_data(rows: &[TorrentRow]) -> Vec<TorrentRow> {
    rows.iter()
        .map(|row| TorrentRow {
            size: SizeValue::Text(format_file_size_f64(row.size.to_number())),
            ..row.clone()
        })
        .collect()
}
