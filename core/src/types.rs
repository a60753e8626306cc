//! Shared types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Paginated query result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultList<T> {
    /// Number of rows matching the filters, ignoring pagination
    pub total: i64,
    /// The requested page
    pub data: Vec<T>,
}

impl<T> ResultList<T> {
    /// Convert every row, keeping the total
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ResultList<U> {
        ResultList {
            total: self.total,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

/// Columns plugin listings may be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortColumn {
    Name,
    CreatedAt,
    UpdatedAt,
}

impl SortColumn {
    /// SQL column name
    pub fn column(&self) -> &'static str {
        match self {
            SortColumn::Name => "name",
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
        }
    }

    /// Name used in API sort strings
    pub fn api_name(&self) -> &'static str {
        match self {
            SortColumn::Name => "name",
            SortColumn::CreatedAt => "createdAt",
            SortColumn::UpdatedAt => "updatedAt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Caller-supplied ordering, written `name` or `-createdAt` (leading `-` = descending)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn parse(value: &str) -> Result<Self> {
        let (direction, field) = match value.strip_prefix('-') {
            Some(rest) => (SortDirection::Desc, rest),
            None => (SortDirection::Asc, value),
        };

        let column = match field {
            "name" => SortColumn::Name,
            "createdAt" => SortColumn::CreatedAt,
            "updatedAt" => SortColumn::UpdatedAt,
            _ => {
                return Err(Error::invalid(
                    "sort",
                    format!("cannot sort by {:?}", value),
                ))
            }
        };

        Ok(Self { column, direction })
    }

    /// ORDER BY clause body; `id` breaks ties so pages are stable
    pub fn order_by(&self) -> String {
        format!("{} {}, id ASC", self.column.column(), self.direction.sql())
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            column: SortColumn::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl FromStr for SortSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.direction == SortDirection::Desc {
            f.write_str("-")?;
        }
        f.write_str(self.column.api_name())
    }
}
