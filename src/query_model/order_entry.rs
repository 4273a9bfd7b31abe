//! ORDER BY entries.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub enum OrderEntry {
    /// Structured order; the column resolves to an alias the same way WHERE
    /// columns do
    Column {
        column: String,
        direction: SortDirection,
    },

    /// Raw expression; bare columns are auto-prefixed with the base alias
    Raw(String),
}
