//! Query-string builders for table reads and filtered writes.
//!
//! Encodes reads in the PostgREST dialect used by the hosted service: equality filters as
//! `column=eq.value`, substring search as an `or=(...)` group of `ilike` clauses, ordering as
//! `order=column.desc`, and ranges as `offset`/`limit`.

/// Sort direction for an ordered read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Single-column predicate applied to reads, updates, and deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    column: String,
    condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Eq(String),
    IsNull,
}

impl Filter {
    /// Match rows whose `column` equals `value`.
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            condition: Condition::Eq(value.to_string()),
        }
    }

    /// Match rows whose `column` is null.
    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            condition: Condition::IsNull,
        }
    }

    /// Match `column` against an optional value, treating `None` as null.
    pub fn eq_or_null<V: ToString>(column: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => Self::eq(column, value),
            None => Self::is_null(column),
        }
    }

    fn to_param(&self) -> (String, String) {
        let value = match &self.condition {
            Condition::Eq(value) => format!("eq.{value}"),
            Condition::IsNull => "is.null".to_string(),
        };
        (self.column.clone(), value)
    }
}

/// Encode filters as query parameters.
pub fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::to_param).collect()
}

/// Builder describing a table read.
#[derive(Debug, Clone, Default)]
pub struct TableQuery {
    columns: Option<String>,
    filters: Vec<Filter>,
    search: Option<(Vec<String>, String)>,
    order: Option<(String, Direction)>,
    range: Option<(usize, usize)>,
}

impl TableQuery {
    /// Start a read returning every column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the returned columns (comma separated).
    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = Some(columns.to_string());
        self
    }

    /// Add an equality filter.
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Add an arbitrary filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Case-insensitive substring match of `term` over any of `columns`.
    ///
    /// Blank terms are ignored.
    pub fn search(mut self, columns: &[&str], term: &str) -> Self {
        let cleaned = sanitize_search_term(term);
        if !cleaned.is_empty() {
            self.search = Some((
                columns.iter().map(|column| column.to_string()).collect(),
                cleaned,
            ));
        }
        self
    }

    /// Order results by `column`.
    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    /// Inclusive row range, as `from..=to` offsets.
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.range = Some((from, to.max(from)));
        self
    }

    /// Encode the read as query parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![(
            "select".to_string(),
            self.columns.clone().unwrap_or_else(|| "*".to_string()),
        )];
        params.extend(filter_params(&self.filters));

        if let Some((columns, term)) = &self.search {
            let clauses: Vec<String> = columns
                .iter()
                .map(|column| format!("{column}.ilike.*{term}*"))
                .collect();
            params.push(("or".to_string(), format!("({})", clauses.join(","))));
        }

        if let Some((column, direction)) = &self.order {
            let suffix = match direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            params.push(("order".to_string(), format!("{column}.{suffix}")));
        }

        if let Some((from, to)) = self.range {
            params.push(("offset".to_string(), from.to_string()));
            params.push(("limit".to_string(), (to - from + 1).to_string()));
        }

        params
    }
}

/// Drop characters that carry meaning inside a PostgREST logic group.
fn sanitize_search_term(term: &str) -> String {
    term.trim()
        .chars()
        .filter(|ch| !matches!(ch, ',' | '(' | ')' | '"' | '\\' | '*'))
        .collect()
}
