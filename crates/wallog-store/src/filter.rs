//! Filter expressions.
//!
//! Filters are built as an AST and rendered to the store's fixed
//! textual grammar on the way out: `eq`/`ne` against string or number
//! literals or `null`, `contains(field,'literal')`, `ge`/`le`/`lt`
//! range comparisons against ISO timestamps, and `and`/`or` with
//! parenthesized grouping. Single quotes inside string literals are
//! escaped by doubling.

use chrono::{DateTime, SecondsFormat, Utc};

/// A literal on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Int(i64),
    Timestamp(DateTime<Utc>),
    Null,
}

impl FilterValue {
    fn render(&self) -> String {
        match self {
            FilterValue::Str(s) => format!("'{}'", escape_literal(s)),
            FilterValue::Int(n) => n.to_string(),
            FilterValue::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            FilterValue::Null => "null".to_string(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Str(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Str(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Int(n)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(ts)
    }
}

/// A filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field eq value`
    Eq { field: String, value: FilterValue },
    /// `field ne value`
    Ne { field: String, value: FilterValue },
    /// `contains(field,'value')`
    Contains { field: String, value: String },
    /// `field ge value`
    Ge { field: String, value: FilterValue },
    /// `field le value`
    Le { field: String, value: FilterValue },
    /// `field lt value`
    Lt { field: String, value: FilterValue },
    /// Conjunction; every operand is parenthesized when rendered.
    And { filters: Vec<Filter> },
    /// Disjunction; every operand is parenthesized when rendered.
    Or { filters: Vec<Filter> },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::Ge {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn le(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::Le {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Filter::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `field eq null`
    pub fn is_null(field: impl Into<String>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: FilterValue::Null,
        }
    }

    /// `field ne null`
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Filter::Ne {
            field: field.into(),
            value: FilterValue::Null,
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    /// Combine with another filter under `and`, flattening when this is
    /// already a conjunction.
    #[must_use]
    pub fn and_with(self, other: Filter) -> Self {
        match self {
            Filter::And { mut filters } => {
                filters.push(other);
                Filter::And { filters }
            }
            _ => Filter::And {
                filters: vec![self, other],
            },
        }
    }

    /// Combine with another filter under `or`, flattening when this is
    /// already a disjunction.
    #[must_use]
    pub fn or_with(self, other: Filter) -> Self {
        match self {
            Filter::Or { mut filters } => {
                filters.push(other);
                Filter::Or { filters }
            }
            _ => Filter::Or {
                filters: vec![self, other],
            },
        }
    }

    /// Render to the textual grammar.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Filter::Eq { field, value } => format!("{field} eq {}", value.render()),
            Filter::Ne { field, value } => format!("{field} ne {}", value.render()),
            Filter::Contains { field, value } => {
                format!("contains({field},'{}')", escape_literal(value))
            }
            Filter::Ge { field, value } => format!("{field} ge {}", value.render()),
            Filter::Le { field, value } => format!("{field} le {}", value.render()),
            Filter::Lt { field, value } => format!("{field} lt {}", value.render()),
            Filter::And { filters } => join_group(filters, " and "),
            Filter::Or { filters } => join_group(filters, " or "),
        }
    }
}

fn join_group(filters: &[Filter], separator: &str) -> String {
    filters
        .iter()
        .map(|f| format!("({})", f.render()))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Escape a string literal by doubling embedded single quotes.
#[must_use]
pub fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_leaves() {
        assert_eq!(Filter::eq("stage", "gr-si").render(), "stage eq 'gr-si'");
        assert_eq!(Filter::eq("statuscode", 1i64).render(), "statuscode eq 1");
        assert_eq!(Filter::is_null("reviewstatus").render(), "reviewstatus eq null");
        assert_eq!(
            Filter::contains("notificationid", "N-1").render(),
            "contains(notificationid,'N-1')"
        );
    }

    #[test]
    fn test_render_timestamp_unquoted() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        assert_eq!(
            Filter::ge("createdon", ts).render(),
            "createdon ge 2025-06-02T00:00:00.000Z"
        );
    }

    #[test]
    fn test_quote_doubling() {
        assert_eq!(
            Filter::eq("remark", "supplier's fault").render(),
            "remark eq 'supplier''s fault'"
        );
    }

    #[test]
    fn test_grouping_parenthesizes_operands() {
        let filter = Filter::eq("a", "1").and_with(Filter::or(vec![
            Filter::eq("b", "2"),
            Filter::is_not_null("c"),
        ]));
        assert_eq!(
            filter.render(),
            "(a eq '1') and ((b eq '2') or (c ne null))"
        );
    }

    #[test]
    fn test_and_with_flattens() {
        let filter = Filter::eq("a", "1")
            .and_with(Filter::eq("b", "2"))
            .and_with(Filter::eq("c", "3"));
        assert_eq!(
            filter.render(),
            "(a eq '1') and (b eq '2') and (c eq '3')"
        );
    }
}
