//! Query shapes for paged reads.

use crate::filter::Filter;
use crate::record::RecordData;

/// What to read from a collection.
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    /// Columns to project. Empty means "all".
    pub select: Vec<String>,
    /// Filter expression.
    pub filter: Option<Filter>,
    /// Rendered ordering clause, e.g. `"createdon desc,versionnumber desc"`.
    pub order_by: Option<String>,
    /// Hard cap on the number of rows returned.
    pub top: Option<u32>,
    /// Preferred page size for multi-page scans.
    pub page_size_hint: Option<u32>,
    /// Ask the store for the total filtered count.
    pub include_count: bool,
}

impl QuerySpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_select<I, S>(mut self, select: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = select.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the filter when one is present; no-op otherwise.
    #[must_use]
    pub fn with_filter_opt(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    #[must_use]
    pub fn with_top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    #[must_use]
    pub fn with_page_size_hint(mut self, hint: u32) -> Self {
        self.page_size_hint = Some(hint);
        self
    }

    #[must_use]
    pub fn with_count(mut self) -> Self {
        self.include_count = true;
        self
    }
}

/// One page of a query result.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    /// Records on this page.
    pub items: Vec<RecordData>,
    /// Opaque continuation token; `None` when the scan is exhausted.
    pub next_link: Option<String>,
    /// Total filtered count, when requested and reported.
    pub total_count: Option<u64>,
}

impl QueryPage {
    /// A final page carrying only items.
    #[must_use]
    pub fn of(items: Vec<RecordData>) -> Self {
        Self {
            items,
            next_link: None,
            total_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let spec = QuerySpec::new()
            .with_select(["a", "b"])
            .with_filter(Filter::eq("a", "1"))
            .with_order_by("createdon desc")
            .with_top(50)
            .with_count();

        assert_eq!(spec.select, vec!["a", "b"]);
        assert!(spec.filter.is_some());
        assert_eq!(spec.order_by.as_deref(), Some("createdon desc"));
        assert_eq!(spec.top, Some(50));
        assert!(spec.include_count);
    }
}
