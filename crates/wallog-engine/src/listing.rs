//! Merged shard listing.
//!
//! Builds the base filter out of listing criteria and owner routing,
//! queries every shard in parallel, and merges the results into one
//! ordered, cursor-resumable page sequence. A full-dump mode drives the
//! same loop to exhaustion for the download path.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use futures::future::join_all;
use tracing::debug;
use wallog_core::{fields, Owner, ShardSet, ShardView};
use wallog_store::{Filter, QuerySpec, RemoteStore};

use crate::cursor::{merge_page, Cursor, MergedItem};
use crate::error::{EngineError, EngineResult};

/// Hard bounds on the requested page size.
const MIN_PAGE_SIZE: u32 = 1;
const MAX_PAGE_SIZE: u32 = 500;

/// Caller-supplied listing criteria.
#[derive(Debug, Clone, Default)]
pub struct ListCriteria {
    /// Include records created on or after this date.
    pub from: Option<NaiveDate>,
    /// Include records created up to and including this date.
    pub to: Option<NaiveDate>,
    /// Substring match on the case id.
    pub search: Option<String>,
    /// Exact status code match.
    pub status: Option<i64>,
}

impl ListCriteria {
    /// Render the criteria as a filter, `None` when empty.
    #[must_use]
    pub fn to_filter(&self) -> Option<Filter> {
        let mut parts: Vec<Filter> = Vec::new();

        if let Some(from) = self.from {
            parts.push(Filter::ge(fields::CREATED_ON, midnight(from)));
        }
        if let Some(to) = self.to {
            // Inclusive end date: strictly before the next midnight.
            parts.push(Filter::lt(fields::CREATED_ON, midnight(to + Days::new(1))));
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            parts.push(Filter::contains(fields::NOTIFICATION_ID, term));
        }
        if let Some(status) = self.status {
            parts.push(Filter::eq("statuscode", status));
        }

        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Filter::and(parts)),
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).expect("midnight exists").and_utc()
}

/// Filter selecting the records an owner is responsible for.
///
/// Unreviewed records route by stage; reviewed records route by remark
/// override. An owner with neither rule contributes no routing filter.
#[must_use]
pub fn owner_filter(owner: &Owner) -> Option<Filter> {
    let mut clauses: Vec<Filter> = Vec::new();

    if !owner.stages.is_empty() {
        let stage_match = Filter::or(
            owner
                .stages
                .iter()
                .map(|s| Filter::eq(fields::STAGE, s.as_str()))
                .collect(),
        );
        let not_reviewed = Filter::or(vec![
            Filter::is_null(fields::REVIEW_STATUS),
            Filter::ne(fields::REVIEW_STATUS, fields::REVIEW_STATUS_REVIEWED),
        ]);
        clauses.push(Filter::and(vec![stage_match, not_reviewed]));
    }

    if !owner.remark_overrides.is_empty() {
        let reviewed = Filter::eq(fields::REVIEW_STATUS, fields::REVIEW_STATUS_REVIEWED);
        let remark_match = Filter::or(
            owner
                .remark_overrides
                .iter()
                .map(|r| Filter::eq(fields::REMARK, r.as_str()))
                .collect(),
        );
        clauses.push(Filter::and(vec![reviewed, remark_match]));
    }

    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(Filter::or(clauses)),
    }
}

/// One page request.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub criteria: ListCriteria,
    /// Restrict to one owner's queue (owner id, case-insensitive).
    pub owner: Option<String>,
    /// Restrict to one shard.
    pub shard: Option<String>,
    /// Requested page size; clamped to `1..=500`.
    pub page_size: u32,
    /// Token from the previous page, absent for the first page.
    pub cursor: Option<String>,
    /// Also report the total filtered count.
    pub include_count: bool,
}

/// A re-exported merged item.
pub type ListItem = MergedItem;

/// One page of a merged listing.
#[derive(Debug)]
pub struct ListPage {
    pub items: Vec<ListItem>,
    /// Token to continue the scan; absent when exhausted.
    pub next_cursor: Option<String>,
    /// Sum of per-shard filtered counts, when requested.
    pub total_count: Option<u64>,
}

/// Merged listing reader over a shard set.
pub struct Lister {
    store: Arc<dyn RemoteStore>,
    shards: ShardSet,
    owners: Vec<Owner>,
}

impl Lister {
    pub fn new(store: Arc<dyn RemoteStore>, shards: ShardSet, owners: Vec<Owner>) -> Self {
        Self {
            store,
            shards,
            owners,
        }
    }

    /// Serve one page of the merged scan.
    pub async fn page(&self, options: &ListOptions) -> EngineResult<ListPage> {
        let views = self.resolve_views(options.shard.as_deref())?;
        let base_filter = self.resolve_filter(options)?;
        let cursor = match options.cursor.as_deref() {
            Some(token) => Cursor::decode(token)?,
            None => Cursor::start(),
        };
        let page_size = options.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);

        // One bounded request per shard, awaited jointly.
        let queries = views.iter().map(|view| {
            let spec = self.shard_query(view, &base_filter, &cursor, page_size, options.include_count);
            let store = self.store.clone();
            let collection = view.collection.clone();
            let key = view.key.clone();
            async move {
                let page = store.query(&collection, &spec).await?;
                Ok::<_, EngineError>((key, page))
            }
        });

        let mut batches = Vec::with_capacity(views.len());
        let mut total_count: Option<u64> = None;
        for result in join_all(queries).await {
            let (key, page) = result?;
            if let Some(count) = page.total_count {
                total_count = Some(total_count.unwrap_or(0) + count);
            }
            batches.push((key, page.items));
        }

        let (items, next) = merge_page(batches, &cursor, page_size as usize);
        debug!(
            items = items.len(),
            has_next = next.is_some(),
            "Served merged page"
        );

        Ok(ListPage {
            items,
            next_cursor: next.map(|c| c.encode()),
            total_count: if options.include_count { total_count } else { None },
        })
    }

    /// Drive the scan to exhaustion and return every matching record in
    /// global order.
    pub async fn dump(&self, options: &ListOptions) -> EngineResult<Vec<ListItem>> {
        let mut all = Vec::new();
        let mut options = ListOptions {
            page_size: MAX_PAGE_SIZE,
            include_count: false,
            cursor: None,
            ..options.clone()
        };

        loop {
            let page = self.page(&options).await?;
            all.extend(page.items);
            match page.next_cursor {
                Some(token) => options.cursor = Some(token),
                None => break,
            }
        }

        Ok(all)
    }

    fn resolve_views(&self, shard: Option<&str>) -> EngineResult<Vec<&ShardView>> {
        match shard {
            Some(key) => {
                let view = self.shards.get(key).ok_or_else(|| {
                    EngineError::validation(format!(
                        "unknown shard '{key}'; valid shards: {}",
                        self.shards.keys().join(", ")
                    ))
                })?;
                Ok(vec![view])
            }
            None => Ok(self.shards.iter().collect()),
        }
    }

    fn resolve_filter(&self, options: &ListOptions) -> EngineResult<Option<Filter>> {
        let mut filter = options.criteria.to_filter();

        if let Some(owner_id) = options.owner.as_deref() {
            let owner = wallog_core::owner::find_owner(&self.owners, owner_id).ok_or_else(|| {
                EngineError::validation(format!("unknown owner '{owner_id}'"))
            })?;
            if let Some(routing) = owner_filter(owner) {
                filter = Some(match filter {
                    Some(f) => f.and_with(routing),
                    None => routing,
                });
            }
        }

        Ok(filter)
    }

    fn shard_query(
        &self,
        view: &ShardView,
        base_filter: &Option<Filter>,
        cursor: &Cursor,
        page_size: u32,
        include_count: bool,
    ) -> QuerySpec {
        let mut filter = base_filter.clone();
        if let Some(paging) = cursor.paging_filter(&view.key) {
            filter = Some(match filter {
                Some(f) => f.and_with(paging),
                None => paging,
            });
        }

        let mut select = view.select.clone();
        if !select.is_empty() {
            // The merge needs the ordering keys and the id.
            for required in [fields::CREATED_ON, fields::VERSION] {
                if !select.iter().any(|c| c == required) {
                    select.push(required.to_string());
                }
            }
            if !select.iter().any(|c| c == &view.id_field) {
                select.push(view.id_field.clone());
            }
        }

        let mut spec = QuerySpec::new()
            .with_select(select)
            .with_filter_opt(filter)
            .with_order_by(format!("{} desc,{} desc", fields::CREATED_ON, fields::VERSION))
            .with_top(page_size);
        if include_count {
            spec = spec.with_count();
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallog_core::Stage;

    #[test]
    fn test_criteria_filter_rendering() {
        let criteria = ListCriteria {
            from: Some(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()),
            to: Some(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()),
            search: Some("N-42".to_string()),
            status: Some(1),
        };

        assert_eq!(
            criteria.to_filter().unwrap().render(),
            "(createdon ge 2025-06-02T00:00:00.000Z) and \
             (createdon lt 2025-07-01T00:00:00.000Z) and \
             (contains(notificationid,'N-42')) and \
             (statuscode eq 1)"
        );
    }

    #[test]
    fn test_empty_criteria_is_no_filter() {
        assert!(ListCriteria::default().to_filter().is_none());
        let blank_search = ListCriteria {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank_search.to_filter().is_none());
    }

    #[test]
    fn test_owner_filter_combines_stage_and_remark_routes() {
        let owner = Owner::new("SI", "Integrator")
            .with_stages(vec![Stage::GrSi, Stage::FwdLoadId])
            .with_remark_overrides(["Pending receipt"]);

        assert_eq!(
            owner_filter(&owner).unwrap().render(),
            "(((stage eq 'gr-si') or (stage eq 'fwd-load-id')) and \
             ((reviewstatus eq null) or (reviewstatus ne 'Reviewed'))) or \
             ((reviewstatus eq 'Reviewed') and ((remark eq 'Pending receipt')))"
        );
    }

    #[test]
    fn test_owner_with_stage_rules_only() {
        let owner = Owner::new("FC", "Facility").with_stages(vec![Stage::GrDc]);
        assert_eq!(
            owner_filter(&owner).unwrap().render(),
            "((stage eq 'gr-dc')) and ((reviewstatus eq null) or (reviewstatus ne 'Reviewed'))"
        );
    }

    #[test]
    fn test_owner_without_rules_has_no_filter() {
        let owner = Owner::new("Shadow", "Shadow");
        assert!(owner_filter(&owner).is_none());
    }
}
