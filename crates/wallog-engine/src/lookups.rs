//! Auxiliary lookup loaders.
//!
//! The classifier needs two precomputed sets: the case ids with a
//! pending serial-number dispute, and the facility codes located in
//! watched countries. Both loaders drain their collections to
//! exhaustion before returning - a partial set would silently
//! mis-classify records.

use std::collections::HashSet;

use tracing::debug;
use wallog_core::fields::{self, change_log, facilities, problem_countries};
use wallog_store::{Filter, QuerySpec, RemoteStore, StoreResult};

/// Preferred page size for the full scans.
const SCAN_PAGE_SIZE: u32 = 5000;

/// Case ids that have a pending dispute on either serial-number field.
pub async fn load_disputed_serials(store: &dyn RemoteStore) -> StoreResult<HashSet<String>> {
    let field_match = Filter::or(
        change_log::DISPUTED_SERIAL_FIELDS
            .iter()
            .map(|f| Filter::eq(change_log::FIELD, *f))
            .collect(),
    );
    let filter = field_match.and_with(Filter::eq(change_log::STATUS, change_log::STATUS_PENDING));

    let spec = QuerySpec::new()
        .with_select([fields::NOTIFICATION_ID])
        .with_filter(filter)
        .with_page_size_hint(SCAN_PAGE_SIZE);

    let rows = store.query_all(change_log::COLLECTION, &spec).await?;

    let ids: HashSet<String> = rows
        .iter()
        .filter_map(|r| r.get_str(fields::NOTIFICATION_ID))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    debug!(count = ids.len(), "Loaded disputed serial cases");
    Ok(ids)
}

/// Lower-cased codes of facilities located in a watched country.
pub async fn load_problem_facilities(store: &dyn RemoteStore) -> StoreResult<HashSet<String>> {
    let country_rows = store
        .query_all(
            problem_countries::COLLECTION,
            &QuerySpec::new()
                .with_select([problem_countries::COUNTRY])
                .with_page_size_hint(SCAN_PAGE_SIZE),
        )
        .await?;

    let countries: Vec<&str> = country_rows
        .iter()
        .filter_map(|r| r.get_str(problem_countries::COUNTRY))
        .filter(|c| !c.is_empty())
        .collect();

    if countries.is_empty() {
        return Ok(HashSet::new());
    }

    let country_filter = Filter::or(
        countries
            .iter()
            .map(|c| Filter::eq(facilities::COUNTRY, *c))
            .collect(),
    );

    let spec = QuerySpec::new()
        .with_select([facilities::FACILITY_CODE])
        .with_filter(country_filter)
        .with_page_size_hint(SCAN_PAGE_SIZE);

    let rows = store.query_all(facilities::COLLECTION, &spec).await?;

    let codes: HashSet<String> = rows
        .iter()
        .filter_map(|r| r.get_str(facilities::FACILITY_CODE))
        .filter(|code| !code.is_empty())
        .map(str::to_lowercase)
        .collect();

    debug!(count = codes.len(), "Loaded problem facility codes");
    Ok(codes)
}
