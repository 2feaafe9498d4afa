//! Availability clipping: drop gap days the source cannot have data for.
//!
//! Summary statistics tell us the window the source actually holds and how
//! densely it is populated. Statistics are cache-aside: a stored snapshot is
//! reused whenever its query window already covers the request.

use chrono::{NaiveDate, Utc};
use diesel::SqliteConnection;
use tracing::{debug, info};

use telemetry_ingestor::providers::TelemetryProvider;

use crate::daterange::DateRange;
use crate::store::{StatisticsSnapshot, SyncStore};
use crate::sync::SyncError;

/// Clips `gaps` to the window the source reports data for.
///
/// Returns the empty vec when the source has no data at all, or when its
/// sample density over the actual window falls below `min_outputs_per_day`
/// (a sparse system is not worth a per-day crawl).
pub async fn clip_to_available<S, P>(
    conn: &mut SqliteConnection,
    store: &S,
    provider: &P,
    pv_system_id: i64,
    gaps: &[DateRange],
    min_outputs_per_day: f64,
    wait_on_limit: bool,
) -> Result<Vec<DateRange>, SyncError>
where
    S: SyncStore,
    P: TelemetryProvider + ?Sized,
{
    let Some(last) = gaps.last() else {
        return Ok(Vec::new());
    };

    let snapshot = statistics_with_cache(
        conn,
        store,
        provider,
        pv_system_id,
        last.end_date(),
        wait_on_limit,
    )
    .await?;

    let Some(available) = snapshot.actual_window() else {
        info!(pv_system_id, "source reports no data for system");
        return Ok(Vec::new());
    };

    let density = snapshot.num_outputs as f64 / available.total_days() as f64;
    if density < min_outputs_per_day {
        info!(
            pv_system_id,
            density, min_outputs_per_day, "sample density below threshold; skipping system"
        );
        return Ok(Vec::new());
    }

    Ok(gaps
        .iter()
        .filter_map(|gap| gap.intersection(&available))
        .collect())
}

/// Returns the cached snapshot when it is fresh for a query bounded by
/// `date_to`, otherwise fetches and replaces it.
async fn statistics_with_cache<S, P>(
    conn: &mut SqliteConnection,
    store: &S,
    provider: &P,
    pv_system_id: i64,
    date_to: NaiveDate,
    wait_on_limit: bool,
) -> Result<StatisticsSnapshot, SyncError>
where
    S: SyncStore,
    P: TelemetryProvider + ?Sized,
{
    if let Some(cached) = store.statistics_get(conn, pv_system_id)? {
        if cached.is_fresh_for(None, Some(date_to)) {
            debug!(pv_system_id, "reusing cached statistics");
            return Ok(cached);
        }
    }

    info!(pv_system_id, %date_to, "refreshing statistics");
    let stat = provider
        .statistic(pv_system_id, None, Some(date_to), wait_on_limit)
        .await?;

    let snapshot = StatisticsSnapshot {
        pv_system_id,
        actual_date_from: stat.actual_date_from,
        actual_date_to: stat.actual_date_to,
        num_outputs: stat.num_outputs,
        query_date_from: None,
        query_date_to: date_to,
        requested_at: Utc::now(),
    };
    store.statistics_replace(conn, &snapshot)?;
    Ok(snapshot)
}
