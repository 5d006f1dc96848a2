//! # MarketDash Core
//!
//! The data and calculation core of an affiliate-marketing analytics
//! dashboard: sales rows imported from e-commerce platform exports are
//! reconciled against manually entered ad-spend records to produce
//! per-channel and per-day financial metrics.
//!
//! ## Core Concepts
//!
//! - **Sales rows**: imported transactions carrying a net commission and an
//!   optional attribution tag (sub id); untagged rows count as organic
//! - **Ad spends**: expenditures tagged per channel, or left untagged as
//!   general spend
//! - **Rateio**: untagged spend is allocated across revenue-producing
//!   channels in proportion to their share of total commission, never
//!   split evenly
//! - **KPIs**: profit, ROAS, ROI% and CPA per channel and per day, plus the
//!   flattened totals that back the dashboard cards
//!
//! The engine is pure: inputs are defensively coerced, malformed monetary
//! or date cells degrade to zero or are dropped, and nothing in the
//! reconciliation path can fail. Fetching, caching and persistence live in
//! the `store` module and, behind the `client` feature, the `remote`
//! gateway.
//!
//! ## Example
//!
//! ```rust,ignore
//! use marketdash::{build_dashboard, ReportQuery};
//!
//! let query = ReportQuery {
//!     from: NaiveDate::from_ymd_opt(2024, 3, 1),
//!     to: NaiveDate::from_ymd_opt(2024, 3, 31),
//!     channel: None,
//! };
//! let report = build_dashboard(&rows, &spends, &query);
//! println!("{}", marketdash::report::render_channel_table(&report.channels));
//! ```

pub mod dates;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod money;
pub mod report;
pub mod schema;
pub mod store;
pub mod validation;

#[cfg(feature = "client")]
pub mod remote;

pub use engine::{
    channel_rollup, daily_rollup, totals, ChannelKpi, DailyKpi, Totals, GENERAL_CHANNEL,
    ORGANIC_CHANNEL, ROAS_UNBOUNDED,
};
pub use error::{MarketDashError, Result};
pub use ingestion::{import_ad_spend_file, parse_ad_spend_csv, ImportBatch};
pub use report::{sort_channels, DashboardReport, SortColumn, SortDirection, SortState};
pub use schema::*;
pub use store::{cache_key, CacheEntry, EntityStore};

use log::{debug, info};

pub struct DashboardProcessor;

impl DashboardProcessor {
    /// Applies the reporting window and channel filter, then runs the three
    /// rollups. Inputs may span any date range; the query decides what
    /// counts.
    pub fn process(
        rows: &[SalesRow],
        spends: &[AdSpend],
        query: &ReportQuery,
    ) -> DashboardReport {
        let rows_in_window: Vec<SalesRow> = rows
            .iter()
            .filter(|row| query.matches_date(row.date))
            .cloned()
            .collect();
        let spends_in_window: Vec<AdSpend> = spends
            .iter()
            .filter(|spend| query.matches_date(spend.date))
            .cloned()
            .collect();

        info!(
            "building dashboard over {} sales rows and {} spends",
            rows_in_window.len(),
            spends_in_window.len()
        );

        let filter = query.channel_filter();
        let totals = engine::totals(&rows_in_window, &spends_in_window, filter);
        let channels = engine::channel_rollup(&rows_in_window, &spends_in_window, filter);

        // The daily trend narrows to the filtered channel with the same
        // exact-tag rule the totals use.
        let daily = match filter {
            Some(filter) => {
                let wanted = filter.to_lowercase();
                let rows: Vec<SalesRow> = rows_in_window
                    .into_iter()
                    .filter(|row| {
                        row.channel_tag().unwrap_or(ORGANIC_CHANNEL).to_lowercase() == wanted
                    })
                    .collect();
                let spends: Vec<AdSpend> = spends_in_window
                    .into_iter()
                    .filter(|spend| {
                        spend
                            .channel_tag()
                            .is_some_and(|tag| tag.to_lowercase() == wanted)
                    })
                    .collect();
                engine::daily_rollup(&rows, &spends)
            }
            None => engine::daily_rollup(&rows_in_window, &spends_in_window),
        };

        debug!(
            "dashboard built: {} channels, {} days",
            channels.len(),
            daily.len()
        );

        DashboardReport {
            totals,
            channels,
            daily,
        }
    }
}

pub fn build_dashboard(
    rows: &[SalesRow],
    spends: &[AdSpend],
    query: &ReportQuery,
) -> DashboardReport {
    DashboardProcessor::process(rows, spends, query)
}
