//! Subscription wire payload.
//!
//! The server's subscription protocol is external and fixed: one JSON
//! payload per subscription with exactly three top-level keys. Field
//! names here are the wire contract; do not rename them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Entity-kind key for live-report subscriptions.
pub const LIVE_REPORT_KIND: &str = "live_report";
/// Entity-kind key for project subscriptions.
pub const PROJECT_KIND: &str = "project";

/// Which rows a result subscription pages over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowMode {
    /// Only frozen rows.
    Frozen,
    /// Every row.
    All,
}

/// Row paging for one live report's results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSubscription {
    /// Live report whose result rows are streamed.
    pub live_report_id: String,
    /// Frozen rows or all rows.
    pub row_mode: RowMode,
    /// First row of the page (inclusive).
    pub start_row: u64,
    /// Last row of the page (exclusive).
    pub end_row: u64,
}

/// The one-shot payload sent after connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// Entity kind mapped to a list holding one live-report id.
    pub live_report_subscriptions: BTreeMap<String, Vec<String>>,
    /// Entity kind mapped to the subscribed project ids.
    pub project_subscriptions: BTreeMap<String, Vec<String>>,
    /// Single-element list describing result-row paging.
    pub live_report_result_subscriptions: Vec<ResultSubscription>,
}

impl SubscriptionRequest {
    /// Builds the canonical shape: one live report, its projects, one
    /// result-row page.
    #[must_use]
    pub fn for_live_report(
        live_report_id: impl Into<String>,
        project_ids: Vec<String>,
        row_mode: RowMode,
        start_row: u64,
        end_row: u64,
    ) -> Self {
        let live_report_id = live_report_id.into();
        let mut live_report_subscriptions = BTreeMap::new();
        live_report_subscriptions.insert(
            LIVE_REPORT_KIND.to_string(),
            vec![live_report_id.clone()],
        );
        let mut project_subscriptions = BTreeMap::new();
        project_subscriptions.insert(PROJECT_KIND.to_string(), project_ids);

        Self {
            live_report_subscriptions,
            project_subscriptions,
            live_report_result_subscriptions: vec![ResultSubscription {
                live_report_id,
                row_mode,
                start_row,
                end_row,
            }],
        }
    }
}
