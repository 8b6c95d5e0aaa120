use serde_json::json;
use tracing::debug;

use hub_shared::constants::FN_ANALYTICS;
use hub_shared::models::{AnalyticsReport, AnalyticsTimeframe};
use hub_shared::{BackendError, CommandError, OwnerId};

use super::{logged, require_owner};
use crate::client::HubClient;

/// Ask the `get-analytics` function for the owner's report over `timeframe`.
pub async fn fetch_analytics(
    client: &HubClient,
    owner: Option<&OwnerId>,
    timeframe: AnalyticsTimeframe,
) -> Result<AnalyticsReport, CommandError> {
    logged("fetch_analytics", fetch(client, owner, timeframe).await)
}

async fn fetch(
    client: &HubClient,
    owner: Option<&OwnerId>,
    timeframe: AnalyticsTimeframe,
) -> Result<AnalyticsReport, CommandError> {
    let owner = require_owner(owner)?;
    if timeframe.start_date > timeframe.end_date {
        return Err(CommandError::validation("Start date must not be after end date"));
    }

    let reply = client
        .functions()
        .invoke(FN_ANALYTICS, json!({ "userId": owner.as_str(), "timeframe": timeframe }))
        .await?;
    let report: AnalyticsReport =
        serde_json::from_value(reply).map_err(|e| BackendError::Malformed(format!("{FN_ANALYTICS}: {e}")))?;

    debug!(
        start = %timeframe.start_date,
        end = %timeframe.end_date,
        top_posts = report.top_posts.len(),
        "analytics fetched"
    );
    Ok(report)
}
