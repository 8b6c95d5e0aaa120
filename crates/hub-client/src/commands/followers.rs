//! Follow and unfollow.

use serde_json::json;
use tracing::info;

use hub_shared::constants::FOLLOWERS_TABLE;
use hub_shared::models::FollowerRelation;
use hub_shared::{CommandError, Filter, FollowStatus, OwnerId};

use super::{logged, require_owner};
use crate::client::HubClient;
use crate::events::decode_row;

fn relation(owner: &OwnerId, influencer_id: &str) -> [Filter; 2] {
    [
        Filter::eq("influencer_id", influencer_id),
        Filter::eq("follower_id", owner.as_str()),
    ]
}

/// Start following `influencer_id`. An existing relation is returned as-is.
pub async fn follow(
    client: &HubClient,
    owner: Option<&OwnerId>,
    influencer_id: &str,
) -> Result<FollowerRelation, CommandError> {
    logged("follow", follow_inner(client, owner, influencer_id).await)
}

async fn follow_inner(
    client: &HubClient,
    owner: Option<&OwnerId>,
    influencer_id: &str,
) -> Result<FollowerRelation, CommandError> {
    let owner = require_owner(owner)?;
    let influencer_id = influencer_id.trim();
    if influencer_id.is_empty() {
        return Err(CommandError::validation("No account to follow"));
    }
    if influencer_id == owner.as_str() {
        return Err(CommandError::validation("You cannot follow yourself"));
    }

    let existing = client
        .tables()
        .select(FOLLOWERS_TABLE, &relation(owner, influencer_id))
        .await?;
    if let Some(row) = existing.into_iter().next() {
        return Ok(decode_row(FOLLOWERS_TABLE, row)?);
    }

    let row = client
        .tables()
        .insert(
            FOLLOWERS_TABLE,
            json!({
                "influencer_id": influencer_id,
                "follower_id": owner.as_str(),
                "status": FollowStatus::Active,
            }),
        )
        .await?;
    let rel: FollowerRelation = decode_row(FOLLOWERS_TABLE, row)?;

    info!(relation_id = %rel.id, influencer_id, "followed");
    Ok(rel)
}

/// Stop following `influencer_id`. Returns the removed relation.
pub async fn unfollow(
    client: &HubClient,
    owner: Option<&OwnerId>,
    influencer_id: &str,
) -> Result<FollowerRelation, CommandError> {
    logged("unfollow", unfollow_inner(client, owner, influencer_id).await)
}

async fn unfollow_inner(
    client: &HubClient,
    owner: Option<&OwnerId>,
    influencer_id: &str,
) -> Result<FollowerRelation, CommandError> {
    let owner = require_owner(owner)?;
    let influencer_id = influencer_id.trim();

    let rows = client
        .tables()
        .delete(FOLLOWERS_TABLE, &relation(owner, influencer_id))
        .await?;
    let row = rows.into_iter().next().ok_or(CommandError::NotFound)?;
    let rel: FollowerRelation = decode_row(FOLLOWERS_TABLE, row)?;

    info!(relation_id = %rel.id, influencer_id, "unfollowed");
    Ok(rel)
}
