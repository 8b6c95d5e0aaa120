//! Comment inbox: list follower comments and answer them.

use serde_json::json;
use tracing::info;

use hub_shared::constants::COMMENTS_TABLE;
use hub_shared::models::Comment;
use hub_shared::{CommandError, Filter, OwnerId};

use super::{logged, require_owner};
use crate::client::HubClient;
use crate::events::{decode_row, decode_rows};

/// Comments left for the owner, newest first.
pub async fn list_comments(client: &HubClient, owner: Option<&OwnerId>) -> Result<Vec<Comment>, CommandError> {
    let owner = require_owner(owner)?;
    let rows = client
        .tables()
        .select(COMMENTS_TABLE, &[Filter::eq("influencer_id", owner.as_str())])
        .await?;

    let mut comments: Vec<Comment> = decode_rows(COMMENTS_TABLE, rows)?;
    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(comments)
}

/// Record `response` on one of the owner's comments and mark it answered.
/// Answering again replaces the previous response.
pub async fn respond_to_comment(
    client: &HubClient,
    owner: Option<&OwnerId>,
    comment_id: &str,
    response: &str,
) -> Result<Comment, CommandError> {
    logged(
        "respond_to_comment",
        respond_inner(client, owner, comment_id, response).await,
    )
}

async fn respond_inner(
    client: &HubClient,
    owner: Option<&OwnerId>,
    comment_id: &str,
    response: &str,
) -> Result<Comment, CommandError> {
    let owner = require_owner(owner)?;
    let response = response.trim();
    if response.is_empty() {
        return Err(CommandError::validation("Please write a response"));
    }

    let rows = client
        .tables()
        .update(
            COMMENTS_TABLE,
            &[
                Filter::eq("id", comment_id),
                Filter::eq("influencer_id", owner.as_str()),
            ],
            json!({ "is_responded": true, "response": response }),
        )
        .await?;
    let row = rows.into_iter().next().ok_or(CommandError::NotFound)?;
    let comment: Comment = decode_row(COMMENTS_TABLE, row)?;

    info!(comment_id = %comment.id, "comment answered");
    Ok(comment)
}
