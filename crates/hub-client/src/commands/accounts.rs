//! Connected social accounts.
//!
//! The OAuth exchange itself runs in the `connect-social-account` function;
//! the client only forwards the authorization code and stores nothing
//! secret.

use serde_json::{json, Value};
use tracing::info;

use hub_shared::constants::{ACCOUNTS_TABLE, FN_CONNECT_ACCOUNT};
use hub_shared::models::SocialAccount;
use hub_shared::{BackendError, CommandError, Filter, OwnerId, Platform};

use super::{logged, require_owner};
use crate::client::HubClient;
use crate::events::{decode_row, decode_rows};

pub async fn list_accounts(client: &HubClient, owner: Option<&OwnerId>) -> Result<Vec<SocialAccount>, CommandError> {
    let owner = require_owner(owner)?;
    let rows = client
        .tables()
        .select(ACCOUNTS_TABLE, &[Filter::eq("user_id", owner.as_str())])
        .await?;
    Ok(decode_rows(ACCOUNTS_TABLE, rows)?)
}

/// Distinct platforms across `accounts`, in [`Platform::ALL`] order.
pub fn connected_platforms(accounts: &[SocialAccount]) -> Vec<Platform> {
    Platform::ALL
        .into_iter()
        .filter(|platform| accounts.iter().any(|a| a.platform == *platform))
        .collect()
}

pub async fn connect_account(
    client: &HubClient,
    owner: Option<&OwnerId>,
    platform: Platform,
    auth_code: &str,
) -> Result<SocialAccount, CommandError> {
    logged("connect_account", connect(client, owner, platform, auth_code).await)
}

async fn connect(
    client: &HubClient,
    owner: Option<&OwnerId>,
    platform: Platform,
    auth_code: &str,
) -> Result<SocialAccount, CommandError> {
    let owner = require_owner(owner)?;
    if auth_code.trim().is_empty() {
        return Err(CommandError::validation("Missing authorization code"));
    }

    let reply = client
        .functions()
        .invoke(
            FN_CONNECT_ACCOUNT,
            json!({
                "platform": platform,
                "authCode": auth_code,
                "userId": owner.as_str(),
            }),
        )
        .await?;

    let account = match reply {
        Value::Object(mut body) => body.remove("account").filter(|a| !a.is_null()),
        _ => None,
    }
    .ok_or_else(|| BackendError::Function("Failed to connect account".into()))?;
    let account: SocialAccount = decode_row(ACCOUNTS_TABLE, account)?;

    info!(account_id = %account.id, platform = %account.platform, "account connected");
    Ok(account)
}

/// Remove one of the owner's accounts. Returns the removed row.
pub async fn disconnect_account(
    client: &HubClient,
    owner: Option<&OwnerId>,
    account_id: &str,
) -> Result<SocialAccount, CommandError> {
    logged("disconnect_account", disconnect(client, owner, account_id).await)
}

async fn disconnect(client: &HubClient, owner: Option<&OwnerId>, account_id: &str) -> Result<SocialAccount, CommandError> {
    let owner = require_owner(owner)?;
    let rows = client
        .tables()
        .delete(
            ACCOUNTS_TABLE,
            &[Filter::eq("id", account_id), Filter::eq("user_id", owner.as_str())],
        )
        .await?;
    let row = rows.into_iter().next().ok_or(CommandError::NotFound)?;
    let account: SocialAccount = decode_row(ACCOUNTS_TABLE, row)?;

    info!(account_id = %account.id, "account disconnected");
    Ok(account)
}
