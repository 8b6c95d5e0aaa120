//! # hub-client
//!
//! The InfluenceHub dashboard core: owner-scoped local mirrors kept current
//! by the backend's change feed, follower statistics, and the command
//! gateway that validates and submits mutations.
//!
//! Nothing here is global. A [`HubClient`] is built once (usually with
//! [`HubClient::connect`]) and handed to every view and command.

pub mod client;
pub mod commands;
pub mod config;
pub mod events;
pub mod live;
pub mod mirror;
pub mod remote;
pub mod state;
pub mod stats;
pub mod views;

use tracing_subscriber::{fmt, EnvFilter};

pub use client::HubClient;
pub use config::ClientConfig;
pub use live::{Collection, LiveView};
pub use mirror::{Change, Mirror};
pub use state::Session;
pub use stats::FollowerStats;
pub use views::{FollowersView, SchedulingView};

/// Install the global tracing subscriber. `RUST_LOG` overrides the defaults.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hub_client=debug,hub_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
