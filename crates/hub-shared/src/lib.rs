//! # hub-shared
//!
//! Types shared by every InfluenceHub crate: domain enums, the row models
//! exchanged with the persistence service, the boundary traits that service
//! has to implement, and the error taxonomy.

pub mod backend;
pub mod constants;
pub mod error;
pub mod models;
pub mod types;

pub use backend::{BlobStorage, ChangeFeed, Filter, Functions, RowChange, Subscription, Tables};
pub use error::{BackendError, CommandError};
pub use models::Record;
pub use types::{ChangeKind, FollowStatus, OwnerId, Platform, PostStatus, Sentiment};
