//! Per-screen state: live mirrors plus the commands that act on them.
//!
//! A view exclusively owns its mirrors. Commands take `&mut self`, so a view
//! never has more than one command in flight, and dropping a view releases
//! its feed subscriptions.

pub mod followers;
pub mod scheduling;

pub use followers::FollowersView;
pub use scheduling::SchedulingView;
