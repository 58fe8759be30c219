//! Row types for the application's tables.
//!
//! These are plain records: ids are UUIDs (profiles reuse the BaaS user id),
//! money is stored as integer minor units next to its currency code, and enums
//! are persisted as snake_case TEXT.

pub mod account;
pub mod billing;
pub mod catalog;
pub mod community;

pub use account::{Profile, Role};
pub use billing::{
    Donation, Payment, Plan, RevenueSummary, RevenueTransaction, Subscription, SubscriptionStatus,
};
pub use catalog::{Album, Track, TrackFilter};
pub use community::{Community, CommunityMember, CommunityPost, Event};
