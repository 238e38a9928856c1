//! Entity services and the sync engine of the studio: every write lands in
//! the local store first and is mirrored to the cloud, directly when it is
//! reachable and through the outbound queue when it is not.

pub mod activity;
pub mod booking;
pub mod cloud;
pub mod conflict;
pub mod connectivity;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod mirror;
pub mod notify;
pub mod reminder;
pub mod studio;
pub mod sync;
pub mod task;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use error::{ServiceError, ServiceResult};
pub use studio::Studio;
