// libs/notification-cell/src/lib.rs
//! # Notification Cell
//!
//! Best-effort booking confirmation emails. Dispatch is decoupled from the
//! booking transaction: a relay failure is logged and never surfaced to
//! the booking caller.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{NotificationError, NotifyBookingRequest};
pub use router::notification_routes;
pub use services::notify::NotificationService;
