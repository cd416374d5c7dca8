// libs/booking-cell/src/lib.rs
//! # Booking Cell
//!
//! The booking lifecycle engine: validates reservations against slot
//! bounds and existing bookings (with a 30-minute trailing buffer), and
//! governs cancel/reschedule transitions behind a 12-hour lockout window.
//!
//! Creation runs under a per-slot lock row so concurrent overlapping
//! requests cannot both commit; confirmation emails are dispatched after
//! the commit and never affect the outcome.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Booking, BookingError, BookingStatus, CreateBookingRequest, UpdateBookingRequest};
pub use router::booking_routes;
pub use services::booking::BookingLifecycleService;
