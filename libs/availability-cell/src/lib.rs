// libs/availability-cell/src/lib.rs
//! # Availability Cell
//!
//! Availability Store surface: clients publish time-bounded slots with
//! pricing, and any authenticated caller can browse them. Slots are owned
//! by the publishing client and referenced (never owned) by bookings.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{AvailabilitySlot, ClientWithAvailability, SlotError};
pub use router::availability_routes;
pub use services::slots::SlotService;
