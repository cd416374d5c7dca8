pub mod booking;
pub mod conflict;
pub mod guard;
pub mod time;

pub use booking::BookingLifecycleService;
pub use conflict::ConflictCheckService;
pub use guard::BookingGuardService;
