pub mod booking;
pub mod lifecycle;
pub mod locks;
pub mod validator;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use locks::BookingLocks;
pub use validator::BookingValidator;
