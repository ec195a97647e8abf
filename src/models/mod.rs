pub mod booking;
pub mod catalog;
pub mod client_profile;
pub mod request;
pub mod user;

pub use booking::{
    Booking, BookingProjection, BookingStatus, BookingUpdate, ContactBooking, NewBooking,
    PaymentStatus, RescheduleTarget,
};
pub use catalog::{ResolvedService, ServicePackage};
pub use client_profile::ClientProfile;
pub use request::{
    CreateBookingRequest, CreateCheckoutRequest, PromoBookingRequest, RescheduleRequest,
};
pub use user::{AdminSession, AdminUser};
