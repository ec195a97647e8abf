pub mod admin_auth;
pub mod booking;
pub mod dashboard;
pub mod email;
pub mod messaging;
pub mod notifications;
pub mod payments;
pub mod phone;
pub mod promo;
pub mod rate_limit;
pub mod reschedule;
pub mod revenue;
pub mod session;
