//! Domain definitions.

pub mod payment;
pub mod payout;
pub mod reservation;
pub mod unit;
pub mod user;

pub use self::{payout::Payout, reservation::Reservation, unit::Unit};
