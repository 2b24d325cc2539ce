//! Read entities definitions.

pub mod payout;
pub mod reservation;
