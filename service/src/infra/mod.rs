//! Infrastructure layer.

pub mod database;
pub mod payment;

#[cfg(any(test, feature = "mock"))]
pub use self::{database::Memory, payment::Mock};
pub use self::{
    database::Database,
    payment::{PaymentProvider, Stripe},
};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
