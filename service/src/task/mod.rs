//! Background [`Task`]s definitions.

mod background;
pub mod complete_stays;

pub use common::Handler as Task;

pub use self::{
    background::{Background, Failure},
    complete_stays::CompleteStays,
};
