//! [`Query`] collection related to the multiple [`Reservation`]s.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::{domain::Reservation, Query};

use super::DatabaseQuery;

/// Queries a page of [`Reservation`]s.
pub type List = DatabaseQuery<
    By<read::reservation::list::Page, read::reservation::list::Selector>,
>;
