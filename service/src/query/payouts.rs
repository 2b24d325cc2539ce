//! [`Query`] collection related to the multiple [`Payout`]s.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::{domain::Payout, Query};

use super::DatabaseQuery;

/// Queries a page of [`Payout`]s.
pub type List =
    DatabaseQuery<By<read::payout::list::Page, read::payout::list::Selector>>;
