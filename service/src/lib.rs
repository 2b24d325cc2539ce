//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod error;
pub mod infra;
pub mod query;
pub mod read;
#[cfg(test)]
mod spec;
pub mod task;

use std::{error::Error, time::Duration};

use common::{
    operations::{By, Start},
    Percent,
};
use derive_more::Debug;

#[cfg(doc)]
use infra::{Database, PaymentProvider};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] decoding key of the bearer tokens.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// [`Fees`] charged by the platform.
    pub fees: Fees,

    /// Delay between requesting a payout and its scheduled transfer.
    pub payout_delay: Duration,

    /// [`task::CompleteStays`] configuration.
    pub complete_stays: task::complete_stays::Config,
}

/// Fees charged by the platform.
#[derive(Clone, Copy, Debug)]
pub struct Fees {
    /// Fee charged to guests on top of a stay subtotal.
    pub service_fee: Percent,

    /// Fee withheld from host payouts.
    pub platform_fee: Percent,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Pp> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`PaymentProvider`] of this [`Service`].
    payments: Pp,
}

impl<Db, Pp> Service<Db, Pp> {
    /// Creates a new [`Service`] with the provided parameters, along with its
    /// [`task::Background`] running the [`Task`]s.
    pub fn new(
        config: Config,
        database: Db,
        payments: Pp,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<task::CompleteStays<Self>, task::complete_stays::Config>,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let this = Service {
            config,
            database,
            payments,
        };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn("CompleteStays", async move {
            svc.execute(Start(By::new(svc.config().complete_stays)))
                .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`PaymentProvider`] of this [`Service`].
    #[must_use]
    pub fn payments(&self) -> &Pp {
        &self.payments
    }
}
