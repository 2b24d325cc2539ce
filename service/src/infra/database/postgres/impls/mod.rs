//! [`Database`] implementations.

#![allow(
    clippy::items_after_statements,
    reason = "`const SQL` after statements"
)]
#![allow(clippy::too_many_lines, reason = "SQL-related code a bit verbose")]

mod payout;
mod reservation;
mod unit;

use async_trait::async_trait;
use common::operations::{Commit, Transact};
use refinery_core::{
    traits::r#async::{AsyncQuery, AsyncTransaction},
    AsyncMigrate, Migration,
};
use tracerr::Traced;
use uuid::Uuid;

use crate::infra::{database, postgres, Database};

use super::{Connection, NonTx, Postgres, Tx};

/// Namespace of a transaction-scoped advisory lock.
#[derive(Clone, Copy, Debug)]
enum LockSpace {
    /// Lock of a unit, serializing its reservations creation.
    Unit = 1,

    /// Lock of a host, serializing its payouts creation.
    Host = 2,
}

/// Acquires a transaction-scoped advisory lock of the provided `key` in the
/// provided [`LockSpace`].
///
/// The lock is released once the transaction ends, and is a no-op outside of
/// a transaction.
async fn lock_advisory<C: Connection>(
    conn: &C,
    space: LockSpace,
    key: Uuid,
) -> Result<(), Traced<database::Error>> {
    const SQL: &str = "\
        SELECT pg_advisory_xact_lock($1::INT4, hashtext($2::UUID::TEXT))";
    conn.query(SQL, &[&(space as i32), &key])
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
}

impl Database<Transact> for Postgres<NonTx> {
    type Ok = Postgres<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Tx::begin(&self.0)
            .await
            .map(Postgres)
            .map_err(tracerr::wrap!())
    }
}

impl Database<Transact> for Postgres<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Postgres<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}

#[async_trait]
impl AsyncTransaction for Postgres {
    type Error = Traced<database::Error>;

    async fn execute(
        &mut self,
        queries: &[&str],
    ) -> Result<usize, Self::Error> {
        let mut conn = self.0.checkout().await.map_err(tracerr::wrap!())?;
        AsyncTransaction::execute(&mut **conn, queries)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

#[async_trait]
impl AsyncQuery<Vec<Migration>> for Postgres {
    async fn query(
        &mut self,
        query: &str,
    ) -> Result<Vec<Migration>, <Self as AsyncTransaction>::Error> {
        let mut conn = self.0.checkout().await.map_err(tracerr::wrap!())?;
        AsyncQuery::query(&mut **conn, query)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

impl AsyncMigrate for Postgres {}
