//! Postgres database clients.

use std::{future::Future, sync::Arc};

use tokio::{runtime, sync::Mutex, task};
use tracerr::Traced;
use tracing as log;

use crate::infra::database::{
    self,
    postgres::{
        self,
        connection::{self, Params, Pooled},
        Connection,
    },
};

/// Non-transactional Postgres database client.
///
/// Every statement runs on a [`connection::Pool`]ed connection of its own.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to check the connections out from.
    pub(crate) pool: connection::Pool,
}

impl NonTx {
    /// Creates a new [`NonTx`] client from the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self { pool }
    }

    /// Checks a connection out of the [`connection::Pool`].
    pub(crate) async fn checkout(
        &self,
    ) -> Result<Pooled, Traced<database::Error>> {
        self.pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

impl Connection for NonTx {
    async fn query(
        &self,
        sql: &str,
        params: &Params<'_>,
    ) -> Result<Vec<tokio_postgres::Row>, Traced<database::Error>> {
        let conn = self.checkout().await.map_err(tracerr::wrap!())?;
        connection::query(&conn, sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &Params<'_>,
    ) -> Result<Option<tokio_postgres::Row>, Traced<database::Error>> {
        let conn = self.checkout().await.map_err(tracerr::wrap!())?;
        connection::query_opt(&conn, sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec(
        &self,
        sql: &str,
        params: &Params<'_>,
    ) -> Result<u64, Traced<database::Error>> {
        let conn = self.checkout().await.map_err(tracerr::wrap!())?;
        connection::exec(&conn, sql, params)
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Transactional Postgres database client.
///
/// Clones share the same transaction. A transaction dropped without
/// [`Tx::commit()`] is rolled back, and its connection returns to the
/// [`connection::Pool`].
#[derive(Clone, Debug)]
pub struct Tx {
    /// Connection holding the open transaction, until it's committed.
    conn: Arc<Mutex<Open>>,
}

/// Connection with an open transaction.
#[derive(Debug)]
struct Open(Option<Pooled>);

impl Drop for Open {
    fn drop(&mut self) {
        if let Some(conn) = self.0.take() {
            log::debug!("rolling back uncommitted transaction");
            drop(release(conn));
        }
    }
}

/// Connection an uncommitted transaction is released from.
trait Release: Send + Sync + Sized + 'static {
    /// Rolls back the open transaction.
    fn rollback(
        &self,
    ) -> impl Future<Output = Result<(), Traced<database::Error>>> + Send;

    /// Closes the connection, aborting the open transaction.
    fn discard(self);
}

impl Release for Pooled {
    async fn rollback(&self) -> Result<(), Traced<database::Error>> {
        connection::exec(self, "ROLLBACK", &[])
            .await
            .map(drop)
            .map_err(tracerr::wrap!())
    }

    fn discard(self) {
        drop(Pooled::take(self));
    }
}

/// Releases the provided connection of an uncommitted transaction.
///
/// The transaction is rolled back in a background task, so the connection
/// goes back to the pool clean. It is closed instead if the rollback fails,
/// or there is no runtime to run it on.
fn release<C: Release>(conn: C) -> Option<task::JoinHandle<()>> {
    let Ok(rt) = runtime::Handle::try_current() else {
        conn.discard();
        return None;
    };
    let mut pending = Pending(Some(conn));
    Some(rt.spawn(async move {
        let Some(conn) = pending.0.as_ref() else {
            return;
        };
        let res = conn.rollback().await;
        match res {
            Ok(()) => drop(pending.0.take()),
            Err(e) => log::warn!("failed to roll back transaction: {e}"),
        }
    }))
}

/// Connection of a transaction being rolled back.
///
/// Discarded on drop, unless the rollback succeeds.
struct Pending<C: Release>(Option<C>);

impl<C: Release> Drop for Pending<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.0.take() {
            conn.discard();
        }
    }
}

impl Tx {
    /// Begins a new [`Tx`] on a connection checked out by the provided
    /// [`NonTx`] client.
    ///
    /// # Errors
    ///
    /// If failed to check out a connection or to begin the transaction.
    pub async fn begin(client: &NonTx) -> Result<Self, Traced<database::Error>> {
        let conn = client.checkout().await.map_err(tracerr::wrap!())?;
        _ = connection::exec(&conn, "BEGIN", &[])
            .await
            .map_err(tracerr::wrap!())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Open(Some(conn)))),
        })
    }

    /// Commits this [`Tx`].
    ///
    /// Committing an already committed [`Tx`] does nothing.
    ///
    /// # Errors
    ///
    /// If failed to commit the transaction.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let mut open = self.conn.lock().await;
        let Some(conn) = open.0.take() else {
            return Ok(());
        };
        if let Err(e) = connection::exec(&conn, "COMMIT", &[]).await {
            // Released on drop.
            open.0 = Some(conn);
            return Err(tracerr::wrap!()(e));
        }
        Ok(())
    }

    /// Returns an error of using an already committed [`Tx`].
    fn committed() -> Traced<database::Error> {
        tracerr::new!(database::Error::from(postgres::Error::Committed))
    }
}

impl Connection for Tx {
    async fn query(
        &self,
        sql: &str,
        params: &Params<'_>,
    ) -> Result<Vec<tokio_postgres::Row>, Traced<database::Error>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .0
            .as_ref()
            .ok_or_else(Self::committed)?;
        connection::query(conn, sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &Params<'_>,
    ) -> Result<Option<tokio_postgres::Row>, Traced<database::Error>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .0
            .as_ref()
            .ok_or_else(Self::committed)?;
        connection::query_opt(conn, sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec(
        &self,
        sql: &str,
        params: &Params<'_>,
    ) -> Result<u64, Traced<database::Error>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .0
            .as_ref()
            .ok_or_else(Self::committed)?;
        connection::exec(conn, sql, params)
            .await
            .map_err(tracerr::wrap!())
    }
}

#[cfg(test)]
mod spec {
    use std::sync::{Arc, Mutex};

    use tracerr::Traced;

    use crate::infra::database::{self, postgres};

    use super::{release, Release};

    /// [`Release`] recording what happened to it.
    #[derive(Clone, Debug, Default)]
    struct Recorder {
        /// Whether rolling back fails.
        broken: bool,

        /// Recorded actions.
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Recorder {
        fn actions(&self) -> Vec<&'static str> {
            self.log.lock().unwrap().clone()
        }
    }

    impl Release for Recorder {
        async fn rollback(&self) -> Result<(), Traced<database::Error>> {
            self.log.lock().unwrap().push("rollback");
            if self.broken {
                return Err(tracerr::new!(database::Error::from(
                    postgres::Error::Committed,
                )));
            }
            Ok(())
        }

        fn discard(self) {
            self.log.lock().unwrap().push("discard");
        }
    }

    #[tokio::test]
    async fn keeps_connection_rolled_back() {
        let conn = Recorder::default();

        release(conn.clone()).unwrap().await.unwrap();

        assert_eq!(conn.actions(), ["rollback"]);
    }

    #[tokio::test]
    async fn closes_connection_failed_to_roll_back() {
        let conn = Recorder {
            broken: true,
            ..Recorder::default()
        };

        release(conn.clone()).unwrap().await.unwrap();

        assert_eq!(conn.actions(), ["rollback", "discard"]);
    }

    #[test]
    fn closes_connection_outside_runtime() {
        let conn = Recorder::default();

        assert!(release(conn.clone()).is_none());
        assert_eq!(conn.actions(), ["discard"]);
    }
}
