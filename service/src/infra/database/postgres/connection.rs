//! [`Connection`] definitions.

use std::future::Future;

use tokio_postgres::{types::ToSql, Client, Row};
use tracerr::Traced;
use tracing as log;

use crate::infra::database::{self, postgres};

pub use deadpool_postgres::{
    CreatePoolError as PoolCreationError, Object as Pooled, Pool, PoolError,
};
pub use tokio_postgres::Error;

/// SQL statement parameters.
pub type Params<'a> = [&'a (dyn ToSql + Sync)];

/// Generic database connection.
pub trait Connection {
    /// Queries the provided SQL statement with the given parameters and
    /// returns the resulting rows.
    ///
    /// # Errors
    ///
    /// If failed to query the statement.
    fn query(
        &self,
        sql: &str,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<Vec<Row>, Traced<database::Error>>>;

    /// Queries the provided SQL statement with the given parameters and
    /// returns the first resulting row, if any.
    ///
    /// # Errors
    ///
    /// If failed to query the statement.
    fn query_opt(
        &self,
        sql: &str,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<Option<Row>, Traced<database::Error>>>;

    /// Executes the provided SQL statement with the given parameters and
    /// returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// If failed to execute the statement.
    fn exec(
        &self,
        sql: &str,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<u64, Traced<database::Error>>>;
}

/// Runs the provided SQL statement on the provided client, returning all
/// the resulting rows.
pub(crate) async fn query(
    client: &Client,
    sql: &str,
    params: &Params<'_>,
) -> Result<Vec<Row>, Traced<database::Error>> {
    log::trace!(db.statement = sql, "query");
    client
        .query(sql, params)
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}

/// Runs the provided SQL statement on the provided client, returning the
/// first resulting row, if any.
pub(crate) async fn query_opt(
    client: &Client,
    sql: &str,
    params: &Params<'_>,
) -> Result<Option<Row>, Traced<database::Error>> {
    Ok(query(client, sql, params)
        .await
        .map_err(tracerr::wrap!())?
        .into_iter()
        .next())
}

/// Executes the provided SQL statement on the provided client, returning the
/// number of affected rows.
pub(crate) async fn exec(
    client: &Client,
    sql: &str,
    params: &Params<'_>,
) -> Result<u64, Traced<database::Error>> {
    log::trace!(db.statement = sql, "execute");
    client
        .execute(sql, params)
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}
