//! [`Unit`]-related [`Database`] implementations.

use common::operations::{By, Lock, Select};
use tracerr::Traced;

use crate::{
    domain::{unit, Unit},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

use super::{lock_advisory, LockSpace};

impl<C> Database<Select<By<Option<Unit>, unit::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Unit>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Unit>, unit::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: unit::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, host_id, \
                   monthly_price, cleaning_fee, security_deposit, \
                   min_stay_weeks, max_stay_months, max_guests, \
                   status \
            FROM units \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| {
                let small = |column: &str| {
                    u16::try_from(row.get::<_, i16>(column))
                        .unwrap_or_else(|_| panic!("negative `{column}`"))
                };
                Unit {
                    id: row.get("id"),
                    host_id: row.get("host_id"),
                    monthly_price: row.get("monthly_price"),
                    cleaning_fee: row.get("cleaning_fee"),
                    security_deposit: row.get("security_deposit"),
                    min_stay_weeks: small("min_stay_weeks"),
                    max_stay_months: small("max_stay_months"),
                    max_guests: small("max_guests"),
                    status: row.get("status"),
                }
            }))
    }
}

impl<C> Database<Lock<By<Unit, unit::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Unit, unit::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        lock_advisory(&**self, LockSpace::Unit, by.into_inner().into())
            .await
            .map_err(tracerr::wrap!())
    }
}
