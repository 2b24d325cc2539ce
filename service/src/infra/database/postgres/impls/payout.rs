//! [`Payout`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select};
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        payout,
        reservation::{BookingStatus, PaymentStatus},
        user, Payout, Reservation,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

use super::{
    lock_advisory,
    reservation::{columns, reservation_from_row},
    LockSpace,
};

/// Builds a [`Payout`] out of the provided [`Row`].
fn payout_from_row(row: &Row) -> Payout {
    Payout {
        id: row.get("id"),
        host_id: row.get("host_id"),
        reservation_id: row.get("reservation_id"),
        gross_amount: row.get("gross_amount"),
        platform_fee: row.get("platform_fee"),
        net_amount: row.get("net_amount"),
        status: row.get("status"),
        scheduled_for: row.get("scheduled_for"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Lock<By<Payout, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Payout, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        lock_advisory(&**self, LockSpace::Host, by.into_inner().into())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<Vec<Reservation>, read::payout::Eligible>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, read::payout::Eligible>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::payout::Eligible {
            host_id,
            reservation_ids,
        } = by.into_inner();

        const SQL: &str = concat!(
            "SELECT ",
            columns!(),
            " FROM reservations r \
              WHERE host_id = $1::UUID \
                AND booking_status = $2::INT2 \
                AND payment_status = $3::INT2 \
                AND NOT EXISTS (SELECT 1 \
                                FROM payouts p \
                                WHERE p.reservation_id = r.id \
                                  AND p.status <> $4::INT2) \
                AND ($5::UUID[] IS NULL OR id = ANY($5::UUID[])) \
              ORDER BY check_out, id",
        );
        Ok(self
            .query(
                SQL,
                &[
                    &host_id,
                    &BookingStatus::Completed,
                    &PaymentStatus::Completed,
                    &payout::Status::Failed,
                    &reservation_ids,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(reservation_from_row)
            .collect())
    }
}

impl<C> Database<Insert<Payout>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(payout): Insert<Payout>,
    ) -> Result<Self::Ok, Self::Err> {
        let Payout {
            id,
            host_id,
            reservation_id,
            gross_amount,
            platform_fee,
            net_amount,
            status,
            scheduled_for,
            created_at,
        } = payout;

        const SQL: &str = "\
            INSERT INTO payouts (\
                id, host_id, reservation_id, \
                gross_amount, platform_fee, net_amount, \
                status, scheduled_for, created_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::INT8, $5::INT8, $6::INT8, \
                $7::INT2, $8::TIMESTAMPTZ, $9::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                scheduled_for = EXCLUDED.scheduled_for";
        self.exec(
            SQL,
            &[
                &id,
                &host_id,
                &reservation_id,
                &gross_amount,
                &platform_fee,
                &net_amount,
                &status,
                &scheduled_for,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C>
    Database<
        Select<By<read::payout::list::Page, read::payout::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::payout::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::payout::list::Page, read::payout::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::payout::list::Selector {
            arguments,
            filter: read::payout::list::Filter { host_id, status },
        } = by.into_inner();

        let limit = i64::try_from(arguments.limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(arguments.offset()).unwrap_or(i64::MAX);
        let ps: [&(dyn ToSql + Sync); 4] = [&host_id, &status, &limit, &offset];

        const SQL: &str = "\
            SELECT id, host_id, reservation_id, \
                   gross_amount, platform_fee, net_amount, \
                   status, scheduled_for, created_at, \
                   COUNT(*) OVER () AS total \
            FROM payouts \
            WHERE host_id = $1::UUID \
              AND ($2::INT2 IS NULL OR status = $2::INT2) \
            ORDER BY created_at DESC, id \
            LIMIT $3::INT8 \
            OFFSET $4::INT8";
        let rows = self.query(SQL, &ps).await.map_err(tracerr::wrap!())?;

        let total = if let Some(row) = rows.first() {
            row.get::<_, i64>("total")
        } else {
            const SQL: &str = "\
                SELECT COUNT(*)::INT8 \
                FROM payouts \
                WHERE host_id = $1::UUID \
                  AND ($2::INT2 IS NULL OR status = $2::INT2)";
            self.query_opt(SQL, &ps[..2])
                .await
                .map_err(tracerr::wrap!())?
                .map_or(0, |row| row.get::<_, i64>(0))
        };

        Ok(read::payout::list::Page {
            items: rows.iter().map(payout_from_row).collect(),
            arguments,
            total: usize::try_from(total).unwrap_or_default(),
        })
    }
}
