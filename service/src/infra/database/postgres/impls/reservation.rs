//! [`Reservation`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Lock, Select},
    Date,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        payment,
        reservation::{
            self, BookingStatus, Cancellation, GuestCount, Price, Stay,
        },
        unit, Reservation,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::{
        self,
        reservation::list::{Filter, Role},
    },
};

/// Columns [`reservation_from_row()`] reads.
macro_rules! columns {
    () => {
        "id, unit_id, guest_id, host_id, \
         check_in, check_out, guest_count, \
         daily_rate, subtotal, service_fee, cleaning_fee, security_deposit, \
         total, \
         booking_status, payment_status, payment_intent_id, refunded_amount, \
         cancellation_reason, cancelled_by, cancelled_at, \
         created_at, updated_at, confirmed_at, completed_at"
    };
}
pub(super) use columns;

/// Builds a [`Reservation`] out of the provided [`Row`] having the
/// [`columns!`].
pub(super) fn reservation_from_row(row: &Row) -> Reservation {
    let reason = row.get::<_, Option<reservation::CancellationReason>>(
        "cancellation_reason",
    );
    let cancelled_at = row.get::<_, Option<_>>("cancelled_at");
    Reservation {
        id: row.get("id"),
        unit_id: row.get("unit_id"),
        guest_id: row.get("guest_id"),
        host_id: row.get("host_id"),
        stay: Stay::new(row.get("check_in"), row.get("check_out"))
            .expect("`reservations_stay_check` violated"),
        guest_count: u16::try_from(row.get::<_, i16>("guest_count"))
            .ok()
            .and_then(GuestCount::new)
            .expect("`guest_count` is not positive"),
        price: Price {
            daily_rate: row.get("daily_rate"),
            subtotal: row.get("subtotal"),
            service_fee: row.get("service_fee"),
            cleaning_fee: row.get("cleaning_fee"),
            security_deposit: row.get("security_deposit"),
            total: row.get("total"),
        },
        booking_status: row.get("booking_status"),
        payment_status: row.get("payment_status"),
        payment_intent_id: row.get("payment_intent_id"),
        refunded_amount: row.get("refunded_amount"),
        cancellation: reason.zip(cancelled_at).map(|(reason, cancelled_at)| {
            Cancellation {
                reason,
                cancelled_by: row.get("cancelled_by"),
                cancelled_at,
            }
        }),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        confirmed_at: row.get("confirmed_at"),
        completed_at: row.get("completed_at"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<reservation::Id, Reservation>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[reservation::Id]>,
{
    type Ok = HashMap<reservation::Id, Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<reservation::Id, Reservation>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[reservation::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = concat!(
            "SELECT ",
            columns!(),
            " FROM reservations \
              WHERE id = ANY($1::UUID[])",
        );
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(reservation_from_row)
            .map(|r| (r.id, r))
            .collect())
    }
}

impl<C> Database<Select<By<Option<Reservation>, reservation::Id>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<reservation::Id, Reservation>, [reservation::Id; 1]>>,
        Ok = HashMap<reservation::Id, Reservation>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Option<Reservation>, payment::intent::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, payment::intent::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let intent_id: payment::intent::Id = by.into_inner();

        const SQL: &str = concat!(
            "SELECT ",
            columns!(),
            " FROM reservations \
              WHERE payment_intent_id = $1::VARCHAR \
              LIMIT 1",
        );
        Ok(self
            .query_opt(SQL, &[&intent_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(reservation_from_row))
    }
}

impl<C> Database<Lock<By<Reservation, reservation::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Reservation, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: reservation::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM reservations \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Insert<Reservation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        let Reservation {
            id,
            unit_id,
            guest_id,
            host_id,
            stay,
            guest_count,
            price:
                Price {
                    daily_rate,
                    subtotal,
                    service_fee,
                    cleaning_fee,
                    security_deposit,
                    total,
                },
            booking_status,
            payment_status,
            payment_intent_id,
            refunded_amount,
            cancellation,
            created_at,
            updated_at,
            confirmed_at,
            completed_at,
        } = reservation;

        let (check_in, check_out) = (stay.check_in(), stay.check_out());
        let nights = i32::try_from(stay.nights()).unwrap_or(i32::MAX);
        let guest_count =
            i16::try_from(u16::from(guest_count)).unwrap_or(i16::MAX);
        let (cancellation_reason, cancelled_by, cancelled_at) = cancellation
            .map_or((None, None, None), |c| {
                (Some(c.reason), c.cancelled_by, Some(c.cancelled_at))
            });

        const SQL: &str = "\
            INSERT INTO reservations (\
                id, unit_id, guest_id, host_id, \
                check_in, check_out, nights, guest_count, \
                daily_rate, subtotal, service_fee, cleaning_fee, \
                security_deposit, total, \
                booking_status, payment_status, payment_intent_id, \
                refunded_amount, \
                cancellation_reason, cancelled_by, cancelled_at, \
                created_at, updated_at, confirmed_at, completed_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::DATE, $6::DATE, $7::INT4, $8::INT2, \
                $9::INT8, $10::INT8, $11::INT8, $12::INT8, \
                $13::INT8, $14::INT8, \
                $15::INT2, $16::INT2, $17::VARCHAR, \
                $18::INT8, \
                $19::VARCHAR, $20::UUID, $21::TIMESTAMPTZ, \
                $22::TIMESTAMPTZ, $23::TIMESTAMPTZ, $24::TIMESTAMPTZ, \
                $25::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET booking_status = EXCLUDED.booking_status, \
                payment_status = EXCLUDED.payment_status, \
                payment_intent_id = EXCLUDED.payment_intent_id, \
                refunded_amount = EXCLUDED.refunded_amount, \
                cancellation_reason = EXCLUDED.cancellation_reason, \
                cancelled_by = EXCLUDED.cancelled_by, \
                cancelled_at = EXCLUDED.cancelled_at, \
                updated_at = EXCLUDED.updated_at, \
                confirmed_at = EXCLUDED.confirmed_at, \
                completed_at = EXCLUDED.completed_at";
        self.exec(
            SQL,
            &[
                &id,
                &unit_id,
                &guest_id,
                &host_id,
                &check_in,
                &check_out,
                &nights,
                &guest_count,
                &daily_rate,
                &subtotal,
                &service_fee,
                &cleaning_fee,
                &security_deposit,
                &total,
                &booking_status,
                &payment_status,
                &payment_intent_id,
                &refunded_amount,
                &cancellation_reason,
                &cancelled_by,
                &cancelled_at,
                &created_at,
                &updated_at,
                &confirmed_at,
                &completed_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<read::reservation::IsAvailable, (unit::Id, Stay)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::reservation::IsAvailable;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::reservation::IsAvailable, (unit::Id, Stay)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (unit_id, stay) = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM reservations \
            WHERE unit_id = $1::UUID \
              AND booking_status IN ($2::INT2, $3::INT2) \
              AND check_out > $4::DATE \
              AND check_in < $5::DATE \
            LIMIT 1";
        self.query_opt(
            SQL,
            &[
                &unit_id,
                &BookingStatus::Pending,
                &BookingStatus::Confirmed,
                &stay.check_in(),
                &stay.check_out(),
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|r| read::reservation::IsAvailable(r.is_none()))
    }
}

impl<C> Database<Select<By<read::reservation::DueForCompletion, Date>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::reservation::DueForCompletion;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::reservation::DueForCompletion, Date>>,
    ) -> Result<Self::Ok, Self::Err> {
        let today: Date = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM reservations \
            WHERE booking_status = $1::INT2 \
              AND check_out <= $2::DATE \
            ORDER BY check_out, id";
        Ok(read::reservation::DueForCompletion(
            self.query(SQL, &[&BookingStatus::Confirmed, &today])
                .await
                .map_err(tracerr::wrap!())?
                .into_iter()
                .map(|row| row.get("id"))
                .collect(),
        ))
    }
}

impl<C>
    Database<
        Select<
            By<
                read::reservation::list::Page,
                read::reservation::list::Selector,
            >,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::reservation::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                read::reservation::list::Page,
                read::reservation::list::Selector,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reservation::list::Selector {
            arguments,
            filter:
                Filter {
                    actor_id,
                    role,
                    booking_status,
                    unit_id,
                    upcoming_from,
                },
        } = by.into_inner();

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&actor_id];

        let party = match role {
            Role::Guest => "guest_id = $1::UUID",
            Role::Host => "host_id = $1::UUID",
            Role::Any => "(guest_id = $1::UUID OR host_id = $1::UUID)",
        };
        let status_idx = booking_status.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });
        let unit_idx = unit_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let upcoming_idx = upcoming_from.as_ref().map(|d| {
            ps.push(d);
            ps.len()
        });

        let filtering = format!(
            "{party} {status} {unit} {upcoming}",
            status = status_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND booking_status = ${idx}::INT2"))
            }),
            unit = unit_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND unit_id = ${idx}::UUID"))
            }),
            upcoming = upcoming_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND check_out >= ${idx}::DATE"))
            }),
        );

        let total = self
            .query_opt(
                &format!(
                    "SELECT COUNT(*)::INT8 \
                     FROM reservations \
                     WHERE {filtering}"
                ),
                ps.as_slice(),
            )
            .await
            .map_err(tracerr::wrap!())?
            .map_or(0, |row| row.get::<_, i64>(0));

        let limit = i64::try_from(arguments.limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(arguments.offset()).unwrap_or(i64::MAX);
        ps.push(&limit);
        let limit_idx = ps.len();
        ps.push(&offset);
        let offset_idx = ps.len();

        let items = self
            .query(
                &format!(
                    "SELECT {columns} \
                     FROM reservations \
                     WHERE {filtering} \
                     ORDER BY check_in DESC, id \
                     LIMIT ${limit_idx}::INT8 \
                     OFFSET ${offset_idx}::INT8",
                    columns = columns!(),
                ),
                ps.as_slice(),
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(reservation_from_row)
            .collect();

        Ok(read::reservation::list::Page {
            items,
            arguments,
            total: usize::try_from(total).unwrap_or_default(),
        })
    }
}
