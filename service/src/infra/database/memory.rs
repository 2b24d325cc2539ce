//! In-memory [`Database`] implementation.

use std::{
    collections::HashMap,
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact},
    Date,
};
use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{
        payment, payout,
        reservation::{self, BookingStatus, PaymentStatus, Stay},
        unit, user, Payout, Reservation, Unit,
    },
    infra::{
        database::{self, constraint},
        Database,
    },
    read,
};

/// In-memory [`Database`].
///
/// Clones share the same storage. A [`Transact`]ed [`Memory`] stages its
/// writes until [`Commit`], holds the [`Lock`]s it acquires until it's
/// committed or dropped, and checks the constraints both on write and on
/// [`Commit`], so concurrent transactions behave like Postgres ones.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Shared [`Storage`].
    storage: Arc<Storage>,

    /// [`Staged`] writes of the current transaction, if any.
    tx: Option<Arc<Mutex<Staged>>>,
}

/// Committed data and locks of a [`Memory`].
#[derive(Debug, Default)]
struct Storage {
    /// Committed [`State`].
    state: Mutex<State>,

    /// Locks by their [`LockKey`].
    locks: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

/// Stored entities.
#[derive(Clone, Debug, Default)]
struct State {
    /// Stored [`Unit`]s.
    units: HashMap<unit::Id, Unit>,

    /// Stored [`Reservation`]s.
    reservations: HashMap<reservation::Id, Reservation>,

    /// Stored [`Payout`]s.
    payouts: HashMap<payout::Id, Payout>,
}

impl State {
    /// Stores the provided [`Reservation`], unless it overlaps another
    /// blocking one of the same [`Unit`].
    fn put_reservation(&mut self, r: Reservation) -> Result<(), Error> {
        let overlaps = r.booking_status.is_blocking()
            && self.reservations.values().any(|o| {
                o.id != r.id
                    && o.unit_id == r.unit_id
                    && o.booking_status.is_blocking()
                    && o.stay.overlaps(&r.stay)
            });
        if overlaps {
            return Err(Error::ExclusionViolation(
                constraint::RESERVATIONS_NO_OVERLAP,
            ));
        }
        _ = self.reservations.insert(r.id, r);
        Ok(())
    }

    /// Stores the provided [`Payout`], unless its [`Reservation`] is paid out
    /// already.
    fn put_payout(&mut self, p: Payout) -> Result<(), Error> {
        let duplicated = p.status.is_effective()
            && self.payouts.values().any(|o| {
                o.id != p.id
                    && o.reservation_id == p.reservation_id
                    && o.status.is_effective()
            });
        if duplicated {
            return Err(Error::UniqueViolation(
                constraint::PAYOUTS_RESERVATION_ID_EFFECTIVE,
            ));
        }
        _ = self.payouts.insert(p.id, p);
        Ok(())
    }
}

/// Writes and locks of an uncommitted transaction.
#[derive(Debug, Default)]
struct Staged {
    /// Written [`Reservation`]s.
    reservations: HashMap<reservation::Id, Reservation>,

    /// Written [`Payout`]s.
    payouts: HashMap<payout::Id, Payout>,

    /// Held locks.
    guards: HashMap<LockKey, OwnedMutexGuard<()>>,
}

/// Key of a [`Lock`] held by a transaction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum LockKey {
    /// Lock of a [`Unit`].
    Unit(unit::Id),

    /// Lock of a [`Reservation`].
    Reservation(reservation::Id),

    /// Lock of a host's [`Payout`]s.
    Payouts(user::Id),
}

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the provided [`Unit`], as the listings service would do.
    pub fn insert_unit(&self, unit: Unit) {
        _ = self.state().units.insert(unit.id, unit);
    }

    /// Returns the committed [`State`].
    fn state(&self) -> MutexGuard<'_, State> {
        self.storage
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the [`Staged`] writes of the current transaction, if any.
    fn staged(&self) -> Option<MutexGuard<'_, Staged>> {
        self.tx
            .as_ref()
            .map(|tx| tx.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the [`State`] as seen by the current transaction.
    fn snapshot(&self) -> State {
        let mut state = self.state().clone();
        if let Some(staged) = self.staged() {
            state.reservations.extend(
                staged.reservations.iter().map(|(id, r)| (*id, r.clone())),
            );
            state
                .payouts
                .extend(staged.payouts.iter().map(|(id, p)| (*id, p.clone())));
        }
        state
    }

    /// Acquires the lock of the provided [`LockKey`] until the current
    /// transaction ends.
    async fn lock(&self, key: LockKey) {
        let Some(tx) = &self.tx else {
            return;
        };
        if self.staged().is_some_and(|s| s.guards.contains_key(&key)) {
            return;
        }

        let mutex = Arc::clone(
            self.storage
                .locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_default(),
        );
        let guard = mutex.lock_owned().await;
        _ = tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .guards
            .insert(key, guard);
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),

    /// Exclusion constraint is violated.
    #[display("Exclusion constraint `{_0}` is violated")]
    ExclusionViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        matches!(
            self,
            Self::UniqueViolation(c) if constraint.map_or(true, |n| n == *c),
        )
    }

    /// Checks if the error is an exclusion violation of the specified
    /// constraint.
    #[must_use]
    pub fn is_exclusion_violation(&self, constraint: Option<&str>) -> bool {
        matches!(
            self,
            Self::ExclusionViolation(c) if constraint.map_or(true, |n| n == *c),
        )
    }
}

impl From<Error> for Traced<database::Error> {
    fn from(e: Error) -> Self {
        tracerr::new!(database::Error::Memory(e))
    }
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(if self.tx.is_some() {
            self.clone()
        } else {
            Self {
                storage: Arc::clone(&self.storage),
                tx: Some(Arc::default()),
            }
        })
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let Some(staged) = self.staged().map(|mut s| mem::take(&mut *s))
        else {
            return Ok(());
        };
        let Staged {
            reservations,
            payouts,
            guards,
        } = staged;

        {
            let mut state = self.state();
            let mut next = state.clone();
            for r in reservations.into_values() {
                next.put_reservation(r)?;
            }
            for p in payouts.into_values() {
                next.put_payout(p)?;
            }
            *state = next;
        }

        drop(guards);
        Ok(())
    }
}

impl Database<Select<By<Option<Unit>, unit::Id>>> for Memory {
    type Ok = Option<Unit>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Unit>, unit::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state().units.get(by.as_inner()).cloned())
    }
}

impl Database<Lock<By<Unit, unit::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Unit, unit::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.lock(LockKey::Unit(by.into_inner())).await;
        Ok(())
    }
}

impl Database<Select<By<Option<Reservation>, reservation::Id>>> for Memory {
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.snapshot().reservations.remove(by.as_inner()))
    }
}

impl Database<Select<By<Option<Reservation>, payment::intent::Id>>>
    for Memory
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, payment::intent::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let intent_id = by.into_inner();
        Ok(self
            .snapshot()
            .reservations
            .into_values()
            .find(|r| r.payment_intent_id.as_ref() == Some(&intent_id)))
    }
}

impl Database<Lock<By<Reservation, reservation::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Reservation, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.lock(LockKey::Reservation(by.into_inner())).await;
        Ok(())
    }
}

impl Database<Insert<Reservation>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        if self.tx.is_none() {
            return Ok(self.state().put_reservation(reservation)?);
        }

        self.snapshot().put_reservation(reservation.clone())?;
        if let Some(mut staged) = self.staged() {
            _ = staged.reservations.insert(reservation.id, reservation);
        }
        Ok(())
    }
}

impl Database<Select<By<read::reservation::IsAvailable, (unit::Id, Stay)>>>
    for Memory
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
        let taken = self.snapshot().reservations.values().any(|r| {
            r.unit_id == unit_id
                && r.booking_status.is_blocking()
                && r.stay.overlaps(&stay)
        });
        Ok(read::reservation::IsAvailable(!taken))
    }
}

impl Database<Select<By<read::reservation::DueForCompletion, Date>>>
    for Memory
{
    type Ok = read::reservation::DueForCompletion;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::reservation::DueForCompletion, Date>>,
    ) -> Result<Self::Ok, Self::Err> {
        let today = by.into_inner();
        let mut due = self
            .snapshot()
            .reservations
            .into_values()
            .filter(|r| {
                r.booking_status == BookingStatus::Confirmed
                    && r.stay.check_out() <= today
            })
            .map(|r| (r.stay.check_out(), r.id))
            .collect::<Vec<_>>();
        due.sort_unstable();
        Ok(read::reservation::DueForCompletion(
            due.into_iter().map(|(_, id)| id).collect(),
        ))
    }
}

impl
    Database<
        Select<
            By<
                read::reservation::list::Page,
                read::reservation::list::Selector,
            >,
        >,
    > for Memory
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
        let read::reservation::list::Selector { arguments, filter } =
            by.into_inner();

        let mut items = self
            .snapshot()
            .reservations
            .into_values()
            .filter(|r| filter.matches(r))
            .collect::<Vec<_>>();
        items.sort_unstable_by(|a, b| {
            b.stay
                .check_in()
                .cmp(&a.stay.check_in())
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(read::reservation::list::Page {
            total: items.len(),
            items: items
                .into_iter()
                .skip(arguments.offset())
                .take(arguments.limit())
                .collect(),
            arguments,
        })
    }
}

impl Database<Lock<By<Payout, user::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Payout, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.lock(LockKey::Payouts(by.into_inner())).await;
        Ok(())
    }
}

impl Database<Select<By<Vec<Reservation>, read::payout::Eligible>>>
    for Memory
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

        let State {
            reservations,
            payouts,
            ..
        } = self.snapshot();
        let mut eligible = reservations
            .into_values()
            .filter(|r| {
                r.host_id == host_id
                    && r.booking_status == BookingStatus::Completed
                    && r.payment_status == PaymentStatus::Completed
                    && reservation_ids
                        .as_ref()
                        .map_or(true, |ids| ids.contains(&r.id))
                    && !payouts.values().any(|p| {
                        p.reservation_id == r.id && p.status.is_effective()
                    })
            })
            .collect::<Vec<_>>();
        eligible.sort_unstable_by_key(|r| (r.stay.check_out(), r.id));
        Ok(eligible)
    }
}

impl Database<Insert<Payout>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(payout): Insert<Payout>,
    ) -> Result<Self::Ok, Self::Err> {
        if self.tx.is_none() {
            return Ok(self.state().put_payout(payout)?);
        }

        self.snapshot().put_payout(payout.clone())?;
        if let Some(mut staged) = self.staged() {
            _ = staged.payouts.insert(payout.id, payout);
        }
        Ok(())
    }
}

impl
    Database<
        Select<By<read::payout::list::Page, read::payout::list::Selector>>,
    > for Memory
{
    type Ok = read::payout::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::payout::list::Page, read::payout::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::payout::list::Selector { arguments, filter } =
            by.into_inner();

        let mut items = self
            .snapshot()
            .payouts
            .into_values()
            .filter(|p| filter.matches(p))
            .collect::<Vec<_>>();
        items.sort_unstable_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(read::payout::list::Page {
            total: items.len(),
            items: items
                .into_iter()
                .skip(arguments.offset())
                .take(arguments.limit())
                .collect(),
            arguments,
        })
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Commit, Insert, Lock, Select, Transact},
        DateTime, Money,
    };
    use tokio::time;

    use crate::{
        domain::{
            reservation::{self, spec::stay, GuestCount, Price},
            unit, user, Reservation, Unit,
        },
        infra::Database as _,
    };

    use super::Memory;

    fn unit() -> Unit {
        Unit {
            id: unit::Id::new(),
            host_id: user::Id::new(),
            monthly_price: Money::from_minor(30_000),
            cleaning_fee: Money::ZERO,
            security_deposit: None,
            min_stay_weeks: 0,
            max_stay_months: 12,
            max_guests: 4,
            status: unit::Status::Active,
        }
    }

    fn reservation(unit: &Unit, check_in: &str, check_out: &str) -> Reservation {
        Reservation::new(
            unit,
            user::Id::new(),
            stay(check_in, check_out),
            GuestCount::new(1).unwrap(),
            Price {
                daily_rate: Money::from_minor(1_000),
                subtotal: Money::ZERO,
                service_fee: Money::ZERO,
                cleaning_fee: Money::ZERO,
                security_deposit: Money::ZERO,
                total: Money::ZERO,
            },
            DateTime::now(),
        )
    }

    #[tokio::test]
    async fn hides_staged_writes_until_commit() {
        let db = Memory::new();
        let unit = unit();
        db.insert_unit(unit.clone());
        let r = reservation(&unit, "2025-01-01", "2025-01-10");

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(r.clone())).await.unwrap();

        let seen = tx
            .execute(Select(By::<Option<Reservation>, _>::new(r.id)))
            .await
            .unwrap();
        assert!(seen.is_some());
        let unseen = db
            .execute(Select(By::<Option<Reservation>, _>::new(r.id)))
            .await
            .unwrap();
        assert!(unseen.is_none());

        tx.execute(Commit).await.unwrap();
        let committed = db
            .execute(Select(By::<Option<Reservation>, _>::new(r.id)))
            .await
            .unwrap();
        assert!(committed.is_some());
    }

    #[tokio::test]
    async fn discards_dropped_transaction() {
        let db = Memory::new();
        let unit = unit();
        let r = reservation(&unit, "2025-01-01", "2025-01-10");

        {
            let tx = db.execute(Transact).await.unwrap();
            tx.execute(Insert(r.clone())).await.unwrap();
        }

        let found = db
            .execute(Select(By::<Option<Reservation>, _>::new(r.id)))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn rejects_overlap_on_commit() {
        let db = Memory::new();
        let unit = unit();

        let first = db.execute(Transact).await.unwrap();
        let second = db.execute(Transact).await.unwrap();
        first
            .execute(Insert(reservation(&unit, "2025-01-01", "2025-01-10")))
            .await
            .unwrap();
        second
            .execute(Insert(reservation(&unit, "2025-01-05", "2025-01-15")))
            .await
            .unwrap();

        first.execute(Commit).await.unwrap();
        let err = second.execute(Commit).await.unwrap_err();
        assert!(err.as_ref().is_exclusion_violation(Some(
            crate::infra::database::constraint::RESERVATIONS_NO_OVERLAP
        )));
    }

    #[tokio::test]
    async fn allows_adjacent_stays() {
        let db = Memory::new();
        let unit = unit();

        db.execute(Insert(reservation(&unit, "2025-01-01", "2025-01-10")))
            .await
            .unwrap();
        db.execute(Insert(reservation(&unit, "2025-01-10", "2025-01-20")))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn serializes_lock_holders() {
        let db = Memory::new();
        let id = reservation::Id::new();

        let first = db.execute(Transact).await.unwrap();
        first
            .execute(Lock(By::<Reservation, _>::new(id)))
            .await
            .unwrap();
        // Reentrant within the same transaction.
        first
            .execute(Lock(By::<Reservation, _>::new(id)))
            .await
            .unwrap();

        let second = db.execute(Transact).await.unwrap();
        let blocked = time::timeout(
            Duration::from_secs(1),
            second.execute(Lock(By::<Reservation, _>::new(id))),
        )
        .await;
        assert!(blocked.is_err(), "lock must be held by the first one");

        drop(first);
        time::timeout(
            Duration::from_secs(1),
            second.execute(Lock(By::<Reservation, _>::new(id))),
        )
        .await
        .unwrap()
        .unwrap();
    }
}
