//! [`CompleteStays`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::{
    operations::{By, Perform, Select, Start},
    Date,
};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    command::{complete_reservation, CompleteReservation},
    domain::Reservation,
    infra::{database, Database},
    read::reservation::DueForCompletion,
    Command, Service,
};

use super::Task;

/// Configuration for [`CompleteStays`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between completions of the ended stays.
    pub interval: time::Duration,
}

/// [`Task`] for completing confirmed [`Reservation`]s whose stays have
/// ended.
#[derive(Clone, Copy, Debug)]
pub struct CompleteStays<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, Pp> Task<Start<By<CompleteStays<Self>, Config>>> for Service<Db, Pp>
where
    CompleteStays<Service<Db, Pp>>:
        Task<Perform<()>, Ok = usize, Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CompleteStays<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CompleteStays {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(n) => log::info!("`task::CompleteStays` completed {n} stays"),
                Err(e) => log::error!("`task::CompleteStays` failed: {e}"),
            }
        }
    }
}

impl<Db, Pp> Task<Perform<()>> for CompleteStays<Service<Db, Pp>>
where
    Db: Database<
        Select<By<DueForCompletion, Date>>,
        Ok = DueForCompletion,
        Err = Traced<database::Error>,
    >,
    Service<Db, Pp>: Command<
        CompleteReservation,
        Ok = Reservation,
        Err = Traced<complete_reservation::ExecutionError>,
    >,
{
    type Ok = usize;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let today = Date::today();
        let due = self
            .service
            .database()
            .execute(Select(By::<DueForCompletion, _>::new(today)))
            .await
            .map_err(tracerr::wrap!())?;

        let mut completed = 0;
        for reservation_id in due.0 {
            // A single failure must not stop the others.
            match self
                .service
                .execute(CompleteReservation {
                    reservation_id,
                    today,
                })
                .await
            {
                Ok(_) => completed += 1,
                Err(e) => log::error!(
                    "failed to complete `Reservation(id: {reservation_id})`: \
                     {e}",
                ),
            }
        }
        Ok(completed)
    }
}

/// Error of [`CompleteStays`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::Handler as _;

    use crate::{
        command::AcceptReservation,
        domain::reservation::BookingStatus,
        spec::{reserve, service, stored, unit},
    };

    use super::{CompleteStays, Config, Perform};

    #[tokio::test]
    async fn completes_only_ended_confirmed_stays() {
        let (svc, db, _) = service();
        let unit = unit(&db);

        let ended = reserve(&svc, &unit, "2024-01-01", "2024-02-01").await;
        let pending = reserve(&svc, &unit, "2024-03-01", "2024-04-01").await;
        let upcoming = reserve(&svc, &unit, "2099-01-01", "2099-02-01").await;
        for r in [&ended, &upcoming] {
            _ = svc
                .execute(AcceptReservation {
                    reservation_id: r.id,
                    host_id: unit.host_id,
                })
                .await
                .unwrap();
        }

        let task = CompleteStays {
            config: Config {
                interval: Duration::from_secs(60),
            },
            service: svc,
        };
        assert_eq!(task.execute(Perform(())).await.unwrap(), 1);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);

        assert_eq!(
            stored(&db, ended.id).await.booking_status,
            BookingStatus::Completed,
        );
        assert_eq!(
            stored(&db, pending.id).await.booking_status,
            BookingStatus::Pending,
        );
        assert_eq!(
            stored(&db, upcoming.id).await.booking_status,
            BookingStatus::Confirmed,
        );
    }
}
