//! [`Command`] for requesting [`Payout`]s of a host.

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{reservation, user, Payout, Reservation},
    error::{Classify, Kind},
    infra::{
        database::{self, constraint},
        Database,
    },
    read::payout::{Batch, Eligible},
    Service,
};

use super::Command;

/// [`Command`] for creating [`Payout`]s of all the completed and fully paid
/// [`Reservation`]s of a host not paid out yet.
///
/// Either all the eligible [`Reservation`]s are paid out, or none.
#[derive(Clone, Debug)]
pub struct RequestPayout {
    /// ID of the host requesting the [`Payout`]s.
    pub host_id: user::Id,

    /// IDs of the [`Reservation`]s to narrow the request to, if any.
    pub reservation_ids: Option<Vec<reservation::Id>>,
}

impl<Db, Pp> Command<RequestPayout> for Service<Db, Pp>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Payout, user::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, Eligible>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Insert<Payout>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Batch;
    type Err = Traced<ExecutionError>;

    #[tracing::instrument(skip_all, fields(host_id = %cmd.host_id))]
    async fn execute(
        &self,
        cmd: RequestPayout,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RequestPayout {
            host_id,
            reservation_ids,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serialize payouts of the same host.
        tx.execute(Lock(By::<Payout, _>::new(host_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let eligible = tx
            .execute(Select(By::<Vec<Reservation>, _>::new(Eligible {
                host_id,
                reservation_ids,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if eligible.is_empty() {
            return Err(tracerr::new!(E::NoEligibleReservations(host_id)));
        }

        let now = DateTime::now();
        let payouts = eligible
            .iter()
            .map(|r| {
                Payout::new(
                    r,
                    self.config().fees.platform_fee,
                    self.config().payout_delay,
                    now,
                )
            })
            .collect::<Vec<_>>();

        for payout in &payouts {
            tx.execute(Insert(payout.clone()))
                .await
                .map_err(paid_out_on_duplicate(host_id))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(paid_out_on_duplicate(host_id))
            .map(drop)?;

        let batch = Batch::from(payouts);
        log::info!(
            "created {} payouts of {} net",
            batch.totals.count,
            batch.totals.net_amount,
        );
        Ok(batch)
    }
}

/// Maps a violation of the single effective payout constraint into
/// [`ExecutionError::NoEligibleReservations`].
fn paid_out_on_duplicate(
    host_id: user::Id,
) -> impl FnOnce(Traced<database::Error>) -> Traced<ExecutionError> {
    move |e| {
        if e.as_ref().is_unique_violation(Some(
            constraint::PAYOUTS_RESERVATION_ID_EFFECTIVE,
        )) {
            tracerr::new!(ExecutionError::NoEligibleReservations(host_id))
        } else {
            let wrap = tracerr::map_from_and_wrap!(=> ExecutionError);
            wrap(e)
        }
    }
}

/// Error of [`RequestPayout`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Host has nothing to be paid out.
    #[display("`User(id: {_0})` has no reservations eligible for a payout")]
    NoEligibleReservations(#[error(not(source))] user::Id),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::Db(e) => e.kind(),
            Self::NoEligibleReservations(_) => Kind::NoEligibleReservations,
        }
    }
}
