//! [`Command`] for cancelling a [`Reservation`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        reservation::{self, CancellationReason, TransitionError},
        user, Reservation,
    },
    error::{Classify, Kind},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling a [`Reservation`] by its guest or host.
///
/// No refund is issued: that's a separate [`RefundPayment`] decision of the
/// host.
///
/// [`RefundPayment`]: super::RefundPayment
#[derive(Clone, Debug)]
pub struct CancelReservation {
    /// ID of the [`Reservation`] to cancel.
    pub reservation_id: reservation::Id,

    /// ID of the user cancelling the [`Reservation`].
    pub actor_id: user::Id,

    /// Reason of cancelling.
    pub reason: String,
}

impl<Db, Pp> Command<CancelReservation> for Service<Db, Pp>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Reservation, reservation::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CancelReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelReservation {
            reservation_id,
            actor_id,
            reason,
        } = cmd;

        let reason = CancellationReason::new(reason)
            .ok_or(E::InvalidReason)
            .map_err(tracerr::wrap!())?;

        let reservation = self
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation_id))
            .map_err(tracerr::wrap!())?;
        if !reservation.is_party(actor_id) {
            return Err(tracerr::new!(E::NotParty(actor_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Reservation, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut reservation = tx
            .execute(Select(By::<Option<Reservation>, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation_id))
            .map_err(tracerr::wrap!())?;

        reservation
            .cancel(actor_id, reason, DateTime::now())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Insert(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(reservation)
    }
}

/// Error of [`CancelReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Reason is empty or too long.
    #[display(
        "Reason must be non-empty and at most {} characters long",
        CancellationReason::MAX_LEN
    )]
    InvalidReason,

    /// User is neither the guest nor the host of the [`Reservation`].
    #[display("`User(id: {_0})` is not a party of the `Reservation`")]
    NotParty(#[error(not(source))] user::Id),

    /// [`Reservation`] with the provided ID doesn't exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// [`Reservation`] cannot be cancelled in its current state.
    #[display("{_0}")]
    #[from]
    Transition(TransitionError),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::Db(e) => e.kind(),
            Self::InvalidReason => Kind::InvalidArgument,
            Self::NotParty(_) => Kind::Forbidden,
            Self::ReservationNotExists(_) => Kind::NotFound,
            Self::Transition(_) => Kind::InvalidState,
        }
    }
}
