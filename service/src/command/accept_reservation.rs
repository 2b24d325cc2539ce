//! [`Command`] for accepting a [`Reservation`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        reservation::{self, TransitionError},
        user, Reservation,
    },
    error::{Classify, Kind},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for accepting a pending [`Reservation`] by its host.
#[derive(Clone, Copy, Debug)]
pub struct AcceptReservation {
    /// ID of the [`Reservation`] to accept.
    pub reservation_id: reservation::Id,

    /// ID of the user accepting the [`Reservation`].
    pub host_id: user::Id,
}

impl<Db, Pp> Command<AcceptReservation> for Service<Db, Pp>
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
        cmd: AcceptReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AcceptReservation {
            reservation_id,
            host_id,
        } = cmd;

        let reservation = self
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation_id))
            .map_err(tracerr::wrap!())?;
        if reservation.host_id != host_id {
            return Err(tracerr::new!(E::NotHost(host_id)));
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
            .accept(DateTime::now())
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

/// Error of [`AcceptReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// User is not the host of the [`Reservation`].
    #[display("`User(id: {_0})` is not the host of the `Reservation`")]
    NotHost(#[error(not(source))] user::Id),

    /// [`Reservation`] with the provided ID doesn't exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// [`Reservation`] cannot be accepted in its current state.
    #[display("{_0}")]
    #[from]
    Transition(TransitionError),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::Db(e) => e.kind(),
            Self::NotHost(_) => Kind::Forbidden,
            Self::ReservationNotExists(_) => Kind::NotFound,
            Self::Transition(_) => Kind::InvalidState,
        }
    }
}
