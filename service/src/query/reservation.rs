//! [`Query`] collection related to a single [`Reservation`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        reservation::{self, Stay},
        unit, user, Reservation,
    },
    error::{Classify, Kind},
    infra::{database, Database},
    read, Service,
};

use super::{DatabaseQuery, Query};

/// Queries whether a [`Stay`] of a unit is free of blocking [`Reservation`]s.
pub type IsAvailable =
    DatabaseQuery<By<read::reservation::IsAvailable, (unit::Id, Stay)>>;

/// [`Query`] of a [`Reservation`] visible to its guest and host only.
#[derive(Clone, Copy, Debug)]
pub struct GetReservation {
    /// ID of the [`Reservation`] to get.
    pub reservation_id: reservation::Id,

    /// ID of the user asking.
    pub actor_id: user::Id,
}

/// [`Query`] of the [`read::reservation::Invoice`] of a [`Reservation`].
#[derive(Clone, Copy, Debug)]
pub struct GetInvoice {
    /// ID of the invoiced [`Reservation`].
    pub reservation_id: reservation::Id,

    /// ID of the user asking.
    pub actor_id: user::Id,
}

/// [`Query`] of the [`read::reservation::PaymentDetails`] of a
/// [`Reservation`].
#[derive(Clone, Copy, Debug)]
pub struct GetPaymentDetails {
    /// ID of the paid [`Reservation`].
    pub reservation_id: reservation::Id,

    /// ID of the user asking.
    pub actor_id: user::Id,
}

impl<Db, Pp> Query<GetReservation> for Service<Db, Pp>
where
    Db: Database<
        Select<By<Option<Reservation>, reservation::Id>>,
        Ok = Option<Reservation>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        GetReservation {
            reservation_id,
            actor_id,
        }: GetReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

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
        Ok(reservation)
    }
}

impl<Db, Pp> Query<GetInvoice> for Service<Db, Pp>
where
    Self: Query<
        GetReservation,
        Ok = Reservation,
        Err = Traced<ExecutionError>,
    >,
{
    type Ok = read::reservation::Invoice;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        GetInvoice {
            reservation_id,
            actor_id,
        }: GetInvoice,
    ) -> Result<Self::Ok, Self::Err> {
        let reservation = self
            .execute(GetReservation {
                reservation_id,
                actor_id,
            })
            .await
            .map_err(tracerr::wrap!())?;
        Ok(read::reservation::Invoice::new(&reservation))
    }
}

impl<Db, Pp> Query<GetPaymentDetails> for Service<Db, Pp>
where
    Self: Query<
        GetReservation,
        Ok = Reservation,
        Err = Traced<ExecutionError>,
    >,
{
    type Ok = read::reservation::PaymentDetails;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        GetPaymentDetails {
            reservation_id,
            actor_id,
        }: GetPaymentDetails,
    ) -> Result<Self::Ok, Self::Err> {
        let reservation = self
            .execute(GetReservation {
                reservation_id,
                actor_id,
            })
            .await
            .map_err(tracerr::wrap!())?;
        Ok(read::reservation::PaymentDetails::from(&reservation))
    }
}

/// Error of a single [`Reservation`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// User is neither the guest nor the host of the [`Reservation`].
    #[display("`User(id: {_0})` is not a party of the `Reservation`")]
    NotParty(#[error(not(source))] user::Id),

    /// [`Reservation`] with the provided ID doesn't exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::Db(e) => e.kind(),
            Self::NotParty(_) => Kind::Forbidden,
            Self::ReservationNotExists(_) => Kind::NotFound,
        }
    }
}
