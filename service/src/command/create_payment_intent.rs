//! [`Command`] for creating a payment [`Intent`] of a [`Reservation`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        payment::{intent, Intent, Method},
        reservation::{self, BookingStatus, PaymentStatus},
        user, Reservation,
    },
    error::{Classify, Kind},
    infra::{database, payment, Database, PaymentProvider},
    Service,
};

use super::Command;

/// [`Command`] for creating a payment [`Intent`] collecting the total of a
/// [`Reservation`] from its guest.
///
/// A live [`Intent`] stored already is returned instead of creating a new
/// one.
#[derive(Clone, Copy, Debug)]
pub struct CreatePaymentIntent {
    /// ID of the [`Reservation`] to pay.
    pub reservation_id: reservation::Id,

    /// ID of the user paying.
    pub guest_id: user::Id,

    /// [`Method`] to pay with.
    pub method: Method,
}

impl<Db, Pp> Command<CreatePaymentIntent> for Service<Db, Pp>
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
    Pp: PaymentProvider<
            Select<By<Intent, intent::Id>>,
            Ok = Intent,
            Err = Traced<payment::Error>,
        > + PaymentProvider<
            Insert<intent::Draft>,
            Ok = Intent,
            Err = Traced<payment::Error>,
        >,
{
    type Ok = Intent;
    type Err = Traced<ExecutionError>;

    #[tracing::instrument(
        skip_all,
        fields(
            reservation_id = %cmd.reservation_id,
            guest_id = %cmd.guest_id,
            method = %cmd.method,
        ),
    )]
    async fn execute(
        &self,
        cmd: CreatePaymentIntent,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreatePaymentIntent {
            reservation_id,
            guest_id,
            method,
        } = cmd;

        let reservation = self
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation_id))
            .map_err(tracerr::wrap!())?;
        ensure_payable(&reservation, guest_id).map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid creating competing intents.
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
        ensure_payable(&reservation, guest_id).map_err(tracerr::wrap!())?;

        let mut replaced = None;
        if let Some(id) = reservation.payment_intent_id.clone() {
            let stored = self
                .payments()
                .execute(Select(By::<Intent, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            match stored.status {
                intent::Status::Succeeded => {
                    return Err(tracerr::new!(E::AlreadyPaid(reservation_id)));
                }
                intent::Status::Canceled => replaced = Some(stored.id),
                intent::Status::RequiresPaymentMethod
                | intent::Status::RequiresConfirmation
                | intent::Status::RequiresAction
                | intent::Status::Processing
                | intent::Status::RequiresCapture => return Ok(stored),
            }
        }

        let intent = self
            .payments()
            .execute(Insert(intent::Draft::new(
                &reservation,
                method,
                replaced.as_ref(),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        reservation.payment_intent_id = Some(intent.id.clone());
        reservation.updated_at = DateTime::now().coerce();

        tx.execute(Insert(reservation))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(intent)
    }
}

/// Ensures the provided [`Reservation`] may be paid by the provided user.
fn ensure_payable(
    reservation: &Reservation,
    guest_id: user::Id,
) -> Result<(), ExecutionError> {
    if reservation.guest_id != guest_id {
        return Err(ExecutionError::NotGuest(guest_id));
    }
    match reservation.booking_status {
        BookingStatus::Pending | BookingStatus::Confirmed => {}
        status @ (BookingStatus::Cancelled | BookingStatus::Completed) => {
            return Err(ExecutionError::NotPayable(status));
        }
    }
    match reservation.payment_status {
        PaymentStatus::Pending => Ok(()),
        PaymentStatus::Partial
        | PaymentStatus::Completed
        | PaymentStatus::Refunded => {
            Err(ExecutionError::AlreadyPaid(reservation.id))
        }
    }
}

/// Error of [`CreatePaymentIntent`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Reservation`] is paid already.
    #[display("`Reservation(id: {_0})` is paid already")]
    AlreadyPaid(#[error(not(source))] reservation::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// User is not the guest of the [`Reservation`].
    #[display("`User(id: {_0})` is not the guest of the `Reservation`")]
    NotGuest(#[error(not(source))] user::Id),

    /// [`Reservation`] is not awaiting a payment anymore.
    #[display("`{_0}` reservation cannot be paid")]
    NotPayable(#[error(not(source))] BookingStatus),

    /// [`PaymentProvider`] error.
    #[display("`PaymentProvider` operation failed: {_0}")]
    #[from]
    Provider(payment::Error),

    /// [`Reservation`] with the provided ID doesn't exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::AlreadyPaid(_) => Kind::AlreadyPaid,
            Self::Db(e) => e.kind(),
            Self::NotGuest(_) => Kind::Forbidden,
            Self::NotPayable(_) => Kind::InvalidState,
            Self::Provider(e) => e.kind(),
            Self::ReservationNotExists(_) => Kind::NotFound,
        }
    }
}
