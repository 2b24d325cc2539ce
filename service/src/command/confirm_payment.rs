//! [`Command`] for confirming a payment of a [`Reservation`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        payment::{intent, Intent},
        reservation::{self, TransitionError},
        user, Reservation,
    },
    error::{Classify, Kind},
    infra::{database, payment, Database, PaymentProvider},
    read::reservation::PaymentDetails,
    Service,
};

use super::Command;

/// [`Command`] for confirming a payment of a [`Reservation`] once the guest
/// has completed its [`Intent`] on the client side.
///
/// Re-confirming a recorded payment changes nothing.
#[derive(Clone, Debug)]
pub struct ConfirmPayment {
    /// ID of the paid [`Reservation`].
    pub reservation_id: reservation::Id,

    /// ID of the user who paid.
    pub guest_id: user::Id,

    /// ID of the completed [`Intent`].
    pub intent_id: intent::Id,
}

impl<Db, Pp> Command<ConfirmPayment> for Service<Db, Pp>
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
    >,
{
    type Ok = PaymentDetails;
    type Err = Traced<ExecutionError>;

    #[tracing::instrument(
        skip_all,
        fields(
            reservation_id = %cmd.reservation_id,
            guest_id = %cmd.guest_id,
            intent_id = %cmd.intent_id,
        ),
    )]
    async fn execute(
        &self,
        cmd: ConfirmPayment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConfirmPayment {
            reservation_id,
            guest_id,
            intent_id,
        } = cmd;

        let reservation = self
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation_id))
            .map_err(tracerr::wrap!())?;
        if reservation.guest_id != guest_id {
            return Err(tracerr::new!(E::NotGuest(guest_id)));
        }
        if reservation.payment_intent_id.as_ref() != Some(&intent_id) {
            return Err(tracerr::new!(E::IntentMismatch(intent_id)));
        }

        let intent = self
            .payments()
            .execute(Select(By::<Intent, _>::new(intent_id.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if intent.status != intent::Status::Succeeded {
            return Err(tracerr::new!(E::NotSucceeded(intent.status)));
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
        if reservation.payment_intent_id.as_ref() != Some(&intent_id) {
            return Err(tracerr::new!(E::IntentMismatch(intent_id)));
        }

        let settled = reservation
            .settle_payment(DateTime::now())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        if settled {
            tx.execute(Insert(reservation.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        Ok(PaymentDetails::from(&reservation))
    }
}

/// Error of [`ConfirmPayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Intent`] is not the one paying the [`Reservation`].
    #[display("`Intent(id: {_0})` doesn't pay the `Reservation`")]
    IntentMismatch(#[error(not(source))] intent::Id),

    /// User is not the guest of the [`Reservation`].
    #[display("`User(id: {_0})` is not the guest of the `Reservation`")]
    NotGuest(#[error(not(source))] user::Id),

    /// [`Intent`] hasn't succeeded.
    #[display("`Intent` is `{_0}`, not `succeeded`")]
    NotSucceeded(#[error(not(source))] intent::Status),

    /// [`PaymentProvider`] error.
    #[display("`PaymentProvider` operation failed: {_0}")]
    #[from]
    Provider(payment::Error),

    /// [`Reservation`] with the provided ID doesn't exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// Payment cannot be recorded in the current state.
    #[display("{_0}")]
    #[from]
    Transition(TransitionError),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::Db(e) => e.kind(),
            Self::IntentMismatch(_) => Kind::InvalidArgument,
            Self::NotGuest(_) => Kind::Forbidden,
            Self::NotSucceeded(_) | Self::Transition(_) => Kind::InvalidState,
            Self::Provider(e) => e.kind(),
            Self::ReservationNotExists(_) => Kind::NotFound,
        }
    }
}
