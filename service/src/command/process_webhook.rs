//! [`Command`] for processing a webhook of a [`PaymentProvider`].

use common::{
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Verify,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        payment::{intent, Event, EventKind},
        reservation::{self, CancellationReason},
        Reservation,
    },
    error::{Classify, Kind},
    infra::{database, payment, Database, PaymentProvider},
    Service,
};

use super::Command;

/// [`Command`] for processing a signed webhook delivery of a
/// [`PaymentProvider`].
///
/// Deliveries may be duplicated or come out of order, so every [`Event`] is
/// applied as a guarded transition, and an [`Event`] changing nothing is
/// [`Outcome::Ignored`].
#[derive(Clone, Debug)]
pub struct ProcessWebhook {
    /// Raw delivery to verify.
    pub payload: payment::Payload,
}

/// Outcome of a [`ProcessWebhook`] [`Command`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Outcome {
    /// [`Event`] has changed a [`Reservation`].
    #[display("applied")]
    Applied,

    /// [`Event`] has changed nothing.
    #[display("ignored")]
    Ignored,
}

impl<Db, Pp> Command<ProcessWebhook> for Service<Db, Pp>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reservation>, intent::Id>>,
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
        Verify<payment::Payload>,
        Ok = Event,
        Err = Traced<payment::Error>,
    >,
{
    type Ok = Outcome;
    type Err = Traced<ExecutionError>;

    #[tracing::instrument(
        skip_all,
        fields(
            event.id = tracing::field::Empty,
            event.kind = tracing::field::Empty,
        ),
    )]
    async fn execute(
        &self,
        cmd: ProcessWebhook,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ProcessWebhook { payload } = cmd;

        let Event { id, kind } = self
            .payments()
            .execute(Verify(payload))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let span = tracing::Span::current();
        _ = span.record("event.id", tracing::field::display(&id));
        _ = span.record("event.kind", tracing::field::debug(&kind));

        let Some(intent_id) = kind.intent_id().cloned() else {
            log::debug!("skipping uninteresting event");
            return Ok(Outcome::Ignored);
        };

        let mut found = None;
        if let Some(reservation_id) = kind.reservation_id() {
            found = self
                .database()
                .execute(Select(By::<Option<Reservation>, _>::new(
                    reservation_id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }
        if found.is_none() {
            found = self
                .database()
                .execute(Select(By::<Option<Reservation>, _>::new(
                    intent_id.clone(),
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }
        let Some(reservation) = found else {
            log::warn!(
                "no `Reservation` is paid by `Intent(id: {intent_id})`",
            );
            return Ok(Outcome::Ignored);
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Reservation, _>::new(reservation.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut reservation = tx
            .execute(Select(By::<Option<Reservation>, _>::new(reservation.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation.id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        let changed = match kind {
            EventKind::PaymentSucceeded { .. } => {
                match reservation.settle_payment(now) {
                    Ok(changed) => changed,
                    Err(e) => {
                        log::warn!(
                            "`Reservation(id: {})` is not settled: {e}",
                            reservation.id,
                        );
                        false
                    }
                }
            }
            EventKind::PaymentFailed { .. } => reservation.fail_payment(now),
            EventKind::ChargeRefunded {
                amount,
                amount_refunded,
                ..
            } => reservation.refund(
                amount_refunded,
                amount,
                None,
                CancellationReason::refunded(),
                now,
            ),
            EventKind::Unknown(_) => false,
        };
        if !changed {
            return Ok(Outcome::Ignored);
        }

        tx.execute(Insert(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Reservation(id: {})` is now `{}` with `{}` payment",
            reservation.id,
            reservation.booking_status,
            reservation.payment_status,
        );
        Ok(Outcome::Applied)
    }
}

/// Error of [`ProcessWebhook`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

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
            Self::Db(e) => e.kind(),
            Self::Provider(e) => e.kind(),
            Self::ReservationNotExists(_) => Kind::NotFound,
        }
    }
}
