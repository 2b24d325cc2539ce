//! [`Command`] for refunding a payment of a [`Reservation`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        payment::{intent, refund, Refund},
        reservation::{self, CancellationReason, PaymentStatus},
        user, Reservation,
    },
    error::{Classify, Kind},
    infra::{database, payment, Database, PaymentProvider},
    Service,
};

use super::Command;

/// [`Command`] for refunding a paid [`Reservation`] by its host, fully or
/// partially, cancelling it unless it's completed.
#[derive(Clone, Debug)]
pub struct RefundPayment {
    /// ID of the [`Reservation`] to refund.
    pub reservation_id: reservation::Id,

    /// ID of the user refunding.
    pub host_id: user::Id,

    /// Amount to refund, the whole total if [`None`].
    pub amount: Option<Money>,

    /// Reason of refunding, if any.
    pub reason: Option<String>,
}

impl<Db, Pp> Command<RefundPayment> for Service<Db, Pp>
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
        Insert<refund::Draft>,
        Ok = Refund,
        Err = Traced<payment::Error>,
    >,
{
    type Ok = Refund;
    type Err = Traced<ExecutionError>;

    #[tracing::instrument(
        skip_all,
        fields(
            reservation_id = %cmd.reservation_id,
            host_id = %cmd.host_id,
            amount = ?cmd.amount.map(|a| a.to_string()),
        ),
    )]
    async fn execute(
        &self,
        cmd: RefundPayment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RefundPayment {
            reservation_id,
            host_id,
            amount,
            reason,
        } = cmd;

        let reason = reason
            .map(|r| CancellationReason::new(r).ok_or(E::InvalidReason))
            .transpose()
            .map_err(tracerr::wrap!())?;

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
        let (intent_id, amount) = check_refundable(&reservation, amount)
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid refunding twice concurrently.
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
        _ = check_refundable(&reservation, Some(amount))
            .map_err(tracerr::wrap!())?;

        let refund = self
            .payments()
            .execute(Insert(refund::Draft {
                intent_id,
                amount,
                reason: reason.clone(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        _ = reservation.refund(
            reservation.refunded_amount + refund.amount,
            reservation.price.total,
            Some(host_id),
            reason.unwrap_or_else(CancellationReason::refunded),
            DateTime::now(),
        );

        tx.execute(Insert(reservation))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(refund)
    }
}

/// Checks whether the provided `amount` of the [`Reservation`] may be
/// refunded, returning the refunded [`intent::Id`] and the resolved amount.
fn check_refundable(
    reservation: &Reservation,
    amount: Option<Money>,
) -> Result<(intent::Id, Money), ExecutionError> {
    let total = reservation.price.total;
    let intent_id = reservation
        .payment_intent_id
        .clone()
        .filter(|_| reservation.payment_status == PaymentStatus::Completed)
        .ok_or(ExecutionError::NotRefundable(reservation.payment_status))?;
    let amount = amount.unwrap_or(total);
    if !amount.is_positive() || amount > total {
        return Err(ExecutionError::InvalidAmount { amount, total });
    }
    Ok((intent_id, amount))
}

/// Error of [`RefundPayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Amount is out of the refundable range.
    #[display("Refund amount `{amount}` is not in `(0, {total}]` range")]
    InvalidAmount {
        /// Requested amount.
        amount: Money,

        /// Total of the [`Reservation`].
        total: Money,
    },

    /// Reason is empty or too long.
    #[display(
        "Reason must be non-empty and at most {} characters long",
        CancellationReason::MAX_LEN
    )]
    InvalidReason,

    /// User is not the host of the [`Reservation`].
    #[display("`User(id: {_0})` is not the host of the `Reservation`")]
    NotHost(#[error(not(source))] user::Id),

    /// [`Reservation`] payment is not refundable.
    #[display("`{_0}` payment cannot be refunded")]
    NotRefundable(#[error(not(source))] PaymentStatus),

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
            Self::InvalidAmount { .. } | Self::InvalidReason => {
                Kind::InvalidArgument
            }
            Self::NotHost(_) => Kind::Forbidden,
            Self::NotRefundable(_) => Kind::InvalidState,
            Self::Provider(e) => e.kind(),
            Self::ReservationNotExists(_) => Kind::NotFound,
        }
    }
}
