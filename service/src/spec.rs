//! End-to-end behavior of the [`Service`] over the in-memory [`Database`]
//! and [`PaymentProvider`].

use std::time::Duration;

use common::{
    operations::{By, Select},
    pagination::Arguments,
    Money,
};
use jsonwebtoken::DecodingKey;
use serde_json::json;

use crate::{
    command::{
        process_webhook::Outcome, AcceptReservation, CancelReservation,
        CompleteReservation, ConfirmPayment, CreatePaymentIntent,
        CreateReservation, ProcessWebhook, RefundPayment, RequestPayout,
    },
    domain::{
        payment::{intent, Method},
        reservation::{self, spec::date, BookingStatus, PaymentStatus},
        unit, user, Reservation, Unit,
    },
    error::{Classify as _, Kind},
    infra::{payment, Database as _, Memory, Mock},
    query::{self, GetPaymentDetails},
    read, task, Command as _, Config, Fees, Query as _, Service,
};

/// Secret the [`Mock`] webhooks are signed with.
const WEBHOOK_SECRET: &str = "whsec_test";

/// [`Service`] under test.
pub(crate) type TestService = Service<Memory, Mock>;

/// Creates a new [`TestService`] with 8% service and 15% platform fees.
pub(crate) fn service() -> (TestService, Memory, Mock) {
    let db = Memory::new();
    let pp = Mock::new(WEBHOOK_SECRET);
    let svc = Service {
        config: Config {
            jwt_decoding_key: DecodingKey::from_secret(b"secret"),
            fees: Fees {
                service_fee: "8".parse().unwrap(),
                platform_fee: "15".parse().unwrap(),
            },
            payout_delay: Duration::from_secs(7 * 24 * 60 * 60),
            complete_stays: task::complete_stays::Config {
                interval: Duration::from_secs(60),
            },
        },
        database: db.clone(),
        payments: pp.clone(),
    };
    (svc, db, pp)
}

/// Stores a new active [`Unit`] priced at `180000` a month, with `7500`
/// cleaning fee and `180000` security deposit.
pub(crate) fn unit(db: &Memory) -> Unit {
    let unit = Unit {
        id: unit::Id::new(),
        host_id: user::Id::new(),
        monthly_price: Money::from_minor(180_000),
        cleaning_fee: Money::from_minor(7_500),
        security_deposit: Some(Money::from_minor(180_000)),
        min_stay_weeks: 1,
        max_stay_months: 6,
        max_guests: 2,
        status: unit::Status::Active,
    };
    db.insert_unit(unit.clone());
    unit
}

/// Reserves the provided [`Unit`] by a new guest.
pub(crate) async fn reserve(
    svc: &TestService,
    unit: &Unit,
    check_in: &str,
    check_out: &str,
) -> Reservation {
    svc.execute(CreateReservation {
        guest_id: user::Id::new(),
        unit_id: unit.id,
        check_in: date(check_in),
        check_out: date(check_out),
        guest_count: 2,
    })
    .await
    .unwrap()
}

/// Returns the committed state of a [`Reservation`].
pub(crate) async fn stored(db: &Memory, id: reservation::Id) -> Reservation {
    db.execute(Select(By::<Option<Reservation>, _>::new(id)))
        .await
        .unwrap()
        .unwrap()
}

/// Returns the first page [`Arguments`] of 20 items.
fn first_page() -> Arguments {
    Arguments::new(None::<usize>, None, 20).unwrap()
}

/// Builds a signed webhook delivery of the provided event `kind`.
fn webhook(
    pp: &Mock,
    event_id: &str,
    kind: &str,
    intent_id: &intent::Id,
    reservation_id: reservation::Id,
) -> payment::Payload {
    let body = json!({
        "id": event_id,
        "type": kind,
        "data": {"object": {
            "id": intent_id.as_ref(),
            "object": "payment_intent",
            "metadata": {"reservation_id": reservation_id.to_string()},
        }},
    });
    pp.sign(body.to_string())
}

/// Creates a payment [`intent::Intent`] of the provided [`Reservation`] and
/// marks it succeeded on the provider side.
async fn pay(svc: &TestService, pp: &Mock, r: &Reservation) -> intent::Id {
    let intent = svc
        .execute(CreatePaymentIntent {
            reservation_id: r.id,
            guest_id: r.guest_id,
            method: Method::Card,
        })
        .await
        .unwrap();
    pp.set_intent_status(&intent.id, intent::Status::Succeeded);
    intent.id
}

/// Builds a signed `charge.refunded` delivery referencing the provided
/// payment [`intent::Intent`] only, without any metadata.
fn refund_webhook(
    pp: &Mock,
    event_id: &str,
    intent_id: &intent::Id,
    charged: i64,
    refunded: i64,
) -> payment::Payload {
    let body = json!({
        "id": event_id,
        "type": "charge.refunded",
        "data": {"object": {
            "id": format!("ch_{event_id}"),
            "object": "charge",
            "payment_intent": intent_id.as_ref(),
            "amount": charged,
            "amount_refunded": refunded,
        }},
    });
    pp.sign(body.to_string())
}

/// Reserves the provided [`Unit`], accepts the [`Reservation`] and settles
/// its payment with a `payment_intent.succeeded` delivery.
async fn settled(
    svc: &TestService,
    pp: &Mock,
    unit: &Unit,
) -> (Reservation, intent::Id) {
    let r = reserve(svc, unit, "2025-01-15", "2025-05-15").await;
    _ = svc
        .execute(AcceptReservation {
            reservation_id: r.id,
            host_id: unit.host_id,
        })
        .await
        .unwrap();
    let intent_id = pay(svc, pp, &r).await;
    let outcome = svc
        .execute(ProcessWebhook {
            payload: webhook(
                pp,
                "evt_paid",
                "payment_intent.succeeded",
                &intent_id,
                r.id,
            ),
        })
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Applied);
    (r, intent_id)
}

#[tokio::test]
async fn books_and_accepts() {
    let (svc, db, _) = service();
    let unit = unit(&db);

    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;

    assert_eq!(r.booking_status, BookingStatus::Pending);
    assert_eq!(r.payment_status, PaymentStatus::Pending);
    assert_eq!(r.stay.nights(), 120);
    assert_eq!(r.price.subtotal, Money::from_minor(720_000));
    assert_eq!(r.price.service_fee, Money::from_minor(57_600));
    assert_eq!(r.price.total, Money::from_minor(965_100));

    let accepted = svc
        .execute(AcceptReservation {
            reservation_id: r.id,
            host_id: unit.host_id,
        })
        .await
        .unwrap();

    assert_eq!(accepted.booking_status, BookingStatus::Confirmed);
    assert!(accepted.confirmed_at.is_some());
    assert_eq!(
        stored(&db, r.id).await.booking_status,
        BookingStatus::Confirmed,
    );
}

#[tokio::test]
async fn rejects_overlapping_stay() {
    let (svc, db, _) = service();
    let unit = unit(&db);
    _ = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;

    let err = svc
        .execute(CreateReservation {
            guest_id: user::Id::new(),
            unit_id: unit.id,
            check_in: date("2025-03-01"),
            check_out: date("2025-04-01"),
            guest_count: 1,
        })
        .await
        .unwrap_err();

    assert_eq!(err.as_ref().kind(), Kind::Unavailable);
}

#[tokio::test]
async fn accepts_back_to_back_stays() {
    let (svc, db, _) = service();
    let unit = unit(&db);
    let first = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;

    let second = reserve(&svc, &unit, "2025-05-15", "2025-06-15").await;

    assert_ne!(first.id, second.id);
    assert!(svc
        .execute(query::reservation::IsAvailable::by((
            unit.id,
            reservation::Stay::new(date("2025-01-01"), date("2025-01-15"))
                .unwrap(),
        )))
        .await
        .unwrap()
        .0);
}

#[tokio::test]
async fn frees_nights_of_cancelled_reservation() {
    let (svc, db, _) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;

    _ = svc
        .execute(CancelReservation {
            reservation_id: r.id,
            actor_id: r.guest_id,
            reason: "plans changed".into(),
        })
        .await
        .unwrap();

    let again = reserve(&svc, &unit, "2025-03-01", "2025-04-01").await;
    assert_eq!(again.booking_status, BookingStatus::Pending);
}

#[tokio::test]
async fn rejects_invalid_requests() {
    let (svc, db, _) = service();
    let unit = unit(&db);

    let kind = |check_in: &str, check_out: &str, guests: u16, guest_id| {
        let svc = svc.clone();
        let cmd = CreateReservation {
            guest_id,
            unit_id: unit.id,
            check_in: date(check_in),
            check_out: date(check_out),
            guest_count: guests,
        };
        async move { svc.execute(cmd).await.unwrap_err().as_ref().kind() }
    };

    let guest = user::Id::new();
    assert_eq!(
        kind("2025-01-15", "2025-01-15", 1, guest).await,
        Kind::InvalidArgument,
    );
    assert_eq!(
        kind("2025-01-15", "2025-01-18", 1, guest).await,
        Kind::InvalidArgument,
    );
    assert_eq!(
        kind("2025-01-15", "2025-08-15", 1, guest).await,
        Kind::InvalidArgument,
    );
    assert_eq!(
        kind("2025-01-15", "2025-02-15", 3, guest).await,
        Kind::InvalidArgument,
    );
    assert_eq!(
        kind("2025-01-15", "2025-02-15", 1, unit.host_id).await,
        Kind::Forbidden,
    );

    let err = svc
        .execute(CreateReservation {
            guest_id: guest,
            unit_id: unit::Id::new(),
            check_in: date("2025-01-15"),
            check_out: date("2025-02-15"),
            guest_count: 1,
        })
        .await
        .unwrap_err();
    assert_eq!(err.as_ref().kind(), Kind::NotFound);
}

#[tokio::test]
async fn guards_transitions() {
    let (svc, db, _) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;
    let accept = AcceptReservation {
        reservation_id: r.id,
        host_id: unit.host_id,
    };

    let err = svc
        .execute(AcceptReservation {
            host_id: r.guest_id,
            ..accept
        })
        .await
        .unwrap_err();
    assert_eq!(err.as_ref().kind(), Kind::Forbidden);

    _ = svc.execute(accept).await.unwrap();
    let err = svc.execute(accept).await.unwrap_err();
    assert_eq!(err.as_ref().kind(), Kind::InvalidState);

    let err = svc
        .execute(CompleteReservation {
            reservation_id: r.id,
            today: date("2025-05-14"),
        })
        .await
        .unwrap_err();
    assert_eq!(err.as_ref().kind(), Kind::InvalidState);
}

#[tokio::test]
async fn settles_duplicated_webhook_once() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;
    _ = svc
        .execute(AcceptReservation {
            reservation_id: r.id,
            host_id: unit.host_id,
        })
        .await
        .unwrap();
    let intent_id = pay(&svc, &pp, &r).await;
    let delivery =
        webhook(&pp, "evt_1", "payment_intent.succeeded", &intent_id, r.id);

    let first = svc
        .execute(ProcessWebhook {
            payload: delivery.clone(),
        })
        .await
        .unwrap();
    let after_first = stored(&db, r.id).await;
    let second = svc
        .execute(ProcessWebhook { payload: delivery })
        .await
        .unwrap();
    let after_second = stored(&db, r.id).await;

    assert_eq!(first, Outcome::Applied);
    assert_eq!(second, Outcome::Ignored);
    assert_eq!(after_first.payment_status, PaymentStatus::Completed);
    assert_eq!(after_second.booking_status, BookingStatus::Confirmed);
    assert_eq!(after_first.updated_at, after_second.updated_at);
}

#[tokio::test]
async fn confirms_pending_reservation_on_payment() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;
    let intent_id = pay(&svc, &pp, &r).await;

    let details = svc
        .execute(ConfirmPayment {
            reservation_id: r.id,
            guest_id: r.guest_id,
            intent_id: intent_id.clone(),
        })
        .await
        .unwrap();

    assert_eq!(details.payment_status, PaymentStatus::Completed);
    assert_eq!(details.booking_status, BookingStatus::Confirmed);
    assert_eq!(details.intent_id, Some(intent_id.clone()));

    let err = svc
        .execute(CreatePaymentIntent {
            reservation_id: r.id,
            guest_id: r.guest_id,
            method: Method::Card,
        })
        .await
        .unwrap_err();
    assert_eq!(err.as_ref().kind(), Kind::AlreadyPaid);

    let seen = svc
        .execute(GetPaymentDetails {
            reservation_id: r.id,
            actor_id: unit.host_id,
        })
        .await
        .unwrap();
    assert_eq!(seen, details);
}

#[tokio::test]
async fn reuses_live_intent() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;
    let create = CreatePaymentIntent {
        reservation_id: r.id,
        guest_id: r.guest_id,
        method: Method::Card,
    };

    let first = svc.execute(create).await.unwrap();
    let second = svc.execute(create).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.amount, r.price.total);
    assert_eq!(pp.created_intents(), 1);
}

#[tokio::test]
async fn fails_closed_on_provider_error() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;
    pp.fail_next(payment::Error::Rejected {
        status: 402,
        message: "card declined".into(),
    });

    let err = svc
        .execute(CreatePaymentIntent {
            reservation_id: r.id,
            guest_id: r.guest_id,
            method: Method::Card,
        })
        .await
        .unwrap_err();

    assert_eq!(err.as_ref().kind(), Kind::ProviderError);
    assert_eq!(stored(&db, r.id).await.payment_intent_id, None);
}

#[tokio::test]
async fn rejects_forged_webhook() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;
    let intent_id = pay(&svc, &pp, &r).await;
    let mut delivery =
        webhook(&pp, "evt_1", "payment_intent.succeeded", &intent_id, r.id);
    delivery.signature =
        Mock::new("forged").sign(delivery.body.clone()).signature;

    let err = svc
        .execute(ProcessWebhook { payload: delivery })
        .await
        .unwrap_err();

    assert_eq!(err.as_ref().kind(), Kind::SignatureInvalid);
    assert_eq!(
        stored(&db, r.id).await.payment_status,
        PaymentStatus::Pending,
    );
}

#[tokio::test]
async fn ignores_unknown_events() {
    let (svc, _, pp) = service();
    let body = json!({
        "id": "evt_9",
        "type": "customer.created",
        "data": {"object": {"id": "cus_1"}},
    });

    let outcome = svc
        .execute(ProcessWebhook {
            payload: pp.sign(body.to_string()),
        })
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Ignored);
}

#[tokio::test]
async fn keeps_payment_on_stale_failure() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let (r, intent_id) = settled(&svc, &pp, &unit).await;
    let before = stored(&db, r.id).await;

    let outcome = svc
        .execute(ProcessWebhook {
            payload: webhook(
                &pp,
                "evt_failed",
                "payment_intent.payment_failed",
                &intent_id,
                r.id,
            ),
        })
        .await
        .unwrap();

    let after = stored(&db, r.id).await;
    assert_eq!(outcome, Outcome::Ignored);
    assert_eq!(after.payment_status, PaymentStatus::Completed);
    assert_eq!(after.booking_status, BookingStatus::Confirmed);
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn records_failure_of_pending_payment() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;
    let intent_id = pay(&svc, &pp, &r).await;

    let outcome = svc
        .execute(ProcessWebhook {
            payload: webhook(
                &pp,
                "evt_failed",
                "payment.failed",
                &intent_id,
                r.id,
            ),
        })
        .await
        .unwrap();

    let after = stored(&db, r.id).await;
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(after.payment_status, PaymentStatus::Pending);
    assert_eq!(after.booking_status, BookingStatus::Pending);
}

#[tokio::test]
async fn cancels_on_full_refund_found_by_intent() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let (r, intent_id) = settled(&svc, &pp, &unit).await;
    let total = r.price.total.minor();
    let delivery = refund_webhook(&pp, "evt_refund", &intent_id, total, total);

    let first = svc
        .execute(ProcessWebhook {
            payload: delivery.clone(),
        })
        .await
        .unwrap();
    let second = svc
        .execute(ProcessWebhook { payload: delivery })
        .await
        .unwrap();

    let after = stored(&db, r.id).await;
    assert_eq!(first, Outcome::Applied);
    assert_eq!(second, Outcome::Ignored);
    assert_eq!(after.payment_status, PaymentStatus::Refunded);
    assert_eq!(after.booking_status, BookingStatus::Cancelled);
    assert_eq!(after.refunded_amount, r.price.total);
}

#[tokio::test]
async fn marks_partial_refund_found_by_intent() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let (r, intent_id) = settled(&svc, &pp, &unit).await;

    let outcome = svc
        .execute(ProcessWebhook {
            payload: refund_webhook(
                &pp,
                "evt_refund",
                &intent_id,
                r.price.total.minor(),
                100_000,
            ),
        })
        .await
        .unwrap();

    let after = stored(&db, r.id).await;
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(after.payment_status, PaymentStatus::Partial);
    assert_eq!(after.booking_status, BookingStatus::Cancelled);
    assert_eq!(after.refunded_amount, Money::from_minor(100_000));
}

#[tokio::test]
async fn acknowledges_refund_of_unknown_intent() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let (r, _) = settled(&svc, &pp, &unit).await;

    let outcome = svc
        .execute(ProcessWebhook {
            payload: refund_webhook(
                &pp,
                "evt_refund",
                &intent::Id::new("pi_elsewhere"),
                500,
                500,
            ),
        })
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Ignored);
    assert_eq!(
        stored(&db, r.id).await.payment_status,
        PaymentStatus::Completed,
    );
}

#[tokio::test]
async fn refunds_within_total_only() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;
    let intent_id = pay(&svc, &pp, &r).await;
    _ = svc
        .execute(ConfirmPayment {
            reservation_id: r.id,
            guest_id: r.guest_id,
            intent_id,
        })
        .await
        .unwrap();

    let err = svc
        .execute(RefundPayment {
            reservation_id: r.id,
            host_id: unit.host_id,
            amount: Some(r.price.total + Money::from_minor(1)),
            reason: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.as_ref().kind(), Kind::InvalidArgument);

    let err = svc
        .execute(RefundPayment {
            reservation_id: r.id,
            host_id: r.guest_id,
            amount: None,
            reason: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.as_ref().kind(), Kind::Forbidden);

    let refund = svc
        .execute(RefundPayment {
            reservation_id: r.id,
            host_id: unit.host_id,
            amount: Some(Money::from_minor(100_000)),
            reason: Some("early leave".into()),
        })
        .await
        .unwrap();
    assert_eq!(refund.amount, Money::from_minor(100_000));

    let refunded = stored(&db, r.id).await;
    assert_eq!(refunded.payment_status, PaymentStatus::Partial);
    assert_eq!(refunded.refunded_amount, Money::from_minor(100_000));
    assert_eq!(refunded.booking_status, BookingStatus::Cancelled);
    assert_eq!(pp.refunds().len(), 1);
}

#[tokio::test]
async fn pays_out_exactly_once() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;
    _ = svc
        .execute(AcceptReservation {
            reservation_id: r.id,
            host_id: unit.host_id,
        })
        .await
        .unwrap();
    let intent_id = pay(&svc, &pp, &r).await;
    _ = svc
        .execute(ProcessWebhook {
            payload: webhook(
                &pp,
                "evt_1",
                "payment_intent.succeeded",
                &intent_id,
                r.id,
            ),
        })
        .await
        .unwrap();
    let completed = svc
        .execute(CompleteReservation {
            reservation_id: r.id,
            today: date("2025-05-15"),
        })
        .await
        .unwrap();
    assert_eq!(completed.booking_status, BookingStatus::Completed);

    let request = RequestPayout {
        host_id: unit.host_id,
        reservation_ids: None,
    };
    let batch = svc.execute(request.clone()).await.unwrap();

    let [payout] = batch.payouts.as_slice() else {
        panic!("expected single payout, got {:?}", batch.payouts);
    };
    assert_eq!(payout.reservation_id, r.id);
    assert_eq!(payout.gross_amount, Money::from_minor(727_500));
    assert_eq!(payout.platform_fee, Money::from_minor(109_125));
    assert_eq!(payout.net_amount, Money::from_minor(618_375));
    assert_eq!(batch.totals.net_amount, Money::from_minor(618_375));

    let err = svc.execute(request).await.unwrap_err();
    assert_eq!(err.as_ref().kind(), Kind::NoEligibleReservations);
}

#[tokio::test]
async fn serializes_concurrent_payouts() {
    let (svc, db, pp) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;
    let intent_id = pay(&svc, &pp, &r).await;
    _ = svc
        .execute(ConfirmPayment {
            reservation_id: r.id,
            guest_id: r.guest_id,
            intent_id,
        })
        .await
        .unwrap();
    _ = svc
        .execute(CompleteReservation {
            reservation_id: r.id,
            today: date("2025-06-01"),
        })
        .await
        .unwrap();
    let request = RequestPayout {
        host_id: unit.host_id,
        reservation_ids: Some(vec![r.id]),
    };

    let (a, b) = tokio::join!(
        svc.execute(request.clone()),
        svc.execute(request.clone()),
    );

    let created = [&a, &b]
        .iter()
        .filter_map(|res| res.as_ref().ok())
        .map(|batch| batch.payouts.len())
        .sum::<usize>();
    assert_eq!(created, 1);
    assert!([a, b].into_iter().any(|res| res
        .is_err_and(|e| e.as_ref().kind() == Kind::NoEligibleReservations)));

    let page = svc
        .execute(query::payouts::List::by(read::payout::list::Selector {
            arguments: first_page(),
            filter: read::payout::list::Filter {
                host_id: unit.host_id,
                status: None,
            },
        }))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn reserves_concurrently_without_overlaps() {
    let (svc, db, _) = service();
    let unit = unit(&db);
    let cmd = |guest_id| CreateReservation {
        guest_id,
        unit_id: unit.id,
        check_in: date("2025-02-01"),
        check_out: date("2025-03-01"),
        guest_count: 1,
    };

    let (a, b) = tokio::join!(
        svc.execute(cmd(user::Id::new())),
        svc.execute(cmd(user::Id::new())),
    );

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    let failed = a.err().or(b.err()).unwrap();
    assert_eq!(failed.as_ref().kind(), Kind::Unavailable);
}

#[tokio::test]
async fn lists_reservations_of_party() {
    use read::reservation::list::Role;

    let (svc, db, _) = service();
    let unit = unit(&db);
    let r = reserve(&svc, &unit, "2025-01-15", "2025-05-15").await;
    _ = reserve(&svc, &unit, "2025-06-01", "2025-07-01").await;

    let list = |actor_id, role| {
        let svc = svc.clone();
        async move {
            svc.execute(query::reservations::List::by(
                read::reservation::list::Selector {
                    arguments: first_page(),
                    filter: read::reservation::list::Filter {
                        actor_id,
                        role,
                        booking_status: None,
                        unit_id: None,
                        upcoming_from: None,
                    },
                },
            ))
            .await
            .unwrap()
        }
    };

    assert_eq!(list(unit.host_id, Role::Host).await.total, 2);
    let own = list(r.guest_id, Role::Any).await;
    assert_eq!(own.total, 1);
    assert_eq!(own.items[0].id, r.id);
    assert_eq!(list(r.guest_id, Role::Host).await.total, 0);
}
