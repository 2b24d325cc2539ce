//! [`Command`] for creating a [`Reservation`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    Date, DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        reservation::{pricing, GuestCount, Price, PricingError, Stay},
        unit, user, Reservation, Unit,
    },
    error::{Classify, Kind},
    infra::{
        database::{self, constraint},
        Database,
    },
    read::reservation::IsAvailable,
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Reservation`] of a [`Unit`].
#[derive(Clone, Copy, Debug)]
pub struct CreateReservation {
    /// ID of the guest reserving the [`Unit`].
    pub guest_id: user::Id,

    /// ID of the [`Unit`] to reserve.
    pub unit_id: unit::Id,

    /// Arrival [`Date`].
    pub check_in: Date,

    /// Departure [`Date`].
    pub check_out: Date,

    /// Number of guests.
    pub guest_count: u16,
}

impl<Db, Pp> Command<CreateReservation> for Service<Db, Pp>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Unit>, unit::Id>>,
            Ok = Option<Unit>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Unit, unit::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<IsAvailable, (unit::Id, Stay)>>,
            Ok = IsAvailable,
            Err = Traced<database::Error>,
        > + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateReservation {
            guest_id,
            unit_id,
            check_in,
            check_out,
            guest_count,
        } = cmd;

        // Inactive units are not reservable, so they are reported as missing.
        let unit = self
            .database()
            .execute(Select(By::<Option<Unit>, _>::new(unit_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(Unit::is_active)
            .ok_or(E::UnitNotExists(unit_id))
            .map_err(tracerr::wrap!())?;

        if unit.host_id == guest_id {
            return Err(tracerr::new!(E::OwnUnit(unit_id)));
        }

        let count = GuestCount::new(guest_count)
            .filter(|c| u16::from(*c) <= unit.max_guests)
            .ok_or(E::InvalidGuestCount {
                count: guest_count,
                max: unit.max_guests,
            })
            .map_err(tracerr::wrap!())?;

        let stay = Stay::new(check_in, check_out)
            .ok_or(E::InvalidStay {
                check_in,
                check_out,
            })
            .map_err(tracerr::wrap!())?;

        let min_nights = u32::from(unit.min_stay_weeks) * 7;
        if stay.nights() < min_nights {
            return Err(tracerr::new!(E::StayTooShort {
                nights: stay.nights(),
                min_nights,
            }));
        }
        if let Some(latest) =
            check_in.add_months(u32::from(unit.max_stay_months))
        {
            if check_out > latest {
                return Err(tracerr::new!(E::StayTooLong {
                    check_out,
                    latest,
                }));
            }
        }

        let price = Price::calculate(
            pricing::Rates {
                monthly_price: unit.monthly_price,
                cleaning_fee: unit.cleaning_fee,
                security_deposit: unit.security_deposit,
            },
            stay.nights(),
            self.config().fees.service_fee,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serialize reservations of the same `Unit`.
        tx.execute(Lock(By::<Unit, _>::new(unit_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let available = tx
            .execute(Select(By::<IsAvailable, _>::new((unit_id, stay))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !*available {
            return Err(tracerr::new!(E::Unavailable(stay)));
        }

        let reservation = Reservation::new(
            &unit,
            guest_id,
            stay,
            count,
            price,
            DateTime::now(),
        );

        tx.execute(Insert(reservation.clone()))
            .await
            .map_err(unavailable_on_overlap(stay))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(unavailable_on_overlap(stay))
            .map(drop)?;

        Ok(reservation)
    }
}

/// Maps a violation of the no-overlap constraint into
/// [`ExecutionError::Unavailable`].
fn unavailable_on_overlap(
    stay: Stay,
) -> impl FnOnce(Traced<database::Error>) -> Traced<ExecutionError> {
    move |e| {
        if e.as_ref()
            .is_exclusion_violation(Some(constraint::RESERVATIONS_NO_OVERLAP))
        {
            tracerr::new!(ExecutionError::Unavailable(stay))
        } else {
            let wrap = tracerr::map_from_and_wrap!(=> ExecutionError);
            wrap(e)
        }
    }
}

/// Error of [`CreateReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Number of guests is out of the [`Unit`] capacity.
    #[display("Guest count `{count}` is not in `1..={max}` range")]
    InvalidGuestCount {
        /// Requested number of guests.
        count: u16,

        /// Capacity of the [`Unit`].
        max: u16,
    },

    /// Departure is not after the arrival.
    #[display("Check-out `{check_out}` is not after check-in `{check_in}`")]
    InvalidStay {
        /// Requested arrival [`Date`].
        check_in: Date,

        /// Requested departure [`Date`].
        check_out: Date,
    },

    /// Guest tries to reserve their own [`Unit`].
    #[display("`Unit(id: {_0})` cannot be reserved by its host")]
    OwnUnit(#[error(not(source))] unit::Id),

    /// [`Price`] cannot be calculated.
    #[display("Failed to calculate the price: {_0}")]
    #[from]
    Pricing(PricingError),

    /// [`Stay`] is longer than the [`Unit`] allows.
    #[display("Check-out `{check_out}` is later than `{latest}`")]
    StayTooLong {
        /// Requested departure [`Date`].
        check_out: Date,

        /// Latest departure [`Date`] allowed.
        latest: Date,
    },

    /// [`Stay`] is shorter than the [`Unit`] allows.
    #[display("Stay of {nights} nights is shorter than {min_nights} nights")]
    StayTooShort {
        /// Requested number of nights.
        nights: u32,

        /// Minimum number of nights.
        min_nights: u32,
    },

    /// [`Stay`] overlaps another reservation of the [`Unit`].
    #[display("`Unit` is not available for `{_0}`")]
    Unavailable(#[error(not(source))] Stay),

    /// [`Unit`] with the provided ID doesn't exist.
    #[display("`Unit(id: {_0})` does not exist")]
    UnitNotExists(#[error(not(source))] unit::Id),
}

impl Classify for ExecutionError {
    fn kind(&self) -> Kind {
        match self {
            Self::Db(e) => e.kind(),
            Self::InvalidGuestCount { .. }
            | Self::InvalidStay { .. }
            | Self::Pricing(_)
            | Self::StayTooLong { .. }
            | Self::StayTooShort { .. } => Kind::InvalidArgument,
            Self::OwnUnit(_) => Kind::Forbidden,
            Self::Unavailable(_) => Kind::Unavailable,
            Self::UnitNotExists(_) => Kind::NotFound,
        }
    }
}
