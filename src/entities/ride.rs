use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ride {
    pub id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub price: i64,
    pub user_id: String,
    pub vehicle_id: String,
    pub finished: bool,
}

impl Ride {
    pub fn new(user_id: impl Into<String>, vehicle_id: impl Into<String>) -> Self {
        Self {
            id: None,
            created_at: None,
            updated_at: None,
            price: 0,
            user_id: user_id.into(),
            vehicle_id: vehicle_id.into(),
            finished: false,
        }
    }

    /// Structural checks required before a ride may be persisted.
    pub fn validate(&self) -> Result<(), Error> {
        if self.user_id.is_empty() {
            return Err(Error::user_id_blank_error());
        }

        if self.vehicle_id.is_empty() {
            return Err(Error::vehicle_id_blank_error());
        }

        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.finished
    }

    /// Whether this ride blocks another ride for `user_id` or `vehicle_id`.
    pub fn overlaps(&self, user_id: &str, vehicle_id: &str) -> bool {
        self.is_active() && (self.user_id == user_id || self.vehicle_id == vehicle_id)
    }

    /// Time elapsed between the ride start and `now`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Result<Duration, Error> {
        let created_at = self.created_at.ok_or_else(Error::invalid_input_error)?;

        Ok(now - created_at)
    }

    /// Closes the ride at `now`, charging every started minute at `minute_price`.
    #[tracing::instrument]
    pub fn finish(&mut self, now: DateTime<Utc>, minute_price: i64) -> Result<(), Error> {
        if self.finished {
            return Err(Error::ride_already_finished_error());
        }

        let minutes = billed_minutes(self.elapsed(now)?);

        self.price = minutes
            .checked_mul(minute_price)
            .and_then(|charge| self.price.checked_add(charge))
            .ok_or_else(Error::fare_overflow_error)?;
        self.finished = true;

        Ok(())
    }
}

/// Number of minutes billed for a ride of length `elapsed`. Any partial minute counts
/// as a whole one; non-positive durations bill nothing.
pub fn billed_minutes(elapsed: Duration) -> i64 {
    if elapsed <= Duration::zero() {
        return 0;
    }

    let seconds = elapsed.num_seconds();
    let remainder = elapsed - Duration::seconds(seconds);

    let minutes = seconds / 60;
    if seconds % 60 != 0 || remainder > Duration::zero() {
        minutes + 1
    } else {
        minutes
    }
}

#[test]
fn validation_test() {
    let mut ride = Ride::new("", "");
    assert_eq!(ride.validate(), Err(Error::user_id_blank_error()));

    ride.user_id = "1".into();
    assert_eq!(ride.validate(), Err(Error::vehicle_id_blank_error()));

    ride.vehicle_id = "1".into();
    assert_eq!(ride.validate(), Ok(()));
}

#[test]
fn validation_checks_user_before_vehicle_test() {
    let ride = Ride::new("", "1");
    assert_eq!(ride.validate(), Err(Error::user_id_blank_error()));
}

#[test]
fn billed_minutes_test() {
    assert_eq!(billed_minutes(Duration::zero()), 0);
    assert_eq!(billed_minutes(Duration::seconds(-30)), 0);
    assert_eq!(billed_minutes(Duration::milliseconds(1)), 1);
    assert_eq!(billed_minutes(Duration::seconds(1)), 1);
    assert_eq!(billed_minutes(Duration::seconds(59)), 1);
    assert_eq!(billed_minutes(Duration::seconds(60)), 1);
    assert_eq!(billed_minutes(Duration::milliseconds(60_001)), 2);
    assert_eq!(billed_minutes(Duration::seconds(61)), 2);
    assert_eq!(billed_minutes(Duration::seconds(1565)), 27);
}

#[test]
fn finish_charges_started_minutes_test() {
    let created_at = Utc::now();
    let mut ride = Ride::new("1", "1");
    ride.id = Some(Uuid::new_v4());
    ride.created_at = Some(created_at);
    ride.price = 18;

    ride.finish(created_at + Duration::seconds(1565), 100).unwrap();

    assert_eq!(ride.price, 2718);
    assert!(ride.finished);
}

#[test]
fn finish_is_terminal_test() {
    let created_at = Utc::now();
    let mut ride = Ride::new("1", "1");
    ride.created_at = Some(created_at);
    ride.price = 18;

    ride.finish(created_at + Duration::seconds(10), 100).unwrap();
    let result = ride.finish(created_at + Duration::seconds(600), 100);

    assert_eq!(result, Err(Error::ride_already_finished_error()));
    assert_eq!(ride.price, 118);
}

#[test]
fn finish_rejects_fare_overflow_test() {
    let created_at = Utc::now();
    let mut ride = Ride::new("1", "1");
    ride.created_at = Some(created_at);
    ride.price = 18;

    let result = ride.finish(created_at + Duration::seconds(120), i64::MAX / 2 + 1);

    assert_eq!(result, Err(Error::fare_overflow_error()));
    assert!(!ride.finished);
    assert_eq!(ride.price, 18);

    ride.finish(created_at + Duration::seconds(60), i64::MAX - 18).unwrap();
    assert_eq!(ride.price, i64::MAX);
}

#[test]
fn finish_requires_start_time_test() {
    let mut ride = Ride::new("1", "1");

    assert_eq!(ride.finish(Utc::now(), 100), Err(Error::invalid_input_error()));
    assert!(!ride.finished);
}

#[test]
fn overlaps_test() {
    let mut ride = Ride::new("u1", "v1");

    assert!(ride.overlaps("u1", "v2"));
    assert!(ride.overlaps("u2", "v1"));
    assert!(!ride.overlaps("u2", "v2"));

    ride.finished = true;
    assert!(!ride.overlaps("u1", "v1"));
}
