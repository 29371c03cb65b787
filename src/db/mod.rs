mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{entities::Ride, error::Error};

/// Predicates understood by [`RideStore::count`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RideFilter {
    /// Unfinished rides held by `user_id` or on `vehicle_id`.
    Active { user_id: String, vehicle_id: String },
    /// The ride `id`, if it is already finished.
    Finished { id: Uuid },
}

impl RideFilter {
    pub fn matches(&self, ride: &Ride) -> bool {
        match self {
            Self::Active {
                user_id,
                vehicle_id,
            } => ride.overlaps(user_id, vehicle_id),
            Self::Finished { id } => ride.id == Some(*id) && ride.finished,
        }
    }
}

/// Persistence for rides.
///
/// Implementations must keep the one-active-ride-per-user/vehicle invariant on
/// `insert` and refuse to `update` a finished ride, so that the engine's count
/// checks cannot be raced by concurrent callers.
#[async_trait]
pub trait RideStore: Send + Sync {
    async fn count(&self, filter: RideFilter) -> Result<i64, Error>;

    /// Stores a new ride, assigning `id`, `created_at` and `updated_at`.
    async fn insert(&self, ride: &mut Ride) -> Result<(), Error>;

    /// Writes `price` and `finished`, refreshing `updated_at`.
    async fn update(&self, ride: &mut Ride) -> Result<(), Error>;

    async fn find(&self, id: Uuid) -> Result<Ride, Error>;
}

#[async_trait]
impl<S: RideStore + ?Sized> RideStore for Arc<S> {
    async fn count(&self, filter: RideFilter) -> Result<i64, Error> {
        (**self).count(filter).await
    }

    async fn insert(&self, ride: &mut Ride) -> Result<(), Error> {
        (**self).insert(ride).await
    }

    async fn update(&self, ride: &mut Ride) -> Result<(), Error> {
        (**self).update(ride).await
    }

    async fn find(&self, id: Uuid) -> Result<Ride, Error> {
        (**self).find(id).await
    }
}

#[test]
fn filter_matches_test() {
    let mut ride = Ride::new("u1", "v1");
    let id = Uuid::new_v4();
    ride.id = Some(id);

    let active = RideFilter::Active {
        user_id: "u2".into(),
        vehicle_id: "v1".into(),
    };
    let finished = RideFilter::Finished { id };

    assert!(active.matches(&ride));
    assert!(!finished.matches(&ride));

    ride.finished = true;

    assert!(!active.matches(&ride));
    assert!(finished.matches(&ride));
    assert!(!RideFilter::Finished { id: Uuid::new_v4() }.matches(&ride));
}
