use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{RideFilter, RideStore};
use crate::{entities::Ride, error::Error};

/// In-process store. Every check-and-write happens under one lock, which gives the
/// same guarantees as the partial unique indexes of [`super::PgStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    rides: Mutex<HashMap<Uuid, Ride>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rides(&self) -> Vec<Ride> {
        self.rides.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.rides.lock().await.len()
    }
}

#[async_trait]
impl RideStore for MemoryStore {
    #[tracing::instrument(skip(self))]
    async fn count(&self, filter: RideFilter) -> Result<i64, Error> {
        let rides = self.rides.lock().await;

        Ok(rides.values().filter(|ride| filter.matches(ride)).count() as i64)
    }

    #[tracing::instrument(skip(self))]
    async fn insert(&self, ride: &mut Ride) -> Result<(), Error> {
        let mut rides = self.rides.lock().await;

        if rides
            .values()
            .any(|other| other.overlaps(&ride.user_id, &ride.vehicle_id))
        {
            tracing::warn!("active ride check rejected insert");
            return Err(Error::ride_already_started_error());
        }

        let now = Utc::now();
        let id = Uuid::new_v4();

        ride.id = Some(id);
        ride.created_at = Some(now);
        ride.updated_at = Some(now);

        rides.insert(id, ride.clone());

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn update(&self, ride: &mut Ride) -> Result<(), Error> {
        let id = ride.id.ok_or_else(Error::ride_not_found_error)?;

        let mut rides = self.rides.lock().await;
        let stored = rides.get_mut(&id).ok_or_else(Error::ride_not_found_error)?;

        if stored.finished {
            return Err(Error::ride_already_finished_error());
        }

        stored.price = ride.price;
        stored.finished = ride.finished;
        stored.updated_at = Some(Utc::now());

        ride.updated_at = stored.updated_at;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find(&self, id: Uuid) -> Result<Ride, Error> {
        self.rides
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(Error::ride_not_found_error)
    }
}
