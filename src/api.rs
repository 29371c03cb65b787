use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::Ride;
use crate::error::Error;

#[async_trait]
pub trait RideAPI {
    /// Validates `ride`, makes sure neither its user nor its vehicle is already on an
    /// active ride, prices it at the base fare and persists it.
    async fn start_ride(&self, ride: Ride) -> Result<Ride, Error>;

    /// Bills every started minute between the ride start and `now` and marks the
    /// ride finished.
    async fn finish_ride(&self, ride: Ride, now: DateTime<Utc>) -> Result<Ride, Error>;

    async fn find_ride(&self, id: Uuid) -> Result<Ride, Error>;
}

pub trait API: RideAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
