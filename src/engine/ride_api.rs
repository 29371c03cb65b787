use super::Engine;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{api::RideAPI, db::RideFilter, entities::Ride, error::Error};

#[async_trait]
impl RideAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn start_ride(&self, mut ride: Ride) -> Result<Ride, Error> {
        ride.validate()?;

        // fast path; the store enforces the same rule atomically on insert
        let active = self
            .store
            .count(RideFilter::Active {
                user_id: ride.user_id.clone(),
                vehicle_id: ride.vehicle_id.clone(),
            })
            .await?;

        if active > 0 {
            tracing::warn!("user or vehicle already has an active ride");
            return Err(Error::ride_already_started_error());
        }

        ride.price = self.pricing.base_fare;
        ride.finished = false;

        self.store.insert(&mut ride).await?;

        tracing::info!(id = ?ride.id, "ride started");

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn finish_ride(&self, mut ride: Ride, now: DateTime<Utc>) -> Result<Ride, Error> {
        let id = ride.id.ok_or_else(Error::ride_not_found_error)?;

        let finished = self.store.count(RideFilter::Finished { id }).await?;

        if finished > 0 {
            tracing::warn!("ride is already finished");
            return Err(Error::ride_already_finished_error());
        }

        ride.finish(now, self.pricing.minute_price)?;

        self.store.update(&mut ride).await?;

        tracing::info!(price = ride.price, "ride finished");

        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    async fn find_ride(&self, id: Uuid) -> Result<Ride, Error> {
        self.store.find(id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Duration;
    use tokio_test::block_on;
    use uuid::Uuid;

    use super::*;
    use crate::config::Pricing;
    use crate::db::{MemoryStore, RideStore};

    /// Memory store that records how often it was written to.
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryStore,
        inserts: AtomicUsize,
        updates: AtomicUsize,
    }

    #[async_trait]
    impl RideStore for RecordingStore {
        async fn count(&self, filter: RideFilter) -> Result<i64, Error> {
            self.inner.count(filter).await
        }

        async fn insert(&self, ride: &mut Ride) -> Result<(), Error> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.inner.insert(ride).await
        }

        async fn update(&self, ride: &mut Ride) -> Result<(), Error> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.inner.update(ride).await
        }

        async fn find(&self, id: Uuid) -> Result<Ride, Error> {
            self.inner.find(id).await
        }
    }

    fn engine() -> (Engine, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::default());
        let engine = Engine::new(store.clone(), Pricing::default());

        (engine, store)
    }

    fn finish_after(seconds: i64) -> Ride {
        let (engine, _) = engine();
        let ride = block_on(engine.start_ride(Ride::new("1", "1"))).unwrap();
        let now = ride.created_at.unwrap() + Duration::seconds(seconds);

        block_on(engine.finish_ride(ride, now)).unwrap()
    }

    #[test]
    fn start_test() {
        let (engine, store) = engine();

        let ride = block_on(engine.start_ride(Ride::new("1", "1"))).unwrap();

        assert!(ride.id.is_some());
        assert!(ride.created_at.is_some());
        assert!(ride.updated_at.is_some());
        assert_eq!(ride.price, 18);
        assert!(!ride.finished);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn start_uses_configured_base_fare_test() {
        let pricing = Pricing {
            base_fare: 250,
            minute_price: 7,
        };
        let engine = Engine::new(MemoryStore::new(), pricing);

        let ride = block_on(engine.start_ride(Ride::new("1", "1"))).unwrap();
        assert_eq!(ride.price, 250);

        let now = ride.created_at.unwrap() + Duration::seconds(125);
        let ride = block_on(engine.finish_ride(ride, now)).unwrap();
        assert_eq!(ride.price, 250 + 3 * 7);
    }

    #[test]
    fn start_ride_validation_error_user_id_test() {
        let (engine, store) = engine();

        let result = block_on(engine.start_ride(Ride::new("", "1")));

        assert_eq!(result, Err(Error::user_id_blank_error()));
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn start_ride_validation_error_vehicle_id_test() {
        let (engine, store) = engine();

        let result = block_on(engine.start_ride(Ride::new("1", "")));

        assert_eq!(result, Err(Error::vehicle_id_blank_error()));
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn start_another_ride_already_started_test() {
        let (engine, store) = engine();
        block_on(engine.start_ride(Ride::new("u1", "v1"))).unwrap();

        let same_user = block_on(engine.start_ride(Ride::new("u1", "v2")));
        let same_vehicle = block_on(engine.start_ride(Ride::new("u2", "v1")));

        assert_eq!(same_user, Err(Error::ride_already_started_error()));
        assert_eq!(same_vehicle, Err(Error::ride_already_started_error()));
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(block_on(store.inner.len()), 1);
    }

    #[test]
    fn start_after_previous_ride_finished_test() {
        let (engine, _) = engine();
        let ride = block_on(engine.start_ride(Ride::new("u1", "v1"))).unwrap();
        block_on(engine.finish_ride(ride, Utc::now())).unwrap();

        let next = block_on(engine.start_ride(Ride::new("u1", "v1"))).unwrap();

        assert_eq!(next.price, 18);
        assert!(!next.finished);
    }

    #[test]
    fn finish_1_second_test() {
        let ride = finish_after(1);

        assert_eq!(ride.price, 118);
        assert!(ride.finished);
        assert!(ride.updated_at >= ride.created_at);
    }

    #[test]
    fn finish_10_seconds_test() {
        assert_eq!(finish_after(10).price, 118);
    }

    #[test]
    fn finish_59_seconds_test() {
        assert_eq!(finish_after(59).price, 118);
    }

    #[test]
    fn finish_60_seconds_test() {
        assert_eq!(finish_after(60).price, 118);
    }

    #[test]
    fn finish_61_seconds_test() {
        assert_eq!(finish_after(61).price, 218);
    }

    #[test]
    fn finish_1565_seconds_test() {
        assert_eq!(finish_after(1565).price, 2718);
    }

    #[test]
    fn finish_persists_price_test() {
        let (engine, store) = engine();
        let ride = block_on(engine.start_ride(Ride::new("1", "1"))).unwrap();
        let id = ride.id.unwrap();
        let now = ride.created_at.unwrap() + Duration::seconds(61);

        block_on(engine.finish_ride(ride, now)).unwrap();

        let stored = block_on(engine.find_ride(id)).unwrap();
        assert_eq!(stored.price, 218);
        assert!(stored.finished);
        assert_eq!(store.updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn finish_ride_already_finished_test() {
        let (engine, store) = engine();
        let ride = block_on(engine.start_ride(Ride::new("1", "1"))).unwrap();
        let now = ride.created_at.unwrap() + Duration::seconds(30);

        let first = block_on(engine.finish_ride(ride.clone(), now)).unwrap();
        let second = block_on(engine.finish_ride(ride, now + Duration::seconds(1565)));

        assert_eq!(first.price, 118);
        assert_eq!(second, Err(Error::ride_already_finished_error()));
        assert_eq!(store.updates.load(Ordering::SeqCst), 1);

        let stored = block_on(engine.find_ride(first.id.unwrap())).unwrap();
        assert_eq!(stored.price, 118);
    }

    #[test]
    fn finish_unsaved_ride_test() {
        let (engine, store) = engine();

        let result = block_on(engine.finish_ride(Ride::new("1", "1"), Utc::now()));

        assert_eq!(result, Err(Error::ride_not_found_error()));
        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn find_missing_ride_test() {
        let (engine, _) = engine();

        let result = block_on(engine.find_ride(Uuid::new_v4()));

        assert_eq!(result, Err(Error::ride_not_found_error()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_starts_for_one_vehicle_test() {
        let (engine, store) = engine();
        let engine = Arc::new(engine);

        let handles = (0..32).map(|n| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .start_ride(Ride::new(format!("user-{}", n), "vehicle"))
                    .await
            })
        });

        let results = futures::future::join_all(handles).await;

        let started = results
            .into_iter()
            .map(|joined| joined.unwrap())
            .filter(|result| match result {
                Ok(_) => true,
                Err(err) => {
                    assert_eq!(err, &Error::ride_already_started_error());
                    false
                }
            })
            .count();

        assert_eq!(started, 1);
        assert_eq!(store.inner.len().await, 1);
    }
}
