use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use chrono::{Duration, Utc};
use rand_distr::{Binomial, Distribution, Uniform};

use crate::api::DynAPI;
use crate::entities::Ride;
use crate::error::Error;

#[derive(Clone, Debug)]
pub struct Settings {
    pub workers: usize,
    pub rides: usize,
    pub users: usize,
    pub vehicles: usize,
    pub finish_probability: f64,
    pub max_ride_seconds: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workers: 16,
            rides: 500,
            users: 40,
            vehicles: 20,
            finish_probability: 0.5,
            max_ride_seconds: 3600,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub started: usize,
    pub rejected: usize,
    pub finished: usize,
}

struct Simulation {
    api: DynAPI,
    settings: Settings,
    users: Uniform<usize>,
    vehicles: Uniform<usize>,
    durations: Uniform<i64>,
    finish: Binomial,
    started: AtomicUsize,
    rejected: AtomicUsize,
    finished: AtomicUsize,
}

impl Simulation {
    fn sample_ids(&self) -> (String, String) {
        let mut rng = rand::thread_rng();

        let user = self.users.sample(&mut rng);
        let vehicle = self.vehicles.sample(&mut rng);

        (format!("user-{}", user), format!("vehicle-{}", vehicle))
    }

    fn sample_finish(&self) -> Option<Duration> {
        let mut rng = rand::thread_rng();

        if self.finish.sample(&mut rng) == 0 {
            return None;
        }

        Some(Duration::seconds(self.durations.sample(&mut rng)))
    }

    #[tracing::instrument(skip(self))]
    async fn ride(&self) -> Result<(), Error> {
        let (user_id, vehicle_id) = self.sample_ids();

        let ride = match self.api.start_ride(Ride::new(user_id, vehicle_id)).await {
            Ok(ride) => ride,
            Err(err) if err == Error::ride_already_started_error() => {
                tracing::debug!("start rejected, user or vehicle busy");
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        self.started.fetch_add(1, Ordering::Relaxed);

        let length = match self.sample_finish() {
            Some(length) => length,
            None => return Ok(()),
        };

        let now = ride.created_at.unwrap_or_else(Utc::now) + length;
        self.api.finish_ride(ride, now).await?;
        self.finished.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }
}

/// Drives concurrent start/finish traffic against an API.
pub struct Executor {
    s: Arc<Simulation>,
}

impl Executor {
    pub fn new(api: DynAPI, settings: Settings) -> Result<Self, Error> {
        if settings.workers == 0 || settings.users == 0 || settings.vehicles == 0 {
            return Err(Error::config_error(
                "workers, users and vehicles must be positive",
            ));
        }

        if settings.max_ride_seconds < 0 {
            return Err(Error::config_error("max_ride_seconds must not be negative"));
        }

        let finish = Binomial::new(1, settings.finish_probability)
            .map_err(|err| Error::config_error(format!("finish_probability: {}", err)))?;

        let s = Simulation {
            api,
            users: Uniform::from(0..settings.users),
            vehicles: Uniform::from(0..settings.vehicles),
            durations: Uniform::from(0..=settings.max_ride_seconds),
            finish,
            settings,
            started: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        };

        Ok(Self { s: Arc::new(s) })
    }

    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<Report, Error> {
        let (tx, rx): (Sender<()>, Receiver<()>) = async_channel::unbounded();

        let mut handles = vec![];
        for _ in 0..self.s.settings.workers {
            let rx = rx.clone();
            let s = self.s.clone();

            let handle = tokio::spawn(async move {
                while let Ok(()) = rx.recv().await {
                    s.ride().await?;
                }

                Ok::<(), Error>(())
            });

            handles.push(handle);
        }

        for _ in 0..self.s.settings.rides {
            tx.send(()).await.map_err(|_| Error::unexpected_error())?;
        }
        drop(tx);

        for joined in futures::future::join_all(handles).await {
            joined.map_err(|err| {
                tracing::error!("simulation worker failed: {}", err);
                Error::unexpected_error()
            })??;
        }

        let report = Report {
            started: self.s.started.load(Ordering::Relaxed),
            rejected: self.s.rejected.load(Ordering::Relaxed),
            finished: self.s.finished.load(Ordering::Relaxed),
        };

        tracing::info!(?report, "simulation complete");

        Ok(report)
    }
}

/// Checks that no user and no vehicle holds more than one active ride, and that
/// no ride was priced below `base_fare`.
pub fn verify_invariants(rides: &[Ride], base_fare: i64) -> Result<(), Error> {
    let mut users = HashSet::new();
    let mut vehicles = HashSet::new();

    for ride in rides {
        if ride.price < base_fare {
            tracing::error!(id = ?ride.id, price = ride.price, "ride priced below base fare");
            return Err(Error::unexpected_error());
        }

        if ride.finished {
            continue;
        }

        if !users.insert(ride.user_id.as_str()) || !vehicles.insert(ride.vehicle_id.as_str()) {
            tracing::error!(id = ?ride.id, "overlapping active rides");
            return Err(Error::unexpected_error());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Pricing, db::MemoryStore, engine::Engine};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn simulation_keeps_invariants_test() {
        let store = Arc::new(MemoryStore::new());
        let api = Arc::new(Engine::new(store.clone(), Pricing::default())) as DynAPI;

        let settings = Settings {
            workers: 8,
            rides: 200,
            users: 10,
            vehicles: 5,
            ..Settings::default()
        };
        let executor = Executor::new(api, settings).unwrap();

        let report = executor.run().await.unwrap();

        assert_eq!(report.started + report.rejected, 200);
        assert!(report.finished <= report.started);
        assert_eq!(store.len().await, report.started);

        verify_invariants(&store.rides().await, 18).unwrap();
    }

    #[test]
    fn invalid_settings_test() {
        let api = Arc::new(Engine::new(MemoryStore::new(), Pricing::default())) as DynAPI;

        let no_users = Settings {
            users: 0,
            ..Settings::default()
        };
        let bad_probability = Settings {
            finish_probability: 1.5,
            ..Settings::default()
        };

        assert_eq!(Executor::new(api.clone(), no_users).err().unwrap().code, 3);
        assert_eq!(Executor::new(api, bad_probability).err().unwrap().code, 3);
    }

    #[test]
    fn verify_invariants_detects_overlap_test() {
        let mut first = Ride::new("u1", "v1");
        first.price = 18;
        let mut second = Ride::new("u2", "v1");
        second.price = 18;

        assert!(verify_invariants(&[first.clone(), second.clone()], 18).is_err());

        second.finished = true;
        assert!(verify_invariants(&[first, second], 18).is_ok());
    }
}
