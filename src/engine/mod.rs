mod ride_api;

use std::fmt;

use crate::{api::API, config::Pricing, db::RideStore};

pub struct Engine {
    store: Box<dyn RideStore>,
    pricing: Pricing,
}

impl Engine {
    pub fn new<S: RideStore + 'static>(store: S, pricing: Pricing) -> Self {
        Self {
            store: Box::new(store),
            pricing,
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("pricing", &self.pricing)
            .finish_non_exhaustive()
    }
}

impl API for Engine {}
