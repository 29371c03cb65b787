mod ride;

pub use ride::{billed_minutes, Ride};
