use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::Error;

/// Fare rules applied by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pricing {
    pub base_fare: i64,
    pub minute_price: i64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            base_fare: 18,
            minute_price: 100,
        }
    }
}

impl Pricing {
    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();

        Ok(Self {
            base_fare: non_negative("RIDE_INITIAL_PRICE", defaults.base_fare)?,
            minute_price: non_negative("RIDE_MINUTE_PRICE", defaults.minute_price)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub listen_addr: SocketAddr,
    pub pricing: Pricing,
}

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up a `.env`.
    pub fn from_env() -> Result<Self, Error> {
        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(env::VarError::NotPresent) => postgres_url_from_parts()?,
            Err(err) => return Err(err.into()),
        };

        let host: IpAddr = parse_or("HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port: u16 = parse_or("PORT", 3000)?;

        Ok(Self {
            database_url,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            listen_addr: SocketAddr::new(host, port),
            pricing: Pricing::from_env()?,
        })
    }
}

fn postgres_url_from_parts() -> Result<String, Error> {
    Ok(format!(
        "postgres://{}:{}@{}:{}/{}?sslmode=disable",
        env::var("POSTGRESQL_USERNAME")?,
        env::var("POSTGRESQL_PASSWORD")?,
        env::var("POSTGRESQL_HOST")?,
        env::var("POSTGRESQL_PORT")?,
        env::var("POSTGRESQL_DATABASE")?,
    ))
}

fn parse_or<T>(key: &str, default: T) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|err| Error::config_error(format!("invalid {}: {}", key, err))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err.into()),
    }
}

fn non_negative(key: &str, default: i64) -> Result<i64, Error> {
    let value = parse_or(key, default)?;

    if value < 0 {
        return Err(Error::config_error(format!("{} must not be negative", key)));
    }

    Ok(value)
}

#[test]
fn default_pricing_test() {
    let pricing = Pricing::default();

    assert_eq!(pricing.base_fare, 18);
    assert_eq!(pricing.minute_price, 100);
}

#[test]
fn pricing_from_env_test() {
    env::remove_var("RIDE_INITIAL_PRICE");
    env::remove_var("RIDE_MINUTE_PRICE");
    assert_eq!(Pricing::from_env().unwrap(), Pricing::default());

    env::set_var("RIDE_INITIAL_PRICE", "25");
    env::set_var("RIDE_MINUTE_PRICE", " 40 ");
    assert_eq!(
        Pricing::from_env().unwrap(),
        Pricing {
            base_fare: 25,
            minute_price: 40
        }
    );

    env::set_var("RIDE_MINUTE_PRICE", "ten");
    assert_eq!(Pricing::from_env().unwrap_err().code, 3);

    env::set_var("RIDE_MINUTE_PRICE", "-1");
    assert_eq!(Pricing::from_env().unwrap_err().code, 3);

    env::remove_var("RIDE_INITIAL_PRICE");
    env::remove_var("RIDE_MINUTE_PRICE");
}
