use axum::extract::{Extension, Json, Path};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::DynAPI;
use crate::entities::Ride;
use crate::error::Error;

#[derive(Deserialize)]
pub struct StartParams {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    vehicle_id: String,
}

pub async fn start(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<StartParams>,
) -> Result<(StatusCode, Json<Ride>), Error> {
    let ride = api
        .start_ride(Ride::new(params.user_id, params.vehicle_id))
        .await?;

    Ok((StatusCode::CREATED, ride.into()))
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, Error> {
    let ride = api.find_ride(id).await?;

    Ok(ride.into())
}

pub async fn finish(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ride>, Error> {
    let ride = api.find_ride(id).await?;
    let ride = api.finish_ride(ride, Utc::now()).await?;

    Ok(ride.into())
}
