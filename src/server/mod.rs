mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};

use crate::api::{DynAPI, API};
use crate::error::Error;
use crate::server::handlers::rides;

pub fn router(api: DynAPI) -> Router {
    Router::new()
        .route("/rides", post(rides::start))
        .route("/rides/:id", get(rides::find))
        .route("/rides/:id/finish", post(rides::finish))
        .layer(Extension(api))
}

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) -> Result<(), Error> {
    let app = router(Arc::new(api) as DynAPI);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!("server error: {}", err);
            Error::unexpected_error()
        })
}
