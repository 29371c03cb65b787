use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        Error::env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::ride_not_found_error(),
            err => Error::database_error(err),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = if self.is_internal_error() {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        } else if self.is_not_found_error() {
            (StatusCode::NOT_FOUND, self.message.as_str())
        } else if self.is_conflict_error() {
            (StatusCode::CONFLICT, self.message.as_str())
        } else {
            (StatusCode::BAD_REQUEST, self.message.as_str())
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl Error {
    pub fn env_var_error(err: env::VarError) -> Self {
        tracing::error!("environment variable error: {}", err);

        Self {
            code: 1,
            message: "environment variable error".into(),
        }
    }

    pub fn database_error<T: Debug>(err: T) -> Self {
        tracing::error!("database error: {:?}", err);

        Self {
            code: 2,
            message: "database error".into(),
        }
    }

    pub fn config_error(reason: impl Into<String>) -> Self {
        Self {
            code: 3,
            message: format!("configuration error: {}", reason.into()),
        }
    }

    pub fn fare_overflow_error() -> Self {
        Self {
            code: 4,
            message: "fare overflow".into(),
        }
    }

    pub fn unexpected_error() -> Self {
        Self {
            code: 5,
            message: "unexpected error".into(),
        }
    }

    pub fn invalid_input_error() -> Self {
        Self {
            code: 100,
            message: "invalid input".into(),
        }
    }

    pub fn user_id_blank_error() -> Self {
        Self {
            code: 101,
            message: "UserID can't be blank".into(),
        }
    }

    pub fn vehicle_id_blank_error() -> Self {
        Self {
            code: 102,
            message: "VehicleID can't be blank".into(),
        }
    }

    pub fn ride_not_found_error() -> Self {
        Self {
            code: 103,
            message: "ride not found".into(),
        }
    }

    pub fn ride_already_started_error() -> Self {
        Self {
            code: 200,
            message: "A ride is already started for this vehicle or user".into(),
        }
    }

    pub fn ride_already_finished_error() -> Self {
        Self {
            code: 201,
            message: "This ride is already finished".into(),
        }
    }

    pub fn is_internal_error(&self) -> bool {
        (1..=99).contains(&self.code)
    }

    pub fn is_validation_error(&self) -> bool {
        (100..=102).contains(&self.code)
    }

    pub fn is_not_found_error(&self) -> bool {
        self.code == 103
    }

    pub fn is_conflict_error(&self) -> bool {
        (200..=299).contains(&self.code)
    }
}

#[test]
fn error_classification_test() {
    assert!(Error::database_error("boom").is_internal_error());
    assert!(Error::config_error("bad").is_internal_error());
    assert!(Error::fare_overflow_error().is_internal_error());
    assert!(Error::user_id_blank_error().is_validation_error());
    assert!(Error::vehicle_id_blank_error().is_validation_error());
    assert!(Error::ride_not_found_error().is_not_found_error());
    assert!(Error::ride_already_started_error().is_conflict_error());
    assert!(Error::ride_already_finished_error().is_conflict_error());
    assert!(!Error::ride_already_finished_error().is_validation_error());
}

#[test]
fn error_response_status_test() {
    let cases = [
        (Error::database_error("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        (Error::fare_overflow_error(), StatusCode::INTERNAL_SERVER_ERROR),
        (Error::user_id_blank_error(), StatusCode::BAD_REQUEST),
        (Error::invalid_input_error(), StatusCode::BAD_REQUEST),
        (Error::ride_not_found_error(), StatusCode::NOT_FOUND),
        (Error::ride_already_started_error(), StatusCode::CONFLICT),
        (Error::ride_already_finished_error(), StatusCode::CONFLICT),
    ];

    for (err, status) in cases {
        assert_eq!(err.into_response().status(), status);
    }
}

#[test]
fn row_not_found_maps_to_ride_not_found_test() {
    let err: Error = sqlx::Error::RowNotFound.into();
    assert_eq!(err, Error::ride_not_found_error());
}
