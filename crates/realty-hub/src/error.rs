use crate::config::ConfigError;
use crate::record_store::RecordStoreError;
use crate::settings::{SettingsServiceError, UnknownSetting};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Http(reqwest::Error),
    RecordStore(RecordStoreError),
    Settings(SettingsServiceError),
    UnknownSetting(UnknownSetting),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Http(err) => write!(f, "http client error: {}", err),
            AppError::RecordStore(err) => write!(f, "record store error: {}", err),
            AppError::Settings(err) => write!(f, "settings error: {}", err),
            AppError::UnknownSetting(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Http(err) => Some(err),
            AppError::RecordStore(err) => Some(err),
            AppError::Settings(err) => Some(err),
            AppError::UnknownSetting(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Settings(SettingsServiceError::Unauthorized) => StatusCode::UNAUTHORIZED,
            AppError::Settings(_) | AppError::UnknownSetting(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::RecordStore(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

impl From<RecordStoreError> for AppError {
    fn from(value: RecordStoreError) -> Self {
        Self::RecordStore(value)
    }
}

impl From<SettingsServiceError> for AppError {
    fn from(value: SettingsServiceError) -> Self {
        Self::Settings(value)
    }
}

impl From<UnknownSetting> for AppError {
    fn from(value: UnknownSetting) -> Self {
        Self::UnknownSetting(value)
    }
}
