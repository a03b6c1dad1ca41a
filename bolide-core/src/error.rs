use axum::{
    headers::{ContentType, HeaderMapExt},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bolide_dependencies::{reqwest, serde_urlencoded, url, uuid};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BolideError {
    #[error("Database Error: {0}")]
    Database(#[from] bolide_models::BolideModelError),
    #[error("SQLx Error: {0}")]
    SQLx(#[from] sqlx::Error),
    #[error("SQL Migration Error: {0}")]
    SQLMigration(#[from] sqlx::migrate::MigrateError),
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Serde: JSON: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Other Error: {0:?}")]
    Other(String),
    #[error("UUID Error: {0}")]
    ParseUuidError(#[from] uuid::Error),
    #[error("The page located under {0:?} could not be found")]
    PageNotFound(String),
    #[error("Could not join thread: {0}")]
    JoinError(#[from] tokio::task::JoinError),
    #[error("Could not parse URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Access has been denied")]
    AccessDenied,
    #[error("Configuration Variable Unset: {0}")]
    ConfigurationUnset(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
    #[error("Requested Session from Static Handler")]
    StaticSession,
    #[error("Could not encode query string: {0}")]
    QueryString(#[from] serde_urlencoded::ser::Error),
    #[error("Could not parse string as integer: {0:?}")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("GitHub API Error: {0}")]
    GithubApi(String),
}

pub type BolideResult<T> = std::result::Result<T, BolideError>;

impl IntoResponse for BolideError {
    fn into_response(self) -> Response {
        let status = match &self {
            BolideError::AccessDenied => StatusCode::FORBIDDEN,
            BolideError::PageNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let c = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // don't reflect internals at the user
            error!("Error presented to user: {:?}", self);
            maud::html! {
                "Internal Error"
                br;
            }
        } else {
            maud::html! {
                b { (self.to_string()) };
            }
        };
        let c: String = c.into_string();
        let mut hm = HeaderMap::new();
        hm.typed_insert(ContentType::html());
        (status, hm, c).into_response()
    }
}
