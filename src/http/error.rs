use rouille::Response;

use crate::{render::RenderError, storage::error::StoreError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::LibraryNotLoaded | RenderError::MapNotInitialized => {
                ApiError::Unavailable(err.to_string())
            }

            RenderError::EntryNotFound(_) => ApiError::NotFound(err.to_string()),

            RenderError::NoPoints | RenderError::NoValidCoordinates | RenderError::Failed(_) => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        log::error!("track store failure: {err:#}");
        ApiError::Internal("internal server error".into())
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::BadRequest(_) => 400,
            ApiError::Unavailable(_) => 503,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Unavailable(msg)
            | ApiError::Internal(msg) => Response::text(msg).with_status_code(status),
        }
    }
}
