use thiserror::Error;

/// Convenience result type for validation and upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Error type returned by the validation, batching and upload pipeline.
///
/// This is a single error enum shared by every `upload_from_*` entry point and the
/// validators they run.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error (e.g. a value that cannot be coerced into the requested schema).
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet serialization error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[cfg(feature = "polars")]
    /// Polars error raised while converting a dataframe (feature-gated behind `polars`).
    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Error returned by the transport collaborator, propagated unmodified.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The input violates a data contract (schema mismatch, empty dataset, bad embeddings,
    /// non-mapping records, ...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A column type cannot be used: either it cannot be written to Parquet, or it is not
    /// the type an embedding column requires.
    #[error("unsupported type: {message}")]
    UnsupportedType { message: String },

    /// An optional adapter was requested but its Cargo feature is not compiled in.
    #[error("{feature} integration not enabled (enable cargo feature '{feature}')")]
    FeatureNotAvailable { feature: &'static str },
}

impl UploadError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported_type(message: impl Into<String>) -> Self {
        Self::UnsupportedType {
            message: message.into(),
        }
    }
}

/// Errors raised by a [`crate::transport::DatasetTransport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// 401/403: the caller is not allowed to complete the request.
    #[error("You may not have access. {0}")]
    Authentication(String),

    /// 404: the requested resource does not exist.
    #[error("The resource may not exist. {0}")]
    NotFound(String),

    /// Any other 4xx response.
    #[error("Bad Request. {0}")]
    BadRequest(String),

    /// Non-2xx, non-4xx response, or a response that does not have the expected shape.
    #[error("Server error. {0}")]
    Server(String),

    #[cfg(feature = "http")]
    /// The request could not be sent or its body could not be read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TransportError {
    /// Returns `true` for the 4xx family (authentication and not-found included).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_) | Self::NotFound(_) | Self::BadRequest(_)
        )
    }
}
