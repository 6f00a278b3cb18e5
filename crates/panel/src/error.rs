use wfm_client::{ApiError, ConfigError};
use wfm_core::error::CoreError;
use wfm_core::titles::TitleError;

/// Errors surfaced by the panel stores.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// The backend call failed or was refused.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A domain rule or pre-flight check failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A title was rejected before submission.
    #[error(transparent)]
    Title(#[from] TitleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid panel route: {0}")]
    Route(String),

    /// A newer request for the same entity was issued while this one was
    /// in flight; its result was dropped.
    #[error("Request superseded by a newer one")]
    Superseded,
}

impl PanelError {
    /// `true` for failures caught before anything was sent to the backend.
    pub fn is_pre_check(&self) -> bool {
        matches!(
            self,
            Self::Title(_) | Self::Core(CoreError::Validation(_)) | Self::Core(CoreError::Conflict(_))
        )
    }
}
