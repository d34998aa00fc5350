use thiserror::Error;

/// Hard failures. Exhibit-level content problems never surface here; they
/// degrade the exhibit in place and are reported as [`crate::LayoutNotice`]s.
#[derive(Debug, Error)]
pub enum PacketError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid case document: {0}")]
    InvalidCase(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for PacketError {
    fn from(value: serde_json::Error) -> Self {
        PacketError::InvalidCase(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PacketError>;
