use thiserror::Error;

#[derive(Debug, Error)]
pub enum CvPomError {
    #[error("Element '{query}' not found after {elapsed_ms}ms")]
    ElementNotFound { query: String, elapsed_ms: u64 },

    #[error("Element '{query}' still visible after {elapsed_ms}ms")]
    ElementStillPresent { query: String, elapsed_ms: u64 },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Driver operation failed: {0}")]
    DriverOperationFailed(String),

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("Text recognition error: {0}")]
    TextRecognition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl serde::Serialize for CvPomError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type CvPomResult<T> = Result<T, CvPomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_carries_query_and_elapsed() {
        let err = CvPomError::ElementNotFound {
            query: r#"{"label":"missing"}"#.into(),
            elapsed_ms: 512,
        };
        let msg = err.to_string();
        assert!(msg.contains(r#"{"label":"missing"}"#));
        assert!(msg.contains("512ms"));
    }

    #[test]
    fn serializes_as_display_string() {
        let err = CvPomError::InvalidQuery("unknown key 'colour'".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Invalid query: unknown key 'colour'\"");
    }
}
