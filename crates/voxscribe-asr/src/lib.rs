pub mod backend;
pub mod dashscope;
pub mod simple;
pub mod sse;

pub use backend::AsrBackend;
pub use dashscope::DashScopeBackend;
pub use simple::SimpleJsonBackend;
pub use sse::SseDecoder;

use voxscribe_core::{AsrConfig, AsrError};

/// Build the configured backend. The set is closed: one implementation
/// per wire protocol.
pub fn create_backend(config: &AsrConfig) -> Result<Box<dyn AsrBackend>, AsrError> {
    match config.backend.as_str() {
        "simple" => Ok(Box::new(SimpleJsonBackend::new(config.endpoint.clone()))),
        "dashscope" => Ok(Box::new(DashScopeBackend::new(config))),
        other => Err(AsrError::BackendNotFound(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_backend_simple() {
        let config = AsrConfig::default();
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.name(), "simple");
        assert!(!backend.supports_streaming());
    }

    #[test]
    fn test_create_backend_dashscope() {
        let config = AsrConfig {
            backend: "dashscope".to_string(),
            ..Default::default()
        };
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.name(), "dashscope");
        assert!(backend.supports_streaming());
    }

    #[test]
    fn test_create_backend_unknown_fails() {
        let config = AsrConfig {
            backend: "nope".to_string(),
            ..Default::default()
        };
        match create_backend(&config) {
            Err(AsrError::BackendNotFound(name)) => assert_eq!(name, "nope"),
            _ => panic!("expected BackendNotFound"),
        }
    }
}
