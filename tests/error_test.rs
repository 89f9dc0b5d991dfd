use huginn::{HuginnError, Result};

#[test]
fn resolution_errors_name_the_provider() {
    let err = HuginnError::ProviderUnavailable("ollama".to_string());
    assert_eq!(err.to_string(), "provider 'ollama' is not available");

    let err = HuginnError::EmptyResponse("lmstudio".to_string());
    assert!(err.to_string().contains("lmstudio"));

    let err = HuginnError::UnknownProvider("gpt".to_string());
    assert!(err.to_string().contains("gpt"));
}

#[test]
fn no_provider_available_display() {
    let err = HuginnError::NoProviderAvailable;
    assert!(err.to_string().contains("no provider available"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(HuginnError::NoProviderAvailable)
    }
    assert!(returns_error().is_err());
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn provider_errors() {
    assert!(HuginnError::Http("reset".into()).is_provider_error());
    assert!(HuginnError::AuthenticationFailed.is_provider_error());
    assert!(HuginnError::Stream("eof".into()).is_provider_error());
    assert!(HuginnError::Llm("x".into()).is_provider_error());
    assert!(
        HuginnError::Api {
            status: 500,
            message: "x".into()
        }
        .is_provider_error()
    );
}

#[test]
fn non_provider_errors() {
    assert!(!HuginnError::NoProviderAvailable.is_provider_error());
    assert!(!HuginnError::ProviderUnavailable("a".into()).is_provider_error());
    assert!(!HuginnError::EmptyResponse("a".into()).is_provider_error());
    assert!(!HuginnError::Cache("locked".into()).is_provider_error());
    assert!(!HuginnError::Configuration("bad".into()).is_provider_error());
}

// ============================================================================
// Conversions
// ============================================================================

#[test]
fn from_serde_json() {
    let err: HuginnError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
    assert!(matches!(err, HuginnError::Json(_)));
}

#[test]
fn from_io() {
    let err: HuginnError = std::io::Error::other("broken pipe").into();
    assert!(matches!(err, HuginnError::Io(_)));
    assert!(err.to_string().contains("broken pipe"));
}

#[test]
fn from_rusqlite_is_cache_error() {
    let err: HuginnError = rusqlite::Error::InvalidQuery.into();
    assert!(matches!(err, HuginnError::Cache(_)));
}
