use linkshelf::types::errors::*;

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(
        StoreError::Io("disk full".to_string()).to_string(),
        "Store I/O error: disk full"
    );
    assert_eq!(
        StoreError::Serialization("bad json".to_string()).to_string(),
        "Store serialization error: bad json"
    );
    assert_eq!(
        StoreError::Lock("poisoned".to_string()).to_string(),
        "Store lock error: poisoned"
    );
    assert_eq!(StoreError::NotFound(42).to_string(), "Record not found: 42");
    assert_eq!(
        StoreError::InvalidInput("rating".to_string()).to_string(),
        "Invalid record input: rating"
    );
}

#[test]
fn store_error_user_message_hides_storage_details() {
    assert_eq!(StoreError::Io("EACCES /srv/data".to_string()).user_message(), "could not save");
    assert_eq!(StoreError::Serialization("x".to_string()).user_message(), "could not save");
    assert_eq!(StoreError::Lock("x".to_string()).user_message(), "could not save");
    assert_eq!(StoreError::NotFound(7).user_message(), "not found");
    assert_eq!(
        StoreError::InvalidInput("rating must be a number".to_string()).user_message(),
        "invalid input: rating must be a number"
    );
}

#[test]
fn store_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(StoreError::NotFound(1));
    assert!(err.source().is_none());
}

// === MirrorError Tests ===

#[test]
fn mirror_error_display_variants() {
    assert_eq!(
        MirrorError::Database("no such table".to_string()).to_string(),
        "Search mirror database error: no such table"
    );
    assert_eq!(
        MirrorError::Unavailable("locked".to_string()).to_string(),
        "Search mirror unavailable: locked"
    );
    assert_eq!(
        MirrorError::InvalidQuery("bad date".to_string()).to_string(),
        "Invalid search query: bad date"
    );
}

// === FetchError Tests ===

#[test]
fn fetch_error_display_variants() {
    assert_eq!(
        FetchError::Network("timeout".to_string()).to_string(),
        "Fetch network error: timeout"
    );
    assert_eq!(
        FetchError::Blocked("https://x.example".to_string()).to_string(),
        "Fetch blocked: https://x.example"
    );
    assert_eq!(FetchError::Parse("utf8".to_string()).to_string(), "Fetch parse error: utf8");
}

// === ConfigError Tests ===

#[test]
fn config_error_display_variants() {
    assert_eq!(ConfigError::Io("denied".to_string()).to_string(), "Config I/O error: denied");
    assert_eq!(ConfigError::Parse("eof".to_string()).to_string(), "Config parse error: eof");
    assert_eq!(
        ConfigError::InvalidValue("page_size".to_string()).to_string(),
        "Invalid config value: page_size"
    );
}

#[test]
fn all_errors_are_debug() {
    let errors: Vec<Box<dyn std::error::Error>> = vec![
        Box::new(StoreError::Io("x".to_string())),
        Box::new(MirrorError::Database("x".to_string())),
        Box::new(FetchError::Network("x".to_string())),
        Box::new(ConfigError::Parse("x".to_string())),
    ];
    for err in errors {
        assert!(!format!("{:?}", err).is_empty());
    }
}
