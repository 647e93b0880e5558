//! Integration tests for analyzer registration
//!
//! # Test Coverage
//! - Range, suffix wildcard, category and universal tag specs
//! - Literal validation against the known tag set
//! - Registration atomicity and duplicate names
//! - Unregistration keeping per-tag lists in place

use revm_soda::errors::RegistrationError;
use revm_soda::events::tags::{known_tags, CALLSTART, TXSTART};
use revm_soda::registry::{categories, expand_spec, Registry};

fn subs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(spec, handler)| (spec.to_string(), handler.to_string()))
        .collect()
}

#[test]
fn test_numbered_range() {
    assert_eq!(expand_spec("PUSH8-10").unwrap(), vec!["PUSH8", "PUSH9", "PUSH10"]);
    assert_eq!(expand_spec("PUSH-8-10").unwrap(), vec!["PUSH8", "PUSH9", "PUSH10"]);
    assert_eq!(expand_spec("SWAP3-2").unwrap(), vec!["SWAP2", "SWAP3"]);
}

#[test]
fn test_suffix_wildcard_is_bounded() {
    let push = expand_spec("PUSH*").unwrap();
    assert_eq!(push.first().map(String::as_str), Some("PUSH0"));
    assert_eq!(push.last().map(String::as_str), Some("PUSH29"));
    assert_eq!(push.len(), 30);
    assert!(!push.contains(&"PUSH30".to_string()));

    let log = expand_spec("LOG*").unwrap();
    assert_eq!(log, vec!["LOG0", "LOG1", "LOG2", "LOG3", "LOG4"]);
}

#[test]
fn test_category_and_universal() {
    assert_eq!(expand_spec("storage-ops").unwrap(), vec!["SLOAD", "SSTORE"]);
    assert_eq!(
        expand_spec("eth-ops").unwrap(),
        vec!["TRANS_CREATE", "TRANS_CALL", "TRANS_CALLCODE", "TRANS_SUICIDE"]
    );
    for category in categories::ALL {
        for tag in category.tags {
            assert!(known_tags().contains(tag), "{} lists unknown tag {}", category.token, tag);
        }
    }

    let all = expand_spec("*").unwrap();
    assert_eq!(all.len(), known_tags().len());
    assert!(all.contains(&TXSTART.to_string()));
    assert!(all.contains(&CALLSTART.to_string()));
    assert!(!all.contains(&"CALL".to_string()));
}

#[test]
fn test_literals() {
    assert_eq!(expand_spec("SSTORE").unwrap(), vec!["SSTORE"]);
    assert_eq!(expand_spec("EXTERNALINFOEND").unwrap(), vec!["EXTERNALINFOEND"]);
    assert_eq!(
        expand_spec("SSTOR"),
        Err(RegistrationError::UnknownTag("SSTOR".into()))
    );
}

#[test]
fn test_register_preserves_order() {
    let mut registry = Registry::new();
    registry
        .register("first", &subs(&[("SSTORE", "on_store")]))
        .unwrap();
    let tags = registry
        .register("second", &subs(&[("storage-ops", "on_storage"), ("SSTORE", "again")]))
        .unwrap();
    assert_eq!(tags, vec!["SLOAD", "SSTORE"]);

    let sstore = registry.subscribers("SSTORE");
    assert_eq!(sstore.len(), 3);
    assert_eq!(sstore[0].analyzer, "first");
    assert_eq!(sstore[1].handler, "on_storage");
    assert_eq!(sstore[2].handler, "again");
    assert_eq!(registry.analyzers(), ["first".to_string(), "second".to_string()]);
}

#[test]
fn test_register_is_atomic() {
    let mut registry = Registry::new();
    let err = registry
        .register("broken", &subs(&[("SLOAD", "a"), ("PUSH-x", "b")]))
        .unwrap_err();
    assert!(matches!(err, RegistrationError::MalformedTagSpec { .. }));
    assert!(!registry.is_registered("SLOAD"));
    assert!(!registry.contains("broken"));
}

#[test]
fn test_register_rejects_bad_descriptors() {
    let mut registry = Registry::new();
    registry.register("dup", &subs(&[("SLOAD", "a")])).unwrap();
    assert_eq!(
        registry.register("dup", &subs(&[("SSTORE", "a")])),
        Err(RegistrationError::DuplicateAnalyzer("dup".into()))
    );
    assert_eq!(
        registry.register("  ", &subs(&[("SSTORE", "a")])),
        Err(RegistrationError::EmptyName)
    );
    assert_eq!(
        registry.register("idle", &[]),
        Err(RegistrationError::NoSubscriptions("idle".into()))
    );
}

#[test]
fn test_unregister_keeps_empty_lists() {
    let mut registry = Registry::new();
    registry
        .register("watch", &subs(&[("LOG1-2", "on_log")]))
        .unwrap();
    assert_eq!(registry.tags_of("watch"), vec!["LOG1", "LOG2"]);

    assert_eq!(registry.unregister("watch"), Ok(2));
    assert!(!registry.is_registered("LOG1"));
    assert!(registry.has_entry("LOG1"));
    assert!(registry.subscribers("LOG2").is_empty());
    assert_eq!(
        registry.unregister("watch"),
        Err(RegistrationError::UnknownAnalyzer("watch".into()))
    );

    // the name is free again
    registry.register("watch", &subs(&[("LOG1", "on_log")])).unwrap();
    assert!(registry.is_registered("LOG1"));
}
