use super::*;

#[test]
fn default_key_matches_core() {
    assert_eq!(LocalStorageTokenStore::default().key(), "token");
}

#[cfg(not(feature = "hydrate"))]
#[test]
fn server_side_slot_is_empty_and_read_only() {
    let store = LocalStorageTokenStore::default();
    assert!(store.load().unwrap().is_none());
    assert!(matches!(store.save("jwt"), Err(TokenStoreError::Unavailable(_))));
    assert!(store.remove().is_ok());
}

#[cfg(not(feature = "hydrate"))]
#[test]
fn holder_over_server_side_slot_reports_absent() {
    let holder = notex::TokenHolder::new(LocalStorageTokenStore::default());
    assert!(holder.set("jwt").is_err());
    assert!(!holder.is_present());
}
