use crate::error::StateError;
use crate::key::{AttrKey, AttrKind};
use crate::store::AttributeStore;

fn test_key(customer: u64, kind: AttrKind) -> AttrKey {
    AttrKey::new(customer, kind)
}

/// Run the attribute store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_store_conformance_tests(store: &dyn AttributeStore) -> Result<(), StateError> {
    test_get_missing(store).await?;
    test_set_and_get(store).await?;
    test_overwrite(store).await?;
    test_delete(store).await?;
    test_scan_kind(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn AttributeStore) -> Result<(), StateError> {
    let key = test_key(1, AttrKind::Certificate);
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

async fn test_set_and_get(store: &dyn AttributeStore) -> Result<(), StateError> {
    let key = test_key(2, AttrKind::ExemptionType);
    store.set(&key, "wholesale").await?;
    let val = store.get(&key).await?;
    assert_eq!(val.as_deref(), Some("wholesale"));
    Ok(())
}

async fn test_overwrite(store: &dyn AttributeStore) -> Result<(), StateError> {
    let key = test_key(3, AttrKind::Expiration);
    store.set(&key, "100").await?;
    store.set(&key, "200").await?;
    let val = store.get(&key).await?;
    assert_eq!(val.as_deref(), Some("200"), "set should overwrite");
    Ok(())
}

async fn test_delete(store: &dyn AttributeStore) -> Result<(), StateError> {
    let key = test_key(4, AttrKind::AlertedExpiration);
    store.set(&key, "500").await?;
    let existed = store.delete(&key).await?;
    assert!(existed, "delete should return true for existing key");
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get after delete should return None");

    let existed = store.delete(&key).await?;
    assert!(!existed, "delete on missing key should return false");
    Ok(())
}

async fn test_scan_kind(store: &dyn AttributeStore) -> Result<(), StateError> {
    store
        .set(&test_key(10, AttrKind::ExemptionType), "government")
        .await?;
    store
        .set(&test_key(11, AttrKind::ExemptionType), "wholesale")
        .await?;
    store.set(&test_key(11, AttrKind::Expiration), "900").await?;

    let mut entries = store.scan_kind(AttrKind::ExemptionType).await?;
    entries.sort_by_key(|(customer, _)| *customer);
    let entries: Vec<(u64, String)> = entries
        .into_iter()
        .filter(|(customer, _)| customer.as_u64() >= 10)
        .map(|(customer, value)| (customer.as_u64(), value))
        .collect();
    assert_eq!(
        entries,
        vec![(10, "government".to_owned()), (11, "wholesale".to_owned())],
        "scan_kind should return only the requested kind"
    );
    Ok(())
}
