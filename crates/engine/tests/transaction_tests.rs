//! Store Transaction Integration Tests
//!
//! Validates the transaction lifecycle:
//! - Closure API and atomic delivery
//! - Rollback on error
//! - Re-entrancy rejection
//! - Serialization of concurrent transactions

use bindstore_core::{PatchOp, Scope, StorageDescriptor, StoreError, Value};
use bindstore_engine::{Store, StoreConfig};
use bindstore_storage::MemoryBackend;
use std::sync::Arc;
use std::thread;

fn memory_store() -> (Store, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let store = Store::with_backend(
        Scope::App,
        StorageDescriptor::Memory,
        backend.clone(),
        &StoreConfig::default(),
    )
    .unwrap();
    (store, backend)
}

fn json(text: &str) -> Value {
    text.parse().unwrap()
}

// ============================================================================
// Atomic Delivery
// ============================================================================

#[test]
fn test_transaction_emits_single_change() {
    let (store, _) = memory_store();
    let feed = store.changes().unwrap();
    let user = store.subscribe("user").unwrap();
    assert_eq!(user.try_recv(), Some(None));

    store
        .transaction(|txn| {
            txn.set("user.name", "Alice")?;
            txn.set("user.age", 30)?;
            txn.merge("user", json(r#"{"role": "admin"}"#))?;
            Ok(())
        })
        .unwrap();

    let change = feed.try_recv().unwrap();
    assert_eq!(change.len(), 3);
    assert!(change.transaction_id.is_some());
    assert_eq!(change.patches[2].op, PatchOp::Merge);
    assert!(feed.try_recv().is_none());

    // One notification for the whole batch
    assert_eq!(
        user.drain(),
        vec![Some(json(r#"{"name": "Alice", "age": 30, "role": "admin"}"#))]
    );
}

#[test]
fn test_transaction_ids_are_fresh() {
    let (store, _) = memory_store();
    let feed = store.changes().unwrap();
    for i in 0..3 {
        store.transaction(|txn| txn.set("n", i)).unwrap();
    }
    let ids: Vec<_> = feed.drain().iter().map(|c| c.transaction_id.unwrap()).collect();
    assert_eq!(ids.len(), 3);
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
}

#[test]
fn test_transaction_sees_own_writes() {
    let (store, _) = memory_store();
    store.set("counter", 1).unwrap();
    let seen = store
        .transaction(|txn| {
            let n = txn.get_as::<i64, _>("counter")?.unwrap_or(0);
            txn.set("counter", n + 1)?;
            txn.get("counter")
        })
        .unwrap();
    assert_eq!(seen, Some(Value::Int(2)));
    assert_eq!(store.get("counter").unwrap(), Some(Value::Int(2)));
}

#[test]
fn test_empty_transaction_emits_nothing() {
    let (store, backend) = memory_store();
    let feed = store.changes().unwrap();
    let out = store
        .transaction(|txn| {
            txn.remove("missing")?;
            Ok(txn.snapshot())
        })
        .unwrap();
    assert_eq!(out, Value::object());
    assert!(feed.try_recv().is_none());
    store.flush().unwrap();
    assert_eq!(backend.save_count(), 0);
}

#[test]
fn test_transaction_saves_once() {
    let (store, backend) = memory_store();
    store
        .transaction(|txn| {
            for i in 0..10 {
                txn.set(format!("items[{}]", i), i)?;
            }
            Ok(())
        })
        .unwrap();
    store.flush().unwrap();
    assert_eq!(backend.save_count(), 1);
    assert_eq!(backend.saved().unwrap()["items"][9], Value::Int(9));
}

// ============================================================================
// Rollback
// ============================================================================

#[test]
fn test_error_rolls_back() {
    let (store, backend) = memory_store();
    store.set("balance", 100).unwrap();
    store.flush().unwrap();
    let feed = store.changes().unwrap();

    let result: Result<(), StoreError> = store.transaction(|txn| {
        txn.set("balance", 50)?;
        txn.set("audit.last", "withdraw")?;
        Err(StoreError::invalid_value("insufficient funds"))
    });

    assert!(result.unwrap_err().is_invalid_value());
    assert_eq!(store.snapshot().unwrap(), json(r#"{"balance": 100}"#));
    assert!(feed.try_recv().is_none());
    store.flush().unwrap();
    assert_eq!(backend.save_count(), 1);
}

#[test]
fn test_failed_operation_inside_body_rolls_back() {
    let (store, _) = memory_store();
    let result = store.transaction(|txn| {
        txn.set("a", 1)?;
        txn.set("b..c", 2)?;
        Ok(())
    });
    assert!(result.unwrap_err().is_invalid_value());
    assert_eq!(store.get("a").unwrap(), None);
}

#[test]
fn test_panic_rolls_back_and_releases() {
    let (store, _) = memory_store();
    let store = Arc::new(store);
    store.set("safe", true).unwrap();

    let s = Arc::clone(&store);
    let joined = thread::spawn(move || {
        let _ = s.transaction(|txn| -> Result<(), StoreError> {
            txn.set("safe", false)?;
            panic!("body exploded");
        });
    })
    .join();
    assert!(joined.is_err());

    assert_eq!(store.get("safe").unwrap(), Some(Value::Bool(true)));
    store.set("after", 1).unwrap();
}

// ============================================================================
// Re-entrancy
// ============================================================================

#[test]
fn test_nested_calls_rejected() {
    let (store, _) = memory_store();
    let result = store.transaction(|txn| {
        txn.set("x", 1)?;
        let nested = store.transaction(|inner| inner.set("y", 2));
        assert!(matches!(nested, Err(StoreError::NestedTransaction)));
        assert!(matches!(store.get("x"), Err(StoreError::NestedTransaction)));
        assert!(matches!(store.set("z", 3), Err(StoreError::NestedTransaction)));
        assert!(matches!(store.subscribe("x"), Err(StoreError::NestedTransaction)));
        Ok(())
    });
    assert!(result.is_ok());
    assert_eq!(store.get("x").unwrap(), Some(Value::Int(1)));
    assert_eq!(store.get("y").unwrap(), None);
}

#[test]
fn test_nested_error_propagates_as_rollback() {
    let (store, _) = memory_store();
    let result = store.transaction(|txn| {
        txn.set("x", 1)?;
        store.set("y", 2)?;
        Ok(())
    });
    assert!(matches!(result, Err(StoreError::NestedTransaction)));
    assert_eq!(store.snapshot().unwrap(), Value::object());
}

#[test]
fn test_dropping_subscription_inside_body() {
    let (store, _) = memory_store();
    let sub = store.subscribe("a").unwrap();
    store
        .transaction(|txn| {
            drop(sub);
            txn.set("a", 1)
        })
        .unwrap();
    // The orphaned entry was pruned on delivery
    assert_eq!(store.subscriber_count().unwrap(), 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_transactions_serialize() {
    let (store, _) = memory_store();
    let store = Arc::new(store);
    store.set("counter", 0).unwrap();
    let feed = store.changes().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let s = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    s.transaction(|txn| {
                        let n = txn.get_as::<i64, _>("counter")?.unwrap_or(0);
                        txn.set("counter", n + 1)
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.get_as::<i64, _>("counter").unwrap(), Some(400));

    let changes = feed.drain();
    assert_eq!(changes.len(), 400);
    for pair in changes.windows(2) {
        assert!(pair[0].sequence < pair[1].sequence);
    }
}

#[test]
fn test_concurrent_writers_distinct_paths() {
    let (store, _) = memory_store();
    let store = Arc::new(store);
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let s = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    s.set(format!("t{}.v{}", t, i), i).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let snapshot = store.snapshot().unwrap();
    for t in 0..4 {
        assert_eq!(snapshot[format!("t{}", t).as_str()].as_object().unwrap().len(), 25);
    }
}
