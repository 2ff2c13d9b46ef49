use hashvault::config::LedgerConfig;
use hashvault::database::{LedgerStore, MemoryStore};
use hashvault::ledger::{verify_chain, LedgerService, Upload, Verdict};
use hashvault::LedgerError;
use std::collections::HashSet;
use std::sync::Arc;

mod common;
use common::fixtures::submit_files;
use common::*;

async fn submit_concurrently(ledger: Arc<LedgerService>, count: usize) -> Vec<String> {
    let mut handles = Vec::with_capacity(count);
    for i in 0..count {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .submit(Upload::new(
                    Some(&format!("concurrent_{}.txt", i)),
                    None,
                    format!("payload {}", i).into_bytes(),
                ))
                .await
        }));
    }

    let mut ids = Vec::with_capacity(count);
    for handle in handles {
        let record = handle.await.expect("task panicked").expect("submit failed");
        ids.push(record.submission_id);
    }
    ids
}

fn assert_gapless(anchors: &[hashvault::ledger::Anchor], expected: usize) {
    assert_eq!(anchors.len(), expected);
    for (i, anchor) in anchors.iter().enumerate() {
        assert_eq!(anchor.sequence_number, i as i64 + 1);
    }
    let report = verify_chain(anchors).expect("chain should verify");
    assert_eq!(report.length, expected);
}

#[tokio::test]
async fn test_hello_then_world() {
    let db = setup_test_db().await;
    let ledger = build_ledger(Arc::new(db));

    let a = ledger
        .submit(Upload::new(Some("a.txt"), Some("text/plain"), b"hello".to_vec()))
        .await
        .unwrap();
    assert_eq!(a.content_digest, HELLO_DIGEST);
    assert_eq!(a.anchor.sequence_number, 1);
    assert_eq!(a.anchor.prev_anchor_digest, None);

    let authentic = ledger.verify(&a.submission_id, b"hello").await.unwrap();
    assert_eq!(authentic.verdict, Verdict::Authentic);
    assert_eq!(authentic.computed_digest, HELLO_DIGEST);

    let tampered = ledger.verify(&a.submission_id, b"hellx").await.unwrap();
    assert_eq!(tampered.verdict, Verdict::Tampered);
    assert_eq!(tampered.stored_digest, HELLO_DIGEST);
    assert_ne!(tampered.computed_digest, HELLO_DIGEST);

    let b = ledger
        .submit(Upload::new(Some("b.txt"), Some("text/plain"), b"world".to_vec()))
        .await
        .unwrap();
    assert_eq!(b.anchor.sequence_number, 2);
    assert_eq!(
        b.anchor.prev_anchor_digest.as_deref(),
        Some(a.anchor.anchor_digest.as_str())
    );
    assert!(ledger.verify(&b.submission_id, b"world").await.unwrap().is_authentic());
}

#[tokio::test]
async fn test_sequential_submissions_link_up() {
    let db = setup_test_db().await;
    let ledger = build_ledger(Arc::new(db.clone()));

    let records = submit_files(&ledger, 5).await;
    for pair in records.windows(2) {
        assert_eq!(pair[1].anchor.sequence_number, pair[0].anchor.sequence_number + 1);
        assert_eq!(
            pair[1].anchor.prev_anchor_digest.as_deref(),
            Some(pair[0].anchor.anchor_digest.as_str())
        );
    }

    let report = ledger.audit_chain().await.unwrap();
    assert_eq!(report.length, 5);
    assert_eq!(
        report.head_digest.as_deref(),
        Some(records[4].anchor.anchor_digest.as_str())
    );
    assert_eq!(
        ledger.chain_head().await.unwrap().unwrap().anchor_digest,
        records[4].anchor.anchor_digest
    );
}

#[tokio::test]
async fn test_verify_unknown_submission() {
    let (ledger, _) = memory_ledger();
    let err = ledger.verify("HV-000000000000", b"hello").await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(id) if id == "HV-000000000000"));
}

#[tokio::test]
async fn test_empty_content_is_accepted() {
    let (ledger, _) = memory_ledger();
    let record = ledger
        .submit(Upload::new(Some("empty.txt"), None, Vec::new()))
        .await
        .unwrap();
    assert_eq!(
        record.content_digest,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(record.size, Some(0));
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let (ledger, _) = memory_ledger();
    let records = submit_files(&ledger, 3).await;

    let listed = ledger.list().await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].submission_id, records[2].submission_id);
    assert_eq!(listed[2].submission_id, records[0].submission_id);
}

#[tokio::test]
async fn test_concurrent_submissions_on_sqlite() {
    let (db, _dir) = setup_file_db().await;
    let ledger = Arc::new(build_ledger(Arc::new(db.clone())));

    let ids = submit_concurrently(ledger.clone(), 50).await;
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 50);

    let anchors = db.list_anchors().await.unwrap();
    assert_gapless(&anchors, 50);
    assert_eq!(ledger.list().await.unwrap().len(), 50);
}

#[tokio::test]
async fn test_concurrent_submissions_in_memory() {
    let (ledger, store) = memory_ledger();

    submit_concurrently(ledger, 50).await;

    let anchors = store.list_anchors().await.unwrap();
    assert_gapless(&anchors, 50);
}

#[tokio::test]
async fn test_two_instances_share_one_chain() {
    let (db, _dir) = setup_file_db().await;
    let config = LedgerConfig {
        append_max_attempts: 50,
        ..LedgerConfig::default()
    };
    let first = Arc::new(build_ledger_with(Arc::new(db.clone()), config.clone()));
    let second = Arc::new(build_ledger_with(Arc::new(db.clone()), config));

    let (a, b) = tokio::join!(
        submit_concurrently(first, 10),
        submit_concurrently(second, 10)
    );
    assert_eq!(a.len() + b.len(), 20);

    let anchors = db.list_anchors().await.unwrap();
    assert_gapless(&anchors, 20);
}

#[tokio::test]
async fn test_audit_detects_tampered_anchor() {
    let store = Arc::new(MemoryStore::new());
    let ledger = build_ledger(store.clone());
    submit_files(&ledger, 4).await;

    store
        .tamper_anchor(2, |anchor| anchor.content_digest = "0".repeat(64))
        .await
        .unwrap();

    let err = ledger.audit_chain().await.unwrap_err();
    assert!(matches!(err, LedgerError::Integrity { sequence_number: 2, .. }));
}

#[tokio::test]
async fn test_audit_detects_rehashed_forgery() {
    let store = Arc::new(MemoryStore::new());
    let ledger = build_ledger(store.clone());
    submit_files(&ledger, 4).await;

    // Recomputing the forged anchor's own digest still breaks its successor.
    store
        .tamper_anchor(2, |anchor| {
            anchor.content_digest = "0".repeat(64);
            anchor.anchor_digest = anchor.calculate_digest();
        })
        .await
        .unwrap();

    let err = ledger.audit_chain().await.unwrap_err();
    assert!(matches!(err, LedgerError::Integrity { sequence_number: 3, .. }));
}

#[tokio::test]
async fn test_rejected_uploads_leave_no_trace() {
    let store = Arc::new(MemoryStore::new());
    let config = LedgerConfig {
        max_upload_bytes: 8,
        ..LedgerConfig::default()
    };
    let ledger = build_ledger_with(store.clone(), config);

    let too_big = ledger
        .submit(Upload::new(Some("a.txt"), None, vec![0u8; 9]))
        .await
        .unwrap_err();
    assert!(matches!(too_big, LedgerError::PayloadTooLarge { size: 9, limit: 8 }));

    let wrong_type = ledger
        .submit(Upload::new(Some("script.sh"), None, b"ls".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(wrong_type, LedgerError::Validation(_)));

    assert!(store.is_empty().await);
    assert!(ledger.list().await.unwrap().is_empty());
}
