//! The ledger survives process restarts: state written through one handle is
//! visible through a fresh handle on the same file.

use chrono::{TimeZone, Utc};
use tp_core::{EntityType, FailureReason, Record, RunResult, SyncMode, Watermark};
use tp_ledger::Ledger;

#[tokio::test]
async fn state_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("ledger.db");
    let watermark = Watermark(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap());

    {
        let ledger = Ledger::open_file(&path).await.unwrap();
        ledger
            .advance_watermark(EntityType::Voucher, watermark)
            .await
            .unwrap();
        let mut result = RunResult::new(EntityType::Ledger, SyncMode::Full);
        result.attempted_count = 3;
        result.succeeded_count = 2;
        result.record_failure(
            Record::new().with("company", "Acme Traders"),
            FailureReason::MissingNaturalKey {
                fields: vec!["name".into()],
            },
        );
        ledger.record_run("run-a", &result).await.unwrap();
    }

    let reopened = Ledger::open_file(&path).await.unwrap();
    assert_eq!(
        reopened.watermark(EntityType::Voucher).await.unwrap(),
        Some(watermark)
    );
    assert_eq!(reopened.watermark(EntityType::Ledger).await.unwrap(), None);

    let latest = reopened.latest_results().await.unwrap();
    assert_eq!(latest.len(), 1);
    let failed = &latest[0].result.failed_records;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].reason.to_string(), "missing natural key: name");
    assert_eq!(
        failed[0].record.get("company").map(tp_core::Value::render),
        Some("Acme Traders".to_string())
    );
}
