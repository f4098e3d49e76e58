mod common;

use std::sync::Arc;

use anyhow::{bail, Result};
use common::{sample_analysis, FakeModel, FlakyStore, STORAGE_KEY};
use signal_journal::clock::ManualClock;
use signal_journal::error::SignalError;
use signal_journal::journal::Journal;
use signal_journal::models::{DecisionStatus, InputDraft, InputType, NewDecision};
use signal_journal::session::DecisionSession;
use signal_journal::soft_delete::UNDO_WINDOW;
use signal_journal::storage::{BlobStore, FileBlobStore, MemoryBlobStore};

fn new_decision(title: &str) -> NewDecision {
    NewDecision {
        title: title.to_string(),
        context: String::new(),
        owner: "Ana".to_string(),
        deadline: "2026-11-30".to_string(),
    }
}

#[tokio::test]
async fn journal_survives_reopen_from_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store: Arc<dyn BlobStore> = Arc::new(FileBlobStore::new(dir.path()));
    let clock = Arc::new(ManualClock::new(5_000));

    let mut journal = Journal::open(store.clone(), STORAGE_KEY).await?;
    let first = journal.create(new_decision("Hire a second SRE?"), 5_000).await?;
    let second = journal.create(new_decision("Sunset v1 API?"), 6_000).await?;

    let mut session = DecisionSession::open(
        &journal,
        &first.id,
        Arc::new(FakeModel::default()),
        clock.clone(),
        UNDO_WINDOW,
    )?;
    session
        .add_input(
            &mut journal,
            InputDraft::new(InputType::Concern, "On-call fatigue", "Ben"),
        )
        .await?;
    session
        .record_analysis(&mut journal, sample_analysis("staffing"))
        .await?;
    session
        .set_status(&mut journal, DecisionStatus::Completed)
        .await?;

    assert!(dir.path().join(format!("{STORAGE_KEY}.json")).exists());

    let reopened = Journal::open(store, STORAGE_KEY).await?;
    let ids: Vec<&str> = reopened.decisions().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

    let restored = reopened.get(&first.id)?;
    assert_eq!(restored.status, DecisionStatus::Completed);
    assert_eq!(restored.inputs.len(), 1);
    assert_eq!(restored.inputs[0].input_type, InputType::Concern);
    assert_eq!(restored.last_analysis_update, Some(5_000));
    assert_eq!(reopened.active().count(), 1);
    Ok(())
}

#[tokio::test]
async fn earlier_snapshots_are_not_mutated() -> Result<()> {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::default());
    let mut journal = Journal::open(store, STORAGE_KEY).await?;
    let before = journal.create(new_decision("Raise prices?"), 1_000).await?;

    let after = journal
        .update(&before.id, |d| Ok(d.with_status(DecisionStatus::Completed)))
        .await?;

    assert_eq!(before.status, DecisionStatus::Active);
    assert_eq!(after.status, DecisionStatus::Completed);
    assert_eq!(journal.get(&before.id)?.status, DecisionStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn create_validates_required_fields() -> Result<()> {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::default());
    let mut journal = Journal::open(store, STORAGE_KEY).await?;

    let mut missing_owner = new_decision("Title");
    missing_owner.owner = "  ".to_string();
    let err = journal
        .create(missing_owner, 1)
        .await
        .expect_err("owner required");
    assert!(matches!(err, SignalError::Validation(_)));

    let mut bad_deadline = new_decision("Title");
    bad_deadline.deadline = "next friday".to_string();
    let err = journal
        .create(bad_deadline, 1)
        .await
        .expect_err("bad deadline");
    assert!(matches!(err, SignalError::Validation(_)));

    assert!(journal.decisions().is_empty());
    Ok(())
}

#[tokio::test]
async fn corrupt_blob_fails_to_open() -> Result<()> {
    let store = Arc::new(MemoryBlobStore::default());
    store
        .put_blob(STORAGE_KEY, b"{ not a list".to_vec())
        .await?;

    let err = match Journal::open(store, STORAGE_KEY).await {
        Ok(_) => bail!("corrupt blob should not open"),
        Err(err) => err,
    };
    assert!(matches!(err, SignalError::Storage(_)));
    Ok(())
}

#[tokio::test]
async fn failed_write_leaves_journal_unchanged() -> Result<()> {
    let store = Arc::new(FlakyStore::default());
    let mut journal = Journal::open(store.clone(), STORAGE_KEY).await?;
    let decision = journal.create(new_decision("Open an office?"), 1_000).await?;

    store.fail_writes(true);
    let err = journal
        .update(&decision.id, |d| Ok(d.with_status(DecisionStatus::Completed)))
        .await
        .expect_err("write fails");
    assert!(matches!(err, SignalError::Storage(_)));
    assert_eq!(journal.get(&decision.id)?.status, DecisionStatus::Active);

    store.fail_writes(false);
    let reopened = Journal::open(store, STORAGE_KEY).await?;
    assert_eq!(reopened.get(&decision.id)?.status, DecisionStatus::Active);
    Ok(())
}
