use chrono::NaiveDate;
use medidrive_autosave::{AutosaveStatus, FieldEdit, FormField, FormMode};
use medidrive_log::{
    AUTOSAVE_KEY, DraftFields, LOGS_KEY, LogFilter, MemoryStorage, MutationOutcome, ServiceType,
    StateStorage, StorageError,
};
use medidrive_ux::{AppConfig, LogsSession, SessionError, Severity, ToastState};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date")
}

fn open(storage: &Arc<MemoryStorage>) -> LogsSession {
    let storage: Arc<dyn StateStorage> = storage.clone();
    LogsSession::open(AppConfig::default(), storage)
        .expect("session should open")
        .with_today(fixed_today)
}

fn valid_fields(provider: &str, car: &str) -> DraftFields {
    let mut fields = DraftFields::defaults_for(fixed_today());
    fields.provider_id = provider.to_string();
    fields.service_order = "SO-1".to_string();
    fields.car_id = car.to_string();
    fields.odometer = 1200.0;
    fields.engine_hours = 35.5;
    fields.service_description = "Oil change".to_string();
    fields
}

fn toast(message: &str, severity: Severity) -> ToastState {
    ToastState {
        open: true,
        message: message.to_string(),
        severity,
    }
}

async fn advance_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

/// Storage whose writes always fail.
#[derive(Default)]
struct ReadOnlyStorage {
    save_attempts: AtomicUsize,
}

impl StateStorage for ReadOnlyStorage {
    fn load(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn save(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Io("read-only".to_string()))
    }
}

fn temp_dir(prefix: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "medidrive-session-{prefix}-{}-{unique}",
        std::process::id()
    ))
}

#[tokio::test]
async fn draft_is_created_listed_and_persisted() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);

    let record = session
        .create_draft(valid_fields("P1", "C1"))
        .expect("valid draft");
    assert!(record.draft);
    assert_eq!(session.toast(), &toast("Draft created", Severity::Info));

    let drafts = session.drafts(&LogFilter::new());
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, record.id);
    assert!(session.confirmed_logs(&LogFilter::new()).is_empty());

    drop(session);
    let reopened = open(&storage);
    assert_eq!(reopened.store().len(), 1);
    assert_eq!(
        reopened.store().get(&record.id).map(|r| r.fields.car_id.as_str()),
        Some("C1")
    );
}

#[tokio::test]
async fn invalid_submit_leaves_store_and_toast_untouched() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);

    let mut fields = valid_fields("", "C1");
    fields.odometer = -1.0;
    let err = session.submit(fields).expect_err("blank provider must fail");
    let SessionError::Validation(report) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(report.has_error("providerId"));
    assert!(report.has_error("odometer"));
    assert!(session.store().is_empty());
    assert_eq!(session.toast(), &ToastState::default());
    assert!(
        storage
            .load(LOGS_KEY)
            .expect("load should succeed")
            .is_none()
    );
}

#[tokio::test]
async fn confirming_a_draft_moves_it_to_confirmed_logs() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);
    let draft = session
        .create_draft(valid_fields("P1", "C1"))
        .expect("valid draft");

    assert_eq!(session.confirm_draft(&draft.id), MutationOutcome::Applied);
    assert_eq!(session.toast(), &toast("Draft confirmed", Severity::Success));
    assert!(session.drafts(&LogFilter::new()).is_empty());

    let confirmed = session.confirmed_logs(&LogFilter::new());
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].id, draft.id);
    assert_eq!(confirmed[0].fields.provider_id, "P1");
    assert_eq!(confirmed[0].created_at, draft.created_at);
}

#[tokio::test]
async fn missing_ids_change_nothing_and_show_nothing() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);
    session
        .submit(valid_fields("P1", "C1"))
        .expect("valid submit");
    session.hide_toast();
    let before = session.toast().clone();

    assert_eq!(session.confirm_draft("nope"), MutationOutcome::Missing);
    assert_eq!(session.delete_log("nope"), MutationOutcome::Missing);
    let outcome = session
        .save_edit("nope", valid_fields("P2", "C2"), false)
        .expect("valid fields");
    assert_eq!(outcome, MutationOutcome::Missing);

    assert_eq!(session.toast(), &before);
    assert_eq!(session.store().len(), 1);
}

#[tokio::test]
async fn save_edit_updates_in_place() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);
    let record = session
        .submit(valid_fields("P1", "C1"))
        .expect("valid submit");

    let mut changed = record.fields.clone();
    changed.service_type = ServiceType::Emergency;
    changed.service_description = "Brake failure".to_string();
    let outcome = session
        .save_edit(&record.id, changed, false)
        .expect("valid edit");
    assert!(outcome.applied());
    assert_eq!(session.toast(), &toast("Service log updated", Severity::Success));

    let stored = session.store().get(&record.id).expect("record kept");
    assert_eq!(stored.fields.service_type, ServiceType::Emergency);
    assert_eq!(stored.created_at, record.created_at);
    assert!(stored.updated_at >= record.updated_at);
}

#[tokio::test]
async fn delete_and_remove_all_drafts_show_warnings() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);
    let kept = session
        .submit(valid_fields("P1", "C1"))
        .expect("valid submit");
    session
        .create_draft(valid_fields("P2", "C2"))
        .expect("valid draft");
    let doomed = session
        .create_draft(valid_fields("P3", "C3"))
        .expect("valid draft");

    assert!(session.delete_log(&doomed.id).applied());
    assert_eq!(session.toast(), &toast("Service log deleted", Severity::Warning));

    assert_eq!(session.remove_all_drafts(), 1);
    assert_eq!(session.toast(), &toast("All drafts removed", Severity::Warning));
    assert_eq!(session.store().len(), 1);
    assert!(session.store().get(&kept.id).is_some());

    session.hide_toast();
    assert_eq!(session.remove_all_drafts(), 0);
    assert!(session.toast().open);
}

#[tokio::test]
async fn views_apply_search_and_type_filters() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);
    session
        .submit(valid_fields("Acme Motors", "C1"))
        .expect("valid submit");
    let mut emergency = valid_fields("Roadside", "TRUCK-9");
    emergency.service_type = ServiceType::Emergency;
    session.submit(emergency).expect("valid submit");

    let by_query = session.confirmed_logs(&LogFilter::new().with_query("truck"));
    assert_eq!(by_query.len(), 1);
    assert_eq!(by_query[0].fields.provider_id, "Roadside");

    let by_type = session.confirmed_logs(&LogFilter::new().with_types([ServiceType::Planned]));
    assert_eq!(by_type.len(), 1);
    assert_eq!(by_type[0].fields.provider_id, "Acme Motors");

    let after = fixed_today().succ_opt().expect("valid date");
    assert!(
        session
            .confirmed_logs(&LogFilter::new().with_date_from(after))
            .is_empty()
    );
}

#[tokio::test(start_paused = true)]
async fn autosave_commits_persists_and_restores() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);
    let mut status = session.subscribe_autosave();

    let mut form = session.create_form();
    assert_eq!(form.mode(), FormMode::Create);
    form.set_field(FieldEdit::ProviderId("P1".to_string()));
    assert!(session.form_edited(&form));
    assert_eq!(session.autosave_status(), AutosaveStatus::Saving);

    advance_ms(300).await;
    form.set_field(FieldEdit::StartDate("2025-04-01".to_string()));
    session.form_edited(&form);
    assert_eq!(form.values().end_date, "2025-04-02");
    assert!(!form.is_field_dirty(FormField::EndDate));

    advance_ms(799).await;
    assert_eq!(session.autosave_slot(), None);
    advance_ms(1).await;

    let slot = session.autosave_slot().expect("slot committed");
    assert_eq!(slot.provider_id.as_deref(), Some("P1"));
    assert_eq!(slot.end_date.as_deref(), Some("2025-04-02"));
    assert_eq!(*status.borrow_and_update(), AutosaveStatus::Saved);
    assert!(
        storage
            .load(AUTOSAVE_KEY)
            .expect("load should succeed")
            .is_some_and(|raw| raw.contains("\"providerId\":\"P1\""))
    );

    session.close();
    drop(session);

    let mut reopened = open(&storage);
    let restored = reopened.create_form();
    assert_eq!(restored.values().provider_id, "P1");
    assert_eq!(restored.values().start_date, "2025-04-01");
    assert!(!restored.is_dirty());

    let mut complete = valid_fields("P1", "C1");
    complete.start_date = "2025-04-01".to_string();
    complete.end_date = "2025-04-02".to_string();
    reopened.submit(complete).expect("valid submit");
    assert_eq!(reopened.autosave_slot(), None);
    assert_eq!(reopened.autosave_status(), AutosaveStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn clear_form_discards_pending_autosave() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);

    let mut form = session.create_form();
    form.set_field(FieldEdit::CarId("C9".to_string()));
    session.form_edited(&form);
    advance_ms(400).await;

    session.clear_form(&mut form);
    assert!(!form.is_dirty());
    assert_eq!(form.values().car_id, "");

    advance_ms(2_000).await;
    assert_eq!(session.autosave_slot(), None);
    assert_eq!(session.autosave_status(), AutosaveStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn undoing_an_edit_drops_the_pending_autosave() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);

    let mut form = session.create_form();
    form.set_field(FieldEdit::CarId("C1".to_string()));
    assert!(session.form_edited(&form));
    advance_ms(100).await;
    form.set_field(FieldEdit::CarId(String::new()));
    assert!(!session.form_edited(&form));

    advance_ms(2_000).await;
    assert_eq!(session.autosave_slot(), None);
    assert_eq!(session.autosave_status(), AutosaveStatus::Idle);
    assert!(
        storage
            .load(AUTOSAVE_KEY)
            .expect("load should succeed")
            .is_none()
    );
}

#[tokio::test(start_paused = true)]
async fn edit_forms_do_not_autosave() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);
    let record = session
        .submit(valid_fields("P1", "C1"))
        .expect("valid submit");

    let mut form = session.edit_form(&record.id).expect("record exists");
    assert_eq!(form.mode(), FormMode::Edit);
    form.set_field(FieldEdit::CarId("C2".to_string()));
    assert!(!session.form_edited(&form));

    advance_ms(2_000).await;
    assert_eq!(session.autosave_slot(), None);
    assert!(session.edit_form("missing").is_none());
}

#[tokio::test(start_paused = true)]
async fn close_cancels_pending_autosave() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage);

    let mut form = session.create_form();
    form.set_field(FieldEdit::ProviderId("P1".to_string()));
    session.form_edited(&form);
    session.close();

    advance_ms(2_000).await;
    assert_eq!(session.autosave_slot(), None);
    assert!(!session.form_edited(&form));
}

#[tokio::test]
async fn corrupt_state_opens_empty_and_in_memory() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .save(LOGS_KEY, "{not json")
        .expect("memory save should succeed");

    let mut session = open(&storage);
    assert!(session.store().is_empty());
    assert!(!session.is_persistent());

    session
        .submit(valid_fields("P1", "C1"))
        .expect("valid submit");
    assert_eq!(session.store().len(), 1);
    assert_eq!(
        storage.load(LOGS_KEY).expect("load should succeed").as_deref(),
        Some("{not json")
    );
}

#[tokio::test]
async fn failing_writes_degrade_once() {
    let storage = Arc::new(ReadOnlyStorage::default());
    let backend: Arc<dyn StateStorage> = storage.clone();
    let mut session = LogsSession::open(AppConfig::default(), backend)
        .expect("session should open")
        .with_today(fixed_today);
    assert!(session.is_persistent());

    session
        .submit(valid_fields("P1", "C1"))
        .expect("store accepts despite storage failure");
    assert!(!session.is_persistent());
    let attempts = storage.save_attempts.load(Ordering::SeqCst);

    session
        .create_draft(valid_fields("P2", "C2"))
        .expect("valid draft");
    session.remove_all_drafts();
    assert_eq!(storage.save_attempts.load(Ordering::SeqCst), attempts);
    assert_eq!(session.store().len(), 1);
}

#[tokio::test]
async fn file_backed_session_round_trips() {
    let dir = temp_dir("roundtrip");
    let config = AppConfig::from_toml_str(&format!(
        "[storage]\ndata_dir = {:?}\n",
        dir.display().to_string()
    ))
    .expect("config should parse");

    let mut session = LogsSession::from_config(config.clone()).expect("session should open");
    let record = session
        .create_draft(valid_fields("P1", "C1"))
        .expect("valid draft");
    session.close();
    drop(session);

    let reopened = LogsSession::from_config(config).expect("session should reopen");
    assert!(reopened.is_persistent());
    let drafts = reopened.drafts(&LogFilter::new());
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, record.id);

    let raw = std::fs::read_to_string(dir.join("logs.json")).expect("logs file written");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("logs file is json");
    assert_eq!(value["version"], 1);
    assert_eq!(value["logs"][0]["type"], "planned");

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn logging_init_is_repeatable() {
    let config = AppConfig::default();
    medidrive_ux::logging::init("medidrive-test", &config.logging);
    medidrive_ux::logging::init("medidrive-test", &config.logging);
}
