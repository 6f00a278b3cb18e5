mod common;

use std::sync::Arc;

use assert_matches::assert_matches;

use common::{panel, FakeBackend, INTRANET, SIMPLE};
use wfm_core::error::CoreError;
use wfm_core::titles::TitleError;
use wfm_panel::catalog::{CatalogOutcome, CatalogPhase};
use wfm_panel::error::PanelError;
use wfm_panel::notify::NotificationLevel;
use wfm_panel::Panel;

#[tokio::test]
async fn refresh_lists_workflows() {
    let backend = FakeBackend::seeded();
    let panel = Panel::new(Arc::clone(&backend));
    assert!(panel.catalog.list_status().await.is_idle());

    let workflows = panel.catalog.refresh().await.unwrap();
    assert_eq!(workflows.len(), 2);
    assert_eq!(panel.catalog.list_status().await.value(), Some(&2));
    assert!(panel.catalog.summary(INTRANET).await.is_some());
}

#[tokio::test]
async fn refresh_failure_fills_error_slot_and_notifies() {
    let backend = FakeBackend::seeded();
    let panel = Panel::new(Arc::clone(&backend));
    let mut toasts = panel.bus.subscribe();
    backend.fail_next("list_workflows", 500, "Database unavailable");

    assert_matches!(panel.catalog.refresh().await, Err(PanelError::Api(_)));
    assert_eq!(
        panel.catalog.list_status().await.error(),
        Some("Database unavailable")
    );
    let toast = toasts.recv().await.unwrap();
    assert_eq!(toast.level, NotificationLevel::Error);
    assert_eq!(toast.message, "Database unavailable");
}

#[tokio::test]
async fn create_clones_and_refreshes() {
    let (backend, panel) = panel().await;
    let mut toasts = panel.bus.subscribe();

    let id = panel.catalog.create(SIMPLE, "test-workflow-x").await.unwrap();

    assert_eq!(id, "test_workflow_x");
    assert_eq!(panel.catalog.phase().await, CatalogPhase::Idle);
    assert_eq!(
        panel.catalog.last_outcome().await,
        Some(CatalogOutcome::Created("test_workflow_x".into()))
    );
    let created = panel.catalog.summary("test_workflow_x").await.unwrap();
    assert_eq!(created.title, "test-workflow-x");
    assert_eq!(created.states.len(), 3);
    assert_eq!(backend.call_count("list_workflows"), 2);
    assert_eq!(toasts.recv().await.unwrap().level, NotificationLevel::Success);
}

#[tokio::test]
async fn create_without_clone_source_sends_nothing() {
    let (backend, panel) = panel().await;
    let mut toasts = panel.bus.subscribe();

    let err = panel.catalog.create("  ", "Editorial").await.unwrap_err();
    assert_matches!(err, PanelError::Core(CoreError::Validation(_)));
    assert!(err.is_pre_check());
    assert_eq!(backend.call_count("create_workflow"), 0);
    assert_eq!(panel.catalog.phase().await, CatalogPhase::Idle);
    assert_eq!(toasts.recv().await.unwrap().level, NotificationLevel::Warning);
}

#[tokio::test]
async fn create_rejects_unknown_source_and_bad_titles() {
    let (backend, panel) = panel().await;

    assert_matches!(
        panel.catalog.create("no_such_workflow", "Editorial").await,
        Err(PanelError::Core(CoreError::NotFound { entity: "workflow", .. }))
    );
    assert_matches!(
        panel.catalog.create(SIMPLE, "x").await,
        Err(PanelError::Title(TitleError::TooShort))
    );
    assert_matches!(
        panel.catalog.create(SIMPLE, "Intranet Workflow").await,
        Err(PanelError::Title(TitleError::Duplicate { .. }))
    );
    assert_eq!(backend.call_count("create_workflow"), 0);
}

#[tokio::test]
async fn create_rejects_duplicate_derived_id() {
    let (backend, panel) = panel().await;

    let err = panel.catalog.create(SIMPLE, "intranet-workflow").await.unwrap_err();
    assert_matches!(
        err,
        PanelError::Title(TitleError::Duplicate { existing_id, .. }) if existing_id == INTRANET
    );
    assert_eq!(backend.call_count("create_workflow"), 0);
}

#[tokio::test]
async fn backend_conflict_is_recorded_as_failed_create() {
    let (backend, panel) = panel().await;
    backend.fail_next("create_workflow", 409, "Workflow with id 'editorial' already exists.");

    let err = panel.catalog.create(SIMPLE, "editorial").await.unwrap_err();
    assert_eq!(err.to_string(), "Backend error (409): Workflow with id 'editorial' already exists.");
    assert_eq!(panel.catalog.phase().await, CatalogPhase::Idle);
    assert_matches!(
        panel.catalog.last_outcome().await,
        Some(CatalogOutcome::CreateFailed(msg)) if msg.contains("already exists")
    );
    // no refresh after a failure
    assert_eq!(backend.call_count("list_workflows"), 1);
}

#[tokio::test]
async fn rename_checks_siblings_then_patches_title() {
    let (backend, panel) = panel().await;

    assert_matches!(
        panel.catalog.rename(INTRANET, "Simple Publication Workflow").await,
        Err(PanelError::Title(TitleError::Duplicate { .. }))
    );
    // keeping its own title is not a collision
    panel.catalog.rename(INTRANET, "intranet workflow").await.unwrap();
    panel.catalog.rename(INTRANET, "Staff Intranet").await.unwrap();

    assert_eq!(backend.workflow(INTRANET).unwrap().title, "Staff Intranet");
    assert_eq!(panel.catalog.summary(INTRANET).await.unwrap().title, "Staff Intranet");
    assert_eq!(
        panel.catalog.last_outcome().await,
        Some(CatalogOutcome::Renamed(INTRANET.into()))
    );
}

#[tokio::test]
async fn rename_of_unknown_workflow_is_refused() {
    let (backend, panel) = panel().await;
    assert_matches!(
        panel.catalog.rename("ghost", "Ghost").await,
        Err(PanelError::Core(CoreError::NotFound { .. }))
    );
    assert_eq!(backend.call_count("update_workflow"), 0);
}

#[tokio::test]
async fn delete_removes_from_list() {
    let (backend, panel) = panel().await;

    panel.catalog.delete(INTRANET).await.unwrap();
    assert!(panel.catalog.summary(INTRANET).await.is_none());
    assert!(backend.workflow(INTRANET).is_none());
    assert_eq!(
        panel.catalog.last_outcome().await,
        Some(CatalogOutcome::Deleted(INTRANET.into()))
    );

    assert_matches!(panel.catalog.delete(INTRANET).await, Err(PanelError::Api(e)) if e.is_not_found());
    assert_matches!(panel.catalog.last_outcome().await, Some(CatalogOutcome::DeleteFailed(_)));
    assert_eq!(panel.catalog.phase().await, CatalogPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn concurrent_mutation_is_a_conflict() {
    let (backend, panel) = panel().await;
    backend.delay("create_workflow", SIMPLE, std::time::Duration::from_millis(50));

    let (created, deleted) = tokio::join!(
        panel.catalog.create(SIMPLE, "Editorial"),
        panel.catalog.delete(INTRANET),
    );

    assert!(created.is_ok());
    assert_matches!(deleted, Err(PanelError::Core(CoreError::Conflict(_))));
    assert!(backend.workflow(INTRANET).is_some());
}
