use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::workflows::approvals::domain::{Application, ApplicationId};
use crate::workflows::approvals::pipeline::StagePipeline;
use crate::workflows::approvals::service::ApprovalService;
use crate::workflows::approvals::store::{
    ApplicationStore, Notifier, NotifyError, StoreError, StoredApplication, TransitionEvent,
};
use crate::workflows::approvals::{approval_router, ApprovalError};

pub(super) fn fresh_application(id: &str) -> Application {
    Application::submitted(
        ApplicationId(id.to_string()),
        "applicant-001",
        Utc::now(),
        &StagePipeline::standard(),
    )
}

/// Chain of wire role names that clears the standard pipeline in order.
pub(super) const APPROVAL_CHAIN: [&str; 4] =
    ["block_admin", "district_admin", "state_admin", "super_admin"];

pub(super) fn build_service() -> (
    Arc<ApprovalService<MemoryStore, RecordingNotifier>>,
    Arc<MemoryStore>,
    Arc<RecordingNotifier>,
) {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = Arc::new(ApprovalService::new(store.clone(), notifier.clone()));
    (service, store, notifier)
}

pub(super) fn submit(
    service: &ApprovalService<MemoryStore, RecordingNotifier>,
) -> StoredApplication {
    service.submit("applicant-001").expect("submission stored")
}

/// Approve an application through the whole chain with the right role at
/// each step; returns the final stored record.
pub(super) fn approve_through_chain(
    service: &ApprovalService<MemoryStore, RecordingNotifier>,
    id: &ApplicationId,
) -> Result<StoredApplication, ApprovalError> {
    let mut stored = service.get(id)?;
    for role in APPROVAL_CHAIN {
        stored = service.approve(id, role)?;
    }
    Ok(stored)
}

pub(super) fn approval_router_with_service(
    service: Arc<ApprovalService<MemoryStore, RecordingNotifier>>,
) -> axum::Router {
    approval_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    records: Arc<Mutex<HashMap<ApplicationId, StoredApplication>>>,
}

impl ApplicationStore for MemoryStore {
    fn insert(&self, application: Application) -> Result<StoredApplication, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(StoreError::Conflict);
        }
        let stored = StoredApplication {
            application,
            version: 1,
        };
        guard.insert(stored.application.id.clone(), stored.clone());
        Ok(stored)
    }

    fn get(&self, id: &ApplicationId) -> Result<StoredApplication, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        guard.get(id).cloned().ok_or(StoreError::NotFound)
    }

    fn compare_and_swap(
        &self,
        id: &ApplicationId,
        expected: u64,
        application: Application,
    ) -> Result<StoredApplication, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let record = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if record.version != expected {
            return Err(StoreError::VersionConflict);
        }
        record.application = application;
        record.version += 1;
        Ok(record.clone())
    }

    fn list(&self) -> Result<Vec<StoredApplication>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        let mut records: Vec<_> = guard.values().cloned().collect();
        records.sort_by(|a, b| a.application.id.0.cmp(&b.application.id.0));
        Ok(records)
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingNotifier {
    events: Arc<Mutex<Vec<TransitionEvent>>>,
}

impl RecordingNotifier {
    pub(super) fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, event: TransitionEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn publish(&self, _event: TransitionEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("gateway offline".to_string()))
    }
}

pub(super) struct UnavailableStore;

impl ApplicationStore for UnavailableStore {
    fn insert(&self, _application: Application) -> Result<StoredApplication, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn get(&self, _id: &ApplicationId) -> Result<StoredApplication, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn compare_and_swap(
        &self,
        _id: &ApplicationId,
        _expected: u64,
        _application: Application,
    ) -> Result<StoredApplication, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<StoredApplication>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}
