use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use member_flow::workflows::approvals::{
    Application, ApplicationId, ApplicationStore, Notifier, NotifyError, StoreError,
    StoredApplication, TransitionEvent, Version,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local application store. The single mutex makes each
/// compare-and-swap an indivisible read-modify-write, which is all the
/// workflow engine requires of a backend.
#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationStore {
    records: Arc<Mutex<HashMap<ApplicationId, StoredApplication>>>,
}

impl ApplicationStore for InMemoryApplicationStore {
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
        expected: Version,
        application: Application,
    ) -> Result<StoredApplication, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let record = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if record.version != expected {
            return Err(StoreError::VersionConflict);
        }
        debug_assert!(
            application.verify().is_ok(),
            "refusing to persist an inconsistent stage list"
        );
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

/// Notification adapter that records events instead of delivering them;
/// real delivery channels live behind the same trait elsewhere.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifier {
    events: Arc<Mutex<Vec<TransitionEvent>>>,
}

impl Notifier for InMemoryNotifier {
    fn publish(&self, event: TransitionEvent) -> Result<(), NotifyError> {
        let mut guard = self.events.lock().expect("notifier mutex poisoned");
        guard.push(event);
        Ok(())
    }
}

impl InMemoryNotifier {
    pub(crate) fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}
