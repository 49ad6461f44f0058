//! Process-wide job registry
//!
//! Maps job name to the locally attached scheduler controller and to the
//! server name the store assigned to this worker. One registry instance is
//! created per process and injected wherever the lookup is needed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

/// Control surface of the local scheduler for one job
pub trait SchedulerControl: Send + Sync {
    /// Stop firing until resumed
    fn pause(&self);
    /// Resume firing
    fn resume(&self);
    /// Fire once immediately
    fn trigger_now(&self);
    /// Stop the scheduler permanently
    fn shutdown(&self);
}

/// Registry of live jobs in this process
#[derive(Default)]
pub struct JobRegistry {
    controllers: Mutex<HashMap<String, Arc<dyn SchedulerControl>>>,
    server_names: Mutex<HashMap<String, String>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a scheduler controller for a job; inserted on job start
    pub fn register_controller(&self, job_name: &str, controller: Arc<dyn SchedulerControl>) {
        self.controllers
            .lock()
            .insert(job_name.to_string(), controller);
        info!("Scheduler controller attached for job '{}'", job_name);
    }

    /// Look up the controller for a job, if one is attached
    pub fn controller(&self, job_name: &str) -> Option<Arc<dyn SchedulerControl>> {
        self.controllers.lock().get(job_name).cloned()
    }

    /// Detach the controller; removed on job shutdown
    pub fn remove_controller(&self, job_name: &str) {
        self.controllers.lock().remove(job_name);
        info!("Scheduler controller detached for job '{}'", job_name);
    }

    /// Record the store-assigned server name for a job
    pub fn set_server_name(&self, job_name: &str, server_name: &str) {
        self.server_names
            .lock()
            .insert(job_name.to_string(), server_name.to_string());
    }

    /// The server name this worker registered under, if any
    pub fn server_name(&self, job_name: &str) -> Option<String> {
        self.server_names.lock().get(job_name).cloned()
    }

    /// Forget the server name; part of deregistration
    pub fn remove_server_name(&self, job_name: &str) {
        self.server_names.lock().remove(job_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingControl {
        pauses: AtomicUsize,
    }

    impl SchedulerControl for CountingControl {
        fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }
        fn resume(&self) {}
        fn trigger_now(&self) {}
        fn shutdown(&self) {}
    }

    #[test]
    fn test_controller_lifecycle() {
        let registry = JobRegistry::new();
        assert!(registry.controller("job-a").is_none());

        let control = Arc::new(CountingControl {
            pauses: AtomicUsize::new(0),
        });
        registry.register_controller("job-a", control.clone());
        registry.controller("job-a").unwrap().pause();
        assert_eq!(control.pauses.load(Ordering::SeqCst), 1);

        registry.remove_controller("job-a");
        assert!(registry.controller("job-a").is_none());
    }

    #[test]
    fn test_server_name_tracking() {
        let registry = JobRegistry::new();
        registry.set_server_name("job-a", "10.0.0.1_0000000000");
        assert_eq!(
            registry.server_name("job-a").as_deref(),
            Some("10.0.0.1_0000000000")
        );
        registry.remove_server_name("job-a");
        assert!(registry.server_name("job-a").is_none());
    }
}
