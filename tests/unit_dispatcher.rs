//! Unit tests for the coordination event dispatcher
//!
//! Covers connection loss/repair, mark-driven scheduler commands, and the
//! scoping of node events to this worker's own record.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shardcoord_core::config::JobCoordinationConfig;
use shardcoord_core::dispatch::{
    ConnectionStateHandler, CoordinationEventDispatcher, NodeChangeHandler,
};
use shardcoord_core::registry::{JobRegistry, SchedulerControl};
use shardcoord_core::server::{ServerDirectory, ServerRecord};
use shardcoord_core::sharding::ExecutionTracker;
use shardcoord_core::store::{
    ConnectionState, CoordinationStore, MemoryStore, NodeEvent, NodeEventKind,
};

#[derive(Default)]
struct RecordingControl {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingControl {
    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }
}

impl SchedulerControl for RecordingControl {
    fn pause(&self) {
        self.calls.lock().push("pause");
    }
    fn resume(&self) {
        self.calls.lock().push("resume");
    }
    fn trigger_now(&self) {
        self.calls.lock().push("trigger");
    }
    fn shutdown(&self) {
        self.calls.lock().push("shutdown");
    }
}

#[derive(Default)]
struct RecordingTracker {
    cleared: Mutex<Vec<Vec<u32>>>,
}

#[async_trait]
impl ExecutionTracker for RecordingTracker {
    async fn has_running_items(&self) -> bool {
        false
    }

    async fn clear_running_marks(&self, items: &[u32]) {
        self.cleared.lock().push(items.to_vec());
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    registry: Arc<JobRegistry>,
    directory: Arc<ServerDirectory>,
    control: Arc<RecordingControl>,
    tracker: Arc<RecordingTracker>,
    connection: ConnectionStateHandler,
    node_change: NodeChangeHandler,
}

fn config() -> JobCoordinationConfig {
    JobCoordinationConfig {
        job_name: "test-job".into(),
        total_shards: 4,
        ..JobCoordinationConfig::default()
    }
}

async fn fixture() -> Fixture {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(JobRegistry::new());
    let directory = Arc::new(ServerDirectory::new(
        store.clone() as Arc<dyn CoordinationStore>,
        registry.clone(),
        "test-job",
        "host-a",
        "10.0.0.1",
    ));
    directory.register(true).await.unwrap();

    let control = Arc::new(RecordingControl::default());
    registry.register_controller("test-job", control.clone());
    let tracker = Arc::new(RecordingTracker::default());

    let connection = ConnectionStateHandler::new(
        config(),
        directory.clone(),
        tracker.clone(),
        registry.clone(),
    );
    let node_change = NodeChangeHandler::new(config(), directory.clone(), registry.clone());
    Fixture {
        store,
        registry,
        directory,
        control,
        tracker,
        connection,
        node_change,
    }
}

fn updated(path: &str) -> NodeEvent {
    NodeEvent {
        kind: NodeEventKind::Updated,
        path: path.to_string(),
        data: String::new(),
    }
}

async fn mutate_local(f: &Fixture, mutate: impl FnOnce(&mut ServerRecord)) -> String {
    let name = f.registry.server_name("test-job").unwrap();
    let mut record = f.directory.load(&name).await.unwrap().unwrap();
    mutate(&mut record);
    f.directory.save(&name, &record).await.unwrap();
    format!("servers/{}", name)
}

#[tokio::test]
async fn test_connection_lost_pauses_scheduler() {
    let f = fixture().await;
    f.connection.handle(ConnectionState::Lost).await.unwrap();
    assert_eq!(f.control.calls(), vec!["pause"]);
}

#[tokio::test]
async fn test_suspended_and_connected_are_noops() {
    let f = fixture().await;
    f.connection.handle(ConnectionState::Connected).await.unwrap();
    f.connection.handle(ConnectionState::Suspended).await.unwrap();
    assert!(f.control.calls().is_empty());
}

#[tokio::test]
async fn test_reconnect_repairs_and_resumes() {
    let f = fixture().await;
    mutate_local(&f, |record| record.set_sharding(Some(&[1, 3]))).await;

    // Session expiry pruned the ephemeral record while we were gone.
    f.store.expire_session();
    f.connection
        .handle(ConnectionState::Reconnected)
        .await
        .unwrap();

    let name = f.registry.server_name("test-job").unwrap();
    assert!(
        f.directory.load(&name).await.unwrap().is_some(),
        "record recreated on reconnect"
    );
    assert_eq!(f.control.calls(), vec!["resume"]);
    // The recreated record carries no assignment, so the stale running
    // markers cleared are exactly the currently-known (empty) set.
    assert_eq!(*f.tracker.cleared.lock(), vec![Vec::<u32>::new()]);
}

#[tokio::test]
async fn test_reconnect_clears_running_marks_for_assigned_shards() {
    let f = fixture().await;
    mutate_local(&f, |record| record.set_sharding(Some(&[1, 3]))).await;

    f.connection
        .handle(ConnectionState::Reconnected)
        .await
        .unwrap();

    assert_eq!(*f.tracker.cleared.lock(), vec![vec![1, 3]]);
}

#[tokio::test]
async fn test_reconnect_respects_manual_pause() {
    let f = fixture().await;
    // An operator pause that was already consumed: paused with no mark.
    mutate_local(&f, |record| record.set_paused_and_clear_mark(true)).await;

    f.connection
        .handle(ConnectionState::Reconnected)
        .await
        .unwrap();

    assert!(
        !f.control.calls().contains(&"resume"),
        "manual pause survives reconnect"
    );
}

#[tokio::test]
async fn test_trigger_mark_fires_and_is_consumed_once() {
    let f = fixture().await;
    let path = mutate_local(&f, |record| record.set_trigger_and_mark(true)).await;

    f.node_change.handle(&updated(&path)).await.unwrap();
    assert_eq!(f.control.calls(), vec!["trigger"]);

    let record = f.directory.load_local().await.unwrap().unwrap();
    assert!(!record.trigger);
    assert_eq!(record.pending_transition(), None);

    // The consuming save produces another update event; it must be inert.
    f.node_change.handle(&updated(&path)).await.unwrap();
    assert_eq!(f.control.calls(), vec!["trigger"]);
}

#[tokio::test]
async fn test_trigger_mark_consumed_without_controller() {
    let f = fixture().await;
    f.registry.remove_controller("test-job");
    let path = mutate_local(&f, |record| record.set_trigger_and_mark(true)).await;

    f.node_change.handle(&updated(&path)).await.unwrap();

    let record = f.directory.load_local().await.unwrap().unwrap();
    assert!(!record.trigger, "mark consumed even with no controller");
    assert!(f.control.calls().is_empty());
}

#[tokio::test]
async fn test_trigger_skipped_when_not_ready() {
    let f = fixture().await;
    let path = mutate_local(&f, |record| {
        record.set_paused_and_clear_mark(true);
        record.set_trigger_and_mark(true);
    })
    .await;

    f.node_change.handle(&updated(&path)).await.unwrap();

    assert!(f.control.calls().is_empty(), "paused worker must not fire");
    let record = f.directory.load_local().await.unwrap().unwrap();
    assert!(!record.trigger, "mark still consumed");
}

#[tokio::test]
async fn test_pause_and_resume_marks() {
    let f = fixture().await;
    let path = mutate_local(&f, |record| record.set_paused_and_mark(true)).await;
    f.node_change.handle(&updated(&path)).await.unwrap();
    assert_eq!(f.control.calls(), vec!["pause"]);
    let record = f.directory.load_local().await.unwrap().unwrap();
    assert!(record.paused, "pause boolean stays set after consumption");
    assert_eq!(record.pending_transition(), None);

    let path = mutate_local(&f, |record| record.set_paused_and_mark(false)).await;
    f.node_change.handle(&updated(&path)).await.unwrap();
    assert_eq!(f.control.calls(), vec!["pause", "resume"]);
    let record = f.directory.load_local().await.unwrap().unwrap();
    assert!(!record.paused);
    assert_eq!(record.pending_transition(), None);
}

#[tokio::test]
async fn test_shutdown_mark_stops_scheduler_and_detaches() {
    let f = fixture().await;
    let path = mutate_local(&f, |record| record.set_shutdown_and_mark(true)).await;

    f.node_change.handle(&updated(&path)).await.unwrap();

    assert_eq!(f.control.calls(), vec!["shutdown"]);
    assert!(f.registry.controller("test-job").is_none());
    let record = f.directory.load_local().await.unwrap().unwrap();
    assert!(!record.shutdown, "shutdown acknowledged and settled");
    assert_eq!(record.pending_transition(), None);
}

#[tokio::test]
async fn test_other_workers_events_are_ignored() {
    let f = fixture().await;
    let record = ServerRecord::new("host-b", "10.0.0.2", false);
    f.directory.save("10.0.0.2_0000000009", &record).await.unwrap();
    let local = mutate_local(&f, |record| record.set_trigger_and_mark(true)).await;

    f.node_change
        .handle(&updated("servers/10.0.0.2_0000000009"))
        .await
        .unwrap();
    f.node_change
        .handle(&updated("sharding/necessary"))
        .await
        .unwrap();

    assert!(f.control.calls().is_empty());
    let own = f.directory.load_local().await.unwrap().unwrap();
    assert!(own.is_trigger_with_mark(), "local mark untouched");
    // Only the event for the local path consumes it.
    f.node_change.handle(&updated(&local)).await.unwrap();
    assert_eq!(f.control.calls(), vec!["trigger"]);
}

#[tokio::test]
async fn test_added_and_removed_events_are_ignored() {
    let f = fixture().await;
    let path = mutate_local(&f, |record| record.set_paused_and_mark(true)).await;

    for kind in [NodeEventKind::Added, NodeEventKind::Removed] {
        f.node_change
            .handle(&NodeEvent {
                kind,
                path: path.clone(),
                data: String::new(),
            })
            .await
            .unwrap();
    }

    assert!(f.control.calls().is_empty());
}

#[tokio::test]
async fn test_dispatcher_wires_store_streams() {
    let Fixture {
        store,
        registry,
        directory,
        control,
        connection,
        node_change,
        ..
    } = fixture().await;
    let dispatcher = CoordinationEventDispatcher::new(
        store.clone() as Arc<dyn CoordinationStore>,
        connection,
        node_change,
    );
    let (connection_task, node_task) = dispatcher.start();

    // Let the consumer tasks subscribe before any event fires.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    store.fire_connection(ConnectionState::Lost);
    let name = registry.server_name("test-job").unwrap();
    let mut record = directory.load(&name).await.unwrap().unwrap();
    record.set_trigger_and_mark(true);
    directory.save(&name, &record).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let calls = control.calls();
    assert!(calls.contains(&"pause"));
    assert!(calls.contains(&"trigger"));

    connection_task.abort();
    node_task.abort();
}
