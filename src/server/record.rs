//! Per-worker server record
//!
//! Encodes a worker's operational state plus a mark-based pending-transition
//! tag. A mark is the pair of `changed_item` and the boolean it names: the
//! tag says which boolean most recently changed, the boolean's value says in
//! which direction. Consuming a transition clears the tag and leaves the
//! boolean settled.

use serde::{Deserialize, Serialize};

/// Execution phase of a worker, flipped by the worker around each fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerStatus {
    /// Waiting for the next fire
    Ready,
    /// Currently executing its shards
    Running,
}

/// Which boolean the most recent pending transition names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkedItem {
    Trigger,
    Paused,
    Disabled,
    Shutdown,
}

/// A pending transition, decoded once from the (tag, boolean) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingTransition {
    Trigger,
    Pause,
    Resume,
    Disable,
    Enable,
    Shutdown,
}

/// One worker's state document in the coordination tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub host_name: String,
    #[serde(rename = "hostIP")]
    pub host_ip: String,
    pub trigger: bool,
    pub paused: bool,
    pub disabled: bool,
    pub shutdown: bool,
    pub status: ServerStatus,
    /// Comma-separated assigned shard indices; `None` or empty = unassigned
    pub sharding: Option<String>,
    /// Tag of the most recent pending transition; `None` = settled
    pub changed_item: Option<MarkedItem>,
}

impl ServerRecord {
    /// Create a fresh record as written at first registration
    pub fn new(host_name: impl Into<String>, host_ip: impl Into<String>, disabled: bool) -> Self {
        Self {
            host_name: host_name.into(),
            host_ip: host_ip.into(),
            trigger: false,
            paused: false,
            disabled,
            shutdown: false,
            status: ServerStatus::Ready,
            sharding: None,
            changed_item: None,
        }
    }

    // The boolean and the tag always move together: `_and_mark` announces a
    // transition, `_and_clear_mark` settles one.

    pub fn set_trigger_and_mark(&mut self, trigger: bool) {
        self.trigger = trigger;
        self.changed_item = Some(MarkedItem::Trigger);
    }

    pub fn set_trigger_and_clear_mark(&mut self, trigger: bool) {
        self.trigger = trigger;
        self.changed_item = None;
    }

    pub fn set_paused_and_mark(&mut self, paused: bool) {
        self.paused = paused;
        self.changed_item = Some(MarkedItem::Paused);
    }

    pub fn set_paused_and_clear_mark(&mut self, paused: bool) {
        self.paused = paused;
        self.changed_item = None;
    }

    pub fn set_disabled_and_mark(&mut self, disabled: bool) {
        self.disabled = disabled;
        self.changed_item = Some(MarkedItem::Disabled);
    }

    pub fn set_disabled_and_clear_mark(&mut self, disabled: bool) {
        self.disabled = disabled;
        self.changed_item = None;
    }

    pub fn set_shutdown_and_mark(&mut self, shutdown: bool) {
        self.shutdown = shutdown;
        self.changed_item = Some(MarkedItem::Shutdown);
    }

    pub fn set_shutdown_and_clear_mark(&mut self, shutdown: bool) {
        self.shutdown = shutdown;
        self.changed_item = None;
    }

    /// Settle whatever transition is announced, leaving every boolean as-is
    pub fn clear_mark(&mut self) {
        self.changed_item = None;
    }

    pub fn is_trigger_with_mark(&self) -> bool {
        self.changed_item == Some(MarkedItem::Trigger) && self.trigger
    }

    pub fn is_paused_with_mark(&self) -> bool {
        self.changed_item == Some(MarkedItem::Paused) && self.paused
    }

    /// Resume shares the pause tag; the boolean's value tells them apart
    pub fn is_resumed_with_mark(&self) -> bool {
        self.changed_item == Some(MarkedItem::Paused) && !self.paused
    }

    pub fn is_disabled_with_mark(&self) -> bool {
        self.changed_item == Some(MarkedItem::Disabled) && self.disabled
    }

    pub fn is_enabled_with_mark(&self) -> bool {
        self.changed_item == Some(MarkedItem::Disabled) && !self.disabled
    }

    pub fn is_shutdown_with_mark(&self) -> bool {
        self.changed_item == Some(MarkedItem::Shutdown) && self.shutdown
    }

    /// Decode the (tag, boolean) pair into the pending transition, if any.
    ///
    /// A trigger or shutdown tag over a false boolean is already settled
    /// and decodes to `None`.
    pub fn pending_transition(&self) -> Option<PendingTransition> {
        match self.changed_item? {
            MarkedItem::Trigger => self.trigger.then_some(PendingTransition::Trigger),
            MarkedItem::Paused => Some(if self.paused {
                PendingTransition::Pause
            } else {
                PendingTransition::Resume
            }),
            MarkedItem::Disabled => Some(if self.disabled {
                PendingTransition::Disable
            } else {
                PendingTransition::Enable
            }),
            MarkedItem::Shutdown => self.shutdown.then_some(PendingTransition::Shutdown),
        }
    }

    /// Assigned shard indices decoded from the encoded list
    pub fn sharding_items(&self) -> Vec<u32> {
        match &self.sharding {
            Some(encoded) => crate::sharding::items::decode(encoded),
            None => Vec::new(),
        }
    }

    /// Overwrite the assignment; `None` or an empty list clears it
    pub fn set_sharding(&mut self, items: Option<&[u32]>) {
        self.sharding = match items {
            Some(items) if !items.is_empty() => Some(crate::sharding::items::encode(items)),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_then_resume_settles_on_resume() {
        let mut record = ServerRecord::new("host-a", "10.0.0.1", false);
        record.set_paused_and_mark(true);
        record.set_paused_and_mark(false);
        assert!(!record.is_paused_with_mark());
        assert!(record.is_resumed_with_mark());
        assert!(!record.paused);
    }

    #[test]
    fn test_cleared_trigger_mark_never_reads_as_pending() {
        let mut record = ServerRecord::new("host-a", "10.0.0.1", false);
        record.set_trigger_and_mark(true);
        record.set_trigger_and_clear_mark(false);
        assert!(!record.is_trigger_with_mark());
        assert_eq!(record.pending_transition(), None);
    }

    #[test]
    fn test_pending_transition_decodes_each_tag() {
        let mut record = ServerRecord::new("host-a", "10.0.0.1", false);
        assert_eq!(record.pending_transition(), None);

        record.set_trigger_and_mark(true);
        assert_eq!(record.pending_transition(), Some(PendingTransition::Trigger));

        record.set_paused_and_mark(true);
        assert_eq!(record.pending_transition(), Some(PendingTransition::Pause));
        record.set_paused_and_mark(false);
        assert_eq!(record.pending_transition(), Some(PendingTransition::Resume));

        record.set_disabled_and_mark(true);
        assert_eq!(record.pending_transition(), Some(PendingTransition::Disable));
        record.set_disabled_and_mark(false);
        assert_eq!(record.pending_transition(), Some(PendingTransition::Enable));

        record.set_shutdown_and_mark(true);
        assert_eq!(record.pending_transition(), Some(PendingTransition::Shutdown));
    }

    #[test]
    fn test_record_round_trips_with_wire_field_names() {
        let mut record = ServerRecord::new("host-a", "10.0.0.1", false);
        record.set_sharding(Some(&[0, 2, 5]));
        record.set_paused_and_mark(true);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"hostIP\":\"10.0.0.1\""));
        assert!(json.contains("\"status\":\"READY\""));
        assert!(json.contains("\"changedItem\":\"paused\""));
        assert!(json.contains("\"sharding\":\"0,2,5\""));

        let decoded: ServerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.sharding_items(), vec![0, 2, 5]);
    }
}
