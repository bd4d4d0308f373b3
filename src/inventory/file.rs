//! File-backed inventory with change watching.
//!
//! Reads a JSON array of service records (a cluster-wide export) and watches
//! the file for modifications. Each modification is diffed by name against the
//! previous view and turned into Added/Deleted events. Only differences the
//! proxy can observe produce events.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::inventory::types::{InventoryError, InventoryEvent, ServiceRecord};
use crate::inventory::{EventStream, InventorySource};
use crate::registry::{classify, Classification};

type RecordIndex = BTreeMap<String, ServiceRecord>;

/// Inventory read from a JSON export on disk.
pub struct FileInventory {
    path: PathBuf,
    poll_interval: Duration,
    /// View as of the last snapshot; the watcher diffs against it.
    baseline: Mutex<RecordIndex>,
}

impl FileInventory {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            baseline: Mutex::new(RecordIndex::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read and decode the inventory file.
pub async fn read_records(path: &Path) -> Result<Vec<ServiceRecord>, InventoryError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| InventoryError::Snapshot(format!("{}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&content)?)
}

fn index(records: Vec<ServiceRecord>) -> RecordIndex {
    let mut indexed = RecordIndex::new();
    for record in records {
        if let Some(previous) = indexed.insert(record.name.clone(), record) {
            tracing::warn!(service = %previous.name, "Duplicate service name in inventory, keeping the last entry");
        }
    }
    indexed
}

/// True when the proxy would treat both versions of a record the same way.
///
/// Label, namespace or port-name edits that leave the extracted backend (or
/// the lack of one) untouched do not count.
fn same_for_proxy(old: &ServiceRecord, new: &ServiceRecord) -> bool {
    match (classify(old), classify(new)) {
        (Classification::Eligible(a), Classification::Eligible(b)) => a == b,
        (Classification::NotEligible(_), Classification::NotEligible(_)) => true,
        (Classification::Ambiguous(_), Classification::Ambiguous(_)) => true,
        _ => false,
    }
}

/// Turn two views into the events that lead from `previous` to `current`.
///
/// Deletions come first. A record whose proxied form changed is reported as a
/// deletion followed by an addition.
pub fn diff(previous: &RecordIndex, current: &RecordIndex) -> Vec<InventoryEvent> {
    let mut events = Vec::new();

    for (name, old) in previous {
        match current.get(name) {
            Some(new) if same_for_proxy(old, new) => {}
            _ => events.push(InventoryEvent::deleted(old.clone())),
        }
    }
    for (name, new) in current {
        match previous.get(name) {
            Some(old) if same_for_proxy(old, new) => {}
            _ => events.push(InventoryEvent::added(new.clone())),
        }
    }

    events
}

/// Re-read the file and send what changed since `known`.
///
/// Unreadable or undecodable content is skipped and `known` kept. Returns
/// false once the receiver is gone.
async fn publish_changes(
    path: &Path,
    known: &mut RecordIndex,
    tx: &mpsc::Sender<Result<InventoryEvent, InventoryError>>,
) -> bool {
    let current = match read_records(path).await {
        Ok(records) => index(records),
        Err(e) => {
            tracing::warn!(error = %e, "Inventory file unreadable, keeping previous view");
            return true;
        }
    };

    for change in diff(known, &current) {
        if tx.send(Ok(change)).await.is_err() {
            return false;
        }
    }
    *known = current;
    true
}

fn touches(event: &Event, target: &Path) -> bool {
    let Some(file_name) = target.file_name() else {
        return false;
    };
    event.paths.iter().any(|p| p.file_name() == Some(file_name))
}

#[async_trait]
impl InventorySource for FileInventory {
    async fn snapshot(&self) -> Result<Vec<ServiceRecord>, InventoryError> {
        let records = read_records(&self.path).await?;
        *self.baseline.lock().unwrap_or_else(|e| e.into_inner()) = index(records.clone());
        tracing::info!(path = ?self.path, services = records.len(), "Inventory snapshot loaded");
        Ok(records)
    }

    fn watch(&self, buffer: usize) -> Result<EventStream, InventoryError> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = raw_tx.send(res);
            },
            Config::default().with_poll_interval(self.poll_interval),
        )
        .map_err(|e| InventoryError::Stream(e.to_string()))?;

        // Watch the directory: editors and exporters usually replace the file via rename.
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| InventoryError::Stream(e.to_string()))?;

        let path = self.path.clone();
        let mut known = self.baseline.lock().unwrap_or_else(|e| e.into_inner()).clone();
        tracing::info!(path = ?path, "Inventory watcher started");

        tokio::spawn(async move {
            let _watcher = watcher;

            // Changes made between the snapshot and now produced no watch event.
            if !publish_changes(&path, &mut known, &tx).await {
                return;
            }

            while let Some(res) = raw_rx.recv().await {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Inventory watch error");
                        let _ = tx.send(Err(InventoryError::Stream(e.to_string()))).await;
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) || !touches(&event, &path) {
                    continue;
                }
                if !publish_changes(&path, &mut known, &tx).await {
                    return;
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::types::{EventKind, ExposureMode, ServicePort};

    fn record(name: &str, node_port: u16) -> ServiceRecord {
        ServiceRecord {
            name: name.to_string(),
            namespace: Some("default".to_string()),
            labels: BTreeMap::from([
                ("haproxy".to_string(), "true".to_string()),
                ("haproxy_url".to_string(), format!("{}.example.com", name)),
            ]),
            exposure: ExposureMode::NodePort,
            ports: vec![ServicePort { name: None, port: 80, node_port: Some(node_port) }],
        }
    }

    fn write_inventory(path: &Path, records: &[ServiceRecord]) {
        std::fs::write(path, serde_json::to_string(records).unwrap()).unwrap();
    }

    async fn next_event(events: &mut EventStream) -> InventoryEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("no inventory event within 5s")
            .expect("inventory stream closed")
            .expect("inventory stream failed")
    }

    async fn assert_quiet(events: &mut EventStream) {
        let extra = tokio::time::timeout(Duration::from_millis(300), events.recv()).await;
        assert!(extra.is_err(), "unexpected inventory event: {:?}", extra);
    }

    #[test]
    fn test_diff_reports_additions_and_deletions() {
        let previous = index(vec![record("a", 30001), record("b", 30002)]);
        let current = index(vec![record("b", 30002), record("c", 30003)]);

        let events = diff(&previous, &current);
        assert_eq!(events.len(), 2);
        assert_eq!((events[0].kind, events[0].record.name.as_str()), (EventKind::Deleted, "a"));
        assert_eq!((events[1].kind, events[1].record.name.as_str()), (EventKind::Added, "c"));
    }

    #[test]
    fn test_diff_changed_record_is_delete_then_add() {
        let previous = index(vec![record("a", 30001)]);
        let current = index(vec![record("a", 30009)]);

        let events = diff(&previous, &current);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Deleted);
        assert_eq!(events[0].record.ports[0].node_port, Some(30001));
        assert_eq!(events[1].kind, EventKind::Added);
        assert_eq!(events[1].record.ports[0].node_port, Some(30009));
    }

    #[test]
    fn test_diff_identical_views_is_empty() {
        let view = index(vec![record("a", 30001)]);
        assert!(diff(&view, &view).is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        let body = serde_json::to_string(&vec![record("a", 30001)]).unwrap();
        std::fs::write(&path, body).unwrap();

        let source = FileInventory::new(&path, Duration::from_secs(1));
        let records = source.snapshot().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "a");
    }

    #[tokio::test]
    async fn test_snapshot_of_missing_file_fails() {
        let source = FileInventory::new("/nonexistent/inventory.json", Duration::from_secs(1));
        assert!(matches!(source.snapshot().await, Err(InventoryError::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_snapshot_of_garbage_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, "not json").unwrap();

        let source = FileInventory::new(&path, Duration::from_secs(1));
        assert!(matches!(source.snapshot().await, Err(InventoryError::Decode(_))));
    }

    #[test]
    fn test_diff_ignores_changes_the_proxy_cannot_see() {
        let previous = index(vec![record("web", 30080)]);
        let mut edited = record("web", 30080);
        edited.labels.insert("team".to_string(), "payments".to_string());
        edited.namespace = Some("prod".to_string());
        edited.ports[0].name = Some("http".to_string());

        assert!(diff(&previous, &index(vec![edited])).is_empty());
    }

    #[test]
    fn test_diff_reports_eligibility_change() {
        let previous = index(vec![record("web", 30080)]);
        let mut untagged = record("web", 30080);
        untagged.labels.remove("haproxy");

        let events = diff(&previous, &index(vec![untagged]));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Deleted);
        assert_eq!(events[1].kind, EventKind::Added);
    }

    #[test]
    fn test_diff_ignores_edits_to_unproxied_records() {
        let mut before = record("db", 5432);
        before.labels.clear();
        let mut after = before.clone();
        after.ports[0].node_port = Some(31000);

        assert!(diff(&index(vec![before]), &index(vec![after])).is_empty());
    }

    #[tokio::test]
    async fn test_watch_delivers_changes_made_before_watch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        write_inventory(&path, &[record("web", 30080)]);

        let source = FileInventory::new(&path, Duration::from_millis(100));
        source.snapshot().await.unwrap();

        write_inventory(&path, &[record("web", 30080), record("api", 30081)]);
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut events = source.watch(16).unwrap();
        let event = next_event(&mut events).await;
        assert_eq!((event.kind, event.record.name.as_str()), (EventKind::Added, "api"));
        assert_quiet(&mut events).await;
    }

    #[tokio::test]
    async fn test_watch_reports_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        write_inventory(&path, &[record("web", 30080)]);

        let source = FileInventory::new(&path, Duration::from_millis(100));
        source.snapshot().await.unwrap();
        let mut events = source.watch(16).unwrap();

        write_inventory(&path, &[record("api", 30081)]);

        let first = next_event(&mut events).await;
        let second = next_event(&mut events).await;
        assert_eq!((first.kind, first.record.name.as_str()), (EventKind::Deleted, "web"));
        assert_eq!((second.kind, second.record.name.as_str()), (EventKind::Added, "api"));
    }

    #[tokio::test]
    async fn test_watch_skips_unparseable_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        write_inventory(&path, &[record("web", 30080)]);

        let source = FileInventory::new(&path, Duration::from_millis(100));
        source.snapshot().await.unwrap();
        let mut events = source.watch(16).unwrap();

        std::fs::write(&path, "[{ truncated").unwrap();
        assert_quiet(&mut events).await;

        write_inventory(&path, &[record("web", 30080), record("api", 30081)]);
        let event = next_event(&mut events).await;
        assert_eq!((event.kind, event.record.name.as_str()), (EventKind::Added, "api"));
    }

    #[tokio::test]
    async fn test_watch_follows_replace_by_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        write_inventory(&path, &[record("web", 30080)]);

        let source = FileInventory::new(&path, Duration::from_millis(100));
        source.snapshot().await.unwrap();
        let mut events = source.watch(16).unwrap();

        let staged = dir.path().join("inventory.json.partial");
        write_inventory(&staged, &[record("web", 30080), record("api", 30081)]);
        std::fs::rename(&staged, &path).unwrap();

        let event = next_event(&mut events).await;
        assert_eq!((event.kind, event.record.name.as_str()), (EventKind::Added, "api"));
    }

    #[tokio::test]
    async fn test_watch_ignores_other_files_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        write_inventory(&path, &[record("web", 30080)]);

        let source = FileInventory::new(&path, Duration::from_millis(100));
        source.snapshot().await.unwrap();
        let mut events = source.watch(16).unwrap();

        write_inventory(&dir.path().join("other.json"), &[record("api", 30081)]);
        assert_quiet(&mut events).await;
    }

    #[tokio::test]
    async fn test_watch_ignores_label_only_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        write_inventory(&path, &[record("web", 30080)]);

        let source = FileInventory::new(&path, Duration::from_millis(100));
        source.snapshot().await.unwrap();
        let mut events = source.watch(16).unwrap();

        let mut relabelled = record("web", 30080);
        relabelled.labels.insert("team".to_string(), "payments".to_string());
        write_inventory(&path, &[relabelled]);

        assert_quiet(&mut events).await;
    }
}
