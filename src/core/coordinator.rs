use std::path::PathBuf;
use std::sync::Arc;

use super::alerts::hub::AlertHub;
use super::alerts::model::AlertEvent;
use super::feed::{self, FeedRecord, FeedTailer};
use super::proximity::ProximityIndex;

#[derive(Debug, Default)]
pub struct CoordinatorOutput {
    /// Records applied to the index this tick
    pub applied: usize,
    /// Alert events published this tick
    pub published: usize,
    pub logs: Vec<String>,
}

/// Moves report-store changes from the feed into the index and onto the alert hub.
pub struct Coordinator {
    feed_path: PathBuf,
    tailer: Option<FeedTailer>,
    // Offset to continue from when the feed has to be reopened
    resume_at: u64,
    index: Arc<ProximityIndex>,
    hub: AlertHub,
    // Feed content present at startup is history: index it without alerting anyone
    seeded: bool,
}

impl Coordinator {
    pub fn new(feed_path: PathBuf, index: Arc<ProximityIndex>, hub: AlertHub) -> Self {
        Self {
            feed_path,
            tailer: None,
            resume_at: 0,
            index,
            hub,
            seeded: false,
        }
    }

    pub fn tick(&mut self) -> CoordinatorOutput {
        let mut output = CoordinatorOutput::default();

        // 1. Open the feed once it exists
        if self.tailer.is_none() {
            match FeedTailer::open_at(&self.feed_path, self.resume_at) {
                Ok(tailer) => {
                    output.logs.push(format!("Following report feed: {:?}", self.feed_path));
                    self.tailer = Some(tailer);
                }
                Err(e) => {
                    log::debug!("Report feed {:?} not available: {}", self.feed_path, e);
                    if !self.seeded {
                        // No history yet; whatever shows up later is new
                        self.seeded = true;
                        output.logs.push(format!(
                            "Report feed {:?} not found, waiting for new reports",
                            self.feed_path
                        ));
                    }
                    return output;
                }
            }
        }

        // 2. Read new records
        let batch = match self.tailer.as_mut().map(FeedTailer::read_new_lines) {
            Some(Ok(batch)) => batch,
            Some(Err(e)) => {
                output.logs.push(format!("Error reading report feed: {}", e));
                self.drop_tailer();
                return output;
            }
            None => return output,
        };

        // A rewritten feed is a new history
        if batch.restarted {
            self.index.clear();
            output.logs.push("Report feed was truncated, reindexing".to_string());
        }

        // 3. Apply them
        let publish = self.seeded && !batch.restarted;
        for line in &batch.lines {
            match feed::parse_record(line) {
                Some(Ok(record)) => {
                    output.applied += 1;
                    if self.apply(record, publish) {
                        output.published += 1;
                    }
                }
                Some(Err(e)) => output.logs.push(format!("Skipping bad feed record: {}", e)),
                None => {}
            }
        }

        if !publish {
            self.seeded = true;
            output.logs.push(format!("Indexed {} existing report(s)", self.index.len()));
        } else if output.applied > 0 {
            output.logs.push(format!(
                "Applied {} feed record(s), published {} alert(s)",
                output.applied, output.published
            ));
        }

        output
    }

    /// Returns true when an alert event was published.
    fn apply(&self, record: FeedRecord, publish: bool) -> bool {
        match record {
            FeedRecord::Create { report } => {
                let report = report.classified();
                let event = AlertEvent::new_report(report.clone());
                // A repeated create is an update: alert only once per report
                if self.index.upsert(report).is_some() || !publish {
                    return false;
                }
                self.hub.publish(&event);
                true
            }
            FeedRecord::Update { report } => {
                self.index.upsert(report.classified());
                false
            }
            FeedRecord::Delete { id } => {
                if self.index.remove(&id).is_none() {
                    log::debug!("Delete for unknown report {}", id);
                }
                false
            }
        }
    }

    /// Close the feed; the next tick reopens it where reading stopped.
    fn drop_tailer(&mut self) {
        if let Some(tailer) = self.tailer.take() {
            self.resume_at = tailer.position();
        }
    }

    pub fn index(&self) -> &Arc<ProximityIndex> {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alerts::filter::AlertFilter;
    use crate::core::model::Priority;
    use std::fs::{File, OpenOptions};
    use std::io::Write;
    use tempfile::tempdir;

    fn create_line(id: &str, tags: &str, created_by: &str) -> String {
        format!(
            r#"{{"op":"create","report":{{"id":"{}","title":"Flood on Main St","description":"water rising","tags":{},"location_name":"Main St","lat":0.0,"lng":0.0,"created_by":"{}"}}}}"#,
            id, tags, created_by
        )
    }

    #[test]
    fn test_coordinator_flow() {
        let dir = tempdir().unwrap();
        let feed_path = dir.path().join("reports.jsonl");
        let mut file = File::create(&feed_path).unwrap();
        writeln!(file, "{}", create_line("old", r#"["urgent"]"#, "userA")).unwrap();
        file.sync_all().unwrap();

        let index = Arc::new(ProximityIndex::new());
        let hub = AlertHub::new();
        let mut coord = Coordinator::new(feed_path.clone(), index.clone(), hub.clone());
        let mut session = hub.connect(Some("userB".to_string()));

        // Tick 1: history is indexed but not broadcast
        let output = coord.tick();
        assert!(output.logs.iter().any(|m| m.contains("Following report feed")));
        assert_eq!(output.applied, 1);
        assert_eq!(output.published, 0);
        assert!(session.try_recv().is_none());
        assert_eq!(index.get("old").unwrap().priority, Priority::High);

        // Tick 2: a new report is broadcast once
        let mut file = OpenOptions::new().append(true).open(&feed_path).unwrap();
        writeln!(file, "{}", create_line("new", r#"["Urgent","shelter"]"#, "userA")).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file, "{}", create_line("new", r#"["Urgent"]"#, "userA")).unwrap();
        file.sync_all().unwrap();

        let output = coord.tick();
        assert_eq!(output.applied, 2);
        assert_eq!(output.published, 1);
        assert!(output.logs.iter().any(|m| m.contains("Skipping bad feed record")));

        let event = session.try_recv().unwrap();
        assert_eq!(event.payload.id, "new");
        assert!(session.try_recv().is_none());
        let filter = AlertFilter::for_client("userB");
        assert!(filter.on_event(&event).is_notify());

        // Tick 3: updates and deletes touch the index only
        writeln!(file, r#"{{"op":"update","report":{{"id":"new","title":"All clear","lat":0.0,"lng":0.0}}}}"#).unwrap();
        writeln!(file, r#"{{"op":"delete","id":"old"}}"#).unwrap();
        file.sync_all().unwrap();

        let output = coord.tick();
        assert_eq!(output.applied, 2);
        assert_eq!(output.published, 0);
        assert!(session.try_recv().is_none());
        assert!(index.get("old").is_none());
        let updated = index.get("new").unwrap();
        assert_eq!(updated.title, "All clear");
        assert_eq!(updated.priority, Priority::Normal);
    }

    #[test]
    fn test_feed_created_after_startup_is_live() {
        let dir = tempdir().unwrap();
        let feed_path = dir.path().join("reports.jsonl");
        let hub = AlertHub::new();
        let mut coord = Coordinator::new(feed_path.clone(), Arc::new(ProximityIndex::new()), hub.clone());
        let mut session = hub.connect(Some("userB".to_string()));

        let output = coord.tick();
        assert!(output.logs.iter().any(|m| m.contains("not found")));

        let mut file = File::create(&feed_path).unwrap();
        writeln!(file, "{}", create_line("first", r#"["urgent"]"#, "userA")).unwrap();
        file.sync_all().unwrap();

        let output = coord.tick();
        assert_eq!(output.published, 1);
        assert_eq!(session.try_recv().unwrap().payload.id, "first");
    }

    #[test]
    fn test_reopen_does_not_replay_deleted_reports() {
        let dir = tempdir().unwrap();
        let feed_path = dir.path().join("reports.jsonl");
        File::create(&feed_path).unwrap();

        let index = Arc::new(ProximityIndex::new());
        let hub = AlertHub::new();
        let mut coord = Coordinator::new(feed_path.clone(), index.clone(), hub.clone());
        coord.tick();
        let mut session = hub.connect(Some("userB".to_string()));

        let mut file = OpenOptions::new().append(true).open(&feed_path).unwrap();
        writeln!(file, "{}", create_line("a", r#"["urgent"]"#, "userA")).unwrap();
        writeln!(file, r#"{{"op":"delete","id":"a"}}"#).unwrap();
        file.sync_all().unwrap();
        assert_eq!(coord.tick().published, 1);
        assert_eq!(session.try_recv().unwrap().payload.id, "a");

        // Same path a read error takes
        coord.drop_tailer();
        writeln!(file, "{}", create_line("b", r#"["urgent"]"#, "userA")).unwrap();
        file.sync_all().unwrap();

        let output = coord.tick();
        assert_eq!(output.applied, 1);
        assert_eq!(output.published, 1);
        assert_eq!(session.try_recv().unwrap().payload.id, "b");
        assert!(session.try_recv().is_none());
        assert!(index.get("a").is_none());
    }

    #[test]
    fn test_truncated_feed_reindexes_without_alerts() {
        let dir = tempdir().unwrap();
        let feed_path = dir.path().join("reports.jsonl");
        let mut file = File::create(&feed_path).unwrap();
        writeln!(file, "{}", create_line("a", r#"["urgent"]"#, "userA")).unwrap();
        writeln!(file, "{}", create_line("b", r#"["urgent"]"#, "userA")).unwrap();
        writeln!(file, r#"{{"op":"delete","id":"a"}}"#).unwrap();
        file.sync_all().unwrap();

        let index = Arc::new(ProximityIndex::new());
        let hub = AlertHub::new();
        let mut coord = Coordinator::new(feed_path.clone(), index.clone(), hub.clone());
        coord.tick();
        assert_eq!(index.len(), 1);
        let mut session = hub.connect(Some("userB".to_string()));

        // Store compacts the feed down to a single create
        let mut file = File::create(&feed_path).unwrap();
        writeln!(file, "{}", create_line("c", r#"["urgent"]"#, "userA")).unwrap();
        file.sync_all().unwrap();

        let output = coord.tick();
        assert!(output.logs.iter().any(|m| m.contains("truncated")));
        assert_eq!(output.published, 0);
        assert!(session.try_recv().is_none());
        assert_eq!(index.len(), 1);
        assert!(index.contains("c"));

        // Later appends are live again
        let mut file = OpenOptions::new().append(true).open(&feed_path).unwrap();
        writeln!(file, "{}", create_line("d", r#"["urgent"]"#, "userA")).unwrap();
        file.sync_all().unwrap();
        assert_eq!(coord.tick().published, 1);
        assert_eq!(session.try_recv().unwrap().payload.id, "d");
    }
}
