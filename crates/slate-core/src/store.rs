use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::datetime::to_project_date;
use crate::storage::{FileStorage, Storage, StoreError};
use crate::task::{Status, Task};

pub const TASKS_KEY: &str = "tasks";

#[derive(Debug)]
pub struct TaskStore<S> {
    storage: S,
}

impl TaskStore<FileStorage> {
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(FileStorage::open(data_dir)?))
    }
}

impl<S: Storage> TaskStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    #[tracing::instrument(skip(self))]
    pub fn load_all(&self) -> Result<Vec<Task>, StoreError> {
        let Some(raw) = self.storage.read(TASKS_KEY)? else {
            debug!("no task collection stored yet");
            return Ok(vec![]);
        };

        let tasks: Vec<Task> = serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
            key: TASKS_KEY.to_string(),
            source,
        })?;
        debug!(count = tasks.len(), "loaded task collection");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_all(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(tasks).map_err(|source| StoreError::Encode {
            key: TASKS_KEY.to_string(),
            source,
        })?;
        self.storage.write(TASKS_KEY, &raw)?;
        debug!(count = tasks.len(), "saved task collection");
        Ok(())
    }

    // Duplicate ids are not rejected here; id uniqueness is the caller's job.
    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn add_one(&self, task: Task) -> Result<(), StoreError> {
        let mut tasks = self.load_all()?;
        tasks.push(task);
        self.save_all(&tasks)
    }

    #[tracing::instrument(skip(self, now))]
    pub fn load_due_today(&self, now: DateTime<Utc>) -> Result<Vec<Task>, StoreError> {
        let today = to_project_date(now);
        let mut tasks = self.load_all()?;
        tasks.retain(|task| {
            task.deadline
                .map(|deadline| to_project_date(deadline) == today)
                .unwrap_or(false)
        });
        debug!(count = tasks.len(), "loaded tasks due today");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self))]
    pub fn load_archived(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks = self.load_all()?;
        tasks.retain(|task| task.status == Status::Archived);
        debug!(count = tasks.len(), "loaded archived tasks");
        Ok(tasks)
    }

    pub fn preference(&self, key: &str) -> Option<String> {
        match self.storage.read(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "failed reading preference; ignoring");
                None
            }
        }
    }

    pub fn set_preference(&self, key: &str, value: &str) {
        if let Err(err) = self.storage.write(key, value) {
            warn!(key, error = %err, "failed writing preference; ignoring");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{TASKS_KEY, TaskStore};
    use crate::storage::{MemoryStorage, Storage, StoreError};
    use crate::task::{Status, Tag, Task};

    fn store() -> TaskStore<MemoryStorage> {
        TaskStore::new(MemoryStorage::new())
    }

    #[test]
    fn load_all_returns_empty_when_nothing_stored() {
        assert!(store().load_all().expect("load").is_empty());
    }

    #[test]
    fn collection_round_trips_to_the_millisecond() {
        let store = store();
        let now = Utc
            .with_ymd_and_hms(2026, 4, 1, 8, 15, 30)
            .unwrap()
            .checked_add_signed(Duration::milliseconds(123))
            .unwrap();

        let mut with_deadline = Task::new("Pay invoice".to_string(), now);
        with_deadline.deadline = Some(now + Duration::days(2));
        with_deadline.tags = vec![Tag::Work, Tag::Urgent];
        with_deadline.description = Some("net 30".to_string());

        let without_deadline = Task::new("Read book".to_string(), now);

        store
            .save_all(&[with_deadline.clone(), without_deadline.clone()])
            .expect("save");
        let loaded = store.load_all().expect("load");

        assert_eq!(loaded, vec![with_deadline, without_deadline]);
        assert!(loaded[1].deadline.is_none());
    }

    #[test]
    fn malformed_collection_surfaces_a_decode_error() {
        let storage = MemoryStorage::new();
        storage.write(TASKS_KEY, "not json").expect("seed");
        let store = TaskStore::new(storage);

        match store.load_all() {
            Err(StoreError::Decode { key, .. }) => assert_eq!(key, TASKS_KEY),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn add_one_appends_without_checking_ids() {
        let store = store();
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();

        let first = Task::new("First".to_string(), now);
        let mut twin = Task::new("Twin".to_string(), now);
        twin.id = first.id.clone();

        store.add_one(first.clone()).expect("add first");
        store.add_one(twin.clone()).expect("add twin");

        let loaded = store.load_all().expect("load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, loaded[1].id);
    }

    #[test]
    fn deleted_task_never_comes_back() {
        let store = store();
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();

        let keep = Task::new("Keep".to_string(), now);
        let doomed = Task::new("Drop".to_string(), now);
        let target_id = doomed.id.clone();
        store.save_all(&[keep.clone(), doomed]).expect("save");

        let remaining: Vec<Task> = store
            .load_all()
            .expect("load")
            .into_iter()
            .filter(|task| task.id != target_id)
            .collect();
        store.save_all(&remaining).expect("save filtered");

        let loaded = store.load_all().expect("reload");
        assert_eq!(loaded, vec![keep]);
        assert!(loaded.iter().all(|task| task.id != target_id));
    }

    #[test]
    fn due_today_matches_calendar_date_not_clock_distance() {
        let store = store();
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 22, 0, 0).unwrap();

        let mut late_tonight = Task::new("Late tonight".to_string(), now);
        late_tonight.deadline = Some(Utc.with_ymd_and_hms(2026, 4, 1, 23, 59, 0).unwrap());

        let mut early_today = Task::new("Already this morning".to_string(), now);
        early_today.deadline = Some(Utc.with_ymd_and_hms(2026, 4, 1, 6, 0, 0).unwrap());

        let mut tomorrow = Task::new("Tomorrow".to_string(), now);
        tomorrow.deadline = Some(Utc.with_ymd_and_hms(2026, 4, 2, 1, 0, 0).unwrap());

        let undated = Task::new("Undated".to_string(), now);

        store
            .save_all(&[late_tonight.clone(), early_today.clone(), tomorrow, undated])
            .expect("save");

        let due = store.load_due_today(now).expect("due today");
        assert_eq!(due, vec![late_tonight, early_today]);
    }

    #[test]
    fn archived_view_keeps_only_archived_tasks() {
        let store = store();
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();

        let open = Task::new("Open".to_string(), now);
        let mut shelved = Task::new("Shelved".to_string(), now);
        shelved.set_status(Status::Archived, now);

        store.save_all(&[open, shelved.clone()]).expect("save");
        assert_eq!(store.load_archived().expect("archived"), vec![shelved]);
    }

    #[test]
    fn preferences_read_and_write_through_the_store() {
        let store = store();
        assert!(store.preference("theme").is_none());
        store.set_preference("theme", "dark");
        assert_eq!(store.preference("theme").as_deref(), Some("dark"));
    }
}
