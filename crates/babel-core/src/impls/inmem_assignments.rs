//! InMemoryAssignmentStore - テスト・シード用の正本
//!
//! # 実装詳細
//! - `by_id` と `active_by_key` の 2 つのインデックスを 1 つの Mutex で保護
//! - 読み取りも同じロックを短時間取得し、返却値は deep clone
//! - active key の解放は `archived` への遷移のみ

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{
    ActiveKey, Assignment, AssignmentDraft, StoreError, ValidationFailure, Violation,
};
use crate::ports::{AssignmentStore, Clock, CreateOutcome, IdGenerator, ListOptions, ListPage};

#[derive(Default)]
struct State {
    by_id: HashMap<String, Assignment>,
    active_by_key: HashMap<ActiveKey, String>,
}

impl State {
    /// Current live holder of `key`, dropping the index entry if it is stale.
    fn holder_of(&mut self, key: &ActiveKey) -> Option<String> {
        let holder = self.active_by_key.get(key)?.clone();
        let live = self
            .by_id
            .get(&holder)
            .is_some_and(|a| a.holds_active_slot() && a.active_key() == *key);
        if live {
            Some(holder)
        } else {
            warn!(assignment_id = %holder, key = %key, "dropping stale active-key entry");
            self.active_by_key.remove(key);
            None
        }
    }

    fn insert_new(&mut self, mut assignment: Assignment) -> Assignment {
        assignment.version = 1;
        if assignment.holds_active_slot() {
            self.active_by_key
                .insert(assignment.active_key(), assignment.id.clone());
        }
        self.by_id.insert(assignment.id.clone(), assignment.clone());
        assignment
    }
}

/// InMemoryAssignmentStore は AssignmentStore のメモリ実装
///
/// Clone は同じ状態を共有する。
#[derive(Clone)]
pub struct InMemoryAssignmentStore {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryAssignmentStore {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
            ids,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Normalizes the draft and checks the identity fields, the only checks
    /// that must pass before the active key means anything.
    fn prepare(&self, draft: AssignmentDraft) -> Result<Assignment, StoreError> {
        let assignment = draft.into_assignment(self.clock.now());
        assignment.validate_identity()?;
        Ok(assignment)
    }

    fn assign_id(&self, state: &State, assignment: &mut Assignment) -> Result<(), StoreError> {
        if assignment.id.is_empty() {
            assignment.id = self.ids.generate_assignment_id().to_string();
        } else if state.by_id.contains_key(&assignment.id) {
            return Err(ValidationFailure::single(Violation::DuplicateId {
                id: assignment.id.clone(),
            })
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn create(&self, draft: AssignmentDraft) -> Result<Assignment, StoreError> {
        let mut assignment = self.prepare(draft)?;
        let mut state = self.state.lock().await;

        if assignment.holds_active_slot() {
            let key = assignment.active_key();
            if let Some(existing_id) = state.holder_of(&key) {
                debug!(existing_id = %existing_id, key = %key, "strict create hit a held key");
                return Err(StoreError::ActiveKeyConflict { existing_id, key });
            }
        }
        assignment.validate()?;
        self.assign_id(&state, &mut assignment)?;

        let created = state.insert_new(assignment);
        info!(
            assignment_id = %created.id,
            status = %created.status,
            key = %created.active_key(),
            "assignment created"
        );
        Ok(created)
    }

    async fn create_or_reuse(&self, draft: AssignmentDraft) -> Result<CreateOutcome, StoreError> {
        let refresh = draft.refresh_fields();
        let mut assignment = self.prepare(draft)?;
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        if assignment.holds_active_slot() {
            let key = assignment.active_key();
            if let Some(existing_id) = state.holder_of(&key) {
                let Some(existing) = state.by_id.get_mut(&existing_id) else {
                    return Err(StoreError::NotFound { id: existing_id });
                };
                let refreshed = refresh.apply_to(existing);
                if refreshed {
                    existing.version += 1;
                    existing.updated_at = now.max(existing.updated_at);
                    info!(
                        assignment_id = %existing.id,
                        version = existing.version,
                        "assignment refreshed on reuse"
                    );
                }
                return Ok(CreateOutcome {
                    assignment: existing.clone(),
                    created: false,
                    refreshed,
                });
            }
        }
        assignment.validate()?;
        self.assign_id(&state, &mut assignment)?;

        let created = state.insert_new(assignment);
        info!(assignment_id = %created.id, key = %created.active_key(), "assignment created");
        Ok(CreateOutcome {
            assignment: created,
            created: true,
            refreshed: false,
        })
    }

    async fn get(&self, id: &str) -> Result<Assignment, StoreError> {
        let state = self.state.lock().await;
        state
            .by_id
            .get(id.trim())
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn list(&self, options: &ListOptions) -> Result<ListPage, StoreError> {
        let now = self.clock.now();
        let per_page = options.clamped_per_page();
        let page = options.clamped_page();

        let state = self.state.lock().await;
        let mut matching: Vec<&Assignment> = state
            .by_id
            .values()
            .filter(|a| options.filter.matches(a, now))
            .collect();
        matching.sort_by(|a, b| options.compare(a, b));

        let total = matching.len();
        let rows = matching
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .cloned()
            .collect();
        Ok(ListPage { rows, total })
    }

    async fn update(
        &self,
        assignment: Assignment,
        expected_version: u64,
    ) -> Result<Assignment, StoreError> {
        let mut next = assignment;
        next.normalize();
        next.validate()?;

        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let Some(current) = state.by_id.get(&next.id) else {
            return Err(StoreError::NotFound { id: next.id });
        };
        if current.version != expected_version {
            debug!(
                assignment_id = %next.id,
                expected = expected_version,
                actual = current.version,
                "version conflict"
            );
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: current.version,
            });
        }
        let old_key = current.holds_active_slot().then(|| current.active_key());
        let version = current.version + 1;
        let updated_at = now.max(current.updated_at);
        let created_at = current.created_at;

        if next.holds_active_slot() {
            let key = next.active_key();
            if let Some(existing_id) = state.holder_of(&key) {
                if existing_id != next.id {
                    return Err(StoreError::ActiveKeyConflict { existing_id, key });
                }
            }
        }

        next.version = version;
        next.updated_at = updated_at;
        next.created_at = created_at;

        if let Some(old_key) = old_key {
            if state.active_by_key.get(&old_key) == Some(&next.id) {
                state.active_by_key.remove(&old_key);
            }
        }
        if next.holds_active_slot() {
            state
                .active_by_key
                .insert(next.active_key(), next.id.clone());
        }
        state.by_id.insert(next.id.clone(), next.clone());

        info!(
            assignment_id = %next.id,
            version = next.version,
            status = %next.status,
            "assignment updated"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssignmentStatus, AssignmentType, Priority};
    use crate::ports::{FixedClock, ListFilter, SortField, SortOrder, UlidGenerator};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 17, 12, 0, 0).unwrap()
    }

    fn store_with_clock() -> (InMemoryAssignmentStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(now()));
        let shared: Arc<dyn Clock> = clock.clone();
        let ids = Arc::new(UlidGenerator::new(shared.clone()));
        (InMemoryAssignmentStore::new(shared, ids), clock)
    }

    fn store() -> InMemoryAssignmentStore {
        store_with_clock().0
    }

    fn draft() -> AssignmentDraft {
        AssignmentDraft {
            translation_group_id: "tg_123".into(),
            entity_type: "pages".into(),
            source_record_id: "page_1".into(),
            source_locale: "en".into(),
            target_locale: "es".into(),
            assignment_type: Some(AssignmentType::OpenPool),
            status: Some(AssignmentStatus::Pending),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn strict_create_rejects_a_held_key() {
        let store = store();
        let first = store.create(draft()).await.unwrap();
        assert_eq!(first.version, 1);
        assert!(first.id.starts_with("tas_"));

        let err = store
            .create(AssignmentDraft {
                assignment_type: Some(AssignmentType::Direct),
                status: Some(AssignmentStatus::Assigned),
                ..draft()
            })
            .await
            .unwrap_err();
        match err {
            StoreError::ActiveKeyConflict { existing_id, key } => {
                assert_eq!(existing_id, first.id);
                assert_eq!(key.translation_group_id, "tg_123");
            }
            other => panic!("expected active key conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reuse_refreshes_only_when_something_changed() {
        let store = store();
        let first = store.create(draft()).await.unwrap();

        let reused = store
            .create_or_reuse(AssignmentDraft {
                source_title: "Updated title".into(),
                priority: Some(Priority::High),
                ..draft()
            })
            .await
            .unwrap();
        assert!(!reused.created);
        assert!(reused.refreshed);
        assert_eq!(reused.assignment.id, first.id);
        assert_eq!(reused.assignment.source_title, "Updated title");
        assert_eq!(reused.assignment.priority, Priority::High);
        assert_eq!(reused.assignment.version, first.version + 1);

        let again = store
            .create_or_reuse(AssignmentDraft {
                source_title: "Updated title".into(),
                ..draft()
            })
            .await
            .unwrap();
        assert!(!again.refreshed);
        assert_eq!(again.assignment.version, reused.assignment.version);
    }

    #[tokio::test]
    async fn reuse_creates_when_the_key_is_free() {
        let store = store();
        let outcome = store.create_or_reuse(draft()).await.unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.assignment.version, 1);
    }

    #[tokio::test]
    async fn archive_frees_the_slot() {
        let store = store();
        let first = store.create(draft()).await.unwrap();

        let mut archived = first.clone();
        archived.status = AssignmentStatus::Archived;
        store.update(archived, first.version).await.unwrap();

        let second = store.create(draft()).await.unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn published_keeps_the_slot() {
        let store = store();
        let first = store.create(draft()).await.unwrap();
        let mut published = first.clone();
        published.status = AssignmentStatus::Published;
        store.update(published, 1).await.unwrap();

        assert!(matches!(
            store.create(draft()).await,
            Err(StoreError::ActiveKeyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn stale_version_is_rejected_and_store_is_unchanged() {
        let (store, clock) = store_with_clock();
        let first = store.create(draft()).await.unwrap();
        clock.advance(Duration::minutes(1));
        let mut edited = first.clone();
        edited.source_title = "v2".into();
        let v2 = store.update(edited, 1).await.unwrap();
        assert_eq!(v2.version, 2);
        assert!(v2.updated_at > first.updated_at);

        let mut stale = v2.clone();
        stale.source_title = "stale".into();
        let err = store.update(stale, 1).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionConflict {
                expected: 1,
                actual: 2
            }
        );
        assert_eq!(store.get(&first.id).await.unwrap(), v2);
    }

    #[tokio::test]
    async fn update_cannot_move_onto_a_held_key() {
        let store = store();
        let es = store.create(draft()).await.unwrap();
        let fr = store
            .create(AssignmentDraft {
                target_locale: "fr".into(),
                ..draft()
            })
            .await
            .unwrap();

        let mut moved = fr.clone();
        moved.target_locale = "es".into();
        let err = store.update(moved, fr.version).await.unwrap_err();
        assert!(matches!(err, StoreError::ActiveKeyConflict { existing_id, .. } if existing_id == es.id));
    }

    #[tokio::test]
    async fn returned_records_are_isolated_copies() {
        let store = store();
        let created = store.create(draft()).await.unwrap();

        let mut fetched = store.get(&created.id).await.unwrap();
        fetched.source_title = "mutated".into();
        fetched.due_date = Some(now());

        let mut page = store.list(&ListOptions::default()).await.unwrap();
        page.rows[0].assignee_id = Some("someone".into());

        let again = store.get(&created.id).await.unwrap();
        assert_eq!(again, created);
    }

    #[tokio::test]
    async fn invalid_records_are_rejected() {
        let store = store();
        let err = store
            .create(AssignmentDraft {
                target_locale: "EN".into(),
                ..draft()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = store.get("tas_missing").await.unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                id: "tas_missing".into()
            }
        );
    }

    #[tokio::test]
    async fn supplied_ids_must_be_unique() {
        let store = store();
        store
            .create(AssignmentDraft {
                id: "tas_fixed".into(),
                ..draft()
            })
            .await
            .unwrap();
        let err = store
            .create(AssignmentDraft {
                id: "tas_fixed".into(),
                target_locale: "fr".into(),
                ..draft()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn list_pages_with_stable_ordering() {
        let (store, clock) = store_with_clock();
        for locale in ["de", "fr", "it", "ja", "ko"] {
            store
                .create(AssignmentDraft {
                    target_locale: locale.into(),
                    ..draft()
                })
                .await
                .unwrap();
            clock.advance(Duration::seconds(1));
        }

        let opts = ListOptions::default().page(2, 2);
        let page = store.list(&opts).await.unwrap();
        assert_eq!(page.total, 5);
        let locales: Vec<_> = page.rows.iter().map(|a| a.target_locale.as_str()).collect();
        assert_eq!(locales, vec!["it", "fr"]);

        let by_locale = ListOptions {
            filter: ListFilter {
                search: Some("IT".into()),
                ..Default::default()
            },
            ..ListOptions::default().sorted_by(SortField::TargetLocale, SortOrder::Asc)
        };
        let page = store.list(&by_locale).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows[0].target_locale, "it");
    }

    #[tokio::test]
    async fn concurrent_updates_with_the_same_version_admit_one_winner() {
        let store = store();
        let created = store.create(draft()).await.unwrap();

        let mut handles = Vec::new();
        for n in 0..8 {
            let store = store.clone();
            let mut next = created.clone();
            next.source_title = format!("title {n}");
            handles.push(tokio::spawn(async move { store.update(next, 1).await }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(store.get(&created.id).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn concurrent_strict_creates_admit_one_holder() {
        let store = store();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.create(draft()).await }));
        }
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.len().await, 1);
    }
}
