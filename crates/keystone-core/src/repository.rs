//! Base repository over an [`EntityStore`].
//!
//! Concrete repositories hold a [`BaseRepository`] as a field and expose
//! domain-specific methods on top of it. The base is a stateless
//! pass-through: it owns no entities and manages no transactions. Errors from
//! the store bubble up unchanged.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{Entity, EntityId, PageWindow, RESERVED_FIELDS, sanitize_pagination};
use crate::ports::{EntityStore, RepositoryError};
use crate::query::{Filter, FindManyOptions, FindOneOptions, Match, Query, validate_field};

/// Partial update addressed by identity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPatch {
    id: EntityId,
    fields: Map<String, Value>,
}

impl EntityPatch {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            fields: Map::new(),
        }
    }

    /// Set a field to a serializable value.
    pub fn set(
        mut self,
        field: impl Into<String>,
        value: impl Serialize,
    ) -> Result<Self, RepositoryError> {
        let value =
            serde_json::to_value(value).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        self.fields.insert(field.into(), value);
        Ok(self)
    }

    pub const fn id(&self) -> &EntityId {
        &self.id
    }

    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Fields to write, without the keys that must never change.
    fn into_writable(self) -> (EntityId, Map<String, Value>) {
        let mut fields = self.fields;
        for reserved in RESERVED_FIELDS {
            fields.remove(reserved);
        }
        (self.id, fields)
    }
}

/// CRUD and query operations shared by every repository.
pub struct BaseRepository<T: Entity> {
    store: Arc<dyn EntityStore<T>>,
}

impl<T: Entity> Clone for BaseRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<T: Entity> BaseRepository<T> {
    pub fn new(store: Arc<dyn EntityStore<T>>) -> Self {
        Self { store }
    }

    /// Upsert by identity.
    pub async fn save(&self, entity: &T) -> Result<(), RepositoryError> {
        self.store.upsert(std::slice::from_ref(entity)).await
    }

    /// Point lookup by identity. `None` means absent.
    pub async fn find_by_id(&self, id: &EntityId) -> Result<Option<T>, RepositoryError> {
        self.store.find_by_id(id).await
    }

    pub async fn delete(&self, id: &EntityId) -> Result<(), RepositoryError> {
        self.store.delete_by_ids(std::slice::from_ref(id)).await
    }

    /// Remove several entities by identity. An empty slice is a no-op.
    pub async fn delete_many(&self, ids: &[EntityId]) -> Result<(), RepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.store.delete_by_ids(ids).await
    }

    /// Remove every entity whose `field` matches a value or any of a list.
    pub async fn delete_many_by(
        &self,
        field: &str,
        values: impl Into<Match>,
    ) -> Result<(), RepositoryError> {
        validate_field(field)?;
        let filter = Filter::new(field, values);
        if filter.matcher.is_empty() {
            return Ok(());
        }
        self.store.delete_where(&filter).await
    }

    /// Merge-write the patch, then re-read the entity.
    ///
    /// Fails with [`RepositoryError::NotFound`] when nothing exists at the
    /// patch's identity after the write: an update aimed at a missing id is
    /// a caller bug.
    ///
    /// A patch the store cannot apply without breaking the stored document
    /// fails with [`RepositoryError::Serialization`] and writes nothing.
    pub async fn update_one(&self, patch: EntityPatch) -> Result<T, RepositoryError> {
        let (id, fields) = patch.into_writable();
        for field in fields.keys() {
            validate_field(field)?;
        }

        self.store.merge(&id, fields).await?;

        self.store
            .find_by_id(&id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("{} {id} after update", T::COLLECTION)))
    }

    /// First entity matching the options.
    pub async fn find_one(&self, options: &FindOneOptions) -> Result<Option<T>, RepositoryError> {
        let query = Query::from_find_one(options)?;
        if query.is_unsatisfiable() {
            return Ok(None);
        }
        self.store.find_one(&query).await
    }

    /// Every entity matching the options, in store order.
    pub async fn find(&self, options: &FindOneOptions) -> Result<Vec<T>, RepositoryError> {
        let query = Query::from_find_one(options)?;
        if query.is_unsatisfiable() {
            return Ok(Vec::new());
        }
        self.store.find(&query).await
    }

    /// One page of matching entities and the total count ignoring the page.
    pub async fn find_and_count(
        &self,
        options: &FindManyOptions,
    ) -> Result<(Vec<T>, u64), RepositoryError> {
        let query = Query::from_find_many(options)?;
        if query.is_unsatisfiable() {
            return Ok((Vec::new(), 0));
        }
        let items = self.store.find(&query).await?;
        let total = self.store.count(&query.filters).await?;
        Ok((items, total))
    }

    /// Bulk upsert. An empty slice issues no write.
    pub async fn create_many(&self, entities: &[T]) -> Result<(), RepositoryError> {
        if entities.is_empty() {
            return Ok(());
        }
        self.store.upsert(entities).await
    }

    /// Sanitized pagination in store-facing `limit`/`offset` terms.
    pub fn format_pagination(&self, page: f64, page_size: f64) -> PageWindow {
        PageWindow::from(sanitize_pagination(page, page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityMeta, PaginationParams};
    use crate::query::OrderBy;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(flatten)]
        meta: EntityMeta,
        title: String,
        owner: String,
    }

    impl Note {
        fn new(title: &str, owner: &str) -> Self {
            Self {
                meta: EntityMeta::new(),
                title: title.to_string(),
                owner: owner.to_string(),
            }
        }
    }

    impl Entity for Note {
        const COLLECTION: &'static str = "notes";

        fn meta(&self) -> &EntityMeta {
            &self.meta
        }
    }

    /// In-memory store that records how many calls reach it.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<Value>>,
        writes: AtomicUsize,
        deletes: AtomicUsize,
        failing: Mutex<Option<&'static str>>,
    }

    impl MemoryStore {
        fn matches(doc: &Value, filters: &[Filter]) -> bool {
            filters.iter().all(|f| {
                let field = doc.get(&f.field).unwrap_or(&Value::Null);
                match &f.matcher {
                    Match::One(v) => field == v,
                    Match::Any(vs) => vs.iter().any(|v| field == v),
                }
            })
        }

        fn fail_on(&self, op: &'static str) {
            *self.failing.lock().unwrap() = Some(op);
        }

        fn check(&self, op: &'static str) -> Result<(), RepositoryError> {
            if *self.failing.lock().unwrap() == Some(op) {
                return Err(RepositoryError::Storage(format!("{op} unavailable")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl EntityStore<Note> for MemoryStore {
        async fn upsert(&self, entities: &[Note]) -> Result<(), RepositoryError> {
            self.check("upsert")?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            for entity in entities {
                let doc = serde_json::to_value(entity).unwrap();
                rows.retain(|r| r["id"] != doc["id"]);
                rows.push(doc);
            }
            Ok(())
        }

        async fn find_by_id(&self, id: &EntityId) -> Result<Option<Note>, RepositoryError> {
            self.check("find_by_id")?;
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .find(|r| r["id"] == id.as_str())
                .map(|r| serde_json::from_value(r.clone()).unwrap()))
        }

        async fn delete_by_ids(&self, ids: &[EntityId]) -> Result<(), RepositoryError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            rows.retain(|r| !ids.iter().any(|id| r["id"] == id.as_str()));
            Ok(())
        }

        async fn delete_where(&self, filter: &Filter) -> Result<(), RepositoryError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            rows.retain(|r| !Self::matches(r, std::slice::from_ref(filter)));
            Ok(())
        }

        async fn merge(
            &self,
            id: &EntityId,
            fields: Map<String, Value>,
        ) -> Result<(), RepositoryError> {
            self.check("merge")?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            if let Some(Value::Object(doc)) = rows.iter_mut().find(|r| r["id"] == id.as_str()) {
                doc.extend(fields);
            }
            Ok(())
        }

        async fn find_one(&self, query: &Query) -> Result<Option<Note>, RepositoryError> {
            Ok(self.find(query).await?.into_iter().next())
        }

        async fn find(&self, query: &Query) -> Result<Vec<Note>, RepositoryError> {
            let rows = self.rows.lock().unwrap();
            let matching = rows
                .iter()
                .filter(|r| Self::matches(r, &query.filters))
                .map(|r| serde_json::from_value(r.clone()).unwrap());
            let items: Vec<Note> = match query.window {
                Some(w) => matching
                    .skip(usize::try_from(w.offset).unwrap())
                    .take(usize::try_from(w.limit).unwrap())
                    .collect(),
                None => matching.collect(),
            };
            Ok(items)
        }

        async fn count(&self, filters: &[Filter]) -> Result<u64, RepositoryError> {
            self.check("count")?;
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().filter(|r| Self::matches(r, filters)).count() as u64)
        }
    }

    fn repo() -> (Arc<MemoryStore>, BaseRepository<Note>) {
        let store = Arc::new(MemoryStore::default());
        let repo = BaseRepository::new(Arc::clone(&store) as Arc<dyn EntityStore<Note>>);
        (store, repo)
    }

    #[tokio::test]
    async fn test_save_then_find_by_id() {
        let (_, repo) = repo();
        let note = Note::new("hello", "ana");
        repo.save(&note).await.unwrap();

        let found = repo.find_by_id(note.id()).await.unwrap();
        assert_eq!(found, Some(note));
    }

    #[tokio::test]
    async fn test_find_by_id_absent_is_none() {
        let (_, repo) = repo();
        let found = repo.find_by_id(&EntityId::generate()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_create_many_empty_issues_no_write() {
        let (store, repo) = repo();
        repo.create_many(&[]).await.unwrap();
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);

        repo.create_many(&[Note::new("a", "x"), Note::new("b", "x")])
            .await
            .unwrap();
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert_eq!(store.rows.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_one_missing_id_is_not_found() {
        let (_, repo) = repo();
        let patch = EntityPatch::new(EntityId::generate())
            .set("title", "ghost")
            .unwrap();

        let err = repo.update_one(patch).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_one_returns_merged_entity() {
        let (_, repo) = repo();
        let note = Note::new("draft", "ana");
        repo.save(&note).await.unwrap();

        let patch = EntityPatch::new(note.id().clone())
            .set("title", "final")
            .unwrap();
        let updated = repo.update_one(patch).await.unwrap();

        assert_eq!(updated.title, "final");
        assert_eq!(updated.owner, "ana");
        assert_eq!(updated.id(), note.id());
    }

    #[tokio::test]
    async fn test_update_one_cannot_change_identity() {
        let (_, repo) = repo();
        let note = Note::new("draft", "ana");
        repo.save(&note).await.unwrap();

        let patch = EntityPatch::new(note.id().clone())
            .set("id", EntityId::generate())
            .unwrap()
            .set("created_at", "1970-01-01T00:00:00Z")
            .unwrap();
        let updated = repo.update_one(patch).await.unwrap();

        assert_eq!(updated.id(), note.id());
        assert_eq!(updated.meta().created_at(), note.meta().created_at());
    }

    #[tokio::test]
    async fn test_update_one_rejects_bad_field() {
        let (store, repo) = repo();
        let patch = EntityPatch::new(EntityId::generate())
            .set("title; DROP", "x")
            .unwrap();
        assert!(matches!(
            repo.update_one(patch).await,
            Err(RepositoryError::InvalidQuery(_))
        ));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delete_single_and_many() {
        let (store, repo) = repo();
        let a = Note::new("a", "x");
        let b = Note::new("b", "x");
        let c = Note::new("c", "x");
        repo.create_many(&[a.clone(), b.clone(), c.clone()])
            .await
            .unwrap();

        repo.delete(a.id()).await.unwrap();
        repo.delete_many(&[b.id().clone(), c.id().clone()])
            .await
            .unwrap();
        repo.delete_many(&[]).await.unwrap();

        assert!(store.rows.lock().unwrap().is_empty());
        assert_eq!(store.deletes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delete_many_by_secondary_key() {
        let (store, repo) = repo();
        repo.create_many(&[
            Note::new("a", "ana"),
            Note::new("b", "bob"),
            Note::new("c", "cy"),
        ])
        .await
        .unwrap();

        repo.delete_many_by("owner", "ana").await.unwrap();
        repo.delete_many_by("owner", vec!["bob".to_string()])
            .await
            .unwrap();
        repo.delete_many_by("owner", Vec::<String>::new())
            .await
            .unwrap();

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["owner"], "cy");
        assert_eq!(store.deletes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_find_one_and_find() {
        let (_, repo) = repo();
        repo.create_many(&[Note::new("a", "ana"), Note::new("b", "ana")])
            .await
            .unwrap();

        let by_ana = FindOneOptions::new().filter(Filter::eq("owner", "ana"));
        assert_eq!(repo.find(&by_ana).await.unwrap().len(), 2);

        let by_title = FindOneOptions::new().filter(Filter::eq("title", "b"));
        let found = repo.find_one(&by_title).await.unwrap().unwrap();
        assert_eq!(found.title, "b");

        let nobody = FindOneOptions::new().filter(Filter::eq("owner", "zed"));
        assert!(repo.find_one(&nobody).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_and_count_ignores_window_for_total() {
        let (_, repo) = repo();
        let notes: Vec<Note> = (0..25).map(|i| Note::new(&format!("n{i}"), "ana")).collect();
        repo.create_many(&notes).await.unwrap();

        let options = FindManyOptions::new()
            .filter(Filter::eq("owner", "ana"))
            .order_by(OrderBy::asc("title"))
            .paginate(PaginationParams::new(3.0, 10.0));
        let (items, total) = repo.find_and_count(&options).await.unwrap();

        assert_eq!(items.len(), 5);
        assert_eq!(total, 25);
    }

    #[tokio::test]
    async fn test_any_of_null_matches_missing_field() {
        let (_, repo) = repo();
        repo.create_many(&[Note::new("a", "ana"), Note::new("b", "bob")])
            .await
            .unwrap();

        let unset = FindOneOptions::new().filter(Filter::any_of("archived", [Value::Null]));
        assert_eq!(repo.find(&unset).await.unwrap().len(), 2);

        let ana_or_unset = FindOneOptions::new()
            .filter(Filter::any_of("owner", [Value::Null, Value::from("ana")]));
        let found = repo.find(&ana_or_unset).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].owner, "ana");
    }

    #[tokio::test]
    async fn test_update_one_propagates_merge_failure() {
        let (store, repo) = repo();
        let note = Note::new("draft", "ana");
        repo.save(&note).await.unwrap();
        store.fail_on("merge");

        let patch = EntityPatch::new(note.id().clone())
            .set("title", "final")
            .unwrap();
        let err = repo.update_one(patch).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Storage(ref msg) if msg == "merge unavailable"));
        assert_eq!(store.rows.lock().unwrap()[0]["title"], "draft");
    }

    #[tokio::test]
    async fn test_update_one_propagates_reread_failure() {
        let (store, repo) = repo();
        let note = Note::new("draft", "ana");
        repo.save(&note).await.unwrap();
        store.fail_on("find_by_id");

        let patch = EntityPatch::new(note.id().clone())
            .set("title", "final")
            .unwrap();
        let err = repo.update_one(patch).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Storage(ref msg) if msg == "find_by_id unavailable"));
    }

    #[tokio::test]
    async fn test_save_and_create_many_propagate_upsert_failure() {
        let (store, repo) = repo();
        store.fail_on("upsert");

        let err = repo.save(&Note::new("a", "ana")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Storage(ref msg) if msg == "upsert unavailable"));

        let err = repo
            .create_many(&[Note::new("b", "ana"), Note::new("c", "ana")])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Storage(ref msg) if msg == "upsert unavailable"));

        assert!(store.rows.lock().unwrap().is_empty());
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_find_and_count_propagates_count_failure() {
        let (store, repo) = repo();
        repo.create_many(&[Note::new("a", "ana"), Note::new("b", "ana")])
            .await
            .unwrap();
        store.fail_on("count");

        let options = FindManyOptions::new().filter(Filter::eq("owner", "ana"));
        let result = repo.find_and_count(&options).await;

        assert!(matches!(
            result,
            Err(RepositoryError::Storage(ref msg)) if msg == "count unavailable"
        ));
    }

    #[test]
    fn test_format_pagination_examples() {
        let (_, repo) = repo();
        assert_eq!(
            repo.format_pagination(0.0, 250.0),
            PageWindow {
                page: 1,
                page_size: 100,
                limit: 100,
                offset: 0,
            }
        );
        assert_eq!(
            repo.format_pagination(3.0, 10.0),
            PageWindow {
                page: 3,
                page_size: 10,
                limit: 10,
                offset: 20,
            }
        );
    }
}
