//! In-memory catalog store.
//!
//! [`CatalogStore`] is the single source of truth for the running session.
//! It is pure state: mutations mark it dirty, and persisting is the
//! caller's job.

use crate::model::PlantRecord;

/// Ordered collection of plant records keyed by `id`.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    records: Vec<PlantRecord>,
    dirty: bool,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection. Uniqueness of ids is not checked.
    pub fn load(&mut self, records: Vec<PlantRecord>) {
        self.records = records;
        self.dirty = true;
    }

    /// Insert or replace by id, keeping the position of an existing record.
    ///
    /// The id is recomputed from the display name first. Returns the id the
    /// record was stored under.
    pub fn upsert(&mut self, mut record: PlantRecord) -> String {
        record.refresh_id();
        let id = record.id.clone();
        match self.position(&id) {
            Some(idx) => self.records[idx] = record,
            None => self.records.push(record),
        }
        self.dirty = true;
        id
    }

    /// Store an edited record in the slot of `previous_id`.
    ///
    /// Used when an edit may have renamed the plant: the record keeps its
    /// place in the list under its new id, and any other record already
    /// holding that id is dropped. Falls back to [`upsert`](Self::upsert)
    /// when `previous_id` is not present.
    pub fn replace(&mut self, previous_id: &str, mut record: PlantRecord) -> String {
        let Some(idx) = self.position(previous_id) else {
            return self.upsert(record);
        };

        record.refresh_id();
        let id = record.id.clone();
        self.records[idx] = record;

        let mut position = 0;
        self.records.retain(|r| {
            let keep = position == idx || r.id != id;
            position += 1;
            keep
        });
        self.dirty = true;
        id
    }

    /// Delete the record with `id`. Absent ids are a no-op and return
    /// `false`.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        let removed = self.records.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    pub fn find(&self, id: &str) -> Option<&PlantRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn all(&self) -> &[PlantRecord] {
        &self.records
    }

    /// Records matching `predicate`, in store order.
    pub fn filter<P>(&self, mut predicate: P) -> Vec<&PlantRecord>
    where
        P: FnMut(&PlantRecord) -> bool,
    {
        self.records.iter().filter(|r| predicate(r)).collect()
    }

    /// Records matching a search/family/kind query.
    pub fn query(&self, query: &CatalogQuery) -> Vec<&PlantRecord> {
        self.filter(|r| query.matches(r))
    }

    /// Distinct non-empty families, sorted.
    pub fn families(&self) -> Vec<&str> {
        self.distinct(|r| &r.family)
    }

    /// Distinct non-empty kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.distinct(|r| &r.kind)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the store changed since the last [`mark_clean`](Self::mark_clean).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn distinct<'a>(&'a self, field: impl Fn(&'a PlantRecord) -> &'a String) -> Vec<&'a str> {
        let mut values: Vec<&str> = self
            .records
            .iter()
            .map(field)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .collect();
        values.sort_unstable();
        values.dedup();
        values
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Linear filter over the catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    /// Case-insensitive substring of the display name, scientific name or
    /// family.
    pub search: Option<String>,
    /// Exact family.
    pub family: Option<String>,
    /// Exact kind.
    pub kind: Option<String>,
}

impl CatalogQuery {
    pub fn matches(&self, record: &PlantRecord) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                [&record.display_name, &record.scientific_name, &record.family]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
        };
        let family_ok = self
            .family
            .as_deref()
            .map_or(true, |f| f.is_empty() || record.family == f);
        let kind_ok = self
            .kind
            .as_deref()
            .map_or(true, |k| k.is_empty() || record.kind == k);

        search_ok && family_ok && kind_ok
    }
}
