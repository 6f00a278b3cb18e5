//! Baseline/draft edit buffers.
//!
//! An [`EditSession`] holds the server snapshot of one selected entity (the
//! baseline) next to the user's working copy (the draft). The rules:
//!
//! - Selecting an entity loads the snapshot into both sides; any unsaved
//!   draft for the previously selected entity is dropped without a prompt.
//! - Nothing selected means the editing surface is disabled; updates are
//!   refused with [`CoreError::NotLoaded`].
//! - The save payload is the entity id plus the fields that differ from the
//!   baseline, or `None` when nothing differs.
//! - The server always wins on refresh. A dirty draft displaced by a refresh
//!   is handed back to the caller, who must explicitly restore or drop it.
//! - At most one save per session is in flight.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::diff::{changed_fields, diff_fields, DiffStatus};
use crate::drafts::Draft;
use crate::error::CoreError;

/// The body of an update call: the entity id plus changed fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavePayload {
    pub id: String,
    #[serde(flatten)]
    pub changes: Map<String, Value>,
}

impl SavePayload {
    pub fn contains(&self, field: &str) -> bool {
        self.changes.contains_key(field)
    }

    /// The changed fields as a JSON object, without the id (the id travels in
    /// the request path).
    pub fn body(&self) -> Value {
        Value::Object(self.changes.clone())
    }
}

#[derive(Debug, Clone)]
struct Selected<D> {
    id: String,
    baseline: D,
    draft: D,
}

#[derive(Debug, Clone)]
pub struct EditSession<D: Draft> {
    selected: Option<Selected<D>>,
    saving: bool,
}

impl<D: Draft> Default for EditSession<D> {
    fn default() -> Self {
        Self {
            selected: None,
            saving: false,
        }
    }
}

impl<D: Draft> EditSession<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a fresh snapshot into both baseline and draft.
    pub fn select(&mut self, id: impl Into<String>, snapshot: D) {
        self.selected = Some(Selected {
            id: id.into(),
            baseline: snapshot.clone(),
            draft: snapshot,
        });
        self.saving = false;
    }

    /// Deselect (entity deleted or not loaded).
    pub fn clear(&mut self) {
        self.selected = None;
        self.saving = false;
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_ref().map(|s| s.id.as_str())
    }

    pub fn draft(&self) -> Option<&D> {
        self.selected.as_ref().map(|s| &s.draft)
    }

    pub fn baseline(&self) -> Option<&D> {
        self.selected.as_ref().map(|s| &s.baseline)
    }

    /// `true` when no entity is selected and the editing surface must refuse
    /// input.
    pub fn is_disabled(&self) -> bool {
        self.selected.is_none()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Merge an edit into the draft.
    pub fn update<F>(&mut self, edit: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut D),
    {
        let selected = self
            .selected
            .as_mut()
            .ok_or(CoreError::NotLoaded("no entity selected"))?;
        edit(&mut selected.draft);
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|s| s.draft != s.baseline)
    }

    /// The save payload, or `None` when the draft equals the baseline.
    pub fn pending_payload(&self) -> Option<SavePayload> {
        let selected = self.selected.as_ref()?;
        if selected.draft == selected.baseline {
            return None;
        }

        let changes = changed_fields(&to_fields(&selected.baseline), &to_fields(&selected.draft));
        if changes.is_empty() {
            return None;
        }

        Some(SavePayload {
            id: selected.id.clone(),
            changes,
        })
    }

    /// Tabs holding at least one changed field.
    pub fn changed_tabs(&self) -> BTreeSet<D::Tab> {
        let Some(selected) = self.selected.as_ref() else {
            return BTreeSet::new();
        };

        diff_fields(&to_fields(&selected.baseline), &to_fields(&selected.draft))
            .into_iter()
            .filter(|d| d.status != DiffStatus::Unchanged)
            .map(|d| D::tab_of(&d.field))
            .collect()
    }

    /// Mark a save as in flight and return its payload.
    ///
    /// Returns `Ok(None)` when there is nothing to save (no call should be
    /// made). Fails while another save for this session is in flight.
    pub fn begin_save(&mut self) -> Result<Option<SavePayload>, CoreError> {
        if self.selected.is_none() {
            return Err(CoreError::NotLoaded("no entity selected"));
        }
        if self.saving {
            return Err(CoreError::Conflict("a save is already in progress".into()));
        }

        let payload = self.pending_payload();
        if payload.is_some() {
            self.saving = true;
        }
        Ok(payload)
    }

    /// Clear the in-flight flag. The draft is left as is: after a failure the
    /// user can correct and resubmit; after a success the caller refreshes.
    pub fn finish_save(&mut self) {
        self.saving = false;
    }

    /// Replace the baseline with a server snapshot. Server wins: the draft is
    /// reset to the new baseline. If the old draft had unsaved changes it is
    /// returned so the caller can decide whether to [`restore_draft`] it.
    ///
    /// [`restore_draft`]: Self::restore_draft
    pub fn refresh(&mut self, snapshot: D) -> Option<D> {
        let selected = self.selected.as_mut()?;
        let dirty = selected.draft != selected.baseline;

        selected.baseline = snapshot.clone();
        let previous = std::mem::replace(&mut selected.draft, snapshot);

        dirty.then_some(previous)
    }

    /// Reapply a draft previously returned by [`refresh`](Self::refresh).
    pub fn restore_draft(&mut self, draft: D) -> Result<(), CoreError> {
        self.update(|d| *d = draft)
    }
}

/// Serialize a draft to its field map. Drafts are plain structs of strings,
/// sets, and string-keyed maps, so this always yields an object.
fn to_fields<D: Serialize>(draft: &D) -> Map<String, Value> {
    match serde_json::to_value(draft) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
