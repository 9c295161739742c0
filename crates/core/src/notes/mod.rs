use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    config::EditingConfig,
    mapping::{GridGeometry, PitchRange, Point, Snap},
};

/// Stable note identifier. Allocated from a per-store counter and never
/// reused, even after the note is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// Start position in beats.
    pub beat: f64,
    /// Length in beats.
    pub duration: f64,
    pub pitch: u8,
    pub velocity: u8,
}

impl Note {
    pub fn end(&self) -> f64 {
        self.beat + self.duration
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeEdge {
    Left,
    Right,
}

/// A resize gesture in progress. The right edge is captured when the
/// gesture starts so repeated left-edge moves cannot drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeHandle {
    pub id: NoteId,
    pub edge: ResizeEdge,
    pub fixed_end: f64,
}

/// Limits applied to every note the store creates or edits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteDefaults {
    pub duration: f64,
    pub velocity: u8,
    pub min_duration: f64,
    pub duplicate_epsilon: f64,
}

impl Default for NoteDefaults {
    fn default() -> Self {
        Self::from(&EditingConfig::default())
    }
}

impl From<&EditingConfig> for NoteDefaults {
    fn from(config: &EditingConfig) -> Self {
        Self {
            duration: config.default_duration,
            velocity: config.default_velocity,
            min_duration: config.min_duration,
            duplicate_epsilon: config.duplicate_epsilon,
        }
    }
}

/// Insertion-ordered notes plus the current selection.
///
/// The store has no notion of pixels; hit tests take the grid geometry as an
/// argument. The selection is kept a subset of the stored ids: every removal
/// path prunes it.
#[derive(Debug, Clone)]
pub struct NoteStore {
    notes: Vec<Note>,
    selection: HashSet<NoteId>,
    pitches: PitchRange,
    defaults: NoteDefaults,
    next_id: u64,
}

impl Default for NoteStore {
    fn default() -> Self {
        Self::new(PitchRange::default(), NoteDefaults::default())
    }
}

impl NoteStore {
    pub fn new(pitches: PitchRange, defaults: NoteDefaults) -> Self {
        Self {
            notes: Vec::new(),
            selection: HashSet::new(),
            pitches,
            defaults,
            next_id: 1,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn pitches(&self) -> PitchRange {
        self.pitches
    }

    pub fn defaults(&self) -> NoteDefaults {
        self.defaults
    }

    /// Creates a note with the default duration and velocity and makes it the
    /// sole selection. Returns `None` without touching anything when a note on
    /// the same pitch already starts at (almost) the same beat.
    pub fn add(&mut self, beat: f64, pitch: i32) -> Option<NoteId> {
        let beat = beat.max(0.0);
        let pitch = self.pitches.clamp(pitch);
        let epsilon = self.defaults.duplicate_epsilon;
        if self
            .notes
            .iter()
            .any(|note| note.pitch == pitch && (note.beat - beat).abs() < epsilon)
        {
            tracing::debug!(beat, pitch, "rejected stacked note");
            return None;
        }

        let id = NoteId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.notes.push(Note {
            id,
            beat,
            duration: self.defaults.duration,
            pitch,
            velocity: self.defaults.velocity,
        });
        self.select_only(id);
        tracing::debug!(%id, beat, pitch, "added note");
        Some(id)
    }

    /// First note in store order whose rectangle contains `point`.
    pub fn find_at(&self, grid: &GridGeometry, point: Point) -> Option<&Note> {
        self.notes
            .iter()
            .find(|note| grid.note_rect(note).contains(point))
    }

    pub fn delete_at(&mut self, grid: &GridGeometry, point: Point) -> Option<Note> {
        let id = self.find_at(grid, point)?.id;
        self.remove(id)
    }

    pub fn remove(&mut self, id: NoteId) -> Option<Note> {
        let index = self.notes.iter().position(|note| note.id == id)?;
        self.selection.remove(&id);
        let note = self.notes.remove(index);
        tracing::debug!(%id, "removed note");
        Some(note)
    }

    /// Removes every selected note and returns how many were deleted.
    pub fn delete_selected(&mut self) -> usize {
        let before = self.notes.len();
        let selection = std::mem::take(&mut self.selection);
        self.notes.retain(|note| !selection.contains(&note.id));
        before - self.notes.len()
    }

    /// Translates the selection. Each note is clamped on its own, so notes at
    /// the keyboard edge stop while the rest keep moving.
    pub fn move_selection(&mut self, delta_beat: f64, delta_pitch: i32) {
        let pitches = self.pitches;
        let selection = &self.selection;
        for note in self
            .notes
            .iter_mut()
            .filter(|note| selection.contains(&note.id))
        {
            note.beat = (note.beat + delta_beat).max(0.0);
            note.pitch = pitches.clamp((note.pitch as i32).saturating_add(delta_pitch));
        }
    }

    pub fn begin_resize(&self, id: NoteId, edge: ResizeEdge) -> Option<ResizeHandle> {
        self.get(id).map(|note| ResizeHandle {
            id,
            edge,
            fixed_end: note.end(),
        })
    }

    /// Moves one edge of the note to `pointer_beat`. Snap quantises only the
    /// edge being dragged.
    pub fn resize_selected(&mut self, handle: &ResizeHandle, pointer_beat: f64, snap: &Snap) {
        let min_duration = self.defaults.min_duration;
        let Some(note) = self.notes.iter_mut().find(|note| note.id == handle.id) else {
            return;
        };

        match handle.edge {
            ResizeEdge::Right => {
                let duration = (pointer_beat - note.beat).max(min_duration);
                note.duration = if snap.enabled {
                    snap.beat(duration).max(snap.step()).max(min_duration)
                } else {
                    duration
                };
            }
            ResizeEdge::Left => {
                note.beat = snap.beat(pointer_beat).max(0.0);
                note.duration = (handle.fixed_end - note.beat).max(min_duration);
            }
        }
    }

    pub fn selected_ids(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.selection.iter().copied()
    }

    /// Selected notes in store order.
    pub fn selected_notes(&self) -> impl Iterator<Item = &Note> + '_ {
        self.notes
            .iter()
            .filter(|note| self.selection.contains(&note.id))
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    pub fn is_selected(&self, id: NoteId) -> bool {
        self.selection.contains(&id)
    }

    pub fn select_only(&mut self, id: NoteId) {
        self.selection.clear();
        if self.get(id).is_some() {
            self.selection.insert(id);
        }
    }

    pub fn toggle(&mut self, id: NoteId) {
        if !self.selection.remove(&id) && self.get(id).is_some() {
            self.selection.insert(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn select_all(&mut self) {
        self.selection = self.notes.iter().map(|note| note.id).collect();
    }

    /// Replaces the selection, silently dropping ids the store does not hold.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = NoteId>) {
        let known: HashSet<NoteId> = self.notes.iter().map(|note| note.id).collect();
        self.selection = ids.into_iter().filter(|id| known.contains(id)).collect();
    }
}
