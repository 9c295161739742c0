use serde::Serialize;

use crate::{
    interaction::{InteractionState, Tool},
    mapping::{CanvasSize, GridGeometry, Rect},
    notes::{Note, NoteId, NoteStore},
};

/// A note as the presentation layer should draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteView {
    #[serde(flatten)]
    pub note: Note,
    pub rect: Rect,
    pub selected: bool,
}

/// Everything a renderer needs after a mutating event. Building one never
/// changes editor state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub notes: Vec<NoteView>,
    /// Selected ids in store order.
    pub selection: Vec<NoteId>,
    pub selection_rect: Option<Rect>,
    pub interaction: InteractionState,
    pub tool: Tool,
    pub playing: bool,
    pub playhead_beat: f64,
    pub playhead_x: f64,
    pub time_label: String,
    pub selection_label: String,
    pub zoom_percent: u32,
    pub canvas: CanvasSize,
}

impl RenderSnapshot {
    pub fn note_views(store: &NoteStore, grid: &GridGeometry) -> Vec<NoteView> {
        store
            .notes()
            .iter()
            .map(|note| NoteView {
                note: note.clone(),
                rect: grid.note_rect(note),
                selected: store.is_selected(note.id),
            })
            .collect()
    }

    pub fn selected_notes(&self) -> impl Iterator<Item = &NoteView> + '_ {
        self.notes.iter().filter(|view| view.selected)
    }
}

pub fn selection_label(count: usize) -> String {
    match count {
        1 => "1 note selected".to_string(),
        n => format!("{n} notes selected"),
    }
}
