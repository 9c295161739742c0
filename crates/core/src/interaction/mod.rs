//! Pointer gesture state machine.
//!
//! `Idle -> {Dragging, Resizing, BoxSelecting} -> Idle`. A gesture lives from
//! pointer-down to the matching pointer-up (or the pointer leaving the grid);
//! nothing about it outlives the release.

use serde::{Deserialize, Serialize};

use crate::{
    mapping::{pitch_name, GridGeometry, Point, Rect, Snap},
    notes::{Note, NoteId, NoteStore, ResizeEdge, ResizeHandle},
};

/// Editing tools available in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Select,
    #[default]
    Pencil,
    Erase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    /// Context button; always erases.
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Additive selection.
    pub shift: bool,
    /// Platform accelerator (Ctrl or Cmd).
    pub accel: bool,
}

/// Pointer sample in grid pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerInput {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub button: PointerButton,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl PointerInput {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn secondary(mut self) -> Self {
        self.button = PointerButton::Secondary;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    pub fn pos(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging,
    Resizing,
    BoxSelecting,
}

/// Cursor glyph the presentation layer should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorHint {
    Default,
    Crosshair,
    ResizeLeft,
    ResizeRight,
}

/// Read-only description of what lies under the pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hover {
    /// Whole beat under the pointer.
    pub beat_index: i64,
    pub pitch: i32,
    /// `None` outside the keyboard range.
    pub pitch_name: Option<String>,
    pub note: Option<NoteId>,
    pub resize_edge: Option<ResizeEdge>,
    pub cursor: CursorHint,
}

/// Everything a gesture reads or edits.
pub struct EditContext<'a> {
    pub store: &'a mut NoteStore,
    pub grid: &'a GridGeometry,
    pub snap: Snap,
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Dragging {
        /// Pointer position that the selection currently corresponds to.
        anchor: Point,
    },
    Resizing {
        handle: ResizeHandle,
    },
    BoxSelecting {
        anchor: Point,
        current: Point,
        /// Selection held before the gesture; kept on release when the
        /// gesture started with shift.
        base: Vec<NoteId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionEngine {
    tool: Tool,
    gesture: Option<Gesture>,
    edge_threshold_px: f64,
}

impl Default for InteractionEngine {
    fn default() -> Self {
        Self::new(6.0)
    }
}

impl InteractionEngine {
    pub fn new(edge_threshold_px: f64) -> Self {
        Self {
            tool: Tool::default(),
            gesture: None,
            edge_threshold_px,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switching tools abandons any gesture in flight.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool != tool {
            self.cancel();
        }
        self.tool = tool;
    }

    /// Drops the gesture in flight without applying it. Needed whenever the
    /// pixel space the gesture was anchored in changes.
    pub fn cancel(&mut self) {
        if let Some(gesture) = self.gesture.take() {
            tracing::debug!(?gesture, "gesture cancelled");
        }
    }

    pub fn state(&self) -> InteractionState {
        match self.gesture {
            None => InteractionState::Idle,
            Some(Gesture::Dragging { .. }) => InteractionState::Dragging,
            Some(Gesture::Resizing { .. }) => InteractionState::Resizing,
            Some(Gesture::BoxSelecting { .. }) => InteractionState::BoxSelecting,
        }
    }

    /// Live rubber-band rectangle, normalised.
    pub fn selection_rect(&self) -> Option<Rect> {
        match &self.gesture {
            Some(Gesture::BoxSelecting {
                anchor, current, ..
            }) => Some(Rect::from_two_points(*anchor, *current)),
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, ctx: EditContext<'_>, input: &PointerInput) -> InteractionState {
        let EditContext { store, grid, snap } = ctx;
        let pos = input.pos();
        self.gesture = None;
        if !pos.is_finite() {
            return self.state();
        }

        if input.button == PointerButton::Secondary {
            store.delete_at(grid, pos);
            return self.state();
        }

        let hit = store
            .find_at(grid, pos)
            .map(|note| (note.id, self.edge_of(grid, note, pos.x)));

        match self.tool {
            Tool::Erase => {
                store.delete_at(grid, pos);
            }
            Tool::Pencil => match hit {
                Some((id, Some(edge))) => self.begin_resize(store, id, edge),
                Some((id, None)) => {
                    store.select_only(id);
                    self.gesture = Some(Gesture::Dragging { anchor: pos });
                }
                None => {
                    let target = grid.pixel_to_musical(pos);
                    if store.add(snap.beat(target.beat), target.pitch).is_some() {
                        self.gesture = Some(Gesture::Dragging { anchor: pos });
                    }
                }
            },
            Tool::Select => match hit {
                Some((id, edge)) => {
                    if input.modifiers.shift {
                        store.toggle(id);
                    } else {
                        store.select_only(id);
                    }
                    match edge {
                        Some(edge) => self.begin_resize(store, id, edge),
                        None => self.gesture = Some(Gesture::Dragging { anchor: pos }),
                    }
                }
                None => {
                    let base = if input.modifiers.shift {
                        store.selected_ids().collect()
                    } else {
                        store.clear_selection();
                        Vec::new()
                    };
                    self.gesture = Some(Gesture::BoxSelecting {
                        anchor: pos,
                        current: pos,
                        base,
                    });
                }
            },
        }

        tracing::debug!(tool = ?self.tool, state = ?self.state(), x = pos.x, y = pos.y, "pointer down");
        self.state()
    }

    pub fn pointer_move(&mut self, ctx: EditContext<'_>, input: &PointerInput) {
        let EditContext { store, grid, snap } = ctx;
        let pos = input.pos();
        if !pos.is_finite() {
            return;
        }

        match &mut self.gesture {
            None => {}
            Some(Gesture::Resizing { handle }) => {
                store.resize_selected(handle, grid.x_to_beat(pos.x), &snap);
            }
            Some(Gesture::Dragging { anchor }) => {
                let delta_beat = snap.beat(grid.x_to_beat(pos.x - anchor.x));
                let delta_pitch = (-(pos.y - anchor.y) / grid.pitch_cell_height()).round() as i32;
                if delta_beat != 0.0 || delta_pitch != 0 {
                    store.move_selection(delta_beat, delta_pitch);
                    // Advance only by what was applied; the remainder carries
                    // into the next sample.
                    anchor.x += grid.beat_to_x(delta_beat);
                    anchor.y -= delta_pitch as f64 * grid.pitch_cell_height();
                }
            }
            Some(Gesture::BoxSelecting { current, .. }) => *current = pos,
        }
    }

    /// Ends whatever gesture is active. Also used when the pointer leaves the
    /// grid, so no mode can outlive a release.
    pub fn pointer_up(&mut self, ctx: EditContext<'_>) {
        let EditContext { store, grid, .. } = ctx;
        if let Some(Gesture::BoxSelecting {
            anchor,
            current,
            base,
        }) = self.gesture.take()
        {
            let rect = Rect::from_two_points(anchor, current);
            let hits: Vec<NoteId> = store
                .notes()
                .iter()
                .filter(|note| grid.note_rect(note).intersects(&rect))
                .map(|note| note.id)
                .collect();
            tracing::debug!(hits = hits.len(), additive = !base.is_empty(), "box selection");
            store.set_selection(base.into_iter().chain(hits));
        }
    }

    /// Which edge of the note under `pos`, if any, a press would resize.
    pub fn resize_edge_at(&self, store: &NoteStore, grid: &GridGeometry, pos: Point) -> Option<ResizeEdge> {
        store
            .find_at(grid, pos)
            .and_then(|note| self.edge_of(grid, note, pos.x))
    }

    pub fn hover(&self, store: &NoteStore, grid: &GridGeometry, pos: Point) -> Hover {
        let musical = grid.pixel_to_musical(pos);
        let note = store.find_at(grid, pos);
        let resize_edge = note.and_then(|note| self.edge_of(grid, note, pos.x));
        let cursor = match (resize_edge, self.tool) {
            (Some(ResizeEdge::Left), _) => CursorHint::ResizeLeft,
            (Some(ResizeEdge::Right), _) => CursorHint::ResizeRight,
            (None, Tool::Pencil | Tool::Erase) => CursorHint::Crosshair,
            (None, Tool::Select) => CursorHint::Default,
        };
        let pitches = grid.pitches();

        Hover {
            beat_index: musical.beat.floor() as i64,
            pitch: musical.pitch,
            pitch_name: pitches
                .contains(musical.pitch)
                .then(|| pitch_name(musical.pitch as u8)),
            note: note.map(|note| note.id),
            resize_edge,
            cursor,
        }
    }

    fn begin_resize(&mut self, store: &NoteStore, id: NoteId, edge: ResizeEdge) {
        self.gesture = store
            .begin_resize(id, edge)
            .map(|handle| Gesture::Resizing { handle });
    }

    /// Nearer edge within the threshold; ties go to the right edge.
    fn edge_of(&self, grid: &GridGeometry, note: &Note, x: f64) -> Option<ResizeEdge> {
        let rect = grid.note_rect(note);
        let left = (x - rect.min.x).abs();
        let right = (x - rect.max.x).abs();
        if left.min(right) > self.edge_threshold_px {
            None
        } else if left < right {
            Some(ResizeEdge::Left)
        } else {
            Some(ResizeEdge::Right)
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::mapping::PitchRange;

    struct Fixture {
        store: NoteStore,
        grid: GridGeometry,
        snap: Snap,
        engine: InteractionEngine,
    }

    impl Fixture {
        fn new(tool: Tool) -> Self {
            let mut engine = InteractionEngine::default();
            engine.set_tool(tool);
            Self {
                store: NoteStore::default(),
                grid: GridGeometry::new(100.0, 20.0, PitchRange::piano()).unwrap(),
                snap: Snap::default(),
                engine,
            }
        }

        fn ctx(&mut self) -> (&mut InteractionEngine, EditContext<'_>) {
            (
                &mut self.engine,
                EditContext {
                    store: &mut self.store,
                    grid: &self.grid,
                    snap: self.snap,
                },
            )
        }

        fn down(&mut self, input: PointerInput) -> InteractionState {
            let (engine, ctx) = self.ctx();
            engine.pointer_down(ctx, &input)
        }

        fn drag_to(&mut self, x: f64, y: f64) {
            let (engine, ctx) = self.ctx();
            engine.pointer_move(ctx, &PointerInput::at(x, y));
        }

        fn up(&mut self) {
            let (engine, ctx) = self.ctx();
            engine.pointer_up(ctx);
        }

        /// y coordinate inside the row of `pitch`.
        fn row(&self, pitch: u8) -> f64 {
            self.grid.row_top(pitch as i32) + 10.0
        }

        fn selected(&self) -> Vec<NoteId> {
            let mut ids: Vec<_> = self.store.selected_ids().collect();
            ids.sort();
            ids
        }
    }

    #[test]
    fn pencil_click_creates_a_snapped_selected_note() {
        let mut f = Fixture::new(Tool::Pencil);

        let state = f.down(PointerInput::at(150.0, 40.0));
        assert_eq!(state, InteractionState::Dragging);

        let note = &f.store.notes()[0];
        assert_relative_eq!(note.beat, 1.5);
        assert_eq!(note.pitch, 21 + (88 - 1 - 2));
        assert_eq!(f.selected(), vec![note.id]);
    }

    #[test]
    fn pencil_snaps_off_grid_clicks() {
        let mut f = Fixture::new(Tool::Pencil);
        f.down(PointerInput::at(161.0, 40.0));
        assert_relative_eq!(f.store.notes()[0].beat, 1.5);

        f.up();
        f.snap.enabled = false;
        f.down(PointerInput::at(461.0, 40.0));
        assert_relative_eq!(f.store.notes()[1].beat, 4.61);
    }

    #[test]
    fn pencil_on_existing_note_drags_instead_of_stacking() {
        let mut f = Fixture::new(Tool::Pencil);
        f.down(PointerInput::at(100.0, f.row(60)));
        f.up();
        let id = f.store.notes()[0].id;
        f.store.clear_selection();

        assert_eq!(f.down(PointerInput::at(150.0, f.row(60))), InteractionState::Dragging);
        assert_eq!(f.store.len(), 1);
        assert_eq!(f.selected(), vec![id]);

        f.drag_to(250.0, f.row(62));
        let note = f.store.get(id).unwrap();
        assert_relative_eq!(note.beat, 2.0);
        assert_eq!(note.pitch, 62);
    }

    #[test]
    fn pencil_near_an_edge_resizes_the_nearer_edge() {
        let mut f = Fixture::new(Tool::Pencil);
        let id = f.store.add(1.0, 60).unwrap();
        let y = f.row(60);

        assert_eq!(f.down(PointerInput::at(196.0, y)), InteractionState::Resizing);
        f.drag_to(330.0, y);
        assert_relative_eq!(f.store.get(id).unwrap().duration, 2.25);
        f.up();

        assert_eq!(f.down(PointerInput::at(104.0, y)), InteractionState::Resizing);
        f.drag_to(50.0, y);
        let note = f.store.get(id).unwrap();
        assert_relative_eq!(note.beat, 0.5);
        assert_relative_eq!(note.end(), 3.25);
    }

    #[test]
    fn equidistant_edges_resize_the_right_edge() {
        let mut f = Fixture::new(Tool::Select);
        let id = f.store.add(0.0, 60).unwrap();
        let handle = f.store.begin_resize(id, ResizeEdge::Right).unwrap();
        f.store.resize_selected(&handle, 0.1, &Snap::off());

        // 10px wide note: the middle is 5px from both edges.
        let pos = Point::new(5.0, f.row(60));
        assert_eq!(f.engine.resize_edge_at(&f.store, &f.grid, pos), Some(ResizeEdge::Right));
    }

    #[test]
    fn erase_and_secondary_button_delete_without_a_gesture() {
        let mut f = Fixture::new(Tool::Erase);
        f.store.add(0.0, 60).unwrap();
        let keep = f.store.add(3.0, 60).unwrap();

        assert_eq!(f.down(PointerInput::at(50.0, f.row(60))), InteractionState::Idle);
        assert_eq!(f.store.len(), 1);

        f.engine.set_tool(Tool::Pencil);
        assert_eq!(f.down(PointerInput::at(20.0, f.row(60)).secondary()), InteractionState::Idle);
        assert_eq!(f.store.len(), 1);
        let state = f.down(PointerInput::at(350.0, f.row(60)).secondary());
        assert_eq!(state, InteractionState::Idle);
        assert!(f.store.get(keep).is_none());
        assert_eq!(f.selected(), Vec::<NoteId>::new());
    }

    #[test]
    fn select_tool_replaces_or_toggles_with_shift() {
        let mut f = Fixture::new(Tool::Select);
        let a = f.store.add(0.0, 60).unwrap();
        let b = f.store.add(2.0, 60).unwrap();
        let y = f.row(60);

        f.down(PointerInput::at(50.0, y));
        f.up();
        assert_eq!(f.selected(), vec![a]);

        f.down(PointerInput::at(250.0, y).with_shift());
        f.up();
        assert_eq!(f.selected(), vec![a, b]);

        f.down(PointerInput::at(50.0, y).with_shift());
        f.up();
        assert_eq!(f.selected(), vec![b]);
    }

    #[test]
    fn dragging_moves_the_whole_selection() {
        let mut f = Fixture::new(Tool::Select);
        let a = f.store.add(0.0, 60).unwrap();
        let b = f.store.add(2.0, 64).unwrap();
        f.store.set_selection([a, b]);

        f.down(PointerInput::at(250.0, f.row(64)).with_shift());
        // Shift toggled `b` off; drag moves what remains selected.
        assert_eq!(f.selected(), vec![a]);
        f.store.set_selection([a, b]);

        f.drag_to(350.0, f.row(64) - 40.0);
        assert_relative_eq!(f.store.get(a).unwrap().beat, 1.0);
        assert_eq!(f.store.get(a).unwrap().pitch, 62);
        assert_relative_eq!(f.store.get(b).unwrap().beat, 3.0);
        assert_eq!(f.store.get(b).unwrap().pitch, 66);
    }

    #[test]
    fn slow_drags_accumulate_below_the_snap_step() {
        let mut f = Fixture::new(Tool::Select);
        let id = f.store.add(1.0, 60).unwrap();
        let y = f.row(60);
        f.down(PointerInput::at(150.0, y));

        // 5px per sample is 0.05 beats, far below the 0.25 grid.
        for step in 1..=10 {
            f.drag_to(150.0 + step as f64 * 5.0, y);
        }
        assert_relative_eq!(f.store.get(id).unwrap().beat, 1.5);
    }

    #[test]
    fn drag_clamps_at_grid_edges() {
        let mut f = Fixture::new(Tool::Select);
        let id = f.store.add(0.5, 107).unwrap();
        f.down(PointerInput::at(100.0, f.row(107)));

        f.drag_to(-400.0, -400.0);
        let note = f.store.get(id).unwrap();
        assert_relative_eq!(note.beat, 0.0);
        assert_eq!(note.pitch, 108);
    }

    #[test]
    fn drag_far_off_grid_clamps_without_overflow() {
        let mut f = Fixture::new(Tool::Select);
        let id = f.store.add(1.0, 60).unwrap();
        f.down(PointerInput::at(150.0, f.row(60)));

        f.drag_to(150.0, -1.0e12);
        assert_eq!(f.store.get(id).unwrap().pitch, 108);
        f.drag_to(150.0, 1.0e12);
        assert_eq!(f.store.get(id).unwrap().pitch, 21);
        assert_relative_eq!(f.store.get(id).unwrap().beat, 1.0);
    }

    #[test]
    fn pencil_far_above_the_grid_creates_on_the_top_row() {
        let mut f = Fixture::new(Tool::Pencil);
        f.down(PointerInput::at(0.0, -1.0e12));
        f.up();

        assert_eq!(f.store.notes()[0].pitch, 108);
    }

    #[test]
    fn non_finite_samples_are_ignored() {
        let mut f = Fixture::new(Tool::Select);
        let id = f.store.add(5.0, 60).unwrap();
        let y = f.row(60);
        f.down(PointerInput::at(550.0, y));

        f.drag_to(f64::NAN, y);
        f.drag_to(550.0, f64::INFINITY);
        assert_relative_eq!(f.store.get(id).unwrap().beat, 5.0);
        assert_eq!(f.store.get(id).unwrap().pitch, 60);

        // The anchor survived, so the drag continues normally.
        f.drag_to(650.0, y);
        assert_relative_eq!(f.store.get(id).unwrap().beat, 6.0);
        f.up();

        let mut pencil = Fixture::new(Tool::Pencil);
        assert_eq!(
            pencil.down(PointerInput::at(f64::NAN, 10.0)),
            InteractionState::Idle
        );
        assert!(pencil.store.is_empty());
    }

    #[test]
    fn box_selection_is_inclusive_of_partial_overlap() {
        let mut f = Fixture::new(Tool::Select);
        let a = f.store.add(1.0, 60).unwrap();
        let b = f.store.add(2.0, 61).unwrap();
        let c = f.store.add(3.5, 60).unwrap();
        let outside = f.store.add(8.0, 60).unwrap();
        f.store.select_only(outside);

        let top = f.grid.row_top(61) - 5.0;
        let bottom = f.grid.row_top(60) + 25.0;
        assert_eq!(f.down(PointerInput::at(90.0, top)), InteractionState::BoxSelecting);
        assert_eq!(f.selected(), Vec::<NoteId>::new());

        f.drag_to(400.0, bottom);
        let rect = f.engine.selection_rect().unwrap();
        assert_relative_eq!(rect.min.x, 90.0);
        assert_relative_eq!(rect.max.x, 400.0);

        f.up();
        assert_eq!(f.engine.state(), InteractionState::Idle);
        assert!(f.engine.selection_rect().is_none());
        assert_eq!(f.selected(), vec![a, b, c]);
    }

    #[test]
    fn box_selection_counts_touching_edges() {
        let mut f = Fixture::new(Tool::Select);
        let id = f.store.add(1.0, 60).unwrap();

        // Drag from below-right up to the exact bottom-right corner of the note.
        let corner_y = f.grid.row_top(60) + 20.0;
        f.down(PointerInput::at(400.0, corner_y + 100.0));
        f.drag_to(200.0, corner_y);
        f.up();
        assert_eq!(f.selected(), vec![id]);
    }

    #[test]
    fn shift_box_selection_adds_to_the_selection() {
        let mut f = Fixture::new(Tool::Select);
        let a = f.store.add(0.0, 60).unwrap();
        let b = f.store.add(5.0, 60).unwrap();
        f.store.select_only(a);

        f.down(PointerInput::at(450.0, 0.0).with_shift());
        assert_eq!(f.selected(), vec![a]);
        f.drag_to(650.0, f.row(60));
        f.up();
        assert_eq!(f.selected(), vec![a, b]);
    }

    #[test]
    fn release_resets_every_gesture() {
        let mut f = Fixture::new(Tool::Select);
        let id = f.store.add(1.0, 60).unwrap();
        let y = f.row(60);

        for x in [100.0, 150.0, 900.0] {
            assert_ne!(f.down(PointerInput::at(x, y)), InteractionState::Idle);
            f.up();
            assert_eq!(f.engine.state(), InteractionState::Idle);
        }

        // Moves after release do nothing.
        f.drag_to(700.0, 0.0);
        assert_relative_eq!(f.store.get(id).unwrap().beat, 1.0);
    }

    #[test]
    fn switching_tools_cancels_the_gesture() {
        let mut f = Fixture::new(Tool::Select);
        f.down(PointerInput::at(10.0, 10.0));
        assert_eq!(f.engine.state(), InteractionState::BoxSelecting);

        f.engine.set_tool(Tool::Pencil);
        assert_eq!(f.engine.state(), InteractionState::Idle);
        assert!(f.engine.selection_rect().is_none());
    }

    #[test]
    fn hover_reports_position_and_cursor_without_mutating() {
        let mut f = Fixture::new(Tool::Select);
        let id = f.store.add(1.0, 60).unwrap();
        f.store.clear_selection();
        let before = f.store.notes().to_vec();
        let y = f.row(60);

        let hover = f.engine.hover(&f.store, &f.grid, Point::new(197.0, y));
        assert_eq!(hover.beat_index, 1);
        assert_eq!(hover.pitch, 60);
        assert_eq!(hover.pitch_name.as_deref(), Some("C4"));
        assert_eq!(hover.note, Some(id));
        assert_eq!(hover.cursor, CursorHint::ResizeRight);

        let hover = f.engine.hover(&f.store, &f.grid, Point::new(150.0, y));
        assert_eq!(hover.resize_edge, None);
        assert_eq!(hover.cursor, CursorHint::Default);

        f.engine.set_tool(Tool::Erase);
        let hover = f.engine.hover(&f.store, &f.grid, Point::new(50.0, -30.0));
        assert_eq!(hover.pitch_name, None);
        assert_eq!(hover.cursor, CursorHint::Crosshair);

        assert_eq!(f.store.notes(), before.as_slice());
        assert_eq!(f.store.selection_len(), 0);
    }
}
