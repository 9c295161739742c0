//! The editor context: one owner for the note store, the gesture engine and
//! the scheduler, driven by a single event-to-effects transition function.

use serde::{Deserialize, Serialize};

use crate::{
    audio::{ToneSink, ToneTrigger},
    config::EditorConfig,
    interaction::{EditContext, Hover, InteractionEngine, Modifiers, PointerInput, Tool},
    mapping::{GridGeometry, PianoKey, PitchRange, Point, Snap, Zoom},
    notes::{NoteDefaults, NoteStore},
    render::{selection_label, RenderSnapshot},
    timeline::{Effect, Scheduler, TickHandle},
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Delete,
    Backspace,
    Space,
    Char(char),
}

/// Input accepted by [`Editor::handle`]. Times are host clock seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorEvent {
    PointerDown(PointerInput),
    PointerMove(PointerInput),
    PointerUp,
    PointerLeave,
    Key {
        key: Key,
        #[serde(default)]
        modifiers: Modifiers,
        #[serde(default)]
        now: f64,
    },
    Tick {
        now: f64,
        handle: TickHandle,
    },
    TogglePlayback {
        now: f64,
    },
    Stop,
    SetTool {
        tool: Tool,
    },
    SetSnap {
        enabled: bool,
    },
    Zoom {
        factor: f64,
    },
    /// Audition a pitch from the keyboard column.
    PreviewKey {
        pitch: u8,
        now: f64,
    },
}

#[derive(Debug, Clone)]
pub struct Editor {
    config: EditorConfig,
    zoom: Zoom,
    grid: GridGeometry,
    snap: Snap,
    store: NoteStore,
    interaction: InteractionEngine,
    scheduler: Scheduler,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Result<Self> {
        config.validate()?;
        let zoom = Zoom::default();
        let grid = zoom.geometry(&config.grid)?;
        let pitches = PitchRange::new(config.grid.lowest_pitch, config.grid.total_pitches)?;

        Ok(Self {
            zoom,
            grid,
            snap: Snap::new(config.editing.snap_enabled, config.editing.snap_subdivision),
            store: NoteStore::new(pitches, NoteDefaults::from(&config.editing)),
            interaction: InteractionEngine::new(config.editing.edge_threshold_px),
            scheduler: Scheduler::new(&config.playback),
            config,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn grid(&self) -> &GridGeometry {
        &self.grid
    }

    pub fn snap(&self) -> Snap {
        self.snap
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn interaction(&self) -> &InteractionEngine {
        &self.interaction
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Applies one event and returns the side effects the host must carry out.
    pub fn handle(&mut self, event: EditorEvent) -> Result<Vec<Effect>> {
        match event {
            EditorEvent::PointerDown(input) => {
                let (engine, ctx) = self.edit_context();
                engine.pointer_down(ctx, &input);
            }
            EditorEvent::PointerMove(input) => {
                let (engine, ctx) = self.edit_context();
                engine.pointer_move(ctx, &input);
            }
            EditorEvent::PointerUp | EditorEvent::PointerLeave => {
                let (engine, ctx) = self.edit_context();
                engine.pointer_up(ctx);
            }
            EditorEvent::Key {
                key,
                modifiers,
                now,
            } => return Ok(self.handle_key(key, modifiers, now)),
            EditorEvent::Tick { now, handle } => {
                return Ok(self.scheduler.tick(now, handle, self.store.notes()));
            }
            EditorEvent::TogglePlayback { now } => {
                return Ok(self.scheduler.toggle(now, self.store.notes()));
            }
            EditorEvent::Stop => return Ok(self.scheduler.stop()),
            EditorEvent::SetTool { tool } => self.interaction.set_tool(tool),
            EditorEvent::SetSnap { enabled } => self.snap.enabled = enabled,
            EditorEvent::Zoom { factor } => self.set_zoom(factor)?,
            EditorEvent::PreviewKey { pitch, now } => {
                let tone = ToneTrigger {
                    pitch: self.store.pitches().clamp(pitch as i32),
                    start_time: now,
                    duration: self.config.playback.preview_seconds,
                };
                return Ok(vec![Effect::Tone(tone)]);
            }
        }
        Ok(Vec::new())
    }

    pub fn hover(&self, x: f64, y: f64) -> Hover {
        self.interaction
            .hover(&self.store, &self.grid, Point::new(x, y))
    }

    pub fn keys(&self) -> Vec<PianoKey> {
        self.grid.keys()
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        let grid = &self.config.grid;
        RenderSnapshot {
            notes: RenderSnapshot::note_views(&self.store, &self.grid),
            selection: self.store.selected_notes().map(|note| note.id).collect(),
            selection_rect: self.interaction.selection_rect(),
            interaction: self.interaction.state(),
            tool: self.interaction.tool(),
            playing: self.scheduler.is_playing(),
            playhead_beat: self.scheduler.current_beat(),
            playhead_x: self.grid.beat_to_x(self.scheduler.current_beat()),
            time_label: self.scheduler.time_label(),
            selection_label: selection_label(self.store.selection_len()),
            zoom_percent: self.zoom.percent(),
            canvas: self.grid.canvas_size(grid.loop_beats, grid.min_canvas_width),
        }
    }

    fn handle_key(&mut self, key: Key, modifiers: Modifiers, now: f64) -> Vec<Effect> {
        match key {
            Key::Delete | Key::Backspace => {
                let removed = self.store.delete_selected();
                tracing::debug!(removed, "deleted selection");
            }
            Key::Char(c) if modifiers.accel && c.eq_ignore_ascii_case(&'a') => {
                self.store.select_all();
            }
            Key::Space => return self.scheduler.toggle(now, self.store.notes()),
            Key::Char(_) => {}
        }
        Vec::new()
    }

    /// Geometry only; the scheduler works in beats and is left untouched.
    /// A gesture in flight is dropped since its anchor is in the old pixels.
    fn set_zoom(&mut self, factor: f64) -> Result<()> {
        let mut zoom = self.zoom;
        zoom.adjust(factor)?;
        self.grid = zoom.geometry(&self.config.grid)?;
        self.zoom = zoom;
        self.interaction.cancel();
        tracing::debug!(percent = zoom.percent(), "zoom changed");
        Ok(())
    }

    fn edit_context(&mut self) -> (&mut InteractionEngine, EditContext<'_>) {
        (
            &mut self.interaction,
            EditContext {
                store: &mut self.store,
                grid: &self.grid,
                snap: self.snap,
            },
        )
    }
}

/// Hands every tone to `sink` and returns the tick the host should schedule
/// next, if any.
pub fn route_effects(effects: &[Effect], sink: &mut impl ToneSink) -> Option<TickHandle> {
    let mut next = None;
    for effect in effects {
        match effect {
            Effect::Tone(tone) => sink.trigger(*tone),
            Effect::ScheduleTick { handle } => next = Some(*handle),
            Effect::CancelTick { handle } => {
                if next == Some(*handle) {
                    next = None;
                }
            }
        }
    }
    next
}
