//! Core library for the Piano Roll editor.
//!
//! The crate holds the parts of the editor that need exact, stateful
//! algorithms: mapping between pixels and musical coordinates, the note store,
//! the pointer gesture state machine, and the lookahead playback scheduler.
//! Drawing, synthesis and input wiring belong to the host, which feeds
//! [`EditorEvent`]s into an [`Editor`] and carries out the returned
//! [`Effect`]s.

pub mod audio;
pub mod config;
pub mod editor;
pub mod error;
pub mod interaction;
pub mod mapping;
pub mod notes;
pub mod render;
pub mod timeline;

pub use audio::{frequency_hz, ToneLog, ToneSink, ToneTrigger};
pub use config::{EditingConfig, EditorConfig, GridConfig, PlaybackConfig};
pub use editor::{route_effects, Editor, EditorEvent, Key};
pub use error::{PianoRollError, Result};
pub use interaction::{
    CursorHint, Hover, InteractionEngine, InteractionState, Modifiers, PointerButton,
    PointerInput, Tool,
};
pub use mapping::{GridGeometry, MusicalPosition, PitchRange, Point, Rect, Snap, Zoom};
pub use notes::{Note, NoteId, NoteStore, ResizeEdge};
pub use render::{NoteView, RenderSnapshot};
pub use timeline::{
    Clock, Effect, ManualClock, Scheduler, SystemClock, TickHandle, TransportState, TEMPO_BPM,
};
