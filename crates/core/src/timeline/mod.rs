use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{
    audio::ToneTrigger,
    config::PlaybackConfig,
    notes::{Note, NoteId},
};

/// Playback tempo. Fixed; the editor has no tempo map.
pub const TEMPO_BPM: f64 = 120.0;

pub fn seconds_per_beat() -> f64 {
    60.0 / TEMPO_BPM
}

/// Monotonic time source in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock for simulations and tests.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    time_seconds: f64,
}

impl ManualClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    /// Moves time forward. Negative deltas are ignored so the clock never
    /// runs backwards.
    pub fn advance(&mut self, delta: f64) {
        self.time_seconds += delta.max(0.0);
    }

    pub fn set(&mut self, time_seconds: f64) {
        self.time_seconds = self.time_seconds.max(time_seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.time_seconds
    }
}

/// Identifies one requested tick. Only the most recently scheduled handle is
/// honoured, which is how a cancelled tick is kept from firing late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickHandle(pub u64);

/// Side effects requested from the host loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Tone(ToneTrigger),
    /// Call back with [`crate::EditorEvent::Tick`] carrying this handle on
    /// the next frame.
    ScheduleTick { handle: TickHandle },
    CancelTick { handle: TickHandle },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

/// A note start that has already been handed to the tone sink this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DispatchToken {
    note: NoteId,
    beat_bits: u64,
}

impl DispatchToken {
    fn new(note: &Note) -> Self {
        Self {
            note: note.id,
            beat_bits: note.beat.to_bits(),
        }
    }
}

/// Lookahead scheduler that drives the playhead from a host clock.
///
/// Each tick dispatches every note whose start falls inside
/// `[now, now + lookahead)`. Consecutive windows overlap, so the dispatched
/// set is what keeps a note from sounding twice in one pass; it is emptied
/// whenever playback halts.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduler {
    state: TransportState,
    current_beat: f64,
    playback_start: f64,
    lookahead_seconds: f64,
    max_tone_seconds: f64,
    dispatched: HashSet<DispatchToken>,
    pending: Option<TickHandle>,
    next_handle: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(&PlaybackConfig::default())
    }
}

impl Scheduler {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            state: TransportState::Stopped,
            current_beat: 0.0,
            playback_start: 0.0,
            lookahead_seconds: config.lookahead_seconds,
            max_tone_seconds: config.max_tone_seconds,
            dispatched: HashSet::new(),
            pending: None,
            next_handle: 0,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn current_beat(&self) -> f64 {
        self.current_beat
    }

    pub fn pending_tick(&self) -> Option<TickHandle> {
        self.pending
    }

    pub fn dispatched_count(&self) -> usize {
        self.dispatched.len()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.current_beat * seconds_per_beat()
    }

    /// Playhead position formatted as `m:ss`.
    pub fn time_label(&self) -> String {
        let elapsed = self.elapsed_seconds().max(0.0);
        let minutes = (elapsed / 60.0).floor() as u64;
        let seconds = (elapsed % 60.0).floor() as u64;
        format!("{minutes}:{seconds:02}")
    }

    /// Enters `Playing`, continuing from the current cursor, and runs the
    /// first tick immediately so a note under the cursor is not missed.
    pub fn start(&mut self, now: f64, notes: &[Note]) -> Vec<Effect> {
        if self.is_playing() {
            return Vec::new();
        }
        self.playback_start = now - self.current_beat * seconds_per_beat();
        self.state = TransportState::Playing;
        tracing::debug!(now, beat = self.current_beat, "playback started");

        let mut effects = Vec::new();
        self.advance(now, notes, &mut effects);
        self.schedule_next(&mut effects);
        effects
    }

    pub fn tick(&mut self, now: f64, handle: TickHandle, notes: &[Note]) -> Vec<Effect> {
        if !self.is_playing() || self.pending != Some(handle) {
            tracing::trace!(?handle, "ignoring stale tick");
            return Vec::new();
        }
        self.pending = None;

        let mut effects = Vec::new();
        self.advance(now, notes, &mut effects);
        self.schedule_next(&mut effects);
        effects
    }

    /// Leaves `Playing` but keeps the cursor where the playhead got to, so
    /// the next start resumes from there.
    pub fn pause(&mut self, now: f64) -> Vec<Effect> {
        if !self.is_playing() {
            return Vec::new();
        }
        self.update_cursor(now);
        self.halt()
    }

    pub fn toggle(&mut self, now: f64, notes: &[Note]) -> Vec<Effect> {
        if self.is_playing() {
            self.pause(now)
        } else {
            self.start(now, notes)
        }
    }

    /// Halts playback and rewinds to beat 0. Safe to call repeatedly.
    pub fn stop(&mut self) -> Vec<Effect> {
        let effects = self.halt();
        self.current_beat = 0.0;
        effects
    }

    fn halt(&mut self) -> Vec<Effect> {
        if self.is_playing() {
            tracing::debug!(
                beat = self.current_beat,
                dispatched = self.dispatched.len(),
                "playback halted"
            );
        }
        self.state = TransportState::Stopped;
        self.dispatched.clear();
        self.pending
            .take()
            .map(|handle| Effect::CancelTick { handle })
            .into_iter()
            .collect()
    }

    fn update_cursor(&mut self, now: f64) {
        let beat = (now - self.playback_start) / seconds_per_beat();
        self.current_beat = self.current_beat.max(beat);
    }

    fn advance(&mut self, now: f64, notes: &[Note], effects: &mut Vec<Effect>) {
        self.update_cursor(now);

        let spb = seconds_per_beat();
        let horizon = now + self.lookahead_seconds;
        for note in notes {
            let start_time = self.playback_start + note.beat * spb;
            if start_time < now || start_time >= horizon {
                continue;
            }
            if !self.dispatched.insert(DispatchToken::new(note)) {
                continue;
            }
            let end_time = start_time + note.duration * spb;
            let tone = ToneTrigger {
                pitch: note.pitch,
                start_time,
                duration: self.max_tone_seconds.min(end_time - start_time),
            };
            tracing::trace!(id = %note.id, pitch = note.pitch, start_time, "dispatching tone");
            effects.push(Effect::Tone(tone));
        }
    }

    fn schedule_next(&mut self, effects: &mut Vec<Effect>) {
        let handle = TickHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.pending = Some(handle);
        effects.push(Effect::ScheduleTick { handle });
    }
}
