//! The tone trigger capability consumed by the scheduler.
//!
//! Synthesis lives outside this crate. The core only decides *when* a pitch
//! should sound and for how long, and hands a [`ToneTrigger`] to whatever
//! [`ToneSink`] the host provides.

use serde::{Deserialize, Serialize};

/// One fire-and-forget request to sound a pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneTrigger {
    pub pitch: u8,
    /// Absolute start on the host clock, in seconds.
    pub start_time: f64,
    /// Length in seconds.
    pub duration: f64,
}

impl ToneTrigger {
    pub fn frequency_hz(&self) -> f64 {
        frequency_hz(self.pitch)
    }
}

/// Host side of the tone capability. Implementations must not fail for
/// pitches in the MIDI range and positive durations.
pub trait ToneSink {
    fn trigger(&mut self, tone: ToneTrigger);
}

impl<F> ToneSink for F
where
    F: FnMut(ToneTrigger),
{
    fn trigger(&mut self, tone: ToneTrigger) {
        self(tone)
    }
}

/// Sink that only remembers what it was asked to play.
#[derive(Debug, Default, Clone)]
pub struct ToneLog {
    tones: Vec<ToneTrigger>,
}

impl ToneLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tones(&self) -> &[ToneTrigger] {
        &self.tones
    }

    pub fn clear(&mut self) {
        self.tones.clear();
    }
}

impl ToneSink for ToneLog {
    fn trigger(&mut self, tone: ToneTrigger) {
        self.tones.push(tone);
    }
}

/// Equal temperament with A4 (pitch 69) at 440 Hz.
pub fn frequency_hz(pitch: u8) -> f64 {
    440.0 * 2f64.powf((pitch as f64 - 69.0) / 12.0)
}
