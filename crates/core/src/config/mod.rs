use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{PianoRollError, Result};

/// Top-level configuration structure for the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub grid: GridConfig,
    pub editing: EditingConfig,
    pub playback: PlaybackConfig,
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(?path, "loaded editor configuration");
        Self::from_json_str(&text)
    }

    /// Rejects values that would produce a degenerate grid or a scheduler
    /// that can never dispatch anything.
    pub fn validate(&self) -> Result<()> {
        let grid = &self.grid;
        if !(grid.base_pixels_per_beat.is_finite() && grid.base_pixels_per_beat > 0.0) {
            return Err(PianoRollError::geometry(format!(
                "base_pixels_per_beat must be positive, got {}",
                grid.base_pixels_per_beat
            )));
        }
        if !(grid.base_pitch_cell_height.is_finite() && grid.base_pitch_cell_height > 0.0) {
            return Err(PianoRollError::geometry(format!(
                "base_pitch_cell_height must be positive, got {}",
                grid.base_pitch_cell_height
            )));
        }
        if grid.total_pitches == 0 {
            return Err(PianoRollError::geometry("total_pitches must be at least 1"));
        }
        if grid.lowest_pitch as u16 + grid.total_pitches as u16 - 1 > 127 {
            return Err(PianoRollError::geometry(format!(
                "pitch range {}..{} exceeds the MIDI range",
                grid.lowest_pitch,
                grid.lowest_pitch as u16 + grid.total_pitches as u16
            )));
        }

        let editing = &self.editing;
        if editing.snap_subdivision == 0 {
            return Err(PianoRollError::Config(
                "snap_subdivision must be at least 1".to_string(),
            ));
        }
        if !(editing.min_duration > 0.0) || !(editing.default_duration >= editing.min_duration) {
            return Err(PianoRollError::Config(format!(
                "durations must satisfy 0 < min_duration ({}) <= default_duration ({})",
                editing.min_duration, editing.default_duration
            )));
        }
        if !(editing.edge_threshold_px >= 0.0) {
            return Err(PianoRollError::Config(
                "edge_threshold_px must not be negative".to_string(),
            ));
        }

        let playback = &self.playback;
        if !(playback.lookahead_seconds > 0.0) || !(playback.max_tone_seconds > 0.0) {
            return Err(PianoRollError::Config(
                "lookahead_seconds and max_tone_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Grid dimensions before zoom is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub base_pixels_per_beat: f64,
    pub base_pitch_cell_height: f64,
    /// MIDI number of the bottom row (A0).
    pub lowest_pitch: u8,
    pub total_pitches: u8,
    /// Length of the editable area in beats; only widens the canvas.
    pub loop_beats: u32,
    pub min_canvas_width: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            base_pixels_per_beat: 100.0,
            base_pitch_cell_height: 20.0,
            lowest_pitch: 21,
            total_pitches: 88,
            loop_beats: 64,
            min_canvas_width: 4000.0,
        }
    }
}

/// Note creation and gesture tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingConfig {
    pub snap_enabled: bool,
    /// Snap divisions per beat (4 = sixteenth notes).
    pub snap_subdivision: u32,
    pub edge_threshold_px: f64,
    pub default_duration: f64,
    pub default_velocity: u8,
    pub min_duration: f64,
    /// Two notes on the same pitch closer than this are considered stacked.
    pub duplicate_epsilon: f64,
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            snap_enabled: true,
            snap_subdivision: 4,
            edge_threshold_px: 6.0,
            default_duration: 1.0,
            default_velocity: 100,
            min_duration: 0.1,
            duplicate_epsilon: 0.01,
        }
    }
}

/// Scheduler timing. Tempo is fixed, see [`crate::timeline::TEMPO_BPM`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub lookahead_seconds: f64,
    pub max_tone_seconds: f64,
    pub preview_seconds: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            lookahead_seconds: 0.25,
            max_tone_seconds: 0.5,
            preview_seconds: 0.2,
        }
    }
}
