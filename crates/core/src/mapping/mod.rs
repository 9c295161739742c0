//! Conversion between pixel space and musical space.
//!
//! Pixel row 0 is the highest pitch, so the vertical axis is inverted. The
//! mapping is snap-agnostic: hit testing needs sub-grid
//! precision, and callers quantise with [`Snap`] where they need to.

use serde::{Deserialize, Serialize};

use crate::{config::GridConfig, notes::Note, PianoRollError, Result};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const BLACK_KEYS: [bool; 12] = [
    false, true, false, true, false, false, true, false, true, false, true, false,
];

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 4.0;

/// Position in grid pixels, relative to the grid origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle. Containment and intersection are inclusive on all
/// four sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub fn from_min_size(min: Point, width: f64, height: f64) -> Self {
        Self {
            min,
            max: Point::new(min.x + width, min.y + height),
        }
    }

    /// Normalises two arbitrary corners, as produced by a rubber band dragged
    /// in any direction.
    pub fn from_two_points(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.max.x >= other.min.x
            && self.min.x <= other.max.x
            && self.max.y >= other.min.y
            && self.min.y <= other.max.y
    }
}

/// Contiguous range of playable pitches. Row 0 of the grid is `highest()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchRange {
    lowest: u8,
    count: u8,
}

impl PitchRange {
    pub fn new(lowest: u8, count: u8) -> Result<Self> {
        if count == 0 || lowest as u16 + count as u16 - 1 > 127 {
            return Err(PianoRollError::geometry(format!(
                "pitch range starting at {lowest} with {count} keys is empty or exceeds 127"
            )));
        }
        Ok(Self { lowest, count })
    }

    /// The 88 keys of a piano, A0 to C8.
    pub fn piano() -> Self {
        Self {
            lowest: 21,
            count: 88,
        }
    }

    pub fn lowest(&self) -> u8 {
        self.lowest
    }

    pub fn highest(&self) -> u8 {
        self.lowest + (self.count - 1)
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn contains(&self, pitch: i32) -> bool {
        pitch >= self.lowest as i32 && pitch <= self.highest() as i32
    }

    pub fn clamp(&self, pitch: i32) -> u8 {
        pitch.clamp(self.lowest as i32, self.highest() as i32) as u8
    }
}

impl Default for PitchRange {
    fn default() -> Self {
        Self::piano()
    }
}

/// Raw result of [`GridGeometry::pixel_to_musical`]. The pitch may fall
/// outside the keyboard when the point lies outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MusicalPosition {
    pub beat: f64,
    pub pitch: i32,
}

/// Grid quantisation. Applied by callers, never inside the raw mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snap {
    pub enabled: bool,
    /// Divisions per beat.
    pub subdivision: u32,
}

impl Snap {
    pub fn new(enabled: bool, subdivision: u32) -> Self {
        Self {
            enabled,
            subdivision: subdivision.max(1),
        }
    }

    pub fn off() -> Self {
        Self::new(false, 4)
    }

    /// Length of one grid subdivision in beats.
    pub fn step(&self) -> f64 {
        1.0 / self.subdivision.max(1) as f64
    }

    pub fn beat(&self, beat: f64) -> f64 {
        if self.enabled {
            quantize(beat, self.subdivision)
        } else {
            beat
        }
    }
}

impl Default for Snap {
    fn default() -> Self {
        Self::new(true, 4)
    }
}

fn quantize(beat: f64, subdivision: u32) -> f64 {
    let div = subdivision.max(1) as f64;
    (beat * div).round() / div
}

/// Pixel scale factors for one zoom level. Construction validates the
/// factors, so every mapping method is total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pixels_per_beat: f64,
    pitch_cell_height: f64,
    pitches: PitchRange,
}

impl GridGeometry {
    pub fn new(pixels_per_beat: f64, pitch_cell_height: f64, pitches: PitchRange) -> Result<Self> {
        if !(pixels_per_beat.is_finite() && pixels_per_beat > 0.0) {
            return Err(PianoRollError::geometry(format!(
                "pixels per beat must be positive and finite, got {pixels_per_beat}"
            )));
        }
        if !(pitch_cell_height.is_finite() && pitch_cell_height > 0.0) {
            return Err(PianoRollError::geometry(format!(
                "pitch cell height must be positive and finite, got {pitch_cell_height}"
            )));
        }
        Ok(Self {
            pixels_per_beat,
            pitch_cell_height,
            pitches,
        })
    }

    pub fn pixels_per_beat(&self) -> f64 {
        self.pixels_per_beat
    }

    pub fn pitch_cell_height(&self) -> f64 {
        self.pitch_cell_height
    }

    pub fn pitches(&self) -> PitchRange {
        self.pitches
    }

    pub fn x_to_beat(&self, x: f64) -> f64 {
        x / self.pixels_per_beat
    }

    pub fn beat_to_x(&self, beat: f64) -> f64 {
        beat * self.pixels_per_beat
    }

    /// Row index counted from the top of the grid. Points far outside the
    /// grid are pinned one keyboard height beyond either end.
    pub fn row_at(&self, y: f64) -> i32 {
        let count = self.pitches.count() as f64;
        (y / self.pitch_cell_height).floor().clamp(-count, 2.0 * count) as i32
    }

    pub fn row_top(&self, pitch: i32) -> f64 {
        let row = self.pitches.count() as i64 - 1 - (pitch as i64 - self.pitches.lowest() as i64);
        row as f64 * self.pitch_cell_height
    }

    pub fn pixel_to_musical(&self, point: Point) -> MusicalPosition {
        let row = self.row_at(point.y);
        MusicalPosition {
            beat: self.x_to_beat(point.x),
            pitch: self.pitches.lowest() as i32 + (self.pitches.count() as i32 - 1 - row),
        }
    }

    /// Top-left corner of the cell holding `pitch` at `beat`.
    pub fn musical_to_pixel(&self, beat: f64, pitch: i32) -> Point {
        Point::new(self.beat_to_x(beat), self.row_top(pitch))
    }

    pub fn note_rect(&self, note: &Note) -> Rect {
        Rect::from_min_size(
            self.musical_to_pixel(note.beat, note.pitch as i32),
            note.duration * self.pixels_per_beat,
            self.pitch_cell_height,
        )
    }

    pub fn canvas_size(&self, loop_beats: u32, min_width: f64) -> CanvasSize {
        CanvasSize {
            width: min_width.max(loop_beats as f64 * self.pixels_per_beat),
            height: self.pitches.count() as f64 * self.pitch_cell_height,
        }
    }

    /// Keyboard column, highest key first so it lines up with grid rows.
    pub fn keys(&self) -> Vec<PianoKey> {
        (self.pitches.lowest()..=self.pitches.highest())
            .rev()
            .map(|pitch| PianoKey {
                pitch,
                name: pitch_name(pitch),
                black: is_black_key(pitch),
                top: self.row_top(pitch as i32),
                height: self.pitch_cell_height,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

/// One key of the keyboard column beside the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PianoKey {
    pub pitch: u8,
    pub name: String,
    pub black: bool,
    pub top: f64,
    pub height: f64,
}

/// Zoom level shared by both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zoom {
    level: f64,
}

impl Zoom {
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn percent(&self) -> u32 {
        (self.level * 100.0).round() as u32
    }

    /// Multiplies the level by `factor`, clamped to [`MIN_ZOOM`, `MAX_ZOOM`].
    pub fn adjust(&mut self, factor: f64) -> Result<()> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(PianoRollError::geometry(format!(
                "zoom factor must be positive and finite, got {factor}"
            )));
        }
        self.level = (self.level * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        Ok(())
    }

    pub fn geometry(&self, grid: &GridConfig) -> Result<GridGeometry> {
        GridGeometry::new(
            grid.base_pixels_per_beat * self.level,
            grid.base_pitch_cell_height * self.level,
            PitchRange::new(grid.lowest_pitch, grid.total_pitches)?,
        )
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self { level: 1.0 }
    }
}

/// Scientific pitch name, e.g. 60 is "C4".
pub fn pitch_name(pitch: u8) -> String {
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

pub fn is_black_key(pitch: u8) -> bool {
    BLACK_KEYS[(pitch % 12) as usize]
}
