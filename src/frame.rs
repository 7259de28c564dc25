//! Frame math and the value types that flow through the pipeline.
//!
//! A frame index maps to a point on a circle through [`Orbit::coordinate`].
//! Coordinates carry their own decimal precision so that the JSON they
//! serialise to always has the same number of digits after the point:
//!
//! ```text
//! [[{"x":300.00,"y":200.00}],[{"x":299.45,"y":210.45}], ...]
//!  └──────── Frame ────────┘
//! └──────────────────────── FrameBatch ────────────────────────┘
//! ```

use std::f64::consts::TAU;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::constants::{COORDINATE_DIGITS, FRAME_RATE, ORBIT_CENTER_X, ORBIT_CENTER_Y, ORBIT_RADIUS};

/// A number rendered with a fixed count of decimal digits.
///
/// Serialises as a bare JSON number (`1.50`, not `"1.50"` and not `1.5`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fixed {
    value: f64,
    digits: usize,
}

impl Fixed {
    /// Wrap `value` for rendering with `digits` decimal places.
    #[must_use]
    pub fn new(value: f64, digits: usize) -> Self {
        Self { value, digits }
    }

    /// The unrounded value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.value
    }

    /// Digits after the decimal point.
    #[must_use]
    pub fn digits(self) -> usize {
        self.digits
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", self.digits, self.value)
    }
}

impl Serialize for Fixed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Non-finite values have no JSON form and fail here.
        let raw = RawValue::from_string(self.to_string())
            .map_err(<S::Error as serde::ser::Error>::custom)?;
        raw.serialize(serializer)
    }
}

/// A single point of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    /// Horizontal position.
    pub x: Fixed,
    /// Vertical position.
    pub y: Fixed,
}

/// All points drawn at one instant. Currently always a single tracked point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Frame(Vec<Coordinate>);

impl Frame {
    /// Frame holding one point.
    #[must_use]
    pub fn single(point: Coordinate) -> Self {
        Self(vec![point])
    }

    /// Points in draw order.
    #[must_use]
    pub fn points(&self) -> &[Coordinate] {
        &self.0
    }
}

/// Frames computed in one generator cycle, in temporal order.
///
/// Serialises as a JSON array of frames. The starting index is kept for
/// bookkeeping and logging only; clients infer it from arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBatch {
    start: u64,
    frames: Vec<Frame>,
}

impl FrameBatch {
    /// Assemble a batch whose first frame has index `start`.
    #[must_use]
    pub fn new(start: u64, frames: Vec<Frame>) -> Self {
        Self { start, frames }
    }

    /// Index of the first frame.
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Frame indices covered by this batch (half-open).
    #[must_use]
    pub fn indices(&self) -> Range<u64> {
        self.start..self.start + self.frames.len() as u64
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` for the batch produced by a zero-count request.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames in temporal order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Render the wire form of this batch.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for FrameBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.frames)
    }
}

/// Geometry and timing of the animated orbit.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Orbit {
    /// Circle radius.
    pub radius: f64,
    /// Horizontal centre.
    pub center_x: f64,
    /// Vertical centre.
    pub center_y: f64,
    /// Animation frames per second; frame `i` is sampled at `i / frame_rate`.
    pub frame_rate: u32,
    /// Decimal digits in serialised coordinates.
    pub digits: usize,
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            radius: ORBIT_RADIUS,
            center_x: ORBIT_CENTER_X,
            center_y: ORBIT_CENTER_Y,
            frame_rate: FRAME_RATE,
            digits: COORDINATE_DIGITS,
        }
    }
}

impl Orbit {
    /// Position of frame `index`.
    ///
    /// Pure: the same index always yields the same coordinate.
    #[must_use]
    pub fn coordinate(&self, index: u64) -> Coordinate {
        self.coordinate_at(index as f64 / f64::from(self.frame_rate))
    }

    /// Position after `revolutions` turns around the circle.
    ///
    /// Only the fractional part matters; `0.25` is a quarter turn.
    #[must_use]
    pub fn coordinate_at(&self, revolutions: f64) -> Coordinate {
        let angle = TAU * revolutions;
        Coordinate {
            x: Fixed::new(self.radius * angle.cos() + self.center_x, self.digits),
            y: Fixed::new(self.radius * angle.sin() + self.center_y, self.digits),
        }
    }

    /// One single-point frame per index in `indices`, in order.
    #[must_use]
    pub fn frames(&self, indices: Range<u64>) -> Vec<Frame> {
        indices.map(|i| Frame::single(self.coordinate(i))).collect()
    }
}
