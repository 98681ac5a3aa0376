//! Frame: one recorded sample, tagged with the logical tick it was captured at.
//!
//! **Why**: recordings are sparse — a frame exists only for ticks where a
//! value actually changed. Gap-fill happens at seek time (latest frame at or
//! before the queried tick), never by interpolation.
//!
//! **Used by**: Track (storage + cursor), producers (capture), consumers (apply)

use serde::{Deserialize, Serialize};

/// Logical tick index. Signed so engine-internal counters can sit at `-1`
/// ("nothing played/captured yet"); stored frames are always `>= 0`.
pub type Tick = i64;

/// Payload of a recorded sample.
///
/// One variant per observable property kind. A given track holds a single
/// variant for its whole lifetime (fixed per track, polymorphic across
/// tracks) — producers decide the variant at registration time, which
/// replaces the original's reflection-driven payload dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f32),
    /// Position / euler angles / scale
    Vec3([f32; 3]),
    /// Rotation quaternion (x, y, z, w)
    Quat([f32; 4]),
    Str(String),
}

/// Single recorded sample. Immutable once appended to a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub tick: Tick,
    pub value: Value,
}

impl Frame {
    pub fn new(tick: Tick, value: Value) -> Self {
        Self { tick, value }
    }
}
