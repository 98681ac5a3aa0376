//! Track: sparse, tick-ordered timeline for one property, plus a stateful
//! seek cursor.
//!
//! **Why**: playback ticks advance by ~1 most of the time, so the cursor
//! scans forward/backward from its previous position instead of binary
//! searching from scratch — O(1) amortized during normal playback, O(n)
//! worst case for arbitrary scrubs.
//!
//! # Seek Model
//!
//! `seek(target)` resolves to the latest frame whose tick is `<= target`
//! (inclusive bound, also on backward scans). A target before the first
//! frame resolves to "no frame" and unsets the cursor. End-of-track holds
//! its last value forever — consistent with record-on-change semantics.

use serde::{Deserialize, Serialize};

use super::frame::{Frame, Tick, Value};

/// Track append errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// Appended tick not strictly greater than the last recorded tick
    NonMonotonic { last: Tick, tick: Tick },
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackError::NonMonotonic { last, tick } => {
                write!(f, "non-monotonic tick {} (last recorded {})", tick, last)
            }
        }
    }
}

impl std::error::Error for TrackError {}

/// Result of a cursor seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seek {
    /// Resolved frame index, `None` if the target precedes the first frame
    /// (or the track is empty).
    pub index: Option<usize>,
    /// Whether the resolved index differs from the cursor before the call.
    /// Drives "property changed" notifications without comparing payloads.
    pub changed: bool,
}

/// Sparse timeline of one recorded property.
///
/// Frames are strictly increasing by tick with no duplicates; `append`
/// enforces this. The cursor is runtime-only playback state and is owned
/// exclusively by the playback tick thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    frames: Vec<Frame>,

    /// Seek cursor, `None` = never sought. Not persisted.
    #[serde(skip)]
    cursor: Option<usize>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn last_tick(&self) -> Tick {
        self.frames.last().map(|f| f.tick).unwrap_or(-1)
    }

    /// Append a frame. The tick must be strictly greater than the last
    /// appended tick (and therefore `>= 0`).
    pub fn append(&mut self, frame: Frame) -> Result<(), TrackError> {
        let last = self.last_tick();
        if frame.tick <= last {
            return Err(TrackError::NonMonotonic {
                last,
                tick: frame.tick,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Record-on-change: append only if `value` differs from the last
    /// frame's value. Returns whether a frame was appended.
    pub fn record(&mut self, tick: Tick, value: Value) -> Result<bool, TrackError> {
        if let Some(last) = self.frames.last()
            && last.value == value
        {
            return Ok(false);
        }
        self.append(Frame::new(tick, value))?;
        Ok(true)
    }

    /// Resolve the cursor to the latest frame with tick `<= target`, using
    /// the previous cursor position as a scan hint.
    pub fn seek(&mut self, target: Tick) -> Seek {
        if self.frames.is_empty() {
            self.cursor = None;
            return Seek {
                index: None,
                changed: false,
            };
        }

        let before = self.cursor;

        // Target 0 and never-sought cursors rescan from the front.
        let mut idx = match self.cursor {
            Some(i) if target != 0 => i.min(self.frames.len() - 1),
            _ => 0,
        };

        // Forward scan
        while idx + 1 < self.frames.len() && self.frames[idx + 1].tick <= target {
            idx += 1;
        }
        // Backward scan
        while idx > 0 && self.frames[idx].tick > target {
            idx -= 1;
        }

        let resolved = if self.frames[idx].tick <= target {
            Some(idx)
        } else {
            // Only reachable at idx == 0: target precedes the first frame.
            None
        };

        self.cursor = resolved;
        Seek {
            index: resolved,
            changed: resolved != before,
        }
    }

    /// Frame at the cursor, or `None` if unset / empty.
    pub fn current(&self) -> Option<&Frame> {
        self.cursor.and_then(|i| self.frames.get(i))
    }

    /// Forget the cursor (file switch, playback restart).
    pub fn reset_cursor(&mut self) {
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(ticks: &[Tick]) -> Track {
        let mut t = Track::new();
        for &tick in ticks {
            t.append(Frame::new(tick, Value::Int(tick))).unwrap();
        }
        t
    }

    /// Reference resolution: binary search from scratch.
    fn resolve_reference(t: &Track, target: Tick) -> Option<usize> {
        let n = t.frames().partition_point(|f| f.tick <= target);
        n.checked_sub(1)
    }

    #[test]
    fn append_rejects_non_monotonic_ticks() {
        let mut t = track(&[0, 45]);
        assert_eq!(
            t.append(Frame::new(45, Value::Int(0))),
            Err(TrackError::NonMonotonic { last: 45, tick: 45 })
        );
        assert_eq!(
            t.append(Frame::new(10, Value::Int(0))),
            Err(TrackError::NonMonotonic { last: 45, tick: 10 })
        );
        assert!(t.append(Frame::new(46, Value::Int(0))).is_ok());
    }

    #[test]
    fn append_rejects_negative_first_tick() {
        let mut t = Track::new();
        assert!(t.append(Frame::new(-1, Value::Bool(true))).is_err());
        assert!(t.append(Frame::new(0, Value::Bool(true))).is_ok());
    }

    #[test]
    fn record_appends_only_on_change() {
        let mut t = Track::new();
        assert!(t.record(0, Value::Float(1.0)).unwrap());
        assert!(!t.record(1, Value::Float(1.0)).unwrap());
        assert!(!t.record(44, Value::Float(1.0)).unwrap());
        assert!(t.record(45, Value::Float(2.0)).unwrap());
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn seek_on_empty_track_is_no_frame() {
        let mut t = Track::new();
        let seek = t.seek(100);
        assert_eq!(seek.index, None);
        assert!(!seek.changed);
        assert!(t.current().is_none());
    }

    #[test]
    fn seek_before_first_frame_resolves_to_none() {
        let mut t = track(&[10, 50]);
        let seek = t.seek(9);
        assert_eq!(seek.index, None);
        assert!(t.current().is_none());
        // Cursor stays unset, so re-seeking is not "changed".
        assert!(!t.seek(5).changed);
    }

    #[test]
    fn seek_selects_latest_at_or_before() {
        let mut t = track(&[0, 45, 200]);
        assert_eq!(t.seek(0).index, Some(0));
        assert_eq!(t.seek(44).index, Some(0));
        assert_eq!(t.seek(45).index, Some(1));
        assert_eq!(t.seek(100).index, Some(1));
        assert_eq!(t.seek(200).index, Some(2));
        // End-of-track holds its last value forever.
        assert_eq!(t.seek(5000).index, Some(2));
    }

    #[test]
    fn seek_exact_tick_selected_on_backward_scan() {
        let mut t = track(&[0, 45, 200]);
        t.seek(5000);
        let seek = t.seek(45);
        assert_eq!(seek.index, Some(1));
        assert!(seek.changed);
    }

    #[test]
    fn seek_is_idempotent() {
        let mut t = track(&[0, 45, 200]);
        let first = t.seek(100);
        assert!(first.changed);
        let second = t.seek(100);
        assert_eq!(second.index, first.index);
        assert!(!second.changed);
    }

    #[test]
    fn seek_to_zero_rescans_from_front() {
        let mut t = track(&[0, 45, 200]);
        t.seek(1000);
        let seek = t.seek(0);
        assert_eq!(seek.index, Some(0));
        assert!(seek.changed);
    }

    #[test]
    fn changed_fires_on_first_resolution() {
        let mut t = track(&[0]);
        assert!(t.seek(10).changed);
    }

    #[test]
    fn hinted_scan_matches_binary_search_for_any_walk() {
        let ticks: Vec<Tick> = vec![0, 3, 4, 45, 90, 91, 200, 512];
        // Ascending, descending, and a random-access scrub pattern.
        let walks: Vec<Vec<Tick>> = vec![
            (0..=520).collect(),
            (0..=520).rev().collect(),
            vec![300, 2, 512, 0, 91, 90, 89, 45, 44, 46, 513, 1, 0, 200],
        ];
        for walk in walks {
            let mut t = track(&ticks);
            for target in walk {
                let seek = t.seek(target);
                assert_eq!(
                    seek.index,
                    resolve_reference(&t, target),
                    "target {}",
                    target
                );
            }
        }
    }

    #[test]
    fn cursor_is_not_serialized() {
        let mut t = track(&[0, 45]);
        t.seek(100);
        let json = serde_json::to_string(&t).unwrap();
        let back: Track = serde_json::from_str(&json).unwrap();
        assert!(back.current().is_none());
        assert_eq!(back.len(), 2);
    }
}
