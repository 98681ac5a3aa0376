//! Engine configuration structs. Serde-derived so a host can persist them
//! alongside its own settings.

use serde::{Deserialize, Serialize};

/// Capture session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Recording name stamped into the output data.
    pub name: String,
    /// Logical ticks per second.
    pub tick_rate: u32,
    /// Sleep between tick-thread iterations, keeps the loop off a busy-spin.
    pub idle_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            name: "recording".into(),
            tick_rate: 60,
            idle_ms: 1,
        }
    }
}

/// Playback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Debounce window for scrub requests.
    pub scrub_debounce_ms: u64,
    /// Upper clamp for the playback rate multiplier.
    pub max_rate: f64,
    /// Wrap at end-of-recording (and advance to the next loaded file).
    pub loop_enabled: bool,
    /// Sleep between tick-thread iterations.
    pub idle_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            scrub_debounce_ms: 200,
            max_rate: 8.0,
            loop_enabled: true,
            idle_ms: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_roundtrip_through_json() {
        let cfg = PlayerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PlayerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scrub_debounce_ms, 200);
        assert!(back.loop_enabled);

        let rcfg: RecorderConfig =
            serde_json::from_str(&serde_json::to_string(&RecorderConfig::default()).unwrap())
                .unwrap();
        assert_eq!(rcfg.tick_rate, 60);
    }
}
