//! Game rules, key bindings and preferences
//!
//! Persisted in LocalStorage as JSON. Missing fields fall back to defaults,
//! so settings saved by an older build still load.

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::input::{ControlMap, RepeatTiming};
use crate::sim::{PaddleAction, PongRules, TetrisAction, TetrisRules};

/// Key bindings for every seat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    /// Single player against the AI: both key sets move the paddle
    pub pong_solo: ControlMap<PaddleAction>,
    pub pong_left: ControlMap<PaddleAction>,
    pub pong_right: ControlMap<PaddleAction>,
    /// One map per local tetris board
    pub tetris: Vec<ControlMap<TetrisAction>>,
}

impl Default for Controls {
    fn default() -> Self {
        let pong_left = ControlMap::new()
            .bind("w", PaddleAction::Up)
            .bind("s", PaddleAction::Down);
        let pong_right = ControlMap::new()
            .bind("ArrowUp", PaddleAction::Up)
            .bind("ArrowDown", PaddleAction::Down);
        let tetris = vec![
            ControlMap::new()
                .bind("a", TetrisAction::Left)
                .bind("d", TetrisAction::Right)
                .bind("s", TetrisAction::Down)
                .bind("w", TetrisAction::Rotate),
            ControlMap::new()
                .bind("ArrowLeft", TetrisAction::Left)
                .bind("ArrowRight", TetrisAction::Right)
                .bind("ArrowDown", TetrisAction::Down)
                .bind("ArrowUp", TetrisAction::Rotate),
        ];
        Self {
            pong_solo: pong_left.clone().merged(&pong_right),
            pong_left,
            pong_right,
            tetris,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pong: PongRules,
    pub tetris: TetrisRules,
    pub repeat: RepeatTiming,
    pub controls: Controls,
    /// Whether tetris results count toward the ladder
    pub ranked: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pong: PongRules::default(),
            tetris: TetrisRules::default(),
            repeat: RepeatTiming::default(),
            controls: Controls::default(),
            ranked: true,
        }
    }
}

impl Settings {
    /// LocalStorage key
    const STORAGE_KEY: &'static str = "arena_arcade_settings";

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Number of tetris boards that can share the keyboard
    pub fn max_local_tetris_players(&self) -> usize {
        self.controls.tetris.len()
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage
            && let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY)
        {
            match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
                Err(e) => log::warn!("Ignoring stored settings: {}", e),
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            match self.to_json() {
                Ok(json) => {
                    log_write(storage.set_item(Self::STORAGE_KEY, &json));
                }
                Err(e) => log::warn!("Could not save settings: {}", e),
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        log::debug!("Settings persistence is browser-only ({})", Self::STORAGE_KEY);
    }
}

/// Log a storage write; true if it went through
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn log_write<E: std::fmt::Debug>(result: Result<(), E>) -> bool {
    match result {
        Ok(()) => {
            log::info!("Settings saved");
            true
        }
        Err(e) => {
            log::warn!("Could not write settings to storage: {:?}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::TetrisVariant;

    #[test]
    fn test_defaults_match_house_rules() {
        let s = Settings::default();
        assert_eq!(s.pong.target_score, 5);
        assert_eq!(s.pong.field_width, 1400.0);
        assert_eq!(s.tetris.rows, 22);
        assert_eq!(s.tetris.variant, TetrisVariant::Standard);
        assert_eq!(s.repeat.initial_delay_ms, 300.0);
        assert_eq!(s.max_local_tetris_players(), 2);
    }

    #[test]
    fn test_solo_controls_accept_both_key_sets() {
        let c = Controls::default();
        assert_eq!(c.pong_solo.action_for("w"), Some(PaddleAction::Up));
        assert_eq!(c.pong_solo.action_for("ArrowDown"), Some(PaddleAction::Down));
        assert_eq!(c.pong_left.action_for("ArrowDown"), None);
    }

    #[test]
    fn test_json_round_trip_keeps_overrides() {
        let mut s = Settings::default();
        s.pong.target_score = 11;
        s.tetris.variant = TetrisVariant::Classic;
        let back = Settings::from_json(&s.to_json().unwrap()).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s = Settings::from_json(r#"{"ranked": false}"#).unwrap();
        assert!(!s.ranked);
        assert_eq!(s.pong, PongRules::default());
    }

    #[test]
    fn test_garbage_json_is_an_error() {
        assert!(matches!(
            Settings::from_json("not json"),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_failed_storage_write_is_not_reported_saved() {
        assert!(log_write::<&str>(Ok(())));
        assert!(!log_write(Err("QuotaExceededError")));
    }
}
