// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Mikael Lund

//! Typed preferences store shared by the CLI, the SID core, and the
//! TUI's color scheme: a `name -> value` map with an optional per-key
//! change callback, persisted as TOML between runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// A preference value. Every key in the external interface table is
/// one of these three shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Str(String),
    Bool(bool),
    Int(i32),
}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

type ChangeCallback = Box<dyn Fn(&str, &PrefValue, &PrefValue) + Send>;

/// Global key/value preferences map. Keys are added with their default
/// value at startup (`add_default`); later `replace` calls (CLI flags,
/// live TUI edits) invoke that key's change callback, if any, so
/// audio-affecting keys can be picked up on the next sample-frame.
#[derive(Default)]
pub struct Prefs {
    values: HashMap<String, PrefValue>,
    callbacks: HashMap<String, ChangeCallback>,
}

impl Prefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` with `value` unless it's already present
    /// (e.g. restored from a saved config file).
    pub fn add_default(&mut self, name: &str, value: PrefValue) {
        self.values.entry(name.to_string()).or_insert(value);
    }

    /// Registers a callback invoked as `(name, old, new)` whenever
    /// `replace` changes `name`'s value.
    pub fn on_change(&mut self, name: &str, callback: impl Fn(&str, &PrefValue, &PrefValue) + Send + 'static) {
        self.callbacks.insert(name.to_string(), Box::new(callback));
    }

    /// Sets `name` to `value`, invoking its change callback (if any)
    /// with the old and new values. Unknown keys are stored as-is; the
    /// CLI layer is responsible for warning about genuinely unknown
    /// `--<key>` flags.
    pub fn replace(&mut self, name: &str, value: PrefValue) {
        let old = self.values.insert(name.to_string(), value.clone());
        if let Some(old) = old
            && old != value
            && let Some(cb) = self.callbacks.get(name)
        {
            cb(name, &old, &value);
        }
    }

    pub fn find_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(PrefValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn find_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(PrefValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn find_int(&self, name: &str) -> Option<i32> {
        match self.values.get(name) {
            Some(PrefValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Parses a CLI-style `true/on/yes` vs `false/off/no` boolean,
    /// returning `None` (rather than panicking) on anything else so the
    /// caller can warn and skip the option per the "bad boolean"
    /// recovery policy.
    pub fn parse_bool(text: &str) -> Option<bool> {
        match text.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Some(true),
            "false" | "off" | "no" | "0" => Some(false),
            _ => None,
        }
    }

    /// Loads persisted preferences from `~/.config/sidplayer/config.toml`,
    /// returning an empty store if the file doesn't exist or is invalid.
    pub fn load() -> Self {
        let values: HashMap<String, PrefValue> = config_path()
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default();
        Self { values, callbacks: HashMap::new() }
    }

    /// Persists the current values (not callbacks, which aren't
    /// serializable) to the config file. Best-effort; failures are
    /// silently ignored since losing a saved preference isn't fatal.
    pub fn save(&self) {
        let Some(path) = config_path() else { return };
        let Some(parent) = path.parent() else { return };
        let _ = fs::create_dir_all(parent);
        if let Ok(content) = toml::to_string_pretty(&self.values) {
            let _ = fs::write(&path, content);
        }
    }
}

/// Default color scheme index (Dracula), matching `tui::theme::DEFAULT_SCHEME`.
pub const DEFAULT_COLOR_SCHEME: i32 = 11;

/// Registers every preference key from the external interface table
/// with its documented default, plus the TUI's `colorscheme` key.
pub fn register_defaults(prefs: &mut Prefs) {
    prefs.add_default("victype", PrefValue::Str("6569".to_string()));
    prefs.add_default("sidtype", PrefValue::Str("6581".to_string()));
    prefs.add_default("samplerate", PrefValue::Int(44100));
    prefs.add_default("audio16bit", PrefValue::Bool(true));
    prefs.add_default("stereo", PrefValue::Bool(true));
    prefs.add_default("filters", PrefValue::Bool(true));
    prefs.add_default("dualsid", PrefValue::Bool(false));
    prefs.add_default("audioeffect", PrefValue::Int(2));
    prefs.add_default("revdelay", PrefValue::Int(125));
    prefs.add_default("revfeedback", PrefValue::Int(0x50));
    prefs.add_default("volume", PrefValue::Int(0x100));
    for v in 1..=4 {
        prefs.add_default(&format!("v{v}volume"), PrefValue::Int(0x100));
    }
    let default_pans = [-0x40, 0, 0x40, 0];
    for (v, pan) in (1..=4).zip(default_pans) {
        prefs.add_default(&format!("v{v}pan"), PrefValue::Int(pan));
    }
    prefs.add_default("dualsep", PrefValue::Int(0x80));
    prefs.add_default("speed", PrefValue::Int(100));
    prefs.add_default("colorscheme", PrefValue::Int(DEFAULT_COLOR_SCHEME));
}

/// Returns the config file path (~/.config/sidplayer/config.toml).
fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sidplayer").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_fires_callback_only_on_change() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut prefs = Prefs::new();
        prefs.add_default("volume", PrefValue::Int(0x100));

        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        prefs.on_change("volume", move |_name, _old, _new| {
            calls2.fetch_add(1, Ordering::SeqCst);
        });

        prefs.replace("volume", PrefValue::Int(0x100));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        prefs.replace("volume", PrefValue::Int(0x80));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(prefs.find_int("volume"), Some(0x80));
    }

    #[test]
    fn parse_bool_accepts_documented_spellings() {
        assert_eq!(Prefs::parse_bool("true"), Some(true));
        assert_eq!(Prefs::parse_bool("Yes"), Some(true));
        assert_eq!(Prefs::parse_bool("off"), Some(false));
        assert_eq!(Prefs::parse_bool("maybe"), None);
    }

    #[test]
    fn add_default_does_not_overwrite_existing_value() {
        let mut prefs = Prefs::new();
        prefs.add_default("speed", PrefValue::Int(100));
        prefs.replace("speed", PrefValue::Int(50));
        prefs.add_default("speed", PrefValue::Int(100));
        assert_eq!(prefs.find_int("speed"), Some(50));
    }

    #[test]
    fn register_defaults_covers_every_documented_key() {
        let mut prefs = Prefs::new();
        register_defaults(&mut prefs);
        for key in ["victype", "sidtype", "samplerate", "audio16bit", "stereo", "filters", "dualsid", "audioeffect", "revdelay", "revfeedback", "volume", "v1volume", "v4pan", "dualsep", "speed", "colorscheme"] {
            assert!(prefs.values.contains_key(key), "missing default for {key}");
        }
    }
}
