use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::actions::parse_chord;

/// Action names a binding may be attached to.
pub const ACTIONS: [&str; 4] = ["previous_tab", "next_tab", "new_tab", "close_tab"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

/// Recognizer tuning. Distances are in normalized landmark units.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Moving-average window for fingertip x, in frames.
    pub window_size: usize,
    /// Exponential factor for wrist y; smaller is smoother and laggier.
    pub smoothing_factor: f64,
    /// Per-frame motion that counts as a swipe or scroll.
    pub motion_threshold: f64,
    /// Thumb-to-fingertip distance that counts as touching.
    pub touch_distance: f64,
    pub cooldown_ms: u64,
    /// Per-frame motion below which the hand is at rest.
    pub stability_epsilon: f64,
    pub scroll_scale: f64,
    pub tab_throttle_ms: u64,
    pub scroll_throttle_ms: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            window_size: 5,
            smoothing_factor: 0.3,
            motion_threshold: 0.05,
            touch_distance: 0.1,
            cooldown_ms: 1000,
            stability_epsilon: 0.01,
            scroll_scale: 20000.0,
            tab_throttle_ms: 500,
            scroll_throttle_ms: 100,
        }
    }
}

impl Thresholds {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn tab_throttle(&self) -> Duration {
        Duration::from_millis(self.tab_throttle_ms)
    }

    pub fn scroll_throttle(&self) -> Duration {
        Duration::from_millis(self.scroll_throttle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Output {
    /// Scroll amount per emitted wheel notch.
    pub wheel_units_per_step: i32,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            wheel_units_per_step: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub bindings: HashMap<String, String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            meta: Meta::default(),
            thresholds: Thresholds::default(),
            output: Output::default(),
            bindings: default_bindings(),
        }
    }
}

impl Profile {
    pub fn parse(txt: &str) -> Result<Self> {
        let mut profile: Profile = toml::from_str(txt)?;
        for (k, v) in default_bindings() {
            profile.bindings.entry(k).or_insert(v);
        }
        validate_profile(&profile)?;
        Ok(profile)
    }

    /// Key chord bound to `action`, without the `key:` prefix.
    pub fn chord(&self, action: &str) -> Option<&str> {
        self.bindings
            .get(action)
            .and_then(|v| v.strip_prefix("key:"))
            .map(str::trim)
    }
}

fn default_bindings() -> HashMap<String, String> {
    [
        ("previous_tab", "key:CTRL+SHIFT+TAB"),
        ("next_tab", "key:CTRL+TAB"),
        ("new_tab", "key:CTRL+T"),
        ("close_tab", "key:CTRL+W"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn validate_profile(p: &Profile) -> Result<()> {
    let th = &p.thresholds;
    if th.window_size == 0 {
        return Err(anyhow!("thresholds.window_size must be at least 1"));
    }
    if !(th.smoothing_factor > 0.0 && th.smoothing_factor <= 1.0) {
        return Err(anyhow!("thresholds.smoothing_factor must be in (0,1]"));
    }
    for (name, v) in [
        ("motion_threshold", th.motion_threshold),
        ("touch_distance", th.touch_distance),
        ("stability_epsilon", th.stability_epsilon),
        ("scroll_scale", th.scroll_scale),
    ] {
        if !(v.is_finite() && v > 0.0) {
            return Err(anyhow!("thresholds.{name} must be a positive number"));
        }
    }
    if p.output.wheel_units_per_step <= 0 {
        return Err(anyhow!("output.wheel_units_per_step must be positive"));
    }

    for (k, v) in &p.bindings {
        if !ACTIONS.contains(&k.as_str()) {
            return Err(anyhow!("unknown binding '{}'", k));
        }
        let chord = v
            .strip_prefix("key:")
            .ok_or_else(|| anyhow!("binding '{}' has invalid action '{}'", k, v))?;
        parse_chord(chord).map_err(|e| anyhow!("binding '{}': {e}", k))?;
    }
    Ok(())
}

/// On-disk profile set plus the currently active one.
#[derive(Debug, Clone)]
pub struct ConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

pub fn default_config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot locate home directory"))?;
    Ok(dirs.home_dir().join(".config").join("handctl"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl ConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        Self::load_or_install_in(default_config_dir()?)
    }

    pub fn load_or_install_in(config_dir: PathBuf) -> Result<Self> {
        let profiles_dir = config_dir.join("profiles");
        fs::create_dir_all(&profiles_dir)?;

        let def_path = profiles_dir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = config_dir.join("active");
        if !active_ptr.exists() {
            fs::write(&active_ptr, b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = load_profile(&profiles_dir.join(format!("{active_name}.toml")))?;

        Ok(Self {
            active_name,
            profile,
            config_dir,
            profiles_dir,
            active_ptr,
        })
    }

    pub fn profile_path(&self) -> PathBuf {
        self.profiles_dir.join(format!("{}.toml", self.active_name))
    }

    /// Re-read the active profile. On error the previous profile is kept.
    pub fn reload(&mut self) -> Result<()> {
        self.profile = load_profile(&self.profile_path())?;
        Ok(())
    }

    /// Use profile `name` for this process without touching the active pointer.
    pub fn select(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        self.profile = load_profile(&p)?;
        self.active_name = name.to_string();
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        self.select(name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let uinput_ok = Path::new("/dev/uinput").exists();
        let in_input_group = check_in_input_group();
        serde_json::json!({
            "uinput_present": uinput_ok,
            "input_group_member": in_input_group,
            "config_dir": self.config_dir,
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "thresholds": {
                "window_size": self.profile.thresholds.window_size,
                "cooldown_ms": self.profile.thresholds.cooldown_ms,
                "motion_threshold": self.profile.thresholds.motion_threshold,
            },
            "hints": {
                "udev_rule": "/etc/udev/rules.d/80-uinput.rules",
                "add_user_to_input_group": "sudo usermod -aG input $USER && newgrp input"
            }
        })
    }
}

pub fn load_profile(path: &Path) -> Result<Profile> {
    let txt = fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    Profile::parse(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))
}

fn check_in_input_group() -> bool {
    let Ok(s) = fs::read_to_string("/etc/group") else {
        return false;
    };
    let user = whoami::username();
    s.lines()
        .filter(|line| line.starts_with("input:"))
        .any(|line| {
            line.split(':')
                .nth(3)
                .unwrap_or("")
                .split(',')
                .any(|u| u == user)
        })
}
