use std::{collections::HashMap, fs, path::Path, time::Duration};

use serde::Deserialize;
use shared::domain::SliderBounds;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub dataset_path: String,
    pub slider_max: f64,
    pub slider_step: f64,
    pub log_filter: String,
    pub event_buffer: usize,
    pub session_idle_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8050".into(),
            dataset_path: "spacex_launch_dash.csv".into(),
            slider_max: 10_000.0,
            slider_step: 1_000.0,
            log_filter: "info".into(),
            event_buffer: 64,
            session_idle_secs: 1_800,
        }
    }
}

impl Settings {
    pub fn slider(&self) -> SliderBounds {
        SliderBounds {
            min: 0.0,
            max: self.slider_max,
            step: self.slider_step,
        }
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("dashboard.toml"), |key| std::env::var(key).ok())
}

fn load_settings_from(
    config_path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => apply_file_config(&mut settings, &file_cfg),
            Err(error) => warn!(
                path = %config_path.display(),
                %error,
                "ignoring unreadable dashboard config file"
            ),
        }
    }

    if let Some(v) = env("DASHBOARD_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("DATASET_PATH") {
        settings.dataset_path = v;
    }
    if let Some(v) = env("APP__DATASET_PATH") {
        settings.dataset_path = v;
    }

    if let Some(v) = env("APP__SLIDER_MAX") {
        set_parsed(&mut settings.slider_max, "APP__SLIDER_MAX", &v);
    }
    if let Some(v) = env("APP__SLIDER_STEP") {
        set_parsed(&mut settings.slider_step, "APP__SLIDER_STEP", &v);
    }
    if let Some(v) = env("APP__EVENT_BUFFER") {
        set_parsed(&mut settings.event_buffer, "APP__EVENT_BUFFER", &v);
    }
    if let Some(v) = env("APP__SESSION_IDLE_SECS") {
        set_parsed(&mut settings.session_idle_secs, "APP__SESSION_IDLE_SECS", &v);
    }

    if let Some(v) = env("RUST_LOG") {
        settings.log_filter = v;
    }

    normalize(settings)
}

fn apply_file_config(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("dataset_path") {
        settings.dataset_path = v.clone();
    }
    if let Some(v) = file_cfg.get("slider_max") {
        set_parsed(&mut settings.slider_max, "slider_max", v);
    }
    if let Some(v) = file_cfg.get("slider_step") {
        set_parsed(&mut settings.slider_step, "slider_step", v);
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
    if let Some(v) = file_cfg.get("event_buffer") {
        set_parsed(&mut settings.event_buffer, "event_buffer", v);
    }
    if let Some(v) = file_cfg.get("session_idle_secs") {
        set_parsed(&mut settings.session_idle_secs, "session_idle_secs", v);
    }
}

fn set_parsed<T: std::str::FromStr>(target: &mut T, key: &str, raw: &str) {
    match raw.trim().parse::<T>() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!(key, value = raw, "ignoring unparsable numeric setting"),
    }
}

fn normalize(mut settings: Settings) -> Settings {
    let defaults = Settings::default();
    if !settings.slider_max.is_finite() || settings.slider_max <= 0.0 {
        settings.slider_max = defaults.slider_max;
    }
    if !settings.slider_step.is_finite() || settings.slider_step <= 0.0 {
        settings.slider_step = defaults.slider_step;
    }
    let min_step = settings.slider().min_step();
    if settings.slider_step < min_step {
        warn!(
            slider_step = settings.slider_step,
            min_step,
            "slider step too small for the slider range; raising it"
        );
        settings.slider_step = min_step;
    }
    if settings.event_buffer == 0 {
        settings.event_buffer = defaults.event_buffer;
    }
    if settings.session_idle_secs == 0 {
        settings.session_idle_secs = defaults.session_idle_secs;
    }
    if settings.dataset_path.trim().is_empty() {
        settings.dataset_path = defaults.dataset_path;
    }
    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
