//! Layered configuration (C11): an optional `visualizer-host.toml` next to
//! the binary, falling back to defaults field-by-field. Grounded on the
//! prior `serde`+`toml` dependency choice, replacing an incomplete
//! wasm-only `Config` struct with a real on-disk schema (SPEC_FULL.md §4.11).

use serde::{Deserialize, Serialize};

use crate::{
        diagnostics::{Diagnostics, Severity},
        gpu::pool::{DEFAULT_LIVE_BUDGET, HARD_CEILING},
        input::modes::{ClickMode, PointerMode, WheelMode},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextPoolConfig
{
        pub cap: usize,
        pub default_live_budget: usize,
}

impl Default for ContextPoolConfig
{
        fn default() -> Self
        {
                Self {
                        cap: HARD_CEILING,
                        default_live_budget: DEFAULT_LIVE_BUDGET,
                }
        }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig
{
        pub destroy_on_switch: bool,
}

impl Default for SchedulerConfig
{
        fn default() -> Self
        {
                Self {
                        destroy_on_switch: true,
                }
        }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig
{
        pub enabled: bool,
        pub device: String,
        pub fft_size: usize,
        pub smoothing: f64,
}

impl Default for AudioConfig
{
        fn default() -> Self
        {
                Self {
                        enabled: true,
                        device: "default".to_string(),
                        fft_size: crate::audio::FFT_SIZE,
                        smoothing: crate::audio::SMOOTHING,
                }
        }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfigFile
{
        pub master_enabled: bool,
        pub pointer_mode: String,
        pub click_mode: String,
        pub wheel_mode: String,
}

impl Default for RouterConfigFile
{
        fn default() -> Self
        {
                Self {
                        master_enabled: true,
                        pointer_mode: "rotations".to_string(),
                        click_mode: "burst".to_string(),
                        wheel_mode: "cycle".to_string(),
                }
        }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig
{
        pub level: String,
}

impl Default for LoggingConfig
{
        fn default() -> Self
        {
                Self {
                        level: "info".to_string(),
                }
        }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig
{
        pub context_pool: ContextPoolConfig,
        pub scheduler: SchedulerConfig,
        pub audio: AudioConfig,
        pub router: RouterConfigFile,
        pub logging: LoggingConfig,
}

impl HostConfig
{
        /// Loads `path` if present, otherwise returns [`HostConfig::default`].
        /// Parse failure falls back to the full default rather than aborting
        /// startup (SPEC_FULL.md §4.11).
        pub fn load(
                path: &std::path::Path,
                diagnostics: &mut Diagnostics,
        ) -> Self
        {
                let text = match std::fs::read_to_string(path)
                {
                        Ok(text) => text,
                        Err(_) => return Self::default(),
                };

                match toml::from_str::<HostConfig>(&text)
                {
                        Ok(mut config) =>
                        {
                                config.validate(diagnostics);
                                config
                        }
                        Err(err) =>
                        {
                                diagnostics.emit(
                                        Severity::Warn,
                                        "invalid_config",
                                        format!("failed to parse {}: {err}, using defaults", path.display()),
                                );
                                Self::default()
                        }
                }
        }

        /// Replaces any out-of-range field with its default, reporting each
        /// replacement as a [`crate::error::HostError::InvalidConfig`]-shaped
        /// diagnostic. Never fails.
        pub fn validate(
                &mut self,
                diagnostics: &mut Diagnostics,
        )
        {
                if self.context_pool.cap == 0 || self.context_pool.cap > HARD_CEILING
                {
                        diagnostics.emit(
                                Severity::Warn,
                                "invalid_config",
                                format!(
                                        "context_pool.cap {} outside 1..={HARD_CEILING}, using {}",
                                        self.context_pool.cap, HARD_CEILING
                                ),
                        );
                        self.context_pool.cap = HARD_CEILING;
                }

                if !self.audio.fft_size.is_power_of_two()
                {
                        diagnostics.emit(
                                Severity::Warn,
                                "invalid_config",
                                format!(
                                        "audio.fft_size {} is not a power of two, using {}",
                                        self.audio.fft_size,
                                        crate::audio::FFT_SIZE
                                ),
                        );
                        self.audio.fft_size = crate::audio::FFT_SIZE;
                }

                if PointerMode::parse(&self.router.pointer_mode).is_none()
                {
                        diagnostics.emit(
                                Severity::Warn,
                                "invalid_config",
                                format!("unknown router.pointer_mode {:?}, using rotations", self.router.pointer_mode),
                        );
                        self.router.pointer_mode = "rotations".to_string();
                }

                if ClickMode::parse(&self.router.click_mode).is_none()
                {
                        diagnostics.emit(
                                Severity::Warn,
                                "invalid_config",
                                format!("unknown router.click_mode {:?}, using burst", self.router.click_mode),
                        );
                        self.router.click_mode = "burst".to_string();
                }

                if WheelMode::parse(&self.router.wheel_mode).is_none()
                {
                        diagnostics.emit(
                                Severity::Warn,
                                "invalid_config",
                                format!("unknown router.wheel_mode {:?}, using cycle", self.router.wheel_mode),
                        );
                        self.router.wheel_mode = "cycle".to_string();
                }
        }
}

#[cfg(test)]
mod tests
{
        use super::*;

        #[test]
        fn default_config_is_self_consistent()
        {
                let mut diagnostics = Diagnostics::new();
                let mut config = HostConfig::default();
                config.validate(&mut diagnostics);
                assert_eq!(diagnostics.recent().count(), 0);
        }

        #[test]
        fn out_of_range_cap_falls_back_to_hard_ceiling()
        {
                let mut diagnostics = Diagnostics::new();
                let mut config = HostConfig::default();
                config.context_pool.cap = 999;
                config.validate(&mut diagnostics);
                assert_eq!(config.context_pool.cap, HARD_CEILING);
                assert_eq!(diagnostics.recent().count(), 1);
        }

        #[test]
        fn missing_file_yields_defaults()
        {
                let mut diagnostics = Diagnostics::new();
                let config = HostConfig::load(std::path::Path::new("/nonexistent/path.toml"), &mut diagnostics);
                assert_eq!(config.context_pool.cap, HARD_CEILING);
        }

        #[test]
        fn unknown_pointer_mode_falls_back_to_rotations()
        {
                let mut diagnostics = Diagnostics::new();
                let mut config = HostConfig::default();
                config.router.pointer_mode = "not-a-mode".to_string();
                config.validate(&mut diagnostics);
                assert_eq!(config.router.pointer_mode, "rotations");
        }
}
