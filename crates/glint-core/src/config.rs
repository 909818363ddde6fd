//! Configuration for glint nodes.
//!
//! A node is configured from three places, later ones winning:
//!
//! 1. Built-in defaults (a 33-node cluster on the network layout)
//! 2. A TOML file, from `--config` or `GLINT_CONFIG_PATH`
//! 3. `GLINT_*` environment variables
//!
//! The positional launch parameters (rate, mode, iterations, mask) are not
//! part of the file; they are validated separately into [`LaunchParams`].
//!
//! # Example
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [cluster]
//! size = 33
//! layout = "physical"
//!
//! [hardware]
//! driver = "sysfs"
//! red_line = 17
//! ```

use crate::error::{GlintError, Result};
use crate::mode::Mode;
use crate::topology::LayoutVariant;
use crate::types::ChannelMask;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// Environment variable names
pub const ENV_CONFIG_PATH: &str = "GLINT_CONFIG_PATH";
pub const ENV_LOG_LEVEL: &str = "GLINT_LOG_LEVEL";
pub const ENV_LAYOUT: &str = "GLINT_LAYOUT";
pub const ENV_CLUSTER_SIZE: &str = "GLINT_CLUSTER_SIZE";
pub const ENV_BIND: &str = "GLINT_BIND";
pub const ENV_CONNECT: &str = "GLINT_CONNECT";
pub const ENV_DRIVER: &str = "GLINT_DRIVER";

/// Number of nodes a full cluster has: one orchestrator and 32 followers.
pub const DEFAULT_CLUSTER_SIZE: usize = 33;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlintConfig {
    general: GeneralConfig,
    cluster: ClusterConfig,
    transport: TransportConfig,
    hardware: HardwareConfig,
    patterns: PatternConfig,
}

/// General settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Cluster shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Total node count including the orchestrator
    pub size: usize,
    /// Which table set describes the rank numbering
    pub layout: LayoutVariant,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CLUSTER_SIZE,
            layout: LayoutVariant::Network,
        }
    }
}

/// TCP transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Address the orchestrator listens on
    pub bind: String,
    /// Address followers dial
    pub connect: String,
    /// How long the orchestrator waits for the whole cluster to join
    pub join_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:7400".to_string(),
            connect: "127.0.0.1:7400".to_string(),
            join_timeout_secs: 60,
        }
    }
}

/// Which output driver a node uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// In-memory outputs, nothing is wired
    #[default]
    Memory,
    /// Linux sysfs GPIO lines
    Sysfs,
}

impl std::str::FromStr for DriverKind {
    type Err = GlintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sysfs" => Ok(Self::Sysfs),
            _ => Err(GlintError::config(format!(
                "Invalid driver '{}'. Must be one of: memory, sysfs",
                s
            ))),
        }
    }
}

/// Output hardware settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub driver: DriverKind,
    /// GPIO line for the red channel
    pub red_line: u32,
    /// GPIO line for the green channel
    pub green_line: u32,
    /// GPIO line for the blue channel
    pub blue_line: u32,
    /// Common-anode LEDs light when the line is driven low
    pub active_low: bool,
    /// Root of the sysfs GPIO tree
    pub sysfs_root: PathBuf,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Memory,
            red_line: 17,
            green_line: 4,
            blue_line: 18,
            active_low: true,
            sysfs_root: PathBuf::from("/sys/class/gpio"),
        }
    }
}

/// Pacing factors for the pattern engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Unison waits this many rate intervals between broadcasts
    pub unison_dwell: u32,
    /// Raster waits this many rate intervals after each selector
    pub raster_scan_depth: u32,
    /// Dual-sweep inner timeline interval, as a multiple of the rate
    pub dual_sweep_inner_scale: u32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            unison_dwell: 5,
            raster_scan_depth: 6,
            dual_sweep_inner_scale: 4,
        }
    }
}

impl GlintConfig {
    /// Load configuration from `path`, or from `GLINT_CONFIG_PATH`, or defaults.
    ///
    /// Environment overrides are applied and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => Self::read_file(&p)?,
            None => {
                debug!("No configuration file given, using defaults");
                Self::default()
            }
        };

        config.merge_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .map_err(|e| GlintError::config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| GlintError::config(format!("Failed to parse config file: {}", e)))?;

        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GlintError::config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GlintError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| GlintError::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply `GLINT_*` environment overrides
    pub fn merge_env_vars(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            self.general.log_level = level;
        }

        if let Ok(layout) = std::env::var(ENV_LAYOUT) {
            self.cluster.layout = layout.parse()?;
        }

        if let Ok(size) = std::env::var(ENV_CLUSTER_SIZE) {
            self.cluster.size = size.parse().map_err(|_| {
                GlintError::config(format!("{} must be a node count, got '{}'", ENV_CLUSTER_SIZE, size))
            })?;
        }

        if let Ok(bind) = std::env::var(ENV_BIND) {
            self.transport.bind = bind;
        }

        if let Ok(connect) = std::env::var(ENV_CONNECT) {
            self.transport.connect = connect;
        }

        if let Ok(driver) = std::env::var(ENV_DRIVER) {
            self.hardware.driver = driver.parse()?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(GlintError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.general.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.cluster.size < 2 {
            return Err(GlintError::config(
                "cluster.size must include the orchestrator and at least one follower",
            ));
        }

        let hw = &self.hardware;
        if hw.red_line == hw.green_line || hw.red_line == hw.blue_line || hw.green_line == hw.blue_line
        {
            return Err(GlintError::config(
                "red_line, green_line and blue_line must be distinct",
            ));
        }

        let p = &self.patterns;
        if p.unison_dwell == 0 || p.raster_scan_depth == 0 || p.dual_sweep_inner_scale == 0 {
            return Err(GlintError::config(
                "pattern pacing factors must be greater than 0",
            ));
        }

        Ok(())
    }

    pub fn general(&self) -> &GeneralConfig {
        &self.general
    }

    pub fn general_mut(&mut self) -> &mut GeneralConfig {
        &mut self.general
    }

    pub fn cluster(&self) -> &ClusterConfig {
        &self.cluster
    }

    pub fn cluster_mut(&mut self) -> &mut ClusterConfig {
        &mut self.cluster
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut TransportConfig {
        &mut self.transport
    }

    pub fn hardware(&self) -> &HardwareConfig {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut HardwareConfig {
        &mut self.hardware
    }

    pub fn patterns(&self) -> &PatternConfig {
        &self.patterns
    }

    pub fn patterns_mut(&mut self) -> &mut PatternConfig {
        &mut self.patterns
    }
}

// ============================================================================
// Launch parameters
// ============================================================================

/// Default step length in milliseconds.
pub const DEFAULT_RATE: i32 = 100;

/// Validated positional launch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchParams {
    /// Step length in milliseconds, always positive
    pub rate: i32,
    pub mode: Mode,
    /// Orchestrator ticks before draining; negative runs until interrupted
    pub iterations: i64,
    pub mask: ChannelMask,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            mode: Mode::Rotation,
            iterations: -1,
            mask: ChannelMask::ALL,
        }
    }
}

impl LaunchParams {
    /// Validate raw launch values.
    pub fn new(rate: i64, selector: Option<i64>, iterations: i64, mask: i64) -> Result<Self> {
        let rate = i32::try_from(rate)
            .ok()
            .filter(|r| *r > 0)
            .ok_or_else(|| GlintError::config(format!("rate must be a positive number of milliseconds, got {}", rate)))?;

        let mask = u8::try_from(mask)
            .map_err(|_| GlintError::config(format!("mask must be between 0 and 7, got {}", mask)))
            .and_then(ChannelMask::new)?;

        Ok(Self {
            rate,
            mode: Mode::from_selector(selector),
            iterations,
            mask,
        })
    }

    /// Whether the session runs until interrupted.
    pub fn is_unbounded(&self) -> bool {
        self.iterations < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::PatternId;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests touching GLINT_* variables share one process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        unsafe {
            for var in [
                ENV_CONFIG_PATH,
                ENV_LOG_LEVEL,
                ENV_LAYOUT,
                ENV_CLUSTER_SIZE,
                ENV_BIND,
                ENV_CONNECT,
                ENV_DRIVER,
            ] {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = GlintConfig::default();
        assert_eq!(config.general().log_level, "info");
        assert_eq!(config.cluster().size, 33);
        assert_eq!(config.cluster().layout, LayoutVariant::Network);
        assert_eq!(config.patterns().raster_scan_depth, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = GlintConfig::default();
        config.general_mut().log_level = "loud".to_string();
        assert!(config.validate().unwrap_err().is_config());

        let mut config = GlintConfig::default();
        config.cluster_mut().size = 1;
        assert!(config.validate().is_err());

        let mut config = GlintConfig::default();
        config.hardware_mut().blue_line = config.hardware().red_line;
        assert!(config.validate().is_err());

        let mut config = GlintConfig::default();
        config.patterns_mut().dual_sweep_inner_scale = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glint.toml");

        let mut config = GlintConfig::default();
        config.cluster_mut().layout = LayoutVariant::Physical;
        config.hardware_mut().driver = DriverKind::Sysfs;
        config.save_to_path(&path).unwrap();

        let loaded = GlintConfig::read_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glint.toml");
        std::fs::write(&path, "[cluster]\nlayout = \"physical\"\n").unwrap();

        let loaded = GlintConfig::read_file(&path).unwrap();
        assert_eq!(loaded.cluster().layout, LayoutVariant::Physical);
        assert_eq!(loaded.cluster().size, DEFAULT_CLUSTER_SIZE);
        assert_eq!(loaded.hardware().red_line, 17);
    }

    #[test]
    fn test_unparseable_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glint.toml");
        std::fs::write(&path, "[cluster\nsize = ").unwrap();
        assert!(GlintConfig::read_file(&path).unwrap_err().is_config());
    }

    #[test]
    fn test_launch_params() {
        let params = LaunchParams::new(50, Some(0), 3, 7).unwrap();
        assert_eq!(params.rate, 50);
        assert_eq!(params.mode, Mode::Sweep(PatternId::StackUp));
        assert_eq!(params.mask, ChannelMask::ALL);
        assert!(!params.is_unbounded());

        assert!(LaunchParams::new(0, None, -1, 7).is_err());
        assert!(LaunchParams::new(-5, None, -1, 7).is_err());
        assert!(LaunchParams::new(100, None, -1, 8).is_err());
        assert!(LaunchParams::new(100, None, -1, -1).is_err());
        assert!(LaunchParams::new(100, None, -1, 1).unwrap().is_unbounded());
    }

    #[test]
    fn test_env_var_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let mut config = GlintConfig::default();

        unsafe {
            env::set_var(ENV_LOG_LEVEL, "debug");
            env::set_var(ENV_LAYOUT, "physical");
            env::set_var(ENV_CLUSTER_SIZE, "9");
            env::set_var(ENV_BIND, "127.0.0.1:9000");
            env::set_var(ENV_CONNECT, "10.0.0.1:9000");
            env::set_var(ENV_DRIVER, "sysfs");
        }

        config.merge_env_vars().unwrap();
        clear_env();

        assert_eq!(config.general().log_level, "debug");
        assert_eq!(config.cluster().layout, LayoutVariant::Physical);
        assert_eq!(config.cluster().size, 9);
        assert_eq!(config.transport().bind, "127.0.0.1:9000");
        assert_eq!(config.transport().connect, "10.0.0.1:9000");
        assert_eq!(config.hardware().driver, DriverKind::Sysfs);
    }

    #[test]
    fn test_invalid_env_var() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let mut config = GlintConfig::default();

        unsafe {
            env::set_var(ENV_CLUSTER_SIZE, "many");
        }
        let result = config.merge_env_vars();
        clear_env();
        assert!(result.unwrap_err().is_config());

        unsafe {
            env::set_var(ENV_DRIVER, "relay");
        }
        let result = config.merge_env_vars();
        clear_env();
        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_load_from_env_config_path() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glint.toml");
        std::fs::write(&path, "[cluster]\nsize = 5\nlayout = \"physical\"\n").unwrap();

        unsafe {
            env::set_var(ENV_CONFIG_PATH, &path);
        }
        let loaded = GlintConfig::load(None);
        clear_env();

        let loaded = loaded.unwrap();
        assert_eq!(loaded.cluster().size, 5);
        assert_eq!(loaded.cluster().layout, LayoutVariant::Physical);
    }

    #[test]
    fn test_explicit_path_wins_over_env_path() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let from_env = dir.path().join("env.toml");
        std::fs::write(&explicit, "[cluster]\nsize = 4\n").unwrap();
        std::fs::write(&from_env, "[cluster]\nsize = 12\n").unwrap();

        unsafe {
            env::set_var(ENV_CONFIG_PATH, &from_env);
            env::set_var(ENV_LAYOUT, "physical");
        }
        let loaded = GlintConfig::load(Some(&explicit));
        clear_env();

        // File choice follows --config, variables still override on top.
        let loaded = loaded.unwrap();
        assert_eq!(loaded.cluster().size, 4);
        assert_eq!(loaded.cluster().layout, LayoutVariant::Physical);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        assert_eq!(GlintConfig::load(None).unwrap(), GlintConfig::default());
    }
}
