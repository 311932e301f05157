//! # 导航配置
//!
//! 全部物理常数都来自配置文件；每个字段都有默认值，配置文件只需写出需要覆盖的部分。
//!
//! ```toml
//! [link]
//! port = "/dev/ttyACM0"
//!
//! [arena]
//! zone = 2
//!
//! [homing]
//! standoff = 1.5
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cubebot_driver::LinkConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arena::ArenaLayout;
use crate::geometry::Calibration;
use crate::units::Deg;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 靠近目标（`[approach]` 段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproachConfig {
    /// 远距离目标先开到目标前方多远处重新观测（米）
    pub checkpoint_distance: f64,
    /// 不需要中途修正的最大距离（米）
    pub max_safe_distance: f64,
    /// 中途修正的角度容差（度）
    pub angle_tolerance_deg: f64,
    /// 中途修正的最大次数
    pub max_corrections: u32,
}

impl Default for ApproachConfig {
    fn default() -> Self {
        Self {
            checkpoint_distance: 1.0,
            max_safe_distance: 3.0,
            angle_tolerance_deg: 1.0,
            max_corrections: 5,
        }
    }
}

/// 标记搜索（`[search]` 段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// capture 的默认尝试次数
    pub capture_attempts: u32,
    /// 两次拍摄之间的停顿（毫秒）
    pub capture_pause_ms: u64,
    /// 扫描步长（度）
    pub sweep_step_deg: f64,
    /// 扫描最大偏角（度）
    pub sweep_max_deg: f64,
    /// 锥形搜索起始角（度）
    pub cone_start_deg: f64,
    /// 锥形搜索终止角（度）
    pub cone_stop_deg: f64,
    /// 锥形搜索步长（度）
    pub cone_step_deg: f64,
    /// 转向后拍摄前的停顿（毫秒），等画面稳定
    pub probe_pause_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            capture_attempts: 3,
            capture_pause_ms: 500,
            sweep_step_deg: 20.0,
            sweep_max_deg: 180.0,
            cone_start_deg: -45.0,
            cone_stop_deg: 45.0,
            cone_step_deg: 15.0,
            probe_pause_ms: 500,
        }
    }
}

impl SearchConfig {
    pub fn capture_pause(&self) -> Duration {
        Duration::from_millis(self.capture_pause_ms)
    }

    pub fn probe_pause(&self) -> Duration {
        Duration::from_millis(self.probe_pause_ms)
    }
}

/// 回家状态机（`[homing]` 段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomingConfig {
    /// 靠近锚点标记后保持的距离（米）
    pub standoff: f64,
    /// 已经在该距离容差内时不再前进（米）
    pub standoff_tolerance: f64,
    /// 卡住后后退的距离（米）
    pub stall_backoff: f64,
    /// 卡住后最多重试次数
    pub max_stall_retries: u32,
    /// 判断“没动”的距离阈值（米）
    pub similar_distance: f64,
    /// 判断“没动”的方位阈值（度）
    pub similar_bearing_deg: f64,
    /// 摆正时与墙保持的距离（米）
    pub wall_offset: f64,
    /// 平行于墙后仍看到锚点时后退的距离（米）
    pub align_backoff: f64,
    /// 平行对齐最多重试次数
    pub max_align_retries: u32,
    /// 沿墙前进的步长（米）
    pub travel_increment: f64,
    /// 每步前进后的停顿（毫秒）
    pub travel_pause_ms: u64,
    /// 沿墙前进时寻找下一个标记的最大距离（米）
    pub travel_scan_distance: f64,
    /// 沿墙前进的最大步数
    pub max_travel_steps: u32,
    /// 最多绕过几面对手的墙
    pub max_wall_laps: u32,
    /// 入角：内侧标记的停靠距离（米）
    pub inner_standoff: f64,
    /// 入角：外侧标记的停靠距离（米）
    pub outer_standoff: f64,
    /// 入角：内侧标记转向后的最后一段（米）
    pub inner_final: f64,
    /// 入角：外侧标记转向后的最后一段（米）
    pub outer_final: f64,
    /// 入角转向角度（度）
    pub corner_turn_deg: f64,
    /// 直接开往角落时在角落前停下的距离（米）
    pub corner_clearance: f64,
    /// 什么都看不到时盲开的两段距离（米）
    pub blind_legs: Vec<f64>,
    /// 丢失标记后的重试次数
    pub lost_marker_retries: u32,
    /// 丢失标记后的等待时间（毫秒）
    pub lost_marker_delay_ms: u64,
    /// 运动被中断后的最大续行次数
    pub max_motion_retries: u32,
    /// 续行前的等待时间（毫秒）
    pub motion_retry_delay_ms: u64,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            standoff: 1.5,
            standoff_tolerance: 0.05,
            stall_backoff: 0.15,
            max_stall_retries: 3,
            similar_distance: 0.1,
            similar_bearing_deg: 15.0,
            wall_offset: 1.75,
            align_backoff: 0.1,
            max_align_retries: 3,
            travel_increment: 1.0,
            travel_pause_ms: 1000,
            travel_scan_distance: 3.0,
            max_travel_steps: 8,
            max_wall_laps: 2,
            inner_standoff: 1.0,
            outer_standoff: 2.0,
            inner_final: 1.5,
            outer_final: 3.0,
            corner_turn_deg: 45.0,
            corner_clearance: 0.5,
            blind_legs: vec![1.5, 2.0],
            lost_marker_retries: 3,
            lost_marker_delay_ms: 2000,
            max_motion_retries: 5,
            motion_retry_delay_ms: 1000,
        }
    }
}

impl HomingConfig {
    pub fn similar_bearing(&self) -> Deg {
        Deg(self.similar_bearing_deg)
    }

    pub fn corner_turn(&self) -> Deg {
        Deg(self.corner_turn_deg)
    }

    pub fn travel_pause(&self) -> Duration {
        Duration::from_millis(self.travel_pause_ms)
    }

    pub fn lost_marker_delay(&self) -> Duration {
        Duration::from_millis(self.lost_marker_delay_ms)
    }

    pub fn motion_retry_delay(&self) -> Duration {
        Duration::from_millis(self.motion_retry_delay_ms)
    }
}

/// 完整导航配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub link: LinkConfig,
    pub calibration: Calibration,
    pub approach: ApproachConfig,
    pub search: SearchConfig,
    pub homing: HomingConfig,
    pub arena: ArenaLayout,
}

impl NavConfig {
    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: NavConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arena.validate().map_err(ConfigError::Invalid)?;

        let positive = [
            ("approach.max_safe_distance", self.approach.max_safe_distance),
            ("homing.standoff", self.homing.standoff),
            ("homing.travel_increment", self.homing.travel_increment),
            ("homing.wall_offset", self.homing.wall_offset),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("approach.checkpoint_distance", self.approach.checkpoint_distance),
            ("approach.angle_tolerance_deg", self.approach.angle_tolerance_deg),
            ("calibration.target_center_offset", self.calibration.target_center_offset),
            ("calibration.footprint_offset", self.calibration.footprint_offset),
            ("homing.stall_backoff", self.homing.stall_backoff),
            ("homing.align_backoff", self.homing.align_backoff),
            ("homing.corner_clearance", self.homing.corner_clearance),
            ("search.sweep_max_deg", self.search.sweep_max_deg),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        if !(self.search.sweep_step_deg > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "search.sweep_step_deg must be positive, got {}",
                self.search.sweep_step_deg
            )));
        }
        if self.approach.checkpoint_distance >= self.approach.max_safe_distance {
            return Err(ConfigError::Invalid(format!(
                "approach.checkpoint_distance ({}) must be shorter than approach.max_safe_distance ({})",
                self.approach.checkpoint_distance, self.approach.max_safe_distance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = NavConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.homing.standoff, 1.5);
        assert_eq!(config.homing.blind_legs, vec![1.5, 2.0]);
        assert_eq!(config.calibration.target_center_offset, 0.1275);
        assert_eq!(config.search.capture_pause(), Duration::from_millis(500));
        assert_eq!(config.link.success_byte, b'd');
    }

    #[test]
    fn test_partial_toml() {
        let config = NavConfig::from_toml_str(
            r#"
[arena]
zone = 2

[homing]
standoff = 1.2
lost_marker_delay_ms = 0
"#,
        )
        .unwrap();
        assert_eq!(config.arena.zone, 2);
        assert_eq!(config.arena.markers_per_wall, 7);
        assert_eq!(config.homing.standoff, 1.2);
        assert_eq!(config.homing.lost_marker_delay(), Duration::ZERO);
        assert_eq!(config.homing.stall_backoff, 0.15);
        assert_eq!(config.approach, ApproachConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = NavConfig::from_toml_str("[arena]\nzone = 7\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = NavConfig::from_toml_str("[homing]\nstandoff = -1.0\n").unwrap_err();
        assert!(format!("{}", err).contains("homing.standoff"));

        let err = NavConfig::from_toml_str("[search]\nsweep_step_deg = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = NavConfig::from_toml_str("[link\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_file_roundtrip() {
        let mut config = NavConfig::default();
        config.arena.zone = 3;
        config.link.port = "/dev/ttyUSB0".to_string();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("robot.toml");
        config.save_to_file(&path).unwrap();
        let loaded = NavConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_from_hand_written_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[calibration]\ncamera_bias_deg = -1.5").unwrap();
        let config = NavConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.calibration.camera_bias(), Deg(-1.5));
    }

    #[test]
    fn test_missing_file() {
        let err = NavConfig::load_from_file("/nonexistent/robot.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
