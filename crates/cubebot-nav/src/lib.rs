//! 导航层模块
//!
//! 本模块在运动链路和视觉数据源之上实现基于标记的导航，包括：
//! - 几何修正：目标方块中心偏移、摄像头安装偏移、到角落的向量
//! - 标记搜索：原地拍摄、左右交替扫描、扇区搜索
//! - 靠近目标：远距离目标在检查点重新观测并修正
//! - 回家：从场地任意位置沿墙回到本队角落的状态机
//!
//! # 使用场景
//!
//! 策略代码应该只依赖 [`Navigator`] trait；[`NavigationController`] 是它的唯一实现。

pub mod arena;
pub mod config;
mod controller;
mod error;
pub mod geometry;
pub mod homing;
pub mod marker;
mod navigator;
pub mod search;
mod units;
pub mod vision;

#[cfg(test)]
mod test_support;

pub use arena::{ArenaLayout, HomeWall};
pub use config::{ApproachConfig, ConfigError, HomingConfig, NavConfig, SearchConfig};
pub use controller::{ApproachOutcome, NavigationController, NavigationGoal, TargetSelector};
pub use error::NavError;
pub use geometry::{Calibration, CornerSide, Vector};
pub use homing::{AlignmentDirection, HomingPhase, HomingReport, markers_indicate_motion};
pub use marker::{MarkerCategory, MarkerFilter, MarkerObservation};
pub use navigator::Navigator;
pub use search::SearchState;
pub use units::Deg;
pub use vision::{StaticScene, VisionSource};
