//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use cubebot_sdk::prelude::*;
//! ```

// 导航层（推荐使用）
pub use cubebot_nav::{
    ApproachOutcome, ArenaLayout, Calibration, Deg, HomingPhase, HomingReport, MarkerCategory,
    MarkerFilter, MarkerObservation, NavConfig, NavigationController, NavigationGoal, Navigator,
    StaticScene, TargetSelector, VisionSource,
};

// 链路层与串口层
pub use cubebot_driver::{LinkConfig, MotionLink};
pub use cubebot_protocol::{MotionCommand, MotionOp};
pub use cubebot_serial::SerialAdapter;

// Builder
pub use crate::{CubebotBuilder, Robot, connect};

// 错误类型
pub use crate::SdkError;
pub use cubebot_driver::{LinkError, MotionInterrupted};
pub use cubebot_nav::{ConfigError, NavError};
pub use cubebot_serial::SerialError;
