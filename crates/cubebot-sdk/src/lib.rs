//! Cubebot SDK - 基于视觉标记的比赛机器人导航
//!
//! 机器人通过摄像头识别场地围墙和目标方块上的标记，再通过串口向电机控制板发送
//! 两字节的运动指令完成移动。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 两字节指令帧的编码/解码
//! - **串口层** (`serial`): 串口硬件抽象，真实串口与 Mock
//! - **链路层** (`driver`): 一问一答的阻塞式运动链路，分块与续行
//! - **导航层** (`nav`): 几何修正、标记搜索、靠近目标、回家状态机
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use cubebot_sdk::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! cubebot_sdk::init_logging();
//! let vision = || Vec::<MarkerObservation>::new();
//! let mut robot = cubebot_sdk::connect(NavConfig::default(), vision)?;
//! let goal = robot.goal(TargetSelector::Category(MarkerCategory::TargetA));
//! let outcome = robot.move_to_target(&goal);
//! println!("approach finished: {:?}", outcome);
//! # Ok(())
//! # }
//! ```

mod builder;
mod logging;
pub mod prelude;

pub use cubebot_driver as driver;
pub use cubebot_nav as nav;
pub use cubebot_protocol as protocol;
pub use cubebot_serial as serial;

pub use builder::{CubebotBuilder, connect};
pub use logging::{DEFAULT_FILTER, init_logging, init_logging_with};

// 常用类型
pub use cubebot_driver::{LinkConfig, LinkError, MotionInterrupted, MotionLink};
pub use cubebot_nav::{
    ApproachOutcome, HomingPhase, HomingReport, MarkerObservation, NavConfig, NavError,
    NavigationController, NavigationGoal, Navigator, TargetSelector,
};
pub use cubebot_serial::{SerialAdapter, SerialError, SerialPortAdapter};

use thiserror::Error;

/// SDK 层错误
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Configuration error: {0}")]
    Config(#[from] cubebot_nav::ConfigError),

    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),
}

/// 使用真实串口的控制器
pub type Robot<V> = NavigationController<SerialPortAdapter, V>;
