//! 控制器 Builder
//!
//! 提供链式 API 从配置文件和覆盖项创建 [`NavigationController`]。

use std::path::PathBuf;

use cubebot_driver::{MotionLink, SerialAdapter};
use cubebot_nav::{NavConfig, NavigationController, VisionSource};
use cubebot_serial::SerialPortAdapter;
use tracing::info;

use crate::SdkError;

/// 控制器 Builder
///
/// # 示例
///
/// ```rust,no_run
/// use cubebot_sdk::prelude::*;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let vision = || Vec::<MarkerObservation>::new();
/// let mut robot = CubebotBuilder::new()
///     .config_file("robot.toml")
///     .port("/dev/ttyACM1")
///     .zone(2)
///     .build(vision)?;
///
/// let report = robot.home_from_field();
/// println!("finished homing in phase {}", report.phase);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CubebotBuilder {
    config: Option<NavConfig>,
    config_file: Option<PathBuf>,
    port: Option<String>,
    baud_rate: Option<u32>,
    zone: Option<u32>,
}

impl CubebotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用现成的配置（优先于配置文件）
    pub fn config(mut self, config: NavConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 从 TOML 文件加载配置
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// 覆盖串口路径
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// 覆盖波特率
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    /// 覆盖出发区编号
    pub fn zone(mut self, zone: u32) -> Self {
        self.zone = Some(zone);
        self
    }

    /// 合并配置来源和覆盖项，并校验结果
    pub fn resolve_config(&self) -> Result<NavConfig, SdkError> {
        let mut config = match (&self.config, &self.config_file) {
            (Some(config), _) => config.clone(),
            (None, Some(path)) => NavConfig::load_from_file(path)?,
            (None, None) => NavConfig::default(),
        };
        if let Some(port) = &self.port {
            config.link.port = port.clone();
        }
        if let Some(baud_rate) = self.baud_rate {
            config.link.baud_rate = baud_rate;
        }
        if let Some(zone) = self.zone {
            config.arena.zone = zone;
        }
        config.validate()?;
        Ok(config)
    }

    /// 打开真实串口并构建控制器
    pub fn build<V: VisionSource>(
        self,
        vision: V,
    ) -> Result<NavigationController<SerialPortAdapter, V>, SdkError> {
        let config = self.resolve_config()?;
        info!(
            "Opening motor board on {} at {} baud",
            config.link.port, config.link.baud_rate
        );
        let link = MotionLink::open(config.link.clone())?;
        Ok(NavigationController::new(link, vision, config))
    }

    /// 使用给定的串口适配器构建控制器（测试或自定义传输）
    pub fn build_with_adapter<A: SerialAdapter, V: VisionSource>(
        self,
        adapter: A,
        vision: V,
    ) -> Result<NavigationController<A, V>, SdkError> {
        let config = self.resolve_config()?;
        let link = MotionLink::new(adapter, config.link.clone());
        Ok(NavigationController::new(link, vision, config))
    }
}

/// 按配置打开串口并构建控制器
pub fn connect<V: VisionSource>(
    config: NavConfig,
    vision: V,
) -> Result<NavigationController<SerialPortAdapter, V>, SdkError> {
    CubebotBuilder::new().config(config).build(vision)
}
