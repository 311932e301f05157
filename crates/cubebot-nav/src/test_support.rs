//! 单元测试共用的构造函数

use cubebot_driver::{LinkConfig, MotionLink};
use cubebot_serial::MockSerial;

use crate::config::NavConfig;
use crate::controller::NavigationController;
use crate::vision::VisionSource;

/// 所有停顿为零、超时很短的配置
pub(crate) fn test_config() -> NavConfig {
    let mut config = NavConfig::default();
    config.link = LinkConfig {
        ack_timeout_ms: 10,
        write_timeout_ms: 10,
        ..LinkConfig::default()
    };
    config.search.capture_pause_ms = 0;
    config.search.probe_pause_ms = 0;
    config.homing.travel_pause_ms = 0;
    config.homing.lost_marker_delay_ms = 0;
    config.homing.motion_retry_delay_ms = 0;
    config
}

/// 基于 Mock 串口的控制器，同时返回 Mock 的一份克隆用于检查
pub(crate) fn controller<V: VisionSource>(
    vision: V,
) -> (NavigationController<MockSerial, V>, MockSerial) {
    controller_with(vision, test_config())
}

pub(crate) fn controller_with<V: VisionSource>(
    vision: V,
    config: NavConfig,
) -> (NavigationController<MockSerial, V>, MockSerial) {
    let mock = MockSerial::new();
    let link = MotionLink::new(mock.clone(), config.link.clone());
    (NavigationController::new(link, vision, config), mock)
}

/// 使用已有的 Mock（视觉闭包需要读取同一个 Mock 的状态时）
pub(crate) fn controller_on<V: VisionSource>(
    mock: MockSerial,
    vision: V,
) -> NavigationController<MockSerial, V> {
    let config = test_config();
    let link = MotionLink::new(mock, config.link.clone());
    NavigationController::new(link, vision, config)
}
