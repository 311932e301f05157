//! 集成测试共用的构造函数

#![allow(dead_code)]

use cubebot_sdk::prelude::*;
use cubebot_serial::MockSerial;

/// 所有停顿为零、超时很短的配置
pub fn fast_config() -> NavConfig {
    let mut config = NavConfig::default();
    config.link.ack_timeout_ms = 20;
    config.link.write_timeout_ms = 20;
    config.search.capture_pause_ms = 0;
    config.search.probe_pause_ms = 0;
    config.homing.travel_pause_ms = 0;
    config.homing.lost_marker_delay_ms = 0;
    config.homing.motion_retry_delay_ms = 0;
    config
}

/// 在给定 Mock 串口上构建控制器
pub fn robot_on<V: VisionSource>(mock: &MockSerial, vision: V) -> NavigationController<MockSerial, V> {
    CubebotBuilder::new()
        .config(fast_config())
        .build_with_adapter(mock.clone(), vision)
        .expect("test config is valid")
}

pub fn boundary(code: u32, distance: f64, bearing: f64, face: f64) -> MarkerObservation {
    MarkerObservation::boundary(code, distance, Deg(bearing), Deg(face))
}

pub fn target(code: u32, distance: f64, bearing: f64, face: f64) -> MarkerObservation {
    MarkerObservation::new(code, MarkerCategory::TargetA, distance, Deg(bearing), Deg(face))
}
