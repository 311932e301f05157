//! 串口链路配置

use std::time::Duration;

use cubebot_protocol::ACK_DONE;
use serde::{Deserialize, Serialize};

/// 链路配置
///
/// 对应配置文件中的 `[link]` 段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// 串口路径
    pub port: String,
    /// 波特率
    pub baud_rate: u32,
    /// 写一帧的截止时间（毫秒）
    pub write_timeout_ms: u64,
    /// 等待应答的截止时间（毫秒）
    ///
    /// 控制板在动作执行完才应答，因此必须覆盖最长的单帧动作（255 cm）。
    pub ack_timeout_ms: u64,
    /// 表示成功的应答字节
    pub success_byte: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            write_timeout_ms: 1000,
            ack_timeout_ms: 20_000,
            success_byte: ACK_DONE,
        }
    }
}

impl LinkConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}
