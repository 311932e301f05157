//! 导航层错误类型定义

use cubebot_driver::{LinkError, MotionInterrupted};
use thiserror::Error;

/// 导航错误
#[derive(Error, Debug)]
pub enum NavError {
    /// 多次拍摄仍未看到需要的标记
    #[error("No matching marker after {attempts} attempt(s)")]
    VisionMiss { attempts: u32 },

    /// 串口交换超时
    #[error("Protocol timeout: {0}")]
    ProtocolTimeout(#[source] LinkError),

    /// 控制板应答错误或串口故障
    #[error("Protocol error: {0}")]
    ProtocolError(#[source] LinkError),

    /// 运动一直无法完成（撞到东西或被卡住）
    #[error("Stall detected after {attempts} attempt(s)")]
    StallDetected { attempts: u32 },

    /// 没有可用的信息，也没有别的后备方案（回家时记录后降级为盲开或放弃）
    #[error("Unrecoverable: {0}")]
    Unrecoverable(String),
}

impl NavError {
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            NavError::ProtocolTimeout(_) | NavError::ProtocolError(_)
        )
    }
}

impl From<LinkError> for NavError {
    fn from(e: LinkError) -> Self {
        if e.is_timeout() {
            NavError::ProtocolTimeout(e)
        } else {
            NavError::ProtocolError(e)
        }
    }
}

impl From<MotionInterrupted> for NavError {
    fn from(e: MotionInterrupted) -> Self {
        e.source.into()
    }
}
