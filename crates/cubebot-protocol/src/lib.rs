//! # Cubebot Protocol
//!
//! 电机控制板（mbed）串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量定义（操作码、应答字节、帧长度）
//! - `command`: 运动指令的编码/解码
//!
//! ## 帧格式
//!
//! ```text
//! 请求：[操作码 (1 byte)] [幅值 (1 byte, 0-255)]
//! 应答：[状态 (1 byte)]，`b'd'` 表示完成，其他任何值均视为协议错误
//! ```
//!
//! 平移指令的幅值单位为厘米，旋转指令的幅值单位为度。

pub mod command;
pub mod constants;

// 重新导出常用类型
pub use command::*;
pub use constants::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid operation byte: 0x{0:02X}")]
    InvalidOperation(u8),
}

/// 线上的请求帧（固定 2 字节）
///
/// 协议层与串口层之间的中间抽象，串口层只负责把 `as_bytes()` 原样写出。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionFrame {
    pub data: [u8; FRAME_LEN],
}

impl MotionFrame {
    /// 从原始字节构建
    pub fn new(op: u8, magnitude: u8) -> Self {
        Self {
            data: [op, magnitude],
        }
    }

    /// 操作码字节
    pub fn op_byte(&self) -> u8 {
        self.data[0]
    }

    /// 幅值字节
    pub fn magnitude(&self) -> u8 {
        self.data[1]
    }

    /// 待写出的字节
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl TryFrom<&[u8]> for MotionFrame {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != FRAME_LEN {
            return Err(ProtocolError::InvalidLength {
                expected: FRAME_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self::new(bytes[0], bytes[1]))
    }
}
