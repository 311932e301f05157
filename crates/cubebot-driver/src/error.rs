//! 链路层错误类型定义

use std::fmt;

use cubebot_protocol::MotionCommand;
use cubebot_serial::SerialError;
use thiserror::Error;

/// 一次交换中超时发生的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStage {
    /// 写请求帧
    Write,
    /// 等待应答字节
    Ack,
}

impl fmt::Display for ExchangeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeStage::Write => f.write_str("write"),
            ExchangeStage::Ack => f.write_str("acknowledgement"),
        }
    }
}

/// 单次请求/应答交换的错误
///
/// 链路层从不自动重试：所有错误都原样交给上层决定。
#[derive(Error, Debug)]
pub enum LinkError {
    /// 超过截止时间（协议超时）
    #[error("Timeout during {stage} of `{command}` after {timeout_ms} ms")]
    Timeout {
        command: MotionCommand,
        stage: ExchangeStage,
        timeout_ms: u64,
    },

    /// 应答字节不是成功标记（协议错误），输入缓冲区已清空
    #[error("Unexpected acknowledgement 0x{received:02X} for `{command}`")]
    UnexpectedAck { command: MotionCommand, received: u8 },

    /// 串口本身的错误
    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),
}

impl LinkError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Timeout { .. })
    }
}

/// 运动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    /// 平移（厘米）
    Translation,
    /// 旋转（度）
    Rotation,
}

impl MotionKind {
    pub fn unit(self) -> &'static str {
        match self {
            MotionKind::Translation => "cm",
            MotionKind::Rotation => "deg",
        }
    }
}

impl fmt::Display for MotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionKind::Translation => f.write_str("translation"),
            MotionKind::Rotation => f.write_str("rotation"),
        }
    }
}

/// 分块运动在中途失败
///
/// `completed` 只统计已被应答的分块；失败的那一块可能执行了一部分，调用者应把剩余量
/// 视为碰撞/卡住，自行决定是否重试（见 `MotionLink::resume`）。
#[derive(Error, Debug)]
#[error("{kind} interrupted after {completed} of {requested} {}: {source}", .kind.unit())]
pub struct MotionInterrupted {
    pub kind: MotionKind,
    /// 请求量（带符号，前进/右转为正）
    pub requested: i32,
    /// 已应答量（带符号）
    pub completed: i32,
    #[source]
    pub source: LinkError,
}

impl MotionInterrupted {
    /// 未完成的量（带符号）
    pub fn remaining(&self) -> i32 {
        self.requested - self.completed
    }
}
