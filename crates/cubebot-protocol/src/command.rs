//! 运动指令的编码/解码
//!
//! 幅值必须落在 0-255 之间。超出范围的请求值会被钳位到最近的边界并记录警告，
//! 绝不会通过 `as u8` 静默取模回绕（例如 300 cm 变成 44 cm）。

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use tracing::warn;

use crate::{MAX_MAGNITUDE, MotionFrame, ProtocolError};

/// 操作码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MotionOp {
    /// 前进
    Forward = b'f',
    /// 后退
    Backward = b'b',
    /// 左转（逆时针）
    TurnLeft = b'l',
    /// 右转（顺时针）
    TurnRight = b'r',
}

impl MotionOp {
    /// 是否为平移指令（幅值单位：厘米）
    pub fn is_translation(self) -> bool {
        matches!(self, MotionOp::Forward | MotionOp::Backward)
    }

    /// 是否为旋转指令（幅值单位：度）
    pub fn is_rotation(self) -> bool {
        !self.is_translation()
    }

    /// 幅值单位
    pub fn unit(self) -> &'static str {
        if self.is_translation() { "cm" } else { "deg" }
    }

    /// 相反方向的操作
    pub fn reversed(self) -> Self {
        match self {
            MotionOp::Forward => MotionOp::Backward,
            MotionOp::Backward => MotionOp::Forward,
            MotionOp::TurnLeft => MotionOp::TurnRight,
            MotionOp::TurnRight => MotionOp::TurnLeft,
        }
    }

    /// 方向符号：前进/右转为 +1，后退/左转为 -1
    pub fn sign(self) -> i32 {
        match self {
            MotionOp::Forward | MotionOp::TurnRight => 1,
            MotionOp::Backward | MotionOp::TurnLeft => -1,
        }
    }
}

impl fmt::Display for MotionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotionOp::Forward => "forward",
            MotionOp::Backward => "backward",
            MotionOp::TurnLeft => "turn-left",
            MotionOp::TurnRight => "turn-right",
        };
        f.write_str(name)
    }
}

/// 单条原语指令（已校验幅值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionCommand {
    pub op: MotionOp,
    pub magnitude: u8,
}

impl MotionCommand {
    pub fn new(op: MotionOp, magnitude: u8) -> Self {
        Self { op, magnitude }
    }

    /// 从任意整数幅值构建，超出 0-255 时钳位并记录
    pub fn clamped(op: MotionOp, requested: i64) -> Self {
        Self::new(op, clamp_magnitude(op, requested))
    }

    /// 带符号的幅值（前进/右转为正）
    pub fn signed_magnitude(&self) -> i32 {
        self.op.sign() * i32::from(self.magnitude)
    }

    /// 转换为线上帧
    pub fn to_frame(self) -> MotionFrame {
        MotionFrame::new(self.op.into(), self.magnitude)
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.op, self.magnitude, self.op.unit())
    }
}

impl TryFrom<MotionFrame> for MotionCommand {
    type Error = ProtocolError;

    fn try_from(frame: MotionFrame) -> Result<Self, Self::Error> {
        let op = MotionOp::try_from(frame.op_byte())
            .map_err(|e| ProtocolError::InvalidOperation(e.number))?;
        Ok(Self::new(op, frame.magnitude()))
    }
}

/// 把请求幅值限制在单字节范围内
pub fn clamp_magnitude(op: MotionOp, requested: i64) -> u8 {
    let max = i64::from(MAX_MAGNITUDE);
    if requested < 0 {
        warn!(
            "Magnitude {} for {} is below 0, clamping to 0 {}",
            requested,
            op,
            op.unit()
        );
        0
    } else if requested > max {
        warn!(
            "Magnitude {} for {} exceeds {}, clamping to {} {}",
            requested,
            op,
            max,
            max,
            op.unit()
        );
        MAX_MAGNITUDE
    } else {
        requested as u8
    }
}

/// 编码一条指令为线上帧
pub fn encode(op: MotionOp, magnitude: i64) -> MotionFrame {
    MotionCommand::clamped(op, magnitude).to_frame()
}

/// 解码一帧为指令
pub fn decode(bytes: &[u8]) -> Result<MotionCommand, ProtocolError> {
    MotionCommand::try_from(MotionFrame::try_from(bytes)?)
}
