//! 链路层模块
//!
//! 本模块提供与电机控制板之间的阻塞式请求/应答链路，包括：
//! - 单帧指令的发送与应答校验（截止时间、错误应答后清空输入）
//! - 把任意距离/角度拆分为不超过 255 的分块并依次发送
//! - 记录最近一次被确认的指令，以及被中断运动的剩余部分
//!
//! # 使用场景
//!
//! 导航层通过 [`MotionLink`] 完成所有动作；链路层本身从不重试，重试策略全部在导航层。

mod config;
mod error;
pub mod link;

pub use config::LinkConfig;
pub use error::{ExchangeStage, LinkError, MotionInterrupted, MotionKind};
pub use link::{ExchangeOutcome, LinkState, MotionLink, PendingMotion, normalize_degrees};

// 方便上层直接使用协议/串口类型
pub use cubebot_protocol::{MotionCommand, MotionOp};
pub use cubebot_serial::{SerialAdapter, SerialError, SerialPortAdapter};
