//! 运动链路
//!
//! 严格的一问一答：上一条指令被应答（或确定失败）之前绝不发送下一条。
//!
//! ```text
//! Idle -> Sending -> AwaitingAck -> Idle (Acknowledged | TimedOut | Rejected | Faulted)
//! ```

use std::time::Duration;

use cubebot_protocol::{MAX_MAGNITUDE, MotionCommand, MotionOp};
use cubebot_serial::{SerialAdapter, SerialError, SerialPortAdapter};
use tracing::{debug, error, trace, warn};

use crate::config::LinkConfig;
use crate::error::{ExchangeStage, LinkError, MotionInterrupted, MotionKind};

/// 链路状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// 空闲，可以发送下一条指令
    Idle,
    /// 正在写请求帧
    Sending,
    /// 等待应答字节
    AwaitingAck,
}

/// 最近一次交换的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// 收到成功应答
    Acknowledged,
    /// 写或等待应答超时
    TimedOut,
    /// 应答字节不正确
    Rejected,
    /// 串口故障
    Faulted,
}

/// 被中断的分块运动的剩余部分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMotion {
    pub kind: MotionKind,
    pub op: MotionOp,
    /// 剩余量（厘米或度，非负）
    pub remaining: u32,
}

/// 把角度归一化到 (-180, 180]
pub fn normalize_degrees(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// 运动链路：串口的唯一所有者
pub struct MotionLink<A: SerialAdapter> {
    adapter: A,
    config: LinkConfig,
    state: LinkState,
    last_outcome: Option<ExchangeOutcome>,
    last_acknowledged: Option<MotionCommand>,
    pending: Option<PendingMotion>,
    /// 已应答旋转的累计值（度，顺时针为正）
    heading_deg: i64,
    /// 已应答平移的累计值（厘米，前进为正）
    odometer_cm: i64,
}

impl MotionLink<SerialPortAdapter> {
    /// 按配置打开真实串口
    pub fn open(config: LinkConfig) -> Result<Self, SerialError> {
        let adapter = SerialPortAdapter::open(&config.port, config.baud_rate)?;
        Ok(Self::new(adapter, config))
    }
}

impl<A: SerialAdapter> MotionLink<A> {
    pub fn new(adapter: A, config: LinkConfig) -> Self {
        Self {
            adapter,
            config,
            state: LinkState::Idle,
            last_outcome: None,
            last_acknowledged: None,
            pending: None,
            heading_deg: 0,
            odometer_cm: 0,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn last_outcome(&self) -> Option<ExchangeOutcome> {
        self.last_outcome
    }

    /// 最近一条被控制板确认的指令
    pub fn last_acknowledged(&self) -> Option<MotionCommand> {
        self.last_acknowledged
    }

    /// 被中断、尚未完成的运动
    pub fn pending(&self) -> Option<PendingMotion> {
        self.pending
    }

    /// 放弃被中断运动的剩余部分
    pub fn discard_pending(&mut self) -> Option<PendingMotion> {
        self.pending.take()
    }

    /// 已确认旋转的累计值（度，顺时针为正）
    pub fn commanded_heading(&self) -> i64 {
        self.heading_deg
    }

    /// 已确认平移的累计值（厘米，前进为正）
    pub fn odometer_cm(&self) -> i64 {
        self.odometer_cm
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    /// 发送一条原语指令并阻塞等待唯一的应答字节
    ///
    /// 幅值超出 0-255 时钳位（并记录警告）。超时和错误应答都不会在这里重试。
    pub fn send_command(&mut self, op: MotionOp, magnitude: i64) -> Result<(), LinkError> {
        let command = MotionCommand::clamped(op, magnitude);
        let result = self.exchange(command);
        self.state = LinkState::Idle;
        self.last_outcome = Some(match &result {
            Ok(()) => ExchangeOutcome::Acknowledged,
            Err(LinkError::Timeout { .. }) => ExchangeOutcome::TimedOut,
            Err(LinkError::UnexpectedAck { .. }) => ExchangeOutcome::Rejected,
            Err(LinkError::Serial(_)) => ExchangeOutcome::Faulted,
        });
        if result.is_ok() {
            self.last_acknowledged = Some(command);
            if op.is_rotation() {
                self.heading_deg += i64::from(command.signed_magnitude());
            } else {
                self.odometer_cm += i64::from(command.signed_magnitude());
            }
        }
        result
    }

    fn exchange(&mut self, command: MotionCommand) -> Result<(), LinkError> {
        let frame = command.to_frame();

        self.state = LinkState::Sending;
        trace!("Sending `{}` ({:?})", command, frame.as_bytes());
        match self
            .adapter
            .write_frame(&frame, self.config.write_timeout())
        {
            Ok(()) => {},
            Err(e) if e.is_timeout() => {
                error!(
                    "Timeout sending `{}` to the motor board. Not retrying.",
                    command
                );
                return Err(LinkError::Timeout {
                    command,
                    stage: ExchangeStage::Write,
                    timeout_ms: self.config.write_timeout_ms,
                });
            },
            Err(e) => {
                error!("Serial error sending `{}`: {}", command, e);
                return Err(e.into());
            },
        }

        self.state = LinkState::AwaitingAck;
        let ack = match self.adapter.read_byte(self.config.ack_timeout()) {
            Ok(byte) => byte,
            Err(e) if e.is_timeout() => {
                error!(
                    "No acknowledgement for `{}` within {} ms. Not retrying.",
                    command, self.config.ack_timeout_ms
                );
                return Err(LinkError::Timeout {
                    command,
                    stage: ExchangeStage::Ack,
                    timeout_ms: self.config.ack_timeout_ms,
                });
            },
            Err(e) => {
                error!("Serial error awaiting acknowledgement: {}", e);
                return Err(e.into());
            },
        };

        if ack != self.config.success_byte {
            error!(
                "Motor board sent a bad response (0x{:02X}). May or may not have done `{}`",
                ack, command
            );
            // 重新同步：丢弃后续残留字节
            if let Err(e) = self.adapter.clear_input() {
                warn!("Failed to flush input after bad response: {}", e);
            }
            return Err(LinkError::UnexpectedAck {
                command,
                received: ack,
            });
        }

        // 控制板已确认，清空失败不改变本次结果
        match self.adapter.clear_input() {
            Ok(0) => {},
            Ok(stale) => debug!("Flushed {} stale byte(s) after `{}`", stale, command),
            Err(e) => warn!("Failed to flush input after `{}`: {}", command, e),
        }
        Ok(())
    }

    /// 平移 `metres` 米（负值后退），返回实际下发的厘米数（带符号）
    ///
    /// 超过 255 cm 的距离被拆成多条指令依次发送。
    pub fn move_by(&mut self, metres: f64) -> Result<i32, MotionInterrupted> {
        if !metres.is_finite() {
            warn!("Ignoring non-finite move request: {}", metres);
            return Ok(0);
        }
        let centimetres = (metres * 100.0).round();
        let op = if centimetres >= 0.0 {
            MotionOp::Forward
        } else {
            MotionOp::Backward
        };
        let units = centimetres.abs().min(f64::from(u32::MAX)) as u32;
        debug!("Moving {:.3} m ({} {} cm)", metres, op, units);
        self.pending = None;
        self.run_chunked(MotionKind::Translation, op, units)
    }

    /// 旋转 `degrees` 度（正值顺时针），返回实际下发的度数（带符号）
    ///
    /// 角度先归一化到 (-180, 180]，总是走较短的方向。
    pub fn turn_by(&mut self, degrees: f64) -> Result<i32, MotionInterrupted> {
        if !degrees.is_finite() {
            warn!("Ignoring non-finite turn request: {}", degrees);
            return Ok(0);
        }
        let normalized = normalize_degrees(degrees).round();
        let op = if normalized >= 0.0 {
            MotionOp::TurnRight
        } else {
            MotionOp::TurnLeft
        };
        let units = normalized.abs() as u32;
        debug!("Turning {:.1} deg ({} {} deg)", degrees, op, units);
        self.pending = None;
        self.run_chunked(MotionKind::Rotation, op, units)
    }

    /// 重新下发上一次被中断运动的剩余部分
    pub fn resume(&mut self) -> Result<i32, MotionInterrupted> {
        match self.pending.take() {
            Some(pending) => {
                debug!(
                    "Resuming interrupted {}: {} {} {}",
                    pending.kind,
                    pending.op,
                    pending.remaining,
                    pending.kind.unit()
                );
                self.run_chunked(pending.kind, pending.op, pending.remaining)
            },
            None => Ok(0),
        }
    }

    fn run_chunked(
        &mut self,
        kind: MotionKind,
        op: MotionOp,
        units: u32,
    ) -> Result<i32, MotionInterrupted> {
        let sign = op.sign();
        let requested = sign * units.min(i32::MAX as u32) as i32;
        let mut remaining = units;
        let mut completed: u32 = 0;

        while remaining > 0 {
            let chunk = remaining.min(u32::from(MAX_MAGNITUDE));
            if let Err(source) = self.send_command(op, i64::from(chunk)) {
                self.pending = Some(PendingMotion {
                    kind,
                    op,
                    remaining,
                });
                warn!(
                    "{} aborted: {} of {} {} completed",
                    kind,
                    completed,
                    units,
                    kind.unit()
                );
                return Err(MotionInterrupted {
                    kind,
                    requested,
                    completed: sign * completed.min(i32::MAX as u32) as i32,
                    source,
                });
            }
            remaining -= chunk;
            completed += chunk;
        }
        Ok(requested)
    }
}
