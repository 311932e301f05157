//! Mock 串口
//!
//! 模拟 mbed 控制板：每收到完整的一帧就记录下来，并按脚本把应答放入输入缓冲区。
//! 克隆共享同一份内部状态，测试可以一边把一份交给 `MotionLink`，一边用另一份检查结果。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cubebot_protocol::{ACK_DONE, FRAME_LEN, MotionCommand, MotionOp, decode};

use crate::{SerialAdapter, SerialError};

/// 对单帧的脚本化应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// 正常完成（`b'd'`）
    Ack,
    /// 应答指定字节，后面再跟若干残留字节
    Byte { ack: u8, trailing: Vec<u8> },
    /// 不应答（读超时）
    Silent,
    /// 写超时（帧不会被记录）
    WriteTimeout,
}

impl MockReply {
    /// 错误应答（不带残留字节）
    pub fn bad(ack: u8) -> Self {
        MockReply::Byte {
            ack,
            trailing: Vec::new(),
        }
    }
}

#[derive(Default)]
struct MockSerialInner {
    /// 尚未凑满一帧的写入字节
    partial: Vec<u8>,
    /// 已接收的指令
    commands: Vec<MotionCommand>,
    /// 无法解码的帧
    rejected: Vec<Vec<u8>>,
    /// 输入缓冲区（控制板 -> 主机）
    input: VecDeque<u8>,
    /// 应答脚本，用完后回落为 `Ack`
    replies: VecDeque<MockReply>,
    /// 调用 clear_input 的次数
    flushes: usize,
    /// 模拟读超时时是否真的休眠
    sleep_on_timeout: bool,
    /// 接下来若干次 clear_input 返回 IO 错误
    failing_flushes: usize,
}

/// Mock 串口
#[derive(Clone, Default)]
pub struct MockSerial {
    inner: Arc<Mutex<MockSerialInner>>,
}

impl MockSerial {
    /// 创建新的 Mock 串口（所有帧默认应答 `b'd'`）
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockSerialInner> {
        // 测试代码中 panic 后的毒化锁仍然可以继续使用
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 追加一条应答脚本
    pub fn push_reply(&self, reply: MockReply) {
        self.lock().replies.push_back(reply);
    }

    /// 追加多条应答脚本
    pub fn script(&self, replies: impl IntoIterator<Item = MockReply>) {
        self.lock().replies.extend(replies);
    }

    /// 模拟读超时时按给定的超时时间休眠（用于验证截止时间）
    pub fn sleep_on_timeout(&self, enabled: bool) {
        self.lock().sleep_on_timeout = enabled;
    }

    /// 让接下来 `count` 次 clear_input 失败（缓冲区不会被清空）
    pub fn fail_flushes(&self, count: usize) {
        self.lock().failing_flushes = count;
    }

    /// 直接注入输入字节（模拟控制板发来的噪声）
    pub fn inject_input(&self, bytes: &[u8]) {
        self.lock().input.extend(bytes.iter().copied());
    }

    /// 已接收的全部指令
    pub fn commands(&self) -> Vec<MotionCommand> {
        self.lock().commands.clone()
    }

    /// 取出并清空已接收的指令
    pub fn take_commands(&self) -> Vec<MotionCommand> {
        std::mem::take(&mut self.lock().commands)
    }

    /// 无法解码的帧
    pub fn rejected_frames(&self) -> Vec<Vec<u8>> {
        self.lock().rejected.clone()
    }

    /// 指定操作的指令数量
    pub fn count(&self, op: MotionOp) -> usize {
        self.lock().commands.iter().filter(|c| c.op == op).count()
    }

    /// 累计旋转（度，顺时针为正）
    pub fn net_rotation_deg(&self) -> i64 {
        self.lock()
            .commands
            .iter()
            .filter(|c| c.op.is_rotation())
            .map(|c| i64::from(c.signed_magnitude()))
            .sum()
    }

    /// 累计平移（厘米，前进为正）
    pub fn net_translation_cm(&self) -> i64 {
        self.lock()
            .commands
            .iter()
            .filter(|c| c.op.is_translation())
            .map(|c| i64::from(c.signed_magnitude()))
            .sum()
    }

    /// 输入缓冲区中剩余的字节数
    pub fn input_len(&self) -> usize {
        self.lock().input.len()
    }

    /// clear_input 被调用的次数
    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }
}

impl SerialAdapter for MockSerial {
    fn write_all(&mut self, bytes: &[u8], _timeout: Duration) -> Result<(), SerialError> {
        let mut inner = self.lock();
        if matches!(inner.replies.front(), Some(MockReply::WriteTimeout)) {
            inner.replies.pop_front();
            return Err(SerialError::WriteTimeout);
        }

        inner.partial.extend_from_slice(bytes);
        while inner.partial.len() >= FRAME_LEN {
            let frame: Vec<u8> = inner.partial.drain(..FRAME_LEN).collect();
            match decode(&frame) {
                Ok(cmd) => inner.commands.push(cmd),
                Err(_) => inner.rejected.push(frame),
            }
            match inner.replies.pop_front().unwrap_or(MockReply::Ack) {
                MockReply::Ack => inner.input.push_back(ACK_DONE),
                MockReply::Byte { ack, trailing } => {
                    inner.input.push_back(ack);
                    inner.input.extend(trailing);
                },
                MockReply::Silent | MockReply::WriteTimeout => {},
            }
        }
        Ok(())
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<u8, SerialError> {
        let (byte, sleep) = {
            let mut inner = self.lock();
            (inner.input.pop_front(), inner.sleep_on_timeout)
        };
        match byte {
            Some(b) => Ok(b),
            None => {
                if sleep {
                    std::thread::sleep(timeout);
                }
                Err(SerialError::ReadTimeout)
            },
        }
    }

    fn clear_input(&mut self) -> Result<usize, SerialError> {
        let mut inner = self.lock();
        inner.flushes += 1;
        if inner.failing_flushes > 0 {
            inner.failing_flushes -= 1;
            return Err(SerialError::Io(std::io::Error::other("mock flush failure")));
        }
        let discarded = inner.input.len();
        inner.input.clear();
        Ok(discarded)
    }

    fn bytes_pending(&mut self) -> Result<usize, SerialError> {
        Ok(self.lock().input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_and_acks() {
        let mock = MockSerial::new();
        let mut port = mock.clone();

        port.write_all(&[b'f', 100], Duration::from_millis(10)).unwrap();
        assert_eq!(port.read_byte(Duration::from_millis(10)).unwrap(), b'd');
        assert_eq!(
            mock.commands(),
            vec![MotionCommand::new(MotionOp::Forward, 100)]
        );
    }

    #[test]
    fn test_mock_frame_split_across_writes() {
        let mock = MockSerial::new();
        let mut port = mock.clone();

        port.write_all(&[b'r'], Duration::ZERO).unwrap();
        assert!(mock.commands().is_empty());
        port.write_all(&[90], Duration::ZERO).unwrap();
        assert_eq!(mock.net_rotation_deg(), 90);
    }

    #[test]
    fn test_mock_scripted_replies() {
        let mock = MockSerial::new();
        let mut port = mock.clone();
        mock.script([
            MockReply::Byte {
                ack: b'x',
                trailing: vec![1, 2, 3],
            },
            MockReply::Silent,
            MockReply::WriteTimeout,
        ]);

        port.write_all(&[b'l', 10], Duration::ZERO).unwrap();
        assert_eq!(port.read_byte(Duration::ZERO).unwrap(), b'x');
        assert_eq!(mock.input_len(), 3);
        assert_eq!(port.clear_input().unwrap(), 3);

        port.write_all(&[b'l', 10], Duration::ZERO).unwrap();
        assert!(matches!(
            port.read_byte(Duration::ZERO),
            Err(SerialError::ReadTimeout)
        ));

        assert!(matches!(
            port.write_all(&[b'l', 10], Duration::ZERO),
            Err(SerialError::WriteTimeout)
        ));
        assert_eq!(mock.count(MotionOp::TurnLeft), 2);
        assert_eq!(mock.net_rotation_deg(), -20);
    }

    #[test]
    fn test_mock_failing_flush() {
        let mock = MockSerial::new();
        let mut port = mock.clone();
        mock.inject_input(&[1, 2]);
        mock.fail_flushes(1);

        assert!(matches!(port.clear_input(), Err(SerialError::Io(_))));
        assert_eq!(mock.input_len(), 2);
        assert_eq!(port.clear_input().unwrap(), 2);
        assert_eq!(mock.flush_count(), 2);
    }

    #[test]
    fn test_mock_rejects_unknown_op() {
        let mock = MockSerial::new();
        let mut port = mock.clone();
        port.write_all(&[b'z', 1], Duration::ZERO).unwrap();
        assert!(mock.commands().is_empty());
        assert_eq!(mock.rejected_frames(), vec![vec![b'z', 1]]);
    }
}
