//! # Cubebot Serial Adapter Layer
//!
//! 串口硬件抽象层，为协议层提供统一的字节收发接口。
//!
//! - [`SerialPortAdapter`]：基于 `serialport` 的真实串口
//! - [`MockSerial`]（`mock` feature）：记录写出的帧、按脚本应答，用于测试

use std::time::Duration;
use thiserror::Error;

// 重新导出 cubebot-protocol 中的帧类型
pub use cubebot_protocol::MotionFrame;

pub mod port;
pub use port::SerialPortAdapter;

#[cfg(feature = "mock")]
pub mod mock;
#[cfg(feature = "mock")]
pub use mock::{MockReply, MockSerial};

/// 串口层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial port error: {0}")]
    Port(#[from] serialport::Error),
    #[error("Read timeout")]
    ReadTimeout,
    #[error("Write timeout")]
    WriteTimeout,
}

impl SerialError {
    /// 是否为超时类错误（读或写）
    pub fn is_timeout(&self) -> bool {
        matches!(self, SerialError::ReadTimeout | SerialError::WriteTimeout)
    }
}

/// 串口适配器
///
/// 所有方法都是阻塞的，并且都带有截止时间：实现必须保证不会阻塞超过给定的 `timeout`。
pub trait SerialAdapter {
    /// 写出全部字节，超过 `timeout` 返回 [`SerialError::WriteTimeout`]
    fn write_all(&mut self, bytes: &[u8], timeout: Duration) -> Result<(), SerialError>;

    /// 读取恰好一个字节，超过 `timeout` 返回 [`SerialError::ReadTimeout`]
    fn read_byte(&mut self, timeout: Duration) -> Result<u8, SerialError>;

    /// 丢弃输入缓冲区中的全部字节，返回丢弃的字节数
    fn clear_input(&mut self) -> Result<usize, SerialError>;

    /// 输入缓冲区中待读取的字节数
    fn bytes_pending(&mut self) -> Result<usize, SerialError> {
        Ok(0)
    }

    /// 写出一帧
    fn write_frame(&mut self, frame: &MotionFrame, timeout: Duration) -> Result<(), SerialError> {
        self.write_all(frame.as_bytes(), timeout)
    }
}

impl<T: SerialAdapter + ?Sized> SerialAdapter for Box<T> {
    fn write_all(&mut self, bytes: &[u8], timeout: Duration) -> Result<(), SerialError> {
        (**self).write_all(bytes, timeout)
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<u8, SerialError> {
        (**self).read_byte(timeout)
    }

    fn clear_input(&mut self) -> Result<usize, SerialError> {
        (**self).clear_input()
    }

    fn bytes_pending(&mut self) -> Result<usize, SerialError> {
        (**self).bytes_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_error_display() {
        assert_eq!(format!("{}", SerialError::ReadTimeout), "Read timeout");
        assert_eq!(format!("{}", SerialError::WriteTimeout), "Write timeout");

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged");
        let msg = format!("{}", SerialError::from(io));
        assert!(msg.contains("IO Error") && msg.contains("unplugged"));
    }

    #[test]
    fn test_is_timeout() {
        assert!(SerialError::ReadTimeout.is_timeout());
        assert!(SerialError::WriteTimeout.is_timeout());
        let io = std::io::Error::other("boom");
        assert!(!SerialError::Io(io).is_timeout());
    }
}
