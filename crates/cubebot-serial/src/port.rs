//! 基于 `serialport` 的真实串口适配器

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::{SerialAdapter, SerialError};

/// 真实串口（USB CDC 的 mbed 控制板）
pub struct SerialPortAdapter {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialPortAdapter {
    /// 打开串口（8N1，无流控）
    ///
    /// # Arguments
    /// * `path` - 串口路径（如 "/dev/ttyACM0"）
    /// * `baud_rate` - 波特率（如 9600）
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, SerialError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()?;

        info!("Opened serial port: {} at {} baud", path, baud_rate);

        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    /// 串口路径
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl SerialAdapter for SerialPortAdapter {
    fn write_all(&mut self, bytes: &[u8], timeout: Duration) -> Result<(), SerialError> {
        self.port.set_timeout(timeout)?;
        match self.port.write_all(bytes).and_then(|_| self.port.flush()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::TimedOut => Err(SerialError::WriteTimeout),
            Err(e) => Err(e.into()),
        }
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<u8, SerialError> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 1];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SerialError::ReadTimeout);
            }
            self.port.set_timeout(remaining)?;
            match self.port.read(&mut buf) {
                Ok(1) => return Ok(buf[0]),
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn clear_input(&mut self) -> Result<usize, SerialError> {
        let pending = self.port.bytes_to_read()? as usize;
        self.port.clear(ClearBuffer::Input)?;
        if pending > 0 {
            debug!("Discarded {} stale byte(s) from {}", pending, self.path);
        }
        Ok(pending)
    }

    fn bytes_pending(&mut self) -> Result<usize, SerialError> {
        Ok(self.port.bytes_to_read()? as usize)
    }
}
