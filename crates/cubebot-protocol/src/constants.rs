//! 协议常量定义

/// 请求帧长度（操作码 + 幅值）
pub const FRAME_LEN: usize = 2;

/// 前进（厘米）
pub const OP_FORWARD: u8 = b'f';
/// 后退（厘米）
pub const OP_BACKWARD: u8 = b'b';
/// 左转 / 逆时针（度）
pub const OP_TURN_LEFT: u8 = b'l';
/// 右转 / 顺时针（度）
pub const OP_TURN_RIGHT: u8 = b'r';

/// 控制板执行完成后的应答字节
pub const ACK_DONE: u8 = b'd';

/// 单帧可表示的最大幅值
pub const MAX_MAGNITUDE: u8 = u8::MAX;
