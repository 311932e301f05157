//! 几何修正
//!
//! 把原始标记观测转换成机器人可以直接执行的转向/行驶向量。全部为无状态纯函数。
//!
//! 调用链：
//!
//! ```text
//! to_vector -> correct_for_target_skew（仅目标方块） -> correct_for_sensor_mount
//! ```
//!
//! 回家时对围墙标记使用 [`vector_to_corner`]，由场地布局决定家角落在哪一侧。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::marker::MarkerObservation;
use crate::units::Deg;

/// 小于该值的长度视为零，避免除零
const EPSILON: f64 = 1e-9;

/// 极坐标向量（距离单位米，角度顺时针为正）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub distance: f64,
    pub angle: Deg,
}

impl Vector {
    pub fn new(distance: f64, angle: Deg) -> Self {
        Self { distance, angle }
    }

    /// 笛卡尔坐标 (x 向右, y 向前)
    pub fn to_cartesian(self) -> (f64, f64) {
        (
            self.distance * self.angle.sin(),
            self.distance * self.angle.cos(),
        )
    }

    pub fn from_cartesian(x: f64, y: f64) -> Self {
        Self {
            distance: x.hypot(y),
            angle: Deg::from_radians(x.atan2(y)),
        }
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} m @ {}", self.distance, self.angle)
    }
}

/// 几何标定参数（对应配置文件中的 `[calibration]` 段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// 标记到目标方块中心的距离（米）
    pub target_center_offset: f64,
    /// 摄像头到车头前缘的距离（米），开到目标前扣除
    pub footprint_offset: f64,
    /// 摄像头的角度偏差
    pub camera_bias_deg: f64,
    /// 摄像头相对旋转中心的横向偏移（米，向右为正）
    pub camera_lateral_offset: f64,
    /// 摄像头相对旋转中心的纵向偏移（米，向前为正）
    pub camera_forward_offset: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            target_center_offset: 0.1275,
            footprint_offset: 0.255,
            camera_bias_deg: 0.0,
            camera_lateral_offset: 0.0,
            camera_forward_offset: 0.0,
        }
    }
}

impl Calibration {
    /// 全零标定（修正函数退化为恒等变换）
    pub fn zero() -> Self {
        Self {
            target_center_offset: 0.0,
            footprint_offset: 0.0,
            camera_bias_deg: 0.0,
            camera_lateral_offset: 0.0,
            camera_forward_offset: 0.0,
        }
    }

    pub fn camera_bias(&self) -> Deg {
        Deg(self.camera_bias_deg)
    }
}

/// 观测对应的原始向量
pub fn to_vector(observation: &MarkerObservation) -> Vector {
    Vector::new(observation.distance, observation.bearing)
}

/// 修正标记与目标中心的偏移
///
/// 标记贴在目标表面，目标中心在标记法线方向后方 `offset` 处。
/// 以 `d`、`offset` 为两边、夹角 `180° - face` 的三角形求第三边及其偏角。
pub fn correct_for_target_skew(vector: Vector, face: Deg, offset: f64) -> Vector {
    let d = vector.distance;
    let interior = Deg::STRAIGHT - face;
    let sin_interior = interior.sin();

    // 正对或背对：三点共线
    if sin_interior.abs() < EPSILON {
        let distance = if interior.cos() < 0.0 {
            d + offset
        } else {
            (d - offset).abs()
        };
        return Vector::new(distance, vector.angle);
    }

    let n = (d * d + offset * offset - 2.0 * d * offset * interior.cos())
        .max(0.0)
        .sqrt();
    if n < EPSILON {
        return Vector::new(0.0, vector.angle);
    }
    let delta = Deg::asin(offset * sin_interior / n);
    Vector::new(n, vector.angle + delta)
}

/// 修正摄像头安装偏移
///
/// 在摄像头坐标系下转成笛卡尔坐标，平移到旋转中心，再转回极坐标并叠加角度偏差。
pub fn correct_for_sensor_mount(vector: Vector, calibration: &Calibration) -> Vector {
    let lateral = calibration.camera_lateral_offset;
    let forward = calibration.camera_forward_offset;
    if lateral == 0.0 && forward == 0.0 {
        return Vector::new(vector.distance, vector.angle + calibration.camera_bias());
    }

    let (x, y) = vector.to_cartesian();
    let shifted = Vector::from_cartesian(x + lateral, y + forward);
    Vector::new(shifted.distance, shifted.angle + calibration.camera_bias())
}

/// 角落位于标记的哪一侧（从场内面向墙看）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerSide {
    Left,
    Right,
}

impl CornerSide {
    /// 角度符号：左负右正
    pub fn sign(self) -> f64 {
        match self {
            CornerSide::Left => -1.0,
            CornerSide::Right => 1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            CornerSide::Left => CornerSide::Right,
            CornerSide::Right => CornerSide::Left,
        }
    }
}

/// 从围墙标记指向指定角落的向量
///
/// 角落沿墙距标记 `corner_offset` 米，位于标记的 `side` 一侧。
/// `face > 0` 表示机器人在标记法线左侧，此时左侧角落处的内角为 `90° - face`，
/// 右侧角落为 `90° + face`。
pub fn vector_to_corner(
    observation: &MarkerObservation,
    corner_offset: f64,
    side: CornerSide,
) -> Vector {
    let d = observation.distance;
    let l = corner_offset;
    let sign = side.sign();
    let interior = Deg::RIGHT + observation.face * sign;

    // 以机器人到标记的连线为轴分解角落位置，钝角时也不会丢解
    let along = d - l * interior.cos();
    let across = l * interior.sin();
    let n = along.hypot(across);
    if n < EPSILON {
        return Vector::new(0.0, observation.bearing);
    }
    let delta = Deg::from_radians(across.atan2(along));
    Vector::new(n, observation.bearing + delta * sign)
}

/// 观测对应的目标中心向量
///
/// 标记朝向相对摄像头视线测得，目标偏移修正必须在摄像头坐标系下完成，
/// 之后再平移到旋转中心。围墙标记不做目标偏移修正。
pub fn corrected_vector(observation: &MarkerObservation, calibration: &Calibration) -> Vector {
    let raw = to_vector(observation);
    let in_camera_frame = if observation.category.is_target() {
        correct_for_target_skew(raw, observation.face, calibration.target_center_offset)
    } else {
        raw
    };
    correct_for_sensor_mount(in_camera_frame, calibration)
}
