//! 强类型角度
//!
//! 导航层所有角度都以度为单位，使用 NewType 防止与距离（米）或弧度混用。
//! 约定：正值为顺时针（向右）。

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// 角度（度）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deg(pub f64);

impl Deg {
    /// 零度常量
    pub const ZERO: Self = Deg(0.0);

    /// 直角
    pub const RIGHT: Self = Deg(90.0);

    /// 平角
    pub const STRAIGHT: Self = Deg(180.0);

    #[inline]
    pub const fn new(value: f64) -> Self {
        Deg(value)
    }

    /// 获取原始值
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// 转换为弧度值
    #[inline]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }

    /// 从弧度值构建
    #[inline]
    pub fn from_radians(rad: f64) -> Self {
        Deg(rad.to_degrees())
    }

    #[inline]
    pub fn sin(self) -> f64 {
        self.to_radians().sin()
    }

    #[inline]
    pub fn cos(self) -> f64 {
        self.to_radians().cos()
    }

    /// 反正弦（参数会被限制在 [-1, 1]，避免浮点误差产生 NaN）
    #[inline]
    pub fn asin(x: f64) -> Self {
        Self::from_radians(x.clamp(-1.0, 1.0).asin())
    }

    /// 取绝对值
    #[inline]
    pub fn abs(self) -> Self {
        Deg(self.0.abs())
    }

    /// 符号：正为 1，负为 -1，零为 0
    #[inline]
    pub fn signum(self) -> f64 {
        if self.0 > 0.0 {
            1.0
        } else if self.0 < 0.0 {
            -1.0
        } else {
            0.0
        }
    }

    /// 归一化到 (-180, 180]
    pub fn normalize(self) -> Self {
        let mut angle = self.0 % 360.0;
        if angle > 180.0 {
            angle -= 360.0;
        } else if angle <= -180.0 {
            angle += 360.0;
        }
        Deg(angle)
    }

    /// 是否在容差范围内
    #[inline]
    pub fn within(self, tolerance: Deg) -> bool {
        self.0.abs() <= tolerance.0.abs()
    }
}

impl fmt::Display for Deg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°", self.0)
    }
}

impl Add for Deg {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Deg(self.0 + rhs.0)
    }
}

impl Sub for Deg {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Deg(self.0 - rhs.0)
    }
}

impl Mul<f64> for Deg {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Deg(self.0 * rhs)
    }
}

impl Neg for Deg {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Deg(-self.0)
    }
}

impl AddAssign for Deg {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Deg {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}
