//! 标记观测与筛选条件

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::units::Deg;

/// 标记类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerCategory {
    /// 场地围墙上的标记（用于定位和回家）
    Boundary,
    /// A 类目标方块
    TargetA,
    /// B 类目标方块
    TargetB,
    /// C 类目标方块
    TargetC,
}

impl MarkerCategory {
    pub fn is_target(self) -> bool {
        !matches!(self, MarkerCategory::Boundary)
    }
}

impl fmt::Display for MarkerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarkerCategory::Boundary => "boundary",
            MarkerCategory::TargetA => "target-A",
            MarkerCategory::TargetB => "target-B",
            MarkerCategory::TargetC => "target-C",
        };
        f.write_str(name)
    }
}

/// 视觉系统的一次标记观测（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    /// 标记编号
    pub code: u32,
    pub category: MarkerCategory,
    /// 距离（米）
    pub distance: f64,
    /// 方位角：相对机器人朝向，顺时针为正
    pub bearing: Deg,
    /// 标记自身朝向：相对正对机器人时的旋转角
    pub face: Deg,
}

impl MarkerObservation {
    pub fn new(
        code: u32,
        category: MarkerCategory,
        distance: f64,
        bearing: Deg,
        face: Deg,
    ) -> Self {
        Self {
            code,
            category,
            distance: distance.max(0.0),
            bearing,
            face,
        }
    }

    /// 围墙标记
    pub fn boundary(code: u32, distance: f64, bearing: Deg, face: Deg) -> Self {
        Self::new(code, MarkerCategory::Boundary, distance, bearing, face)
    }
}

impl fmt::Display for MarkerObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} at {:.2} m, bearing {}, face {}",
            self.category, self.code, self.distance, self.bearing, self.face
        )
    }
}

/// 按距离从近到远排序
pub fn sort_by_distance(markers: &mut [MarkerObservation]) {
    markers.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}

/// 最近的标记
pub fn nearest(markers: &[MarkerObservation]) -> Option<MarkerObservation> {
    markers
        .iter()
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
        .copied()
}

/// 组合式标记筛选条件
///
/// 所有已设置的条件必须同时满足；未设置的条件不做限制。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerFilter {
    category: Option<MarkerCategory>,
    code: Option<u32>,
    excluded: BTreeSet<u32>,
    distance: Option<(f64, f64)>,
}

impl MarkerFilter {
    /// 匹配任意标记
    pub fn any() -> Self {
        Self::default()
    }

    /// 指定类别
    pub fn category(category: MarkerCategory) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    /// 指定编号
    pub fn code(code: u32) -> Self {
        Self {
            code: Some(code),
            ..Self::default()
        }
    }

    /// 限定类别
    pub fn with_category(mut self, category: MarkerCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// 排除一组编号
    pub fn excluding(mut self, codes: impl IntoIterator<Item = u32>) -> Self {
        self.excluded.extend(codes);
        self
    }

    /// 距离在 `distance ± tolerance` 范围内
    pub fn near(self, distance: f64, tolerance: f64) -> Self {
        self.within(distance - tolerance, distance + tolerance)
    }

    /// 距离在 `[min, max]` 范围内
    pub fn within(mut self, min: f64, max: f64) -> Self {
        self.distance = Some((min, max));
        self
    }

    /// 距离小于 `max`
    pub fn closer_than(self, max: f64) -> Self {
        self.within(f64::NEG_INFINITY, max)
    }

    pub fn matches(&self, marker: &MarkerObservation) -> bool {
        let correct_category = self.category.is_none_or(|c| c == marker.category);
        let correct_code = self.code.is_none_or(|c| c == marker.code);
        let not_excluded = !self.excluded.contains(&marker.code);
        let correct_distance = self
            .distance
            .is_none_or(|(min, max)| min <= marker.distance && marker.distance <= max);
        correct_category && correct_code && not_excluded && correct_distance
    }

    /// 作为闭包谓词使用
    pub fn predicate(&self) -> impl Fn(&MarkerObservation) -> bool + '_ {
        move |marker| self.matches(marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(code: u32, distance: f64) -> MarkerObservation {
        MarkerObservation::new(code, MarkerCategory::TargetB, distance, Deg(5.0), Deg::ZERO)
    }

    #[test]
    fn test_observation_clamps_negative_distance() {
        let m = MarkerObservation::boundary(3, -0.2, Deg::ZERO, Deg::ZERO);
        assert_eq!(m.distance, 0.0);
    }

    #[test]
    fn test_filter_any() {
        assert!(MarkerFilter::any().matches(&cube(40, 9.0)));
    }

    #[test]
    fn test_filter_combined() {
        let filter = MarkerFilter::category(MarkerCategory::TargetB).near(1.5, 0.5);
        assert!(filter.matches(&cube(40, 1.2)));
        assert!(filter.matches(&cube(40, 2.0)));
        assert!(!filter.matches(&cube(40, 2.1)));

        let wall = MarkerObservation::boundary(4, 1.5, Deg::ZERO, Deg::ZERO);
        assert!(!filter.matches(&wall));
    }

    #[test]
    fn test_filter_code_and_exclusion() {
        let filter = MarkerFilter::category(MarkerCategory::Boundary)
            .closer_than(3.0)
            .excluding(0..7);
        assert!(!filter.matches(&MarkerObservation::boundary(3, 1.0, Deg::ZERO, Deg::ZERO)));
        assert!(filter.matches(&MarkerObservation::boundary(9, 1.0, Deg::ZERO, Deg::ZERO)));
        assert!(!filter.matches(&MarkerObservation::boundary(9, 3.5, Deg::ZERO, Deg::ZERO)));

        assert!(MarkerFilter::code(41).matches(&cube(41, 1.0)));
        assert!(!MarkerFilter::code(41).matches(&cube(42, 1.0)));
    }

    #[test]
    fn test_nearest_and_sort() {
        let mut markers = vec![cube(1, 2.0), cube(2, 0.5), cube(3, 1.0)];
        assert_eq!(nearest(&markers).map(|m| m.code), Some(2));
        sort_by_distance(&mut markers);
        let codes: Vec<u32> = markers.iter().map(|m| m.code).collect();
        assert_eq!(codes, vec![2, 3, 1]);
        assert_eq!(nearest(&[]), None);
    }
}
