//! 几何修正的属性测试
//!
//! 使用 proptest 验证对称性和三角不等式。

use cubebot_nav::geometry::{
    Calibration, CornerSide, Vector, correct_for_sensor_mount, correct_for_target_skew,
    vector_to_corner,
};
use cubebot_nav::{Deg, MarkerObservation};
use proptest::prelude::*;

proptest! {
    /// 左右镜像的观测和角落得到左右镜像的角落向量
    #[test]
    fn corner_vector_mirror_symmetric(
        d in 0.3..6.0f64,
        bearing in -60.0..60.0f64,
        face in -89.0..89.0f64,
        offset in 0.5..4.0f64,
        left_side in any::<bool>(),
    ) {
        let side = if left_side { CornerSide::Left } else { CornerSide::Right };
        let left = MarkerObservation::boundary(3, d, Deg(bearing), Deg(face));
        let right = MarkerObservation::boundary(3, d, Deg(-bearing), Deg(-face));
        let a = vector_to_corner(&left, offset, side);
        let b = vector_to_corner(&right, offset, side.opposite());
        prop_assert!((a.distance - b.distance).abs() < 1e-9);
        prop_assert!((a.angle.0 + b.angle.0).abs() < 1e-9);
    }

    /// 角落向量的终点到标记的距离等于沿墙偏移
    #[test]
    fn corner_vector_lands_on_wall(
        d in 0.3..6.0f64,
        face in -80.0..80.0f64,
        offset in 0.5..4.0f64,
        left_side in any::<bool>(),
    ) {
        let side = if left_side { CornerSide::Left } else { CornerSide::Right };
        let marker = MarkerObservation::boundary(3, d, Deg::ZERO, Deg(face));
        let (mx, my) = Vector::new(d, Deg::ZERO).to_cartesian();
        let (cx, cy) = vector_to_corner(&marker, offset, side).to_cartesian();
        prop_assert!(((cx - mx).hypot(cy - my) - offset).abs() < 1e-9);
    }

    /// 目标偏移修正同样左右对称
    #[test]
    fn skew_mirror_symmetric(
        d in 0.2..6.0f64,
        bearing in -60.0..60.0f64,
        face in -170.0..170.0f64,
        offset in 0.0..0.3f64,
    ) {
        let a = correct_for_target_skew(Vector::new(d, Deg(bearing)), Deg(face), offset);
        let b = correct_for_target_skew(Vector::new(d, Deg(-bearing)), Deg(-face), offset);
        prop_assert!((a.distance - b.distance).abs() < 1e-9);
        prop_assert!((a.angle.0 + b.angle.0).abs() < 1e-9);
    }

    /// 修正后的距离满足三角不等式
    #[test]
    fn skew_distance_bounded(
        d in 0.2..6.0f64,
        face in -180.0..180.0f64,
        offset in 0.0..0.3f64,
    ) {
        let v = correct_for_target_skew(Vector::new(d, Deg::ZERO), Deg(face), offset);
        prop_assert!(v.distance >= (d - offset).abs() - 1e-9);
        prop_assert!(v.distance <= d + offset + 1e-9);
        prop_assert!(v.angle.0.is_finite());
    }

    /// 零偏移时目标修正是恒等变换
    #[test]
    fn skew_zero_offset_identity(
        d in 0.2..6.0f64,
        bearing in -90.0..90.0f64,
        face in -89.0..89.0f64,
    ) {
        let v = correct_for_target_skew(Vector::new(d, Deg(bearing)), Deg(face), 0.0);
        prop_assert!((v.distance - d).abs() < 1e-9);
        prop_assert!((v.angle.0 - bearing).abs() < 1e-9);
    }

    /// 全零标定下安装修正是恒等变换
    #[test]
    fn mount_zero_calibration_identity(d in 0.0..6.0f64, angle in -180.0..180.0f64) {
        let v = correct_for_sensor_mount(Vector::new(d, Deg(angle)), &Calibration::zero());
        prop_assert_eq!(v, Vector::new(d, Deg(angle)));
    }

    /// 极坐标与笛卡尔坐标互转
    #[test]
    fn cartesian_roundtrip(d in 0.1..6.0f64, angle in -179.0..179.0f64) {
        let (x, y) = Vector::new(d, Deg(angle)).to_cartesian();
        let back = Vector::from_cartesian(x, y);
        prop_assert!((back.distance - d).abs() < 1e-9);
        prop_assert!((back.angle.0 - angle).abs() < 1e-9);
    }
}
