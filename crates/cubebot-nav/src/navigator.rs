//! 策略层使用的导航能力接口
//!
//! 策略代码只依赖 [`Navigator`]，不关心串口和视觉的具体类型，
//! 因此可以直接使用 `&mut dyn Navigator`。

use cubebot_driver::SerialAdapter;

use crate::controller::{ApproachOutcome, NavigationController, NavigationGoal};
use crate::error::NavError;
use crate::homing::HomingReport;
use crate::marker::{MarkerFilter, MarkerObservation};
use crate::units::Deg;
use crate::vision::VisionSource;

/// 导航能力
pub trait Navigator {
    /// 原地多次拍摄，返回按距离排序的匹配标记
    fn capture(&mut self, filter: &MarkerFilter, attempts: u32) -> Vec<MarkerObservation>;

    /// 左右交替扫描，至少看到 `minimum_count` 个匹配时停下
    fn sweep_search(
        &mut self,
        minimum_count: usize,
        filter: &MarkerFilter,
        step_angle: Deg,
        max_angle: Deg,
    ) -> Result<Vec<MarkerObservation>, NavError>;

    /// 扇区搜索
    fn cone_search(
        &mut self,
        filter: &MarkerFilter,
        start_angle: Deg,
        stop_angle: Deg,
        step_angle: Deg,
    ) -> Result<Vec<MarkerObservation>, NavError>;

    fn move_to_target(&mut self, goal: &NavigationGoal) -> ApproachOutcome;

    fn home_from_field(&mut self) -> HomingReport;

    /// 平移（米，负值后退）
    fn move_by(&mut self, metres: f64) -> Result<(), NavError>;

    /// 旋转（正值顺时针）
    fn turn_by(&mut self, angle: Deg) -> Result<(), NavError>;

    /// 最近的一个匹配标记；看不到时返回 [`NavError::VisionMiss`]
    fn locate(&mut self, filter: &MarkerFilter, attempts: u32) -> Result<MarkerObservation, NavError> {
        self.capture(filter, attempts)
            .first()
            .copied()
            .ok_or(NavError::VisionMiss {
                attempts: attempts.max(1),
            })
    }
}

impl<A: SerialAdapter, V: VisionSource> Navigator for NavigationController<A, V> {
    fn capture(&mut self, filter: &MarkerFilter, attempts: u32) -> Vec<MarkerObservation> {
        NavigationController::capture(self, filter.predicate(), attempts)
    }

    fn sweep_search(
        &mut self,
        minimum_count: usize,
        filter: &MarkerFilter,
        step_angle: Deg,
        max_angle: Deg,
    ) -> Result<Vec<MarkerObservation>, NavError> {
        NavigationController::sweep_search(
            self,
            minimum_count,
            filter.predicate(),
            step_angle,
            max_angle,
        )
    }

    fn cone_search(
        &mut self,
        filter: &MarkerFilter,
        start_angle: Deg,
        stop_angle: Deg,
        step_angle: Deg,
    ) -> Result<Vec<MarkerObservation>, NavError> {
        NavigationController::cone_search(
            self,
            filter.predicate(),
            start_angle,
            stop_angle,
            step_angle,
        )
    }

    fn move_to_target(&mut self, goal: &NavigationGoal) -> ApproachOutcome {
        NavigationController::move_to_target(self, goal)
    }

    fn home_from_field(&mut self) -> HomingReport {
        NavigationController::home_from_field(self)
    }

    fn move_by(&mut self, metres: f64) -> Result<(), NavError> {
        NavigationController::move_by(self, metres).map(|_| ())
    }

    fn turn_by(&mut self, angle: Deg) -> Result<(), NavError> {
        NavigationController::turn_by(self, angle).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::TargetSelector;
    use crate::marker::MarkerCategory;
    use crate::test_support::controller;
    use crate::vision::StaticScene;
    use cubebot_driver::{MotionCommand, MotionOp};

    /// 只依赖 trait 的简单策略：找最近的 A 类方块并把它推进车体
    fn collect_nearest(nav: &mut dyn Navigator) -> ApproachOutcome {
        let filter = MarkerFilter::category(MarkerCategory::TargetA);
        let Ok(found) = nav.sweep_search(1, &filter, Deg(30.0), Deg(90.0)) else {
            return ApproachOutcome::Crashed;
        };
        match found.first() {
            Some(cube) => {
                let goal = NavigationGoal::new(TargetSelector::Code(cube.code)).with_distance_after(0.1);
                nav.move_to_target(&goal)
            },
            None => ApproachOutcome::LostTarget,
        }
    }

    #[test]
    fn test_strategy_through_trait_object() {
        let cube = MarkerObservation::new(40, MarkerCategory::TargetA, 1.0, Deg(-10.0), Deg::ZERO);
        let (mut nav, mock) = controller(StaticScene::new(vec![cube]));
        assert_eq!(collect_nearest(&mut nav), ApproachOutcome::Ok);
        // 1.1275 - 0.255 + 0.1 = 0.9725 m
        assert_eq!(
            mock.commands(),
            vec![
                MotionCommand::new(MotionOp::TurnLeft, 10),
                MotionCommand::new(MotionOp::Forward, 97),
            ]
        );
    }

    #[test]
    fn test_strategy_nothing_visible() {
        let (mut nav, mock) = controller(StaticScene::empty());
        assert_eq!(collect_nearest(&mut nav), ApproachOutcome::LostTarget);
        assert_eq!(mock.net_rotation_deg(), 0);
    }

    #[test]
    fn test_locate_vision_miss() {
        let (mut nav, _) = controller(StaticScene::empty());
        let nav: &mut dyn Navigator = &mut nav;
        let err = nav.locate(&MarkerFilter::any(), 2).unwrap_err();
        assert!(matches!(err, NavError::VisionMiss { attempts: 2 }));
    }

    #[test]
    fn test_move_and_turn_through_trait() {
        let (mut nav, mock) = controller(StaticScene::empty());
        let nav: &mut dyn Navigator = &mut nav;
        nav.turn_by(Deg(270.0)).unwrap();
        nav.move_by(-0.3).unwrap();
        assert_eq!(
            mock.commands(),
            vec![
                MotionCommand::new(MotionOp::TurnLeft, 90),
                MotionCommand::new(MotionOp::Backward, 30),
            ]
        );
    }
}
