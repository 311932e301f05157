//! 导航控制器
//!
//! 把几何修正、标记搜索和运动链路组合成完整的动作：靠近目标、回家（见 `homing` 模块）。
//!
//! 控制器独占串口链路和视觉数据源，所有动作都是阻塞的，`&mut self` 保证同一时刻只有一个动作。

use std::fmt;
use std::time::Duration;

use cubebot_driver::{MotionLink, SerialAdapter};
use tracing::{debug, error, info, warn};

use crate::config::{ApproachConfig, NavConfig};
use crate::error::NavError;
use crate::geometry::{Vector, corrected_vector};
use crate::marker::{MarkerCategory, MarkerFilter, MarkerObservation};
use crate::units::Deg;
use crate::vision::VisionSource;

/// 停顿；零时长直接返回
pub(crate) fn pause(duration: Duration) {
    if !duration.is_zero() {
        spin_sleep::sleep(duration);
    }
}

/// 要靠近的目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSelector {
    /// 指定编号的标记
    Code(u32),
    /// 某一类别中最近的标记
    Category(MarkerCategory),
}

impl TargetSelector {
    pub fn to_filter(self) -> MarkerFilter {
        match self {
            TargetSelector::Code(code) => MarkerFilter::code(code),
            TargetSelector::Category(category) => MarkerFilter::category(category),
        }
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSelector::Code(code) => write!(f, "marker #{}", code),
            TargetSelector::Category(category) => write!(f, "nearest {}", category),
        }
    }
}

/// 靠近目标的参数（调用者提供，只读）
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationGoal {
    pub target: TargetSelector,
    /// 远距离目标的检查点：在目标前多远处停下重新观测（米）
    pub checkpoint_distance: f64,
    /// 超过该距离需要中途修正（米）
    pub max_safe_distance: f64,
    /// 中途修正的角度容差
    pub angle_tolerance: Deg,
    /// 中途修正的最大次数
    pub max_corrections: u32,
    /// 到达目标后继续前进的距离（米），用于把方块推进车体
    pub distance_after: f64,
    /// 撞到东西时是否等待后继续
    pub crash_continue: bool,
}

impl NavigationGoal {
    /// 使用默认参数
    pub fn new(target: TargetSelector) -> Self {
        Self::from_config(target, &ApproachConfig::default())
    }

    pub fn from_config(target: TargetSelector, config: &ApproachConfig) -> Self {
        Self {
            target,
            checkpoint_distance: config.checkpoint_distance,
            max_safe_distance: config.max_safe_distance,
            angle_tolerance: Deg(config.angle_tolerance_deg),
            max_corrections: config.max_corrections,
            distance_after: 0.0,
            crash_continue: false,
        }
    }

    pub fn with_distance_after(mut self, distance: f64) -> Self {
        self.distance_after = distance;
        self
    }

    pub fn with_crash_continue(mut self, enabled: bool) -> Self {
        self.crash_continue = enabled;
        self
    }
}

/// 靠近目标的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproachOutcome {
    /// 已到达
    Ok,
    /// 途中撞到东西（运动被中断）
    Crashed,
    /// 一开始就没看到目标
    LostTarget,
}

/// 导航控制器
pub struct NavigationController<A: SerialAdapter, V: VisionSource> {
    pub(crate) link: MotionLink<A>,
    pub(crate) vision: V,
    pub(crate) config: NavConfig,
}

impl<A: SerialAdapter, V: VisionSource> NavigationController<A, V> {
    pub fn new(link: MotionLink<A>, vision: V, config: NavConfig) -> Self {
        info!(
            "Navigation controller ready (zone {}, port {})",
            config.arena.zone, config.link.port
        );
        Self {
            link,
            vision,
            config,
        }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn link(&self) -> &MotionLink<A> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut MotionLink<A> {
        &mut self.link
    }

    pub fn vision_mut(&mut self) -> &mut V {
        &mut self.vision
    }

    pub fn into_parts(self) -> (MotionLink<A>, V) {
        (self.link, self.vision)
    }

    /// 按配置构造靠近目标的参数
    pub fn goal(&self, target: TargetSelector) -> NavigationGoal {
        NavigationGoal::from_config(target, &self.config.approach)
    }

    /// 平移（米），返回下发的厘米数
    pub fn move_by(&mut self, metres: f64) -> Result<i32, NavError> {
        Ok(self.link.move_by(metres)?)
    }

    /// 旋转，返回下发的度数
    pub fn turn_by(&mut self, angle: Deg) -> Result<i32, NavError> {
        Ok(self.link.turn_by(angle.value())?)
    }

    /// 尽力完成平移：被中断后等待并续行剩余部分
    ///
    /// 一次完成返回 `true`，经过续行才完成返回 `false`；续行次数用完返回 `StallDetected`。
    pub fn move_persistent(&mut self, metres: f64) -> Result<bool, NavError> {
        let first = match self.link.move_by(metres) {
            Ok(_) => return Ok(true),
            Err(e) => e,
        };
        warn!("Motion interrupted ({}), will try to continue", first);

        let retries = self.config.homing.max_motion_retries;
        for attempt in 1..=retries {
            pause(self.config.homing.motion_retry_delay());
            match self.link.resume() {
                Ok(_) => {
                    info!("Motion completed after {} retry(s)", attempt);
                    return Ok(false);
                },
                Err(e) => warn!("Retry {}/{} failed: {}", attempt, retries, e),
            }
        }

        self.link.discard_pending();
        error!("Giving up on move of {:.2} m: still blocked", metres);
        Err(NavError::StallDetected {
            attempts: retries + 1,
        })
    }

    /// 转向目标中心，返回还需前进的距离（已扣除车头）
    pub fn face_target(&mut self, marker: &MarkerObservation) -> Result<f64, NavError> {
        let vector = corrected_vector(marker, &self.config.calibration);
        debug!("Facing {} via corrected vector {}", marker, vector);
        self.link.turn_by(vector.angle.value())?;
        Ok(vector.distance - self.config.calibration.footprint_offset)
    }

    /// 靠近目标
    ///
    /// 近距离目标直接开过去；远距离目标先开到检查点，重新观测并修正方向后再走完剩余距离。
    /// 检查点处看不到目标时按最后一次修正后的向量继续。
    pub fn move_to_target(&mut self, goal: &NavigationGoal) -> ApproachOutcome {
        let filter = goal.target.to_filter();
        let attempts = self.config.search.capture_attempts;
        let Some(target) = self.capture(filter.predicate(), attempts).first().copied() else {
            warn!("Cannot see {}, not moving", goal.target);
            return ApproachOutcome::LostTarget;
        };
        info!("Approaching {}", target);

        let footprint = self.config.calibration.footprint_offset;
        let vector = corrected_vector(&target, &self.config.calibration);
        if let Err(e) = self.link.turn_by(vector.angle.value()) {
            error!("Failed to face {}: {}", goal.target, e);
            return ApproachOutcome::Crashed;
        }

        if vector.distance <= goal.max_safe_distance {
            return self.drive(vector.distance - footprint + goal.distance_after, goal);
        }

        let first_leg = vector.distance - footprint - goal.checkpoint_distance;
        debug!(
            "Target is far ({:.2} m), stopping {:.2} m short to re-check",
            vector.distance, goal.checkpoint_distance
        );
        if self.drive(first_leg, goal) != ApproachOutcome::Ok {
            return ApproachOutcome::Crashed;
        }

        // 已经正对目标，剩余距离就是检查点距离
        let mut last_known = Vector::new(goal.checkpoint_distance + footprint, Deg::ZERO);
        let tracked = MarkerFilter::code(target.code);
        for correction in 0..goal.max_corrections {
            let Some(marker) = self.capture(tracked.predicate(), attempts).first().copied() else {
                warn!(
                    "Lost sight of marker #{} at checkpoint, continuing on last known vector {}",
                    target.code, last_known
                );
                break;
            };
            last_known = corrected_vector(&marker, &self.config.calibration);
            if last_known.angle.within(goal.angle_tolerance) {
                debug!("Residual angle {} within tolerance", last_known.angle);
                break;
            }
            debug!(
                "Correction {}/{}: turning {}",
                correction + 1,
                goal.max_corrections,
                last_known.angle
            );
            if let Err(e) = self.link.turn_by(last_known.angle.value()) {
                error!("Failed to correct heading: {}", e);
                return ApproachOutcome::Crashed;
            }
            last_known.angle = Deg::ZERO;
        }

        self.drive(last_known.distance - footprint + goal.distance_after, goal)
    }

    fn drive(&mut self, metres: f64, goal: &NavigationGoal) -> ApproachOutcome {
        if metres <= 0.0 {
            debug!("Already within reach ({:.3} m), not moving", metres);
            return ApproachOutcome::Ok;
        }
        let result = if goal.crash_continue {
            self.move_persistent(metres).map(|_| ())
        } else {
            self.link.move_by(metres).map(|_| ()).map_err(NavError::from)
        };
        match result {
            Ok(()) => ApproachOutcome::Ok,
            Err(e) => {
                warn!("Crashed while driving to {}: {}", goal.target, e);
                ApproachOutcome::Crashed
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::controller;
    use crate::vision::StaticScene;
    use cubebot_driver::{MotionCommand, MotionOp};
    use cubebot_serial::MockReply;
    use std::cell::Cell;
    use std::rc::Rc;

    fn cube(code: u32, distance: f64, bearing: f64) -> MarkerObservation {
        MarkerObservation::new(code, MarkerCategory::TargetA, distance, Deg(bearing), Deg::ZERO)
    }

    #[test]
    fn test_move_to_target_close() {
        let (mut nav, mock) = controller(StaticScene::new(vec![cube(40, 2.0, 30.0)]));
        let goal = nav.goal(TargetSelector::Category(MarkerCategory::TargetA));

        assert_eq!(nav.move_to_target(&goal), ApproachOutcome::Ok);
        // 2.0 + 0.1275 - 0.255 = 1.8725 m
        assert_eq!(
            mock.commands(),
            vec![
                MotionCommand::new(MotionOp::TurnRight, 30),
                MotionCommand::new(MotionOp::Forward, 187),
            ]
        );
    }

    #[test]
    fn test_move_to_target_lost() {
        let (mut nav, mock) = controller(StaticScene::empty());
        let goal = nav.goal(TargetSelector::Code(44));
        assert_eq!(nav.move_to_target(&goal), ApproachOutcome::LostTarget);
        assert!(mock.commands().is_empty());
    }

    #[test]
    fn test_move_to_target_checkpoint_lost_continues() {
        let sightings = Rc::new(Cell::new(0u32));
        let counter = sightings.clone();
        let vision = move || {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                vec![cube(40, 5.0, 0.0)]
            } else {
                Vec::new()
            }
        };
        let (mut nav, mock) = controller(vision);
        let goal = nav.goal(TargetSelector::Code(40));

        assert_eq!(nav.move_to_target(&goal), ApproachOutcome::Ok);
        // 5.1275 - 0.255 - 1.0 = 3.8725 -> 387 cm，拆成 255 + 132；然后按最后向量再走 1.0 m
        assert_eq!(
            mock.commands(),
            vec![
                MotionCommand::new(MotionOp::Forward, 255),
                MotionCommand::new(MotionOp::Forward, 132),
                MotionCommand::new(MotionOp::Forward, 100),
            ]
        );
        assert!(sightings.get() > 1);
    }

    #[test]
    fn test_move_to_target_checkpoint_correction() {
        let sightings = Rc::new(Cell::new(0u32));
        let counter = sightings.clone();
        let vision = move || {
            counter.set(counter.get() + 1);
            match counter.get() {
                1 => vec![cube(40, 5.0, 0.0)],
                2 => vec![cube(40, 1.2, 8.0)],
                _ => vec![cube(40, 1.2, 0.5)],
            }
        };
        let (mut nav, mock) = controller(vision);
        let goal = nav.goal(TargetSelector::Code(40));

        assert_eq!(nav.move_to_target(&goal), ApproachOutcome::Ok);
        let commands = mock.commands();
        assert_eq!(commands[2], MotionCommand::new(MotionOp::TurnRight, 8));
        // 1.2 + 0.1275 - 0.255 = 1.0725 m
        assert_eq!(commands[3], MotionCommand::new(MotionOp::Forward, 107));
        assert_eq!(commands.len(), 4);
    }

    #[test]
    fn test_move_to_target_crash() {
        let (mut nav, mock) = controller(StaticScene::new(vec![cube(40, 1.0, 0.0)]));
        mock.push_reply(MockReply::bad(b'c'));
        let goal = nav.goal(TargetSelector::Code(40));
        assert_eq!(nav.move_to_target(&goal), ApproachOutcome::Crashed);
    }

    #[test]
    fn test_move_to_target_crash_continue() {
        let (mut nav, mock) = controller(StaticScene::new(vec![cube(40, 1.0, 0.0)]));
        mock.push_reply(MockReply::bad(b'c'));
        let goal = nav
            .goal(TargetSelector::Code(40))
            .with_crash_continue(true)
            .with_distance_after(0.1);
        assert_eq!(nav.move_to_target(&goal), ApproachOutcome::Ok);
        // 1.1275 - 0.255 + 0.1 = 0.9725 -> 97 cm，失败后原样重发
        assert_eq!(
            mock.commands(),
            vec![
                MotionCommand::new(MotionOp::Forward, 97),
                MotionCommand::new(MotionOp::Forward, 97),
            ]
        );
    }

    #[test]
    fn test_move_persistent_gives_up() {
        let (mut nav, mock) = controller(StaticScene::empty());
        mock.script(std::iter::repeat_n(MockReply::bad(b'x'), 10));
        let err = nav.move_persistent(0.5).unwrap_err();
        assert!(matches!(err, NavError::StallDetected { attempts: 6 }));
        // 1 次原始尝试 + 5 次续行
        assert_eq!(mock.commands().len(), 6);
        assert_eq!(nav.link().pending(), None);
    }

    #[test]
    fn test_move_persistent_resumes_remainder() {
        let (mut nav, mock) = controller(StaticScene::empty());
        mock.script([MockReply::Ack, MockReply::Silent]);
        assert!(!nav.move_persistent(3.0).unwrap());
        assert_eq!(
            mock.commands(),
            vec![
                MotionCommand::new(MotionOp::Forward, 255),
                MotionCommand::new(MotionOp::Forward, 45),
                MotionCommand::new(MotionOp::Forward, 45),
            ]
        );
        assert!(nav.move_persistent(0.2).unwrap());
    }

    #[test]
    fn test_face_target() {
        let (mut nav, mock) = controller(StaticScene::empty());
        let distance = nav.face_target(&cube(40, 1.0, -12.0)).unwrap();
        assert!((distance - (1.1275 - 0.255)).abs() < 1e-9);
        assert_eq!(mock.commands(), vec![MotionCommand::new(MotionOp::TurnLeft, 12)]);
    }
}
