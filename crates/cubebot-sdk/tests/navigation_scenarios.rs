//! 端到端导航场景
//!
//! 通过 SDK 门面构建控制器，Mock 串口记录下发的全部指令。

mod common;

use common::{boundary, robot_on, target};
use cubebot_sdk::prelude::*;
use cubebot_serial::MockSerial;

#[test]
fn close_target_single_turn_and_drive() {
    let mock = MockSerial::new();
    let mut robot = robot_on(&mock, StaticScene::new(vec![target(40, 2.0, 30.0, 0.0)]));
    let goal = robot.goal(TargetSelector::Category(MarkerCategory::TargetA));

    assert_eq!(robot.move_to_target(&goal), ApproachOutcome::Ok);
    let commands = mock.commands();
    assert_eq!(commands[0], MotionCommand::new(MotionOp::TurnRight, 30));
    // 只有一帧前进，且不超过 255
    assert_eq!(mock.count(MotionOp::Forward), 1);
    assert_eq!(commands[1], MotionCommand::new(MotionOp::Forward, 187));
    assert_eq!(commands.len(), 2);
}

#[test]
fn far_target_rechecks_at_checkpoint() {
    // 目标在正前方 4.5 m，前进后距离相应缩短
    let mock = MockSerial::new();
    let odometer = mock.clone();
    let vision = move || {
        let travelled = odometer.net_translation_cm() as f64 / 100.0;
        vec![target(41, 4.5 - travelled, 0.0, 0.0)]
    };
    let mut robot = robot_on(&mock, vision);
    let goal = robot.goal(TargetSelector::Code(41));

    assert_eq!(robot.move_to_target(&goal), ApproachOutcome::Ok);
    assert_eq!(
        mock.commands(),
        vec![
            MotionCommand::new(MotionOp::Forward, 255),
            MotionCommand::new(MotionOp::Forward, 82),
            MotionCommand::new(MotionOp::Forward, 100),
        ]
    );
    assert_eq!(mock.net_rotation_deg(), 0);
}

#[test]
fn approach_reports_crash() {
    let mock = MockSerial::new();
    let mut robot = robot_on(&mock, StaticScene::new(vec![target(40, 1.5, 0.0, 0.0)]));
    mock.push_reply(cubebot_serial::MockReply::Silent);
    let goal = robot.goal(TargetSelector::Code(40));
    assert_eq!(robot.move_to_target(&goal), ApproachOutcome::Crashed);
}

#[test]
fn homing_blind_when_nothing_visible() {
    let mock = MockSerial::new();
    let mut robot = robot_on(&mock, StaticScene::empty());

    let report = robot.home_from_field();
    assert!(report.is_home());
    assert_eq!(report.trail, vec![HomingPhase::Orienting, HomingPhase::Home]);
    assert_eq!(
        mock.commands(),
        vec![
            MotionCommand::new(MotionOp::Forward, 150),
            MotionCommand::new(MotionOp::Forward, 200),
        ]
    );
    assert_eq!(mock.count(MotionOp::TurnLeft) + mock.count(MotionOp::TurnRight), 0);
}

#[test]
fn homing_single_stall_cycle_then_home() {
    // zone 0；锚点 3 在家的右侧墙上
    let mock = MockSerial::new();
    let probe = mock.clone();
    let vision = move || {
        let forwards = probe.count(MotionOp::Forward);
        if probe.net_rotation_deg() <= -45 {
            if forwards >= 3 {
                vec![boundary(27, 2.5, 0.0, 0.0)]
            } else {
                Vec::new()
            }
        } else {
            match forwards {
                0 => vec![boundary(3, 3.0, 10.0, 0.0)],
                // Δd = 0.05 m, Δbearing = 5°：看起来没动
                1 => vec![boundary(3, 2.95, 5.0, 0.0)],
                _ => vec![boundary(3, 1.5, 0.0, 0.0)],
            }
        }
    };
    let mut robot = robot_on(&mock, vision);

    let report = robot.home_from_field();
    assert_eq!(report.phase, HomingPhase::Home);
    assert_eq!(report.visits(HomingPhase::Stuck), 1);
    assert_eq!(report.visits(HomingPhase::Approaching), 2);
    assert_eq!(mock.count(MotionOp::Backward), 1);
    assert_eq!(
        mock.commands()
            .iter()
            .find(|c| c.op == MotionOp::Backward),
        Some(&MotionCommand::new(MotionOp::Backward, 15))
    );
}

#[test]
fn homing_straight_to_own_corner() {
    // zone 2 的角落标记 13 就在正前方，它在左侧家墙的末端，家角落在它右侧 1 m
    let mut config = common::fast_config();
    config.arena.zone = 2;
    let mock = MockSerial::new();
    let mut robot = CubebotBuilder::new()
        .config(config)
        .build_with_adapter(mock.clone(), StaticScene::new(vec![boundary(13, 2.0, 0.0, 0.0)]))
        .unwrap();

    let report = robot.home_from_field();
    assert!(report.is_home());
    assert_eq!(report.anchor, Some(13));
    assert_eq!(
        mock.commands(),
        vec![
            MotionCommand::new(MotionOp::TurnRight, 27),
            MotionCommand::new(MotionOp::Forward, 174),
        ]
    );
}

#[test]
fn homing_gives_up_on_dead_link() {
    let mock = MockSerial::new();
    let mut robot = robot_on(&mock, StaticScene::new(vec![boundary(10, 3.0, 20.0, 0.0)]));
    mock.script(std::iter::repeat_n(cubebot_serial::MockReply::Silent, 32));

    let report = robot.home_from_field();
    assert_eq!(report.phase, HomingPhase::Failed);
    assert!(!report.is_home());
}

#[test]
fn strategy_uses_trait_object() {
    fn home_or_report(nav: &mut dyn Navigator) -> HomingPhase {
        nav.home_from_field().phase
    }

    let mock = MockSerial::new();
    let mut robot = robot_on(&mock, StaticScene::empty());
    assert_eq!(home_or_report(&mut robot), HomingPhase::Home);
}
