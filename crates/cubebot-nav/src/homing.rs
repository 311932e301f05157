//! # 回家状态机
//!
//! 比赛结束前把机器人从场地任意位置开回本队出发区所在的角落。
//!
//! ```text
//! Orienting ──(看到本队角落标记)──────────────────────────────> Home
//!     │  ──(什么都看不到：盲开两段)───────────────────────────> Home
//!     v
//! Approaching <──> Stuck（后退重试，有上限）
//!     v
//! Aligning ──> Traveling ──(锚点不在家墙上：换锚点)──> Approaching
//!                  v
//!            EnteringCorner ──> Home
//! ```
//!
//! 每个会丢失标记的阶段都按固定延迟等待并重试有限次，之后进入 `Failed`。
//! 所有循环都有上限，状态机一定会停在 `Home`、`Stuck` 或 `Failed`。

use std::fmt;

use cubebot_driver::SerialAdapter;
use tracing::{debug, error, info, warn};

use crate::controller::{NavigationController, pause};
use crate::error::NavError;
use crate::geometry::vector_to_corner;
use crate::marker::{MarkerCategory, MarkerFilter, MarkerObservation};
use crate::units::Deg;
use crate::vision::VisionSource;

/// 已经在停靠距离附近时不再前进的余量（米）
const MIN_SQUARE_UP_LEG: f64 = 0.01;

/// 回家阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HomingPhase {
    /// 判断看到了什么
    Orienting,
    /// 开到锚点标记前的停靠距离
    Approaching,
    /// 摆正并转到与锚点所在墙平行
    Aligning,
    /// 沿墙前进
    Traveling,
    /// 进入本队角落
    EnteringCorner,
    /// 已到家
    Home,
    /// 被卡住
    Stuck,
    /// 无法回家
    Failed,
}

impl HomingPhase {
    /// 一旦进入就不会再离开的阶段（`Stuck` 只有在重试用完时才是终态）
    pub fn is_terminal(self) -> bool {
        matches!(self, HomingPhase::Home | HomingPhase::Failed)
    }
}

impl fmt::Display for HomingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HomingPhase::Orienting => "orienting",
            HomingPhase::Approaching => "approaching",
            HomingPhase::Aligning => "aligning",
            HomingPhase::Traveling => "traveling",
            HomingPhase::EnteringCorner => "entering-corner",
            HomingPhase::Home => "home",
            HomingPhase::Stuck => "stuck",
            HomingPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 沿墙前进的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentDirection {
    /// 墙在左手边，顺时针前进
    Clockwise,
    /// 墙在右手边，逆时针前进
    CounterClockwise,
}

impl AlignmentDirection {
    /// 正对标记时转到与墙平行所需的转角
    pub fn parallel_turn(self, face: Deg) -> Deg {
        match self {
            AlignmentDirection::CounterClockwise => -(Deg::RIGHT - face),
            AlignmentDirection::Clockwise => Deg::RIGHT + face,
        }
    }
}

/// 回家结果
#[derive(Debug, Clone, PartialEq)]
pub struct HomingReport {
    /// 最终阶段
    pub phase: HomingPhase,
    /// 依次经过的阶段（含最终阶段）
    pub trail: Vec<HomingPhase>,
    /// 最后一个锚点标记
    pub anchor: Option<u32>,
    pub alignment: Option<AlignmentDirection>,
    /// 最后一次导致放弃或降级为盲开的错误
    pub fault: Option<String>,
}

impl HomingReport {
    pub fn is_home(&self) -> bool {
        self.phase == HomingPhase::Home
    }

    /// 某个阶段被经过的次数
    pub fn visits(&self, phase: HomingPhase) -> usize {
        self.trail.iter().filter(|p| **p == phase).count()
    }
}

/// 状态机上下文
#[derive(Debug, Default)]
struct HomingContext {
    anchor: Option<MarkerObservation>,
    alignment: Option<AlignmentDirection>,
    stall_retries: u32,
    wall_laps: u32,
    trail: Vec<HomingPhase>,
    fault: Option<String>,
}

fn no_anchor(action: &str) -> NavError {
    NavError::Unrecoverable(format!("no anchor marker to {}", action))
}

/// 根据前后两次看到的标记判断机器人是否真的移动了
///
/// 同一编号的标记距离变化小于 `similar_distance` 且方位变化小于 `similar_bearing` 即视为没动。
/// 没有共同的标记，或者某一侧为空，都视为动了。
pub fn markers_indicate_motion(
    before: &[MarkerObservation],
    after: &[MarkerObservation],
    similar_distance: f64,
    similar_bearing: Deg,
) -> bool {
    if before.is_empty() || after.is_empty() {
        debug!("Markers appeared or vanished, assuming we moved");
        return true;
    }

    let mut shared = 0;
    for initial in before {
        for last in after.iter().filter(|m| m.code == initial.code) {
            shared += 1;
            let distance_change = (initial.distance - last.distance).abs();
            let bearing_change = (initial.bearing - last.bearing).normalize().abs();
            if distance_change < similar_distance && bearing_change < similar_bearing {
                debug!(
                    "Marker #{} barely changed ({:.3} m, {}), we have not moved",
                    initial.code, distance_change, bearing_change
                );
                return false;
            }
        }
    }
    if shared == 0 {
        debug!("All the markers are different, we have probably moved");
    }
    true
}

impl<A: SerialAdapter, V: VisionSource> NavigationController<A, V> {
    /// 从场地任意位置回家
    ///
    /// 协议错误和丢失标记都不会向上传播：状态机会停在 `Failed`（或重试用完后的 `Stuck`）。
    pub fn home_from_field(&mut self) -> HomingReport {
        let mut ctx = HomingContext::default();
        let mut phase = HomingPhase::Orienting;
        info!("Heading home to zone {}", self.config.arena.zone);

        let last = loop {
            ctx.trail.push(phase);
            if phase.is_terminal() {
                break phase;
            }
            debug!("Homing phase: {}", phase);

            let step = match phase {
                HomingPhase::Orienting => self.orient(&mut ctx),
                HomingPhase::Approaching => self.approach_anchor(&mut ctx),
                HomingPhase::Aligning => self.align_with_wall(&mut ctx),
                HomingPhase::Traveling => self.travel_along_wall(&mut ctx),
                HomingPhase::EnteringCorner => self.enter_corner(&mut ctx),
                HomingPhase::Stuck => self.recover_from_stall(&mut ctx),
                HomingPhase::Home | HomingPhase::Failed => Ok(phase),
            };

            let next = match step {
                Ok(next) => next,
                Err(e @ NavError::StallDetected { .. }) => {
                    warn!("{} while {}", e, phase);
                    ctx.fault = Some(e.to_string());
                    HomingPhase::Stuck
                },
                Err(e) => {
                    error!("Cannot get home: {}", e);
                    ctx.fault = Some(e.to_string());
                    HomingPhase::Failed
                },
            };

            // Stuck -> Stuck 表示后退重试已用完
            if phase == HomingPhase::Stuck && next == HomingPhase::Stuck {
                break next;
            }
            if next != phase {
                info!("Homing: {} -> {}", phase, next);
            }
            phase = next;
        };

        match last {
            HomingPhase::Home => info!("We should now be home!"),
            other => error!("Cannot get home, gave up while {}", other),
        }
        HomingReport {
            phase: last,
            trail: ctx.trail,
            anchor: ctx.anchor.map(|m| m.code),
            alignment: ctx.alignment,
            fault: ctx.fault,
        }
    }

    fn boundary_markers(&mut self) -> Vec<MarkerObservation> {
        let attempts = self.config.search.capture_attempts;
        let filter = MarkerFilter::category(MarkerCategory::Boundary);
        self.capture(filter.predicate(), attempts)
    }

    /// 等待匹配的标记出现，有限次重试
    fn wait_for(&mut self, filter: &MarkerFilter, what: &str) -> Vec<MarkerObservation> {
        let attempts = self.config.search.capture_attempts;
        let retries = self.config.homing.lost_marker_retries;
        for retry in 0..=retries {
            if retry > 0 {
                warn!(
                    "Can't see {}, waiting and trying again ({}/{})",
                    what, retry, retries
                );
                pause(self.config.homing.lost_marker_delay());
            }
            let markers = self.capture(filter.predicate(), attempts);
            if !markers.is_empty() {
                return markers;
            }
        }
        error!("Lost {} for good", what);
        Vec::new()
    }

    fn reacquire(&mut self, code: u32) -> Option<MarkerObservation> {
        self.wait_for(&MarkerFilter::code(code), "anchor")
            .into_iter()
            .next()
    }

    fn orient(&mut self, ctx: &mut HomingContext) -> Result<HomingPhase, NavError> {
        let markers = self.boundary_markers();
        let arena = self.config.arena.clone();
        let codes: Vec<u32> = markers.iter().map(|m| m.code).collect();
        debug!("Seen {} arena marker(s): {:?}", markers.len(), codes);

        let mut own: Vec<MarkerObservation> = markers
            .iter()
            .filter(|m| arena.is_home_corner(m.code))
            .copied()
            .collect();
        own.sort_by(|a, b| {
            arena
                .is_outer(a.code)
                .cmp(&arena.is_outer(b.code))
                .then(a.distance.total_cmp(&b.distance))
        });
        let own_corner = own
            .iter()
            .find_map(|m| arena.home_corner(m.code).map(|corner| (*m, corner)));
        if let Some((marker, (side, offset))) = own_corner {
            let corner = vector_to_corner(&marker, offset, side);
            info!(
                "Can see our corner marker #{}, heading for the corner ({})",
                marker.code, corner
            );
            ctx.anchor = Some(marker);
            self.link.turn_by(corner.angle.value())?;
            let travel = corner.distance - self.config.homing.corner_clearance;
            if travel > 0.0 {
                self.move_persistent(travel)?;
            }
            return Ok(HomingPhase::Home);
        }

        let mut rivals = markers;
        rivals.sort_by(|a, b| {
            let home_a = arena.wall_of(a.code).is_some_and(|w| arena.is_home_wall(w));
            let home_b = arena.wall_of(b.code).is_some_and(|w| arena.is_home_wall(w));
            home_b.cmp(&home_a).then(a.distance.total_cmp(&b.distance))
        });
        if let Some(anchor) = rivals.first().copied() {
            warn!(
                "Other teams' markers ({:?}) are visible, following the walls from #{}",
                codes, anchor.code
            );
            ctx.anchor = Some(anchor);
            return Ok(HomingPhase::Approaching);
        }

        let reason = NavError::Unrecoverable("can't see any useful arena markers".to_string());
        warn!("{}, driving forwards and hoping", reason);
        ctx.fault = Some(reason.to_string());
        for leg in self.config.homing.blind_legs.clone() {
            self.move_persistent(leg)?;
        }
        Ok(HomingPhase::Home)
    }

    fn approach_anchor(&mut self, ctx: &mut HomingContext) -> Result<HomingPhase, NavError> {
        let anchor = ctx.anchor.ok_or_else(|| no_anchor("approach"))?;
        let homing = self.config.homing.clone();

        let before = self.boundary_markers();
        self.link.turn_by(anchor.bearing.value())?;
        let Some(anchor) = self.reacquire(anchor.code) else {
            return Err(NavError::Unrecoverable(format!(
                "turned to marker #{} and now can't see it",
                anchor.code
            )));
        };
        ctx.anchor = Some(anchor);

        if anchor.distance <= homing.standoff + homing.standoff_tolerance {
            debug!(
                "Already {:.2} m from marker #{}, not moving",
                anchor.distance, anchor.code
            );
            return Ok(HomingPhase::Aligning);
        }

        debug!(
            "Moving to {:.2} m from marker #{}",
            homing.standoff, anchor.code
        );
        self.move_persistent(anchor.distance - homing.standoff)?;

        let after = self.boundary_markers();
        let Some(tracked) = after.iter().find(|m| m.code == anchor.code).copied() else {
            error!(
                "We moved closer to marker #{} (maybe) and now can't see it",
                anchor.code
            );
            return Ok(HomingPhase::Stuck);
        };
        if !markers_indicate_motion(&before, &after, homing.similar_distance, homing.similar_bearing()) {
            error!("We're stuck! Backing off before trying marker #{} again", anchor.code);
            return Ok(HomingPhase::Stuck);
        }
        info!("We're not stuck, marker #{} is {:.2} m away", tracked.code, tracked.distance);
        ctx.anchor = Some(tracked);
        Ok(HomingPhase::Aligning)
    }

    fn recover_from_stall(&mut self, ctx: &mut HomingContext) -> Result<HomingPhase, NavError> {
        ctx.stall_retries += 1;
        let limit = self.config.homing.max_stall_retries;
        if ctx.stall_retries > limit || ctx.anchor.is_none() {
            error!("Still stuck after {} backoff(s), cannot get home", limit);
            return Ok(HomingPhase::Stuck);
        }

        let backoff = self.config.homing.stall_backoff;
        warn!(
            "Backing off {:.2} m (attempt {}/{})",
            backoff, ctx.stall_retries, limit
        );
        if let Err(e) = self.link.move_by(-backoff) {
            warn!("Backoff interrupted: {}", e);
            self.link.discard_pending();
        }
        Ok(HomingPhase::Approaching)
    }

    fn align_with_wall(&mut self, ctx: &mut HomingContext) -> Result<HomingPhase, NavError> {
        let anchor = ctx.anchor.ok_or_else(|| no_anchor("align with"))?;
        let homing = self.config.homing.clone();
        let search = self.config.search.clone();
        let arena = self.config.arena.clone();

        // 绕标记走等腰三角形的底边，摆到正对标记、距墙 wall_offset 的位置
        let face = anchor.face;
        let w = homing.wall_offset;
        let leg = (2.0 * w * w * (1.0 - face.cos())).max(0.0).sqrt();
        if leg > MIN_SQUARE_UP_LEG {
            let angle = if face < Deg::ZERO {
                (Deg::STRAIGHT - face) * 0.5
            } else {
                (-Deg::STRAIGHT - face) * 0.5
            };
            debug!("Squaring up: turn {}, move {:.2} m, turn {}", angle, leg, -angle);
            self.link.turn_by(angle.value())?;
            self.move_persistent(leg)?;
            self.link.turn_by(-angle.value())?;
        }

        let tracked = MarkerFilter::code(anchor.code);
        let mut found = Vec::new();
        for retry in 0..=homing.lost_marker_retries {
            if retry > 0 {
                error!(
                    "Couldn't find marker #{} we fixated upon, waiting and trying again",
                    anchor.code
                );
                pause(homing.lost_marker_delay());
            }
            found = self.cone_search(
                tracked.predicate(),
                Deg(search.cone_start_deg),
                Deg(search.cone_stop_deg),
                Deg(search.cone_step_deg),
            )?;
            if !found.is_empty() {
                break;
            }
        }
        let Some(marker) = found.first().copied() else {
            return Err(NavError::Unrecoverable(format!(
                "marker #{} is gone",
                anchor.code
            )));
        };
        self.link.turn_by(marker.bearing.value())?;
        if marker.distance > w {
            self.move_persistent(marker.distance - w)?;
        } else {
            warn!("We're closer than we should be ({:.2} m), not backing off", marker.distance);
        }

        let Some(wall) = arena.wall_of(anchor.code) else {
            return Err(NavError::Unrecoverable(format!(
                "marker #{} is not on any wall",
                anchor.code
            )));
        };
        let direction = if arena.follows_anticlockwise(wall) {
            AlignmentDirection::CounterClockwise
        } else {
            AlignmentDirection::Clockwise
        };
        ctx.alignment = Some(direction);

        for attempt in 0..=homing.max_align_retries {
            let Some(marker) = self.reacquire(anchor.code) else {
                return Err(NavError::Unrecoverable(format!(
                    "moved to face marker #{} and now can't see it",
                    anchor.code
                )));
            };
            let turn = direction.parallel_turn(marker.face);
            debug!("Turning {:?} to follow wall {} ({})", direction, wall, turn);
            self.link.turn_by(turn.value())?;

            let attempts = self.config.search.capture_attempts;
            if self.capture(tracked.predicate(), attempts).is_empty() {
                debug!("We're parallel to wall {}, continuing on the way home", wall);
                ctx.anchor = Some(marker);
                return Ok(HomingPhase::Traveling);
            }
            warn!(
                "Marker #{} is still in front of us, we didn't turn parallel to the wall ({}/{})",
                anchor.code,
                attempt + 1,
                homing.max_align_retries + 1
            );
            if let Err(e) = self.link.move_by(-homing.align_backoff) {
                warn!("Backoff interrupted: {}", e);
                self.link.discard_pending();
            }
        }
        Err(NavError::Unrecoverable(format!(
            "unable to turn parallel to wall {}",
            wall
        )))
    }

    fn travel_along_wall(&mut self, ctx: &mut HomingContext) -> Result<HomingPhase, NavError> {
        let anchor = ctx.anchor.ok_or_else(|| no_anchor("travel along"))?;
        let homing = self.config.homing.clone();
        let arena = self.config.arena.clone();
        let Some(anchor_wall) = arena.wall_of(anchor.code) else {
            return Err(NavError::Unrecoverable(format!(
                "marker #{} is not on any wall",
                anchor.code
            )));
        };
        let ahead = MarkerFilter::category(MarkerCategory::Boundary)
            .closer_than(homing.travel_scan_distance)
            .excluding(arena.wall_codes(anchor_wall));

        for step in 0..=homing.max_travel_steps {
            let attempts = self.config.search.capture_attempts;
            if let Some(next) = self.capture(ahead.predicate(), attempts).first().copied() {
                debug!("Wall marker #{} ahead ({:.2} m)", next.code, next.distance);
                if arena.is_home_wall(anchor_wall) {
                    debug!("We should now be facing our corner");
                    return Ok(HomingPhase::EnteringCorner);
                }
                if ctx.wall_laps >= homing.max_wall_laps {
                    return Err(NavError::Unrecoverable(format!(
                        "gone round {} walls already",
                        ctx.wall_laps
                    )));
                }
                ctx.wall_laps += 1;
                info!(
                    "Following another wall from marker #{} (lap {})",
                    next.code, ctx.wall_laps
                );
                ctx.anchor = Some(next);
                return Ok(HomingPhase::Approaching);
            }
            if step == homing.max_travel_steps {
                break;
            }
            debug!("Nothing ahead, going forwards {:.2} m", homing.travel_increment);
            self.move_persistent(homing.travel_increment)?;
            pause(homing.travel_pause());
        }
        Err(NavError::Unrecoverable(format!(
            "no wall marker after {} step(s)",
            homing.max_travel_steps
        )))
    }

    fn enter_corner(&mut self, ctx: &mut HomingContext) -> Result<HomingPhase, NavError> {
        let anchor = ctx.anchor.ok_or_else(|| no_anchor("enter the corner from"))?;
        let homing = self.config.homing.clone();
        let arena = self.config.arena.clone();
        let mut corner = MarkerFilter::category(MarkerCategory::Boundary);
        if let Some(wall) = arena.wall_of(anchor.code) {
            corner = corner.excluding(arena.wall_codes(wall));
        }
        let others: Vec<u32> = (0..arena.total_markers())
            .filter(|code| !arena.is_home_corner(*code))
            .collect();
        let corner = corner.excluding(others);

        let mut markers = self.wait_for(&corner, "our corner markers");
        markers.sort_by(|a, b| {
            arena
                .is_inner(b.code)
                .cmp(&arena.is_inner(a.code))
                .then(a.distance.total_cmp(&b.distance))
        });
        let Some(marker) = markers.first().copied() else {
            return Err(NavError::Unrecoverable(
                "none of our corner markers are visible".to_string(),
            ));
        };
        ctx.anchor = Some(marker);

        let (standoff, last_leg) = if arena.is_inner(marker.code) {
            (homing.inner_standoff, homing.inner_final)
        } else {
            (homing.outer_standoff, homing.outer_final)
        };
        debug!(
            "Driving to {:.1} m from corner marker #{}",
            standoff, marker.code
        );
        self.link.turn_by(marker.bearing.value())?;
        if marker.distance > standoff {
            self.move_persistent(marker.distance - standoff)?;
        } else {
            warn!(
                "Marker #{} is only {:.2} m away, less than the expected {:.1} m",
                marker.code, marker.distance, standoff
            );
        }

        let turn = homing.corner_turn() * arena.corner_turn_sign(marker.code);
        debug!("Turning into the corner ({})", turn);
        self.link.turn_by(turn.value())?;
        self.move_persistent(last_leg)?;
        Ok(HomingPhase::Home)
    }
}
