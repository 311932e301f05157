//! 标记搜索
//!
//! 三种搜索策略都建立在一次视觉查询和链路的旋转原语上：
//!
//! - [`capture`](NavigationController::capture)：原地多次拍摄
//! - [`sweep_search`](NavigationController::sweep_search)：左右交替、逐步扩大的扫描
//! - [`cone_search`](NavigationController::cone_search)：在固定扇区内单向步进
//!
//! 失败的搜索一定会把机器人转回原来的朝向；成功的搜索停在看到标记的朝向上。

use cubebot_driver::SerialAdapter;
use tracing::{debug, error, info, trace, warn};

use crate::controller::{NavigationController, pause};
use crate::error::NavError;
use crate::marker::{MarkerObservation, sort_by_distance};
use crate::units::Deg;
use crate::vision::VisionSource;

/// 一次搜索的临时状态
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    cumulative_turn: Deg,
    step: Deg,
    matches: Vec<MarkerObservation>,
}

impl SearchState {
    pub fn new(step: Deg) -> Self {
        Self {
            cumulative_turn: Deg::ZERO,
            step,
            matches: Vec::new(),
        }
    }

    /// 相对搜索开始时的累计转角（已归一化）
    pub fn cumulative_turn(&self) -> Deg {
        self.cumulative_turn
    }

    pub fn step(&self) -> Deg {
        self.step
    }

    pub fn matches(&self) -> &[MarkerObservation] {
        &self.matches
    }

    pub fn into_matches(self) -> Vec<MarkerObservation> {
        self.matches
    }
}

impl<A: SerialAdapter, V: VisionSource> NavigationController<A, V> {
    /// 当前可见的全部标记
    pub fn see(&mut self) -> Vec<MarkerObservation> {
        let markers = self.vision.see();
        trace!("Vision returned {} marker(s)", markers.len());
        markers
    }

    /// 多次拍摄，返回第一组非空的匹配结果（按距离排序）
    ///
    /// 所有尝试都没有匹配时返回空。
    pub fn capture<P>(&mut self, mut predicate: P, attempts: u32) -> Vec<MarkerObservation>
    where
        P: FnMut(&MarkerObservation) -> bool,
    {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            let mut matches: Vec<MarkerObservation> =
                self.see().into_iter().filter(|m| predicate(m)).collect();
            if !matches.is_empty() {
                sort_by_distance(&mut matches);
                debug!(
                    "Captured {} matching marker(s) on attempt {}/{}",
                    matches.len(),
                    attempt,
                    attempts
                );
                return matches;
            }
            if attempt < attempts {
                pause(self.config.search.capture_pause());
            }
        }
        debug!("No matching markers after {} attempt(s)", attempts);
        Vec::new()
    }

    /// 左右交替扫描
    ///
    /// 先看正前方，然后依次看 `+step`、`-step`、回到中间，每轮把偏角增加一个 `step`，
    /// 直到偏角超过 `max_angle`。找到至少 `minimum_count` 个匹配时停在该朝向上返回；
    /// 扫描结束仍未找到时转回原朝向并返回空。
    pub fn sweep_search<P>(
        &mut self,
        minimum_count: usize,
        mut predicate: P,
        step_angle: Deg,
        max_angle: Deg,
    ) -> Result<Vec<MarkerObservation>, NavError>
    where
        P: FnMut(&MarkerObservation) -> bool,
    {
        let minimum_count = minimum_count.max(1);
        let step = step_angle.abs();
        let max_angle = max_angle.abs();
        let mut state = SearchState::new(step);
        info!(
            "Sweep search for {} marker(s), step {}, up to {}",
            minimum_count, step, max_angle
        );

        let result = self.run_sweep(&mut state, minimum_count, &mut predicate, max_angle);
        self.finish_search(state, result)
    }

    fn run_sweep<P>(
        &mut self,
        state: &mut SearchState,
        minimum_count: usize,
        predicate: &mut P,
        max_angle: Deg,
    ) -> Result<bool, NavError>
    where
        P: FnMut(&MarkerObservation) -> bool,
    {
        if self.probe(state, minimum_count, &mut *predicate) {
            return Ok(true);
        }
        if state.step <= Deg::ZERO {
            return Ok(false);
        }

        let mut offset = state.step;
        while offset <= max_angle {
            for target in [offset, -offset] {
                self.turn_to_offset(state, target)?;
                if self.probe(state, minimum_count, &mut *predicate) {
                    return Ok(true);
                }
            }
            self.turn_to_offset(state, Deg::ZERO)?;
            offset += state.step;
        }
        Ok(false)
    }

    /// 扇区搜索
    ///
    /// 转到 `start_angle` 拍摄，然后朝 `stop_angle` 每次转 `step_angle` 并拍摄，
    /// 看到匹配就停下。`step_angle` 不为正时只在起始角拍摄一次。
    pub fn cone_search<P>(
        &mut self,
        mut predicate: P,
        start_angle: Deg,
        stop_angle: Deg,
        step_angle: Deg,
    ) -> Result<Vec<MarkerObservation>, NavError>
    where
        P: FnMut(&MarkerObservation) -> bool,
    {
        let mut state = SearchState::new(step_angle);
        debug!(
            "Cone search from {} to {} in steps of {}",
            start_angle, stop_angle, step_angle
        );
        let result = self.run_cone(&mut state, &mut predicate, start_angle, stop_angle);
        self.finish_search(state, result)
    }

    fn run_cone<P>(
        &mut self,
        state: &mut SearchState,
        predicate: &mut P,
        start_angle: Deg,
        stop_angle: Deg,
    ) -> Result<bool, NavError>
    where
        P: FnMut(&MarkerObservation) -> bool,
    {
        let mut offset = start_angle;
        self.turn_to_offset(state, offset)?;
        if self.probe(state, 1, &mut *predicate) {
            return Ok(true);
        }
        if state.step <= Deg::ZERO {
            return Ok(false);
        }

        let direction = (stop_angle - start_angle).signum();
        while offset != stop_angle && direction != 0.0 {
            let next = offset + state.step * direction;
            offset = if direction > 0.0 {
                if next > stop_angle { stop_angle } else { next }
            } else if next < stop_angle {
                stop_angle
            } else {
                next
            };
            self.turn_to_offset(state, offset)?;
            if self.probe(state, 1, &mut *predicate) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 在当前朝向拍摄，匹配数足够时记录到状态中
    fn probe<P>(&mut self, state: &mut SearchState, minimum_count: usize, predicate: &mut P) -> bool
    where
        P: FnMut(&MarkerObservation) -> bool,
    {
        pause(self.config.search.probe_pause());
        let attempts = self.config.search.capture_attempts;
        let matches = self.capture(&mut *predicate, attempts);
        trace!(
            "Probe at {}: {} match(es)",
            state.cumulative_turn,
            matches.len()
        );
        if matches.len() >= minimum_count {
            state.matches = matches;
            true
        } else {
            false
        }
    }

    /// 转到相对搜索起点的 `target` 偏角
    fn turn_to_offset(&mut self, state: &mut SearchState, target: Deg) -> Result<(), NavError> {
        let delta = (target - state.cumulative_turn).normalize();
        match self.link.turn_by(delta.value()) {
            Ok(turned) => {
                state.cumulative_turn = (state.cumulative_turn + Deg(f64::from(turned))).normalize();
                Ok(())
            },
            Err(e) => {
                state.cumulative_turn =
                    (state.cumulative_turn + Deg(f64::from(e.completed))).normalize();
                self.link.discard_pending();
                Err(e.into())
            },
        }
    }

    /// 搜索收尾：失败或出错时转回原朝向
    fn finish_search(
        &mut self,
        state: SearchState,
        result: Result<bool, NavError>,
    ) -> Result<Vec<MarkerObservation>, NavError> {
        match result {
            Ok(true) => {
                info!(
                    "Search found {} marker(s) at {}",
                    state.matches.len(),
                    state.cumulative_turn
                );
                Ok(state.into_matches())
            },
            Ok(false) => {
                warn!("Search found nothing, restoring heading");
                self.restore_heading(&state)?;
                Ok(Vec::new())
            },
            Err(e) => {
                error!("Search aborted: {}", e);
                if let Err(restore) = self.restore_heading(&state) {
                    error!("Failed to restore heading after aborted search: {}", restore);
                }
                Err(e)
            },
        }
    }

    fn restore_heading(&mut self, state: &SearchState) -> Result<(), NavError> {
        let undo = -state.cumulative_turn;
        if undo != Deg::ZERO {
            debug!("Undoing cumulative search turn of {}", state.cumulative_turn);
            self.link.turn_by(undo.value())?;
        }
        Ok(())
    }
}
