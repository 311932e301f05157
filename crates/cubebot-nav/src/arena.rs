//! 场地布局
//!
//! 正方形场地，四面围墙，每面墙等间距安装 7 个围墙标记，编号 0-27 顺时针连续递增。
//! 每支队伍的出发区（家）位于一个角落：`zone` 号墙的起点与 `zone - 1` 号墙的终点交汇处。
//!
//! ```text
//!   zone-1 号墙 ... 26 27 ┐ <- 家所在的角落
//!                         │ 0  zone 号墙（zone = 0 时）
//!                         │ 1
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::geometry::CornerSide;

/// 家的两面墙中的哪一面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeWall {
    /// `zone - 1` 号墙（面向角落时在左手边）
    Left,
    /// `zone` 号墙（面向角落时在右手边）
    Right,
}

/// 场地布局（对应配置文件中的 `[arena]` 段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaLayout {
    /// 本队出发区编号
    pub zone: u32,
    /// 围墙数量
    pub walls: u32,
    /// 每面墙上的标记数量
    pub markers_per_wall: u32,
    /// 相邻标记的间距（米）
    pub marker_spacing: f64,
}

impl Default for ArenaLayout {
    fn default() -> Self {
        Self {
            zone: 0,
            walls: 4,
            markers_per_wall: 7,
            marker_spacing: 1.0,
        }
    }
}

impl ArenaLayout {
    /// 指定出发区的默认场地
    pub fn for_zone(zone: u32) -> Self {
        Self {
            zone,
            ..Self::default()
        }
    }

    /// 围墙标记总数
    pub fn total_markers(&self) -> u32 {
        self.walls * self.markers_per_wall
    }

    /// 标记所在的墙
    pub fn wall_of(&self, code: u32) -> Option<u32> {
        (code < self.total_markers()).then(|| code / self.markers_per_wall)
    }

    /// 标记在墙上的序号（0 起）
    pub fn index_on_wall(&self, code: u32) -> u32 {
        code % self.markers_per_wall
    }

    /// 某面墙上的全部编号
    pub fn wall_codes(&self, wall: u32) -> Range<u32> {
        let start = wall * self.markers_per_wall;
        start..start + self.markers_per_wall
    }

    /// 家右手边的墙（`zone`）
    pub fn right_home_wall(&self) -> u32 {
        self.zone % self.walls
    }

    /// 家左手边的墙（`zone - 1`）
    pub fn left_home_wall(&self) -> u32 {
        (self.zone + self.walls - 1) % self.walls
    }

    pub fn is_home_wall(&self, wall: u32) -> bool {
        wall == self.right_home_wall() || wall == self.left_home_wall()
    }

    /// 标记位于家的哪一面墙
    pub fn home_wall_of(&self, code: u32) -> Option<HomeWall> {
        match self.wall_of(code)? {
            w if w == self.left_home_wall() => Some(HomeWall::Left),
            w if w == self.right_home_wall() => Some(HomeWall::Right),
            _ => None,
        }
    }

    /// 家角落两侧的四个标记：[右内, 右外, 左内, 左外]
    pub fn home_corner_markers(&self) -> [u32; 4] {
        let total = self.total_markers();
        let right = self.right_home_wall() * self.markers_per_wall;
        [
            right,
            (right + 1) % total,
            (right + total - 1) % total,
            (right + total - 2) % total,
        ]
    }

    pub fn is_home_corner(&self, code: u32) -> bool {
        self.home_corner_markers().contains(&code)
    }

    /// 紧挨任一角落的标记
    pub fn is_inner(&self, code: u32) -> bool {
        let index = self.index_on_wall(code);
        code < self.total_markers() && (index == 0 || index == self.markers_per_wall - 1)
    }

    /// 离角落第二近的标记
    pub fn is_outer(&self, code: u32) -> bool {
        let index = self.index_on_wall(code);
        code < self.total_markers() && (index == 1 || index + 2 == self.markers_per_wall)
    }

    /// 家角落相对标记的方位和沿墙距离（米）
    ///
    /// 编号顺时针递增，从场内看墙时编号向右增大：右侧家墙的起点、左侧家墙的终点在家角落。
    /// 不在家墙上的标记返回 `None`。
    pub fn home_corner(&self, code: u32) -> Option<(CornerSide, f64)> {
        let index = self.index_on_wall(code);
        match self.home_wall_of(code)? {
            HomeWall::Right => Some((CornerSide::Left, f64::from(index + 1) * self.marker_spacing)),
            HomeWall::Left => Some((
                CornerSide::Right,
                f64::from(self.markers_per_wall - index) * self.marker_spacing,
            )),
        }
    }

    /// 沿该墙回家时是否逆时针前进（墙在右手边）
    ///
    /// `zone` 号墙和它顺时针方向的下一面墙逆时针走更近，其余两面顺时针走。
    pub fn follows_anticlockwise(&self, wall: u32) -> bool {
        wall == self.right_home_wall() || wall == (self.zone + 1) % self.walls
    }

    /// 入角转向的符号：标记在左侧的家墙上时右转（+1），否则左转（-1）
    pub fn corner_turn_sign(&self, code: u32) -> f64 {
        if self.wall_of(code) == Some(self.left_home_wall()) {
            1.0
        } else {
            -1.0
        }
    }

    /// 配置是否自洽
    pub fn validate(&self) -> Result<(), String> {
        if self.walls < 3 {
            return Err(format!("arena needs at least 3 walls, got {}", self.walls));
        }
        if self.markers_per_wall < 4 {
            return Err(format!(
                "inner/outer corner markers need at least 4 markers per wall, got {}",
                self.markers_per_wall
            ));
        }
        if self.zone >= self.walls {
            return Err(format!(
                "zone {} out of range for {} walls",
                self.zone, self.walls
            ));
        }
        if !(self.marker_spacing > 0.0) {
            return Err(format!(
                "marker spacing must be positive, got {}",
                self.marker_spacing
            ));
        }
        Ok(())
    }
}
