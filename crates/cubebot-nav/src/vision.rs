//! 视觉系统接口
//!
//! 标记检测不在本库范围内，导航层只需要一次同步查询返回当前可见的全部标记。

use crate::marker::MarkerObservation;

/// 视觉数据源
pub trait VisionSource {
    /// 拍摄一帧并返回其中的全部标记
    fn see(&mut self) -> Vec<MarkerObservation>;
}

impl<F> VisionSource for F
where
    F: FnMut() -> Vec<MarkerObservation>,
{
    fn see(&mut self) -> Vec<MarkerObservation> {
        self()
    }
}

/// 固定场景：每次查询都返回同一组标记
#[derive(Debug, Clone, Default)]
pub struct StaticScene {
    markers: Vec<MarkerObservation>,
}

impl StaticScene {
    pub fn new(markers: Vec<MarkerObservation>) -> Self {
        Self { markers }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl VisionSource for StaticScene {
    fn see(&mut self) -> Vec<MarkerObservation> {
        self.markers.clone()
    }
}
