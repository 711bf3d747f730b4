//! 扇区分析
//!
//! 把一帧原始扫描归约为前/左/右三个方向的最近距离，以及左右空间比较结果。
//!
//! # 扇区映射
//!
//! 扇区以角度半开区间 `[start, end)` 定义，按实际点数 `N` 等比换算为索引：
//! `index = round(degree * N / 360)`，区间内每个索引再对 `N` 取模（回绕）。
//! 因此 N=360 与 N=720 得到几何上等价的扇区。
//!
//! # 采样过滤
//!
//! 有效采样必须同时满足：非 NaN、`> noise_floor`、`< range_max`。
//! 扇区内没有有效采样时，距离取 `range_max`（视为空旷）。
//! 分析过程是纯函数，从不报错。

use crate::config::{AvoidanceConfig, SectorConfig};
use roamer_protocol::RangeScan;
use std::ops::Range;

/// 角度窗口（度，半开区间）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorWindow {
    pub start_deg: f64,
    pub end_deg: f64,
}

impl SectorWindow {
    pub fn new(start_deg: f64, end_deg: f64) -> Self {
        Self { start_deg, end_deg }
    }

    /// 未取模的索引区间
    ///
    /// 点数极少时窗口可能被舍入为零宽，此时至少保留起始索引；
    /// 区间长度不超过 `n`，避免重复访问同一采样。
    fn raw_range(&self, n: usize) -> Range<i64> {
        let start = degree_to_index(self.start_deg, n);
        let mut end = degree_to_index(self.end_deg, n);
        if end <= start {
            end = start + 1;
        }
        end = end.min(start + n as i64);
        start..end
    }

    /// 窗口覆盖的采样索引（已回绕到 `[0, n)`）
    ///
    /// `n == 0` 时为空。
    pub fn indices(&self, n: usize) -> impl Iterator<Item = usize> {
        let range = if n == 0 { 0..0 } else { self.raw_range(n) };
        range.map(move |i| i.rem_euclid(n as i64) as usize)
    }
}

/// 角度换算为（未取模的）索引
#[inline]
fn degree_to_index(degree: f64, n: usize) -> i64 {
    (degree * n as f64 / 360.0).round() as i64
}

/// 三个扇区的角度划分
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorLayout {
    pub front: SectorWindow,
    pub left: SectorWindow,
    pub right: SectorWindow,
}

impl SectorLayout {
    pub fn from_config(config: &SectorConfig) -> Self {
        let half = config.front_half_width_deg;
        Self {
            front: SectorWindow::new(-half, half),
            left: SectorWindow::new(config.left_start_deg, config.left_end_deg),
            right: SectorWindow::new(config.right_start_deg, config.right_end_deg),
        }
    }
}

impl Default for SectorLayout {
    fn default() -> Self {
        Self::from_config(&SectorConfig::default())
    }
}

/// 左右空间比较结果
///
/// 三者互斥且完备，由类型保证"恰好一个成立"。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideBalance {
    /// 左侧比右侧空旷超过迟滞阈值
    LeftBetter,
    /// 右侧比左侧空旷超过迟滞阈值
    RightBetter,
    /// 两侧差距在迟滞阈值以内
    Equal,
}

impl SideBalance {
    /// 按迟滞阈值比较左右距离
    pub fn compare(left_min: f64, right_min: f64, margin: f64) -> Self {
        if left_min - right_min > margin {
            SideBalance::LeftBetter
        } else if right_min - left_min > margin {
            SideBalance::RightBetter
        } else {
            SideBalance::Equal
        }
    }
}

/// 扇区摘要（每个周期重新计算）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectorSummary {
    pub front_min: f64,
    pub left_min: f64,
    pub right_min: f64,
    pub balance: SideBalance,
}

impl SectorSummary {
    /// 直接由三个距离构造（主要用于测试和回放）
    pub fn from_distances(front_min: f64, left_min: f64, right_min: f64, margin: f64) -> Self {
        Self {
            front_min,
            left_min,
            right_min,
            balance: SideBalance::compare(left_min, right_min, margin),
        }
    }

    #[inline]
    pub fn left_better(&self) -> bool {
        self.balance == SideBalance::LeftBetter
    }

    #[inline]
    pub fn right_better(&self) -> bool {
        self.balance == SideBalance::RightBetter
    }

    #[inline]
    pub fn equal(&self) -> bool {
        self.balance == SideBalance::Equal
    }
}

/// 扇区分析器
///
/// 保存由配置推导出的扇区划分、噪声下限和迟滞阈值。
#[derive(Debug, Clone)]
pub struct SectorAnalyzer {
    layout: SectorLayout,
    noise_floor: f32,
    hysteresis_margin: f64,
}

impl SectorAnalyzer {
    pub fn new(config: &AvoidanceConfig) -> Self {
        Self {
            layout: SectorLayout::from_config(&config.sectors),
            noise_floor: config.noise_floor as f32,
            hysteresis_margin: config.hysteresis_margin,
        }
    }

    /// 归约一帧扫描
    pub fn summarize(&self, scan: &RangeScan) -> SectorSummary {
        let front_min = self.sector_min(scan, &self.layout.front);
        let left_min = self.sector_min(scan, &self.layout.left);
        let right_min = self.sector_min(scan, &self.layout.right);
        SectorSummary::from_distances(front_min, left_min, right_min, self.hysteresis_margin)
    }

    /// 扇区内有效采样的最小值；无有效采样时为 `range_max`
    fn sector_min(&self, scan: &RangeScan, window: &SectorWindow) -> f64 {
        window
            .indices(scan.len())
            .map(|i| scan.ranges[i])
            .filter(|&r| self.is_valid(r, scan.range_max))
            .reduce(f32::min)
            .unwrap_or(scan.range_max) as f64
    }

    /// 在 f32 域比较，避免 `0.1f32` 提升为 f64 后略大于 0.1 而被误判为有效
    #[inline]
    fn is_valid(&self, range: f32, range_max: f32) -> bool {
        !range.is_nan() && range > self.noise_floor && range < range_max
    }
}

/// 按配置归约一帧扫描
///
/// 每次调用都会重新推导扇区划分；周期性调用请复用 [`SectorAnalyzer`]。
pub fn summarize(scan: &RangeScan, config: &AvoidanceConfig) -> SectorSummary {
    SectorAnalyzer::new(config).summarize(scan)
}
