//! 激光雷达扫描快照

use crate::ProtocolError;

/// 360° 激光雷达扫描快照
///
/// 由传感器驱动产生，投递后不可变；每一帧新扫描都会完整替换上一帧
/// （last-writer-wins，不保留历史）。
///
/// # 索引与角度
///
/// 不携带逐点角度。索引 `i` 对应的方位角为 `i * 360 / N` 度，
/// 索引 0 为正前方，逆时针递增。扇区边界按实际点数 `N` 等比缩放，
/// 因此不要求每度恰好一个采样点。
///
/// # 示例
///
/// ```
/// use roamer_protocol::RangeScan;
///
/// let scan = RangeScan::new(vec![1.0; 360], 0.12, 8.0);
/// assert_eq!(scan.len(), 360);
/// assert_eq!(scan.angle_of(90), 90.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeScan {
    /// 距离采样（米），可能包含 NaN / inf
    ///
    /// JSON 中的 `null` 解码为 NaN（serde_json 也会把 NaN 编码为 `null`）。
    #[cfg_attr(feature = "serde", serde(deserialize_with = "null_as_nan"))]
    pub ranges: Vec<f32>,

    /// 传感器标称最小量程（米）
    pub range_min: f32,

    /// 传感器标称最大量程（米），同时作为"空旷"的默认距离
    pub range_max: f32,

    /// 传感器时间戳（秒），仅用于诊断和回放
    #[cfg_attr(feature = "serde", serde(default))]
    pub stamp: Option<f64>,
}

impl RangeScan {
    /// 创建不带时间戳的扫描
    pub fn new(ranges: Vec<f32>, range_min: f32, range_max: f32) -> Self {
        Self {
            ranges,
            range_min,
            range_max,
            stamp: None,
        }
    }

    /// 附加传感器时间戳
    pub fn with_stamp(mut self, stamp: f64) -> Self {
        self.stamp = Some(stamp);
        self
    }

    /// 采样点数量 N
    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// 是否为空扫描
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// 索引对应的方位角（度，[0, 360)）
    ///
    /// 空扫描返回 0.0。
    pub fn angle_of(&self, index: usize) -> f64 {
        if self.ranges.is_empty() {
            return 0.0;
        }
        (index % self.ranges.len()) as f64 * 360.0 / self.ranges.len() as f64
    }

    /// 检查扫描头部参数
    ///
    /// 只校验 `range_min` / `range_max`，不校验逐点数据：
    /// 无效采样（NaN、过近、超量程）由扇区分析直接过滤。
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if !self.range_max.is_finite() || self.range_max <= 0.0 {
            return Err(ProtocolError::InvalidRangeMax {
                value: self.range_max,
            });
        }
        if !self.range_min.is_finite() || self.range_min >= self.range_max {
            return Err(ProtocolError::InvalidRangeMin {
                value: self.range_min,
            });
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
fn null_as_nan<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let raw = Vec::<Option<f32>>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|r| r.unwrap_or(f32::NAN)).collect())
}
