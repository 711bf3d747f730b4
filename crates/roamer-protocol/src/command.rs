//! 速度指令

/// 差速底盘速度指令
///
/// - `linear`: 线速度（m/s），正值前进，负值后退
/// - `angular`: 角速度（rad/s），正值逆时针（向左）
///
/// 每个控制周期重新生成，核心层不保留。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VelocityCommand {
    pub linear: f64,
    pub angular: f64,
}

impl VelocityCommand {
    /// 零速度指令（停车）
    pub const STOP: Self = Self {
        linear: 0.0,
        angular: 0.0,
    };

    #[inline]
    pub fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// 零速度指令
    #[inline]
    pub fn stop() -> Self {
        Self::STOP
    }

    /// 是否为零速度
    #[inline]
    pub fn is_stop(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }
}
