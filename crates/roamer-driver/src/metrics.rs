//! 运行期指标
//!
//! 零开销的原子计数器，任何线程都可以读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 控制流水线指标
///
/// # 使用示例
///
/// ```rust
/// use roamer_driver::PipelineMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = PipelineMetrics::new();
/// metrics.ticks.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.ticks, 1);
/// ```
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// 控制周期总数
    pub ticks: AtomicU64,

    /// 尚未收到扫描的周期数（不输出指令）
    pub idle_ticks: AtomicU64,

    /// 复用上一帧扫描的周期数
    ///
    /// 如果这个值快速增长，说明扫描频率低于控制频率或传感器已停止。
    pub stale_ticks: AtomicU64,

    /// 成功输出的指令数（含停止时的零速指令）
    pub commands_published: AtomicU64,

    /// 指令输出失败次数
    pub sink_errors: AtomicU64,

    /// 收到的扫描总数（两条投递路径合计）
    pub scans_received: AtomicU64,

    /// 周期体耗时超过阈值的次数
    pub overruns: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照（`Ordering::Relaxed`，计数器之间可能有微小时间差）
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            idle_ticks: self.idle_ticks.load(Ordering::Relaxed),
            stale_ticks: self.stale_ticks.load(Ordering::Relaxed),
            commands_published: self.commands_published.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
            scans_received: self.scans_received.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub stale_ticks: u64,
    pub commands_published: u64,
    pub sink_errors: u64,
    pub scans_received: u64,
    pub overruns: u64,
}

impl MetricsSnapshot {
    /// 有扫描可用的周期数
    pub fn active_ticks(&self) -> u64 {
        self.ticks.saturating_sub(self.idle_ticks)
    }

    /// 复用旧扫描的比例（百分比），没有活跃周期时为 0.0
    pub fn stale_rate(&self) -> f64 {
        let active = self.active_ticks();
        if active == 0 {
            return 0.0;
        }
        (self.stale_ticks as f64 / active as f64) * 100.0
    }

    /// 指令输出失败率（百分比）
    pub fn sink_error_rate(&self) -> f64 {
        let attempts = self.commands_published + self.sink_errors;
        if attempts == 0 {
            return 0.0;
        }
        (self.sink_errors as f64 / attempts as f64) * 100.0
    }
}
