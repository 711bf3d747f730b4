//! 控制器状态快照
//!
//! 控制线程每个周期通过 `ArcSwap::store` 发布一次，其他线程无锁读取。

use roamer_control::{MotionState, SectorSummary};
use roamer_protocol::VelocityCommand;

/// 控制器对外可见的状态
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerSnapshot {
    /// 当前状态（周期结束后）
    pub state: MotionState,

    /// 阶段计时器（秒）
    pub phase_timer: f64,

    /// 最近一次输出的指令（尚未收到扫描时为 `None`）
    pub last_command: Option<VelocityCommand>,

    /// 最近一次扇区分析结果
    pub last_summary: Option<SectorSummary>,

    /// 已执行的控制周期数
    pub ticks: u64,

    /// 最近一次使用的扫描序号（0 表示尚未收到扫描）
    pub scan_sequence: u64,
}

impl ControllerSnapshot {
    /// 状态名（用于日志和 CLI 输出）
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// 是否已经收到过扫描
    pub fn has_scan(&self) -> bool {
        self.scan_sequence > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot() {
        let snapshot = ControllerSnapshot::default();
        assert_eq!(snapshot.state_name(), "Exploring");
        assert!(!snapshot.has_scan());
        assert_eq!(snapshot.ticks, 0);
    }

    #[test]
    fn test_stop_command_alone_is_not_a_scan() {
        let snapshot = ControllerSnapshot {
            last_command: Some(VelocityCommand::STOP),
            ..ControllerSnapshot::default()
        };
        assert!(!snapshot.has_scan());

        let snapshot = ControllerSnapshot {
            scan_sequence: 1,
            ..snapshot
        };
        assert!(snapshot.has_scan());
    }
}
