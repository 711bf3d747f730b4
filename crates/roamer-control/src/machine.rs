//! 运动状态机
//!
//! 每个控制周期消费最新的扫描，完成状态转换并生成速度指令。
//!
//! # 状态转换
//!
//! ```text
//!            front < min_distance
//! Exploring ───────────────────────▶ BackingUp { ticks: 0 }
//!     ▲                                   │ ticks >= backup_ticks
//!     │ ticks >= turning_cutoff_ticks     ▼
//!     └────────────────────────────── Turning { ticks }（计时器不清零）
//! ```
//!
//! 倒车和转向共用同一个阶段计时器：进入倒车时清零，进入转向时保持。
//! 默认配置下倒车持续 15 个周期（1.5 s），转向持续 35 - 15 = 20 个周期（2.0 s）。
//!
//! # 示例
//!
//! ```
//! use roamer_control::{AvoidanceConfig, MotionController, MotionState};
//! use roamer_control::policy::{FixedTurn, TurnDirection};
//! use roamer_control::sector::SectorSummary;
//!
//! let mut controller =
//!     MotionController::new(AvoidanceConfig::default(), FixedTurn(TurnDirection::Left));
//!
//! // 前方 0.2 m：立即倒车
//! let cmd = controller.tick(&SectorSummary::from_distances(0.2, 1.0, 1.0, 0.3));
//! assert_eq!(cmd.linear, -0.1);
//! assert_eq!(controller.state(), &MotionState::BackingUp { ticks: 0 });
//! ```

use crate::config::AvoidanceConfig;
use crate::error::ConfigError;
use crate::policy::{DirectionPolicy, TurnSource};
use crate::sector::{SectorAnalyzer, SectorSummary};
use roamer_protocol::{RangeScan, VelocityCommand};
use tracing::{debug, info, warn};

/// 控制器状态
///
/// 阶段计时器以周期数保存在变体中，`BackingUp → Turning` 时原样带入。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionState {
    /// 巡航：前方空旷时直行，接近障碍时减速转向
    #[default]
    Exploring,

    /// 倒车：`ticks` 为进入倒车以来的周期数
    BackingUp { ticks: u32 },

    /// 原地转向：`ticks` 从倒车开始累计
    Turning { ticks: u32 },
}

impl MotionState {
    /// 状态名（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            MotionState::Exploring => "Exploring",
            MotionState::BackingUp { .. } => "BackingUp",
            MotionState::Turning { .. } => "Turning",
        }
    }

    /// 阶段计时器（周期数），巡航状态下为 0
    pub fn phase_ticks(&self) -> u32 {
        match self {
            MotionState::Exploring => 0,
            MotionState::BackingUp { ticks } | MotionState::Turning { ticks } => *ticks,
        }
    }

    pub fn is_exploring(&self) -> bool {
        matches!(self, MotionState::Exploring)
    }

    /// 是否处于脱困流程（倒车或转向）
    pub fn is_escaping(&self) -> bool {
        !self.is_exploring()
    }
}

/// 单个周期的完整输出
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub summary: SectorSummary,
    pub command: VelocityCommand,
    pub state: MotionState,
}

/// 运动控制器
///
/// 独占控制器状态；只在 `tick` / `step` 中修改。
///
/// # 线程安全
///
/// 控制器本身不共享，驱动层把它移动到控制线程中独占使用。
/// 只要 `S: Send`，控制器就可以跨线程移动。
#[derive(Debug, Clone)]
pub struct MotionController<S> {
    config: AvoidanceConfig,
    analyzer: SectorAnalyzer,
    policy: DirectionPolicy<S>,
    state: MotionState,
    backup_ticks: u32,
    cutoff_ticks: u32,
}

impl<S: TurnSource> MotionController<S> {
    /// 创建控制器（初始状态为 `Exploring`）
    ///
    /// 不校验配置；来自外部输入的配置请使用 [`MotionController::try_new`]。
    pub fn new(config: AvoidanceConfig, source: S) -> Self {
        Self {
            analyzer: SectorAnalyzer::new(&config),
            policy: DirectionPolicy::new(source),
            state: MotionState::Exploring,
            backup_ticks: config.backup_ticks(),
            cutoff_ticks: config.turning_cutoff_ticks(),
            config,
        }
    }

    /// 校验配置后创建控制器
    pub fn try_new(config: AvoidanceConfig, source: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config, source))
    }

    /// 以指定状态开始（用于测试和恢复）
    pub fn with_state(mut self, state: MotionState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// 阶段计时器（秒）
    pub fn phase_timer(&self) -> f64 {
        self.state.phase_ticks() as f64 * self.config.tick_period
    }

    pub fn config(&self) -> &AvoidanceConfig {
        &self.config
    }

    pub fn policy(&self) -> &DirectionPolicy<S> {
        &self.policy
    }

    /// 回到巡航状态
    pub fn reset(&mut self) {
        self.state = MotionState::Exploring;
    }

    /// 消费一帧扫描
    ///
    /// 从未收到扫描时（`None`）本周期不输出指令，状态不变。
    pub fn step(&mut self, scan: Option<&RangeScan>) -> Option<VelocityCommand> {
        scan.map(|scan| self.evaluate(scan).command)
    }

    /// 分析扫描并推进一个周期
    pub fn evaluate(&mut self, scan: &RangeScan) -> TickOutcome {
        let summary = self.analyzer.summarize(scan);
        let command = self.tick(&summary);
        TickOutcome {
            summary,
            command,
            state: self.state,
        }
    }

    /// 状态机单步
    pub fn tick(&mut self, summary: &SectorSummary) -> VelocityCommand {
        let cfg = &self.config;

        debug!(
            state = self.state.name(),
            front = summary.front_min,
            left = summary.left_min,
            right = summary.right_min,
            "tick"
        );

        let (next, command) = match self.state {
            MotionState::Exploring => {
                if summary.front_min < cfg.min_distance {
                    warn!(front = summary.front_min, "Too close, backing up");
                    (
                        MotionState::BackingUp { ticks: 0 },
                        VelocityCommand::new(cfg.backup_speed, 0.0),
                    )
                } else if summary.front_min < cfg.safe_distance {
                    let direction = self.policy.choose_turn(summary);
                    debug!(
                        direction = direction.name(),
                        balance = ?summary.balance,
                        "Obstacle ahead, steering"
                    );
                    (
                        MotionState::Exploring,
                        VelocityCommand::new(
                            cfg.forward_speed * cfg.approach_speed_factor,
                            cfg.turn_speed * direction.sign(),
                        ),
                    )
                } else {
                    (
                        MotionState::Exploring,
                        VelocityCommand::new(cfg.forward_speed, 0.0),
                    )
                }
            },

            MotionState::BackingUp { ticks } => {
                let ticks = ticks.saturating_add(1);
                let next = if ticks >= self.backup_ticks {
                    info!(ticks, "Backup complete, starting turn");
                    MotionState::Turning { ticks }
                } else {
                    MotionState::BackingUp { ticks }
                };
                (next, VelocityCommand::new(cfg.backup_speed, 0.0))
            },

            MotionState::Turning { ticks } => {
                let ticks = ticks.saturating_add(1);
                let direction = self.policy.choose_turn(summary);
                let next = if ticks >= self.cutoff_ticks {
                    info!(ticks, "Turn complete, resuming exploration");
                    MotionState::Exploring
                } else {
                    MotionState::Turning { ticks }
                };
                (
                    next,
                    VelocityCommand::new(0.0, cfg.turn_speed * direction.sign()),
                )
            },
        };

        self.state = next;
        command
    }
}
