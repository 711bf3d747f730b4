//! 控制核心
//!
//! 本 crate 实现反应式避障的全部决策逻辑，不依赖任何线程、通道或时钟：
//! - 扇区分析：把一帧激光扫描归约为前/左/右三个最近距离
//! - 转向决策：带迟滞的左右比较，平局由注入的随机源决定
//! - 运动状态机：`Exploring → BackingUp → Turning → Exploring`
//! - 配置：TOML 加载、保存与校验
//!
//! 驱动线程、指令输出和运行期指标见 `roamer-driver`。
//!
//! # 示例
//!
//! ```
//! use roamer_control::{AvoidanceConfig, MotionController};
//! use roamer_control::policy::SeededTurns;
//! use roamer_protocol::RangeScan;
//!
//! let mut controller = MotionController::new(AvoidanceConfig::default(), SeededTurns::new(42));
//! let scan = RangeScan::new(vec![3.0; 360], 0.12, 8.0);
//!
//! let cmd = controller.step(Some(&scan)).unwrap();
//! assert_eq!(cmd.linear, 0.12);
//! assert_eq!(cmd.angular, 0.0);
//! ```

pub mod config;
mod error;
pub mod machine;
pub mod policy;
pub mod sector;

pub use config::{AvoidanceConfig, SectorConfig, ticks_for};
pub use error::ConfigError;
pub use machine::{MotionController, MotionState, TickOutcome};
pub use policy::{DirectionPolicy, FixedTurn, ScriptedTurns, SeededTurns, TurnDirection, TurnSource};
pub use sector::{SectorAnalyzer, SectorLayout, SectorSummary, SectorWindow, SideBalance};
