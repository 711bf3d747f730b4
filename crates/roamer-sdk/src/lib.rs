//! Roamer SDK - 激光雷达反应式避障
//!
//! 让差速底盘在未知环境中漫游而不碰撞：每个控制周期读取最新一帧扫描，
//! 归约为前/左/右三个扇区的最近距离，由状态机给出线速度和角速度。
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **协议层** (`protocol`): 扫描与速度指令类型、JSON Lines 编解码
//! - **控制层** (`control`): 扇区分析、转向决策、运动状态机、配置
//! - **驱动层** (`driver`): 扫描槽、周期控制线程、指令输出、安全停止
//!
//! # 快速开始
//!
//! ```rust
//! use roamer_sdk::prelude::*;
//!
//! let (sink, commands) = ChannelSink::bounded(64);
//! let mut roamer = RoamerBuilder::new().seed(7).sink(sink).build()?;
//!
//! roamer.submit_scan(RangeScan::new(vec![3.0; 360], 0.12, 8.0));
//! roamer.stop()?;
//! assert!(commands.try_iter().last().is_some_and(|c| c.is_stop()));
//! # Ok::<(), DriverError>(())
//! ```
//!
//! 离线逐帧计算只需要控制层：
//!
//! ```rust
//! use roamer_sdk::control::{AvoidanceConfig, MotionController, SeededTurns};
//! use roamer_sdk::RangeScan;
//!
//! let mut controller = MotionController::new(AvoidanceConfig::default(), SeededTurns::new(0));
//! let cmd = controller.step(Some(&RangeScan::new(vec![0.2; 360], 0.12, 8.0)));
//! assert_eq!(cmd.map(|c| c.linear), Some(-0.1));
//! ```

mod logging;
pub mod prelude;

pub use roamer_control as control;
pub use roamer_driver as driver;
pub use roamer_protocol as protocol;

// --- 常用类型 ---
pub use control::{AvoidanceConfig, ConfigError, MotionController, MotionState};
pub use driver::{DriverError, Roamer, RoamerBuilder};
pub use logging::{LoggerError, init_logger};
pub use protocol::{ProtocolError, RangeScan, VelocityCommand};
