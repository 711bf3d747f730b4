//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use roamer_sdk::prelude::*;
//! ```

// 协议层
pub use crate::protocol::{RangeScan, VelocityCommand};

// 控制层
pub use crate::control::{
    AvoidanceConfig, FixedTurn, MotionController, MotionState, SectorSummary, SeededTurns,
    TurnDirection, TurnSource,
};

// 驱动层
pub use crate::driver::{
    ChannelSink, CommandSink, ControllerSnapshot, FnSink, LoopConfig, MetricsSnapshot, Roamer,
    RoamerBuilder,
};

// 错误类型
pub use crate::control::ConfigError;
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
