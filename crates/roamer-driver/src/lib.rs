//! 驱动层模块
//!
//! 本 crate 把控制核心接到真实的时间和线程上：
//! - 扫描槽（ArcSwap 单槽快照，后写入者覆盖）
//! - 扫描接收线程与周期控制线程
//! - 指令输出（`CommandSink`，非阻塞）
//! - 状态快照与运行期指标（无锁读取）
//! - 安全停止（退出前输出零速指令）
//!
//! # 使用场景
//!
//! 适用于把传感器和执行器接到避障控制器上的场景。
//! 只需要离线逐帧计算时，直接使用 `roamer_control::MotionController`。

mod builder;
mod error;
pub mod metrics;
pub mod pipeline;
mod roamer;
pub mod sink;
pub mod slot;
pub mod state;

pub use builder::RoamerBuilder;
pub use error::DriverError;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use pipeline::{ControlContext, LoopConfig, control_loop, ingest_loop};
pub use roamer::Roamer;
pub use sink::{ChannelSink, CommandSink, FnSink};
pub use slot::{ScanSlot, SequencedScan};
pub use state::ControllerSnapshot;
