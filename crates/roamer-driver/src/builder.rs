//! Builder 模式实现
//!
//! 提供链式构造 `Roamer` 实例的便捷方式。

use crate::error::DriverError;
use crate::metrics::PipelineMetrics;
use crate::pipeline::{ControlContext, LoopConfig, control_loop, ingest_loop};
use crate::roamer::Roamer;
use crate::sink::CommandSink;
use crate::slot::ScanSlot;
use crate::state::ControllerSnapshot;
use arc_swap::ArcSwap;
use crossbeam_channel::bounded;
use roamer_control::{AvoidanceConfig, MotionController, SeededTurns, TurnSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Roamer Builder（链式构造）
///
/// # Example
///
/// ```
/// use roamer_driver::RoamerBuilder;
/// use roamer_driver::sink::ChannelSink;
/// use roamer_protocol::RangeScan;
///
/// let (sink, commands) = ChannelSink::bounded(64);
/// let mut roamer = RoamerBuilder::new()
///     .seed(42)
///     .sink(sink)
///     .build()
///     .unwrap();
///
/// roamer.submit_scan(RangeScan::new(vec![3.0; 360], 0.12, 8.0));
/// roamer.stop().unwrap();
///
/// // 最后一条一定是零速
/// let last = commands.try_iter().last().unwrap();
/// assert!(last.is_stop());
/// ```
pub struct RoamerBuilder {
    config: AvoidanceConfig,
    loop_config: Option<LoopConfig>,
    turn_source: Option<Box<dyn TurnSource>>,
    seed: Option<u64>,
    sink: Option<Box<dyn CommandSink>>,
    scan_channel_capacity: usize,
}

impl RoamerBuilder {
    pub fn new() -> Self {
        Self {
            config: AvoidanceConfig::default(),
            loop_config: None,
            turn_source: None,
            seed: None,
            sink: None,
            scan_channel_capacity: 16,
        }
    }

    /// 设置避障配置（可选，默认 `AvoidanceConfig::default()`）
    pub fn config(mut self, config: AvoidanceConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置控制循环配置（可选，默认使用避障配置的 `tick_period`）
    pub fn loop_config(mut self, loop_config: LoopConfig) -> Self {
        self.loop_config = Some(loop_config);
        self
    }

    /// 注入自定义随机源（优先于 `seed`）
    pub fn turn_source(mut self, source: impl TurnSource + 'static) -> Self {
        self.turn_source = Some(Box::new(source));
        self
    }

    /// 固定随机种子（可复现的平局决策）
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// 设置指令输出（必需）
    pub fn sink(mut self, sink: impl CommandSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// 扫描通道容量（可选，默认 16）
    pub fn scan_channel_capacity(mut self, capacity: usize) -> Self {
        self.scan_channel_capacity = capacity;
        self
    }

    /// 校验配置并启动后台线程
    pub fn build(self) -> Result<Roamer, DriverError> {
        self.config.validate()?;

        let loop_config = self
            .loop_config
            .unwrap_or_else(|| LoopConfig::from_avoidance(&self.config));
        loop_config.validate()?;

        let nominal = Duration::from_secs_f64(self.config.tick_period);
        if loop_config.tick_period != nominal {
            warn!(
                "Loop period {:?} differs from controller tick_period {:?}; phase timing is counted in ticks",
                loop_config.tick_period, nominal
            );
        }

        let sink = self.sink.ok_or(DriverError::MissingSink)?;
        let source: Box<dyn TurnSource> = match (self.turn_source, self.seed) {
            (Some(source), _) => source,
            (None, Some(seed)) => Box::new(SeededTurns::new(seed)),
            (None, None) => Box::new(SeededTurns::from_entropy()),
        };
        let controller = MotionController::new(self.config, source);

        let slot = Arc::new(ScanSlot::new());
        let snapshot = Arc::new(ArcSwap::from_pointee(ControllerSnapshot::default()));
        let metrics = Arc::new(PipelineMetrics::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let (scan_tx, scan_rx) = bounded(self.scan_channel_capacity);

        let ingest_thread = {
            let slot = slot.clone();
            let metrics = metrics.clone();
            let is_running = is_running.clone();
            let poll_timeout = loop_config.ingest_poll_timeout;
            thread::Builder::new()
                .name("roamer-ingest".to_string())
                .spawn(move || ingest_loop(scan_rx, slot, metrics, is_running, poll_timeout))?
        };

        let ctx = ControlContext {
            slot: slot.clone(),
            snapshot: snapshot.clone(),
            metrics: metrics.clone(),
            is_running: is_running.clone(),
        };
        let control_thread = match thread::Builder::new()
            .name("roamer-control".to_string())
            .spawn(move || control_loop(controller, sink, ctx, loop_config))
        {
            Ok(handle) => handle,
            Err(e) => {
                // ingest 线程已经启动，需要让它退出
                is_running.store(false, Ordering::Release);
                return Err(DriverError::Spawn(e));
            },
        };

        info!("Roamer started");

        Ok(Roamer::from_parts(
            scan_tx,
            slot,
            snapshot,
            metrics,
            is_running,
            ingest_thread,
            control_thread,
        ))
    }
}

impl Default for RoamerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
