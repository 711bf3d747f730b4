//! Pipeline 循环模块
//!
//! 两个后台线程的循环体：
//! - `ingest_loop`：把通道中的扫描写入 [`ScanSlot`]
//! - `control_loop`：按固定周期读取扫描槽、推进状态机、输出指令
//!
//! 两者只通过扫描槽和原子标志交互，控制路径上没有锁。

use crate::error::DriverError;
use crate::metrics::PipelineMetrics;
use crate::sink::CommandSink;
use crate::slot::ScanSlot;
use crate::state::ControllerSnapshot;
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use roamer_control::{AvoidanceConfig, MotionController, TurnSource};
use roamer_protocol::{RangeScan, VelocityCommand};
use spin_sleep::SpinSleeper;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 控制循环配置
///
/// # Example
///
/// ```
/// use roamer_driver::LoopConfig;
/// use std::time::Duration;
///
/// // 默认 10Hz
/// let config = LoopConfig::default();
/// assert_eq!(config.tick_period, Duration::from_millis(100));
///
/// // 测试中加速运行 50 个周期
/// let config = LoopConfig {
///     tick_period: Duration::from_millis(5),
///     max_iterations: Some(50),
///     ..LoopConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    /// 控制周期（墙钟时间）
    ///
    /// 状态机按周期数计时，与这里的墙钟周期无关；
    /// 两者不一致时相当于按比例加速或减速运行。
    pub tick_period: Duration,

    /// 最大迭代次数（None 表示运行到 `stop()`）
    pub max_iterations: Option<u64>,

    /// 周期体耗时超过 `tick_period` 的此倍数时记为一次超时
    pub overrun_warn_multiplier: f64,

    /// 扫描通道的轮询超时
    pub ingest_poll_timeout: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(100),
            max_iterations: None,
            overrun_warn_multiplier: 0.5,
            ingest_poll_timeout: Duration::from_millis(20),
        }
    }
}

impl LoopConfig {
    /// 以避障配置的 `tick_period` 作为墙钟周期
    pub fn from_avoidance(config: &AvoidanceConfig) -> Self {
        Self {
            tick_period: Duration::from_secs_f64(config.tick_period),
            ..Self::default()
        }
    }

    /// 控制频率（Hz）
    pub fn frequency_hz(&self) -> f64 {
        1.0 / self.tick_period.as_secs_f64()
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        if self.tick_period.is_zero() {
            return Err(DriverError::InvalidLoopConfig(
                "tick_period must be > 0".to_string(),
            ));
        }
        if self.tick_period < Duration::from_micros(100) {
            warn!(
                "Very high control frequency: {:.0} Hz. This may cause performance issues.",
                self.frequency_hz()
            );
        }
        if !self.overrun_warn_multiplier.is_finite() || self.overrun_warn_multiplier <= 0.0 {
            return Err(DriverError::InvalidLoopConfig(format!(
                "overrun_warn_multiplier must be > 0 (got {})",
                self.overrun_warn_multiplier
            )));
        }
        if self.ingest_poll_timeout.is_zero() {
            return Err(DriverError::InvalidLoopConfig(
                "ingest_poll_timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 扫描接收循环
///
/// 从通道取出扫描写入扫描槽，直到 `is_running` 为 false 或所有发送端关闭。
pub fn ingest_loop(
    rx: Receiver<RangeScan>,
    slot: Arc<ScanSlot>,
    metrics: Arc<PipelineMetrics>,
    is_running: Arc<AtomicBool>,
    poll_timeout: Duration,
) {
    while is_running.load(Ordering::Acquire) {
        match rx.recv_timeout(poll_timeout) {
            Ok(scan) => {
                slot.publish(scan);
                metrics.scans_received.fetch_add(1, Ordering::Relaxed);
            },
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Scan channel closed, ingest loop exiting");
                break;
            },
        }
    }
}

/// 控制循环的共享上下文
pub struct ControlContext {
    pub slot: Arc<ScanSlot>,
    pub snapshot: Arc<ArcSwap<ControllerSnapshot>>,
    pub metrics: Arc<PipelineMetrics>,
    pub is_running: Arc<AtomicBool>,
}

/// 控制循环
///
/// 每个周期：
/// 1. 读取扫描槽一次（从未收到扫描时跳过，不输出指令）
/// 2. 扇区分析 + 状态机单步
/// 3. 输出指令（失败只记录，不中断循环）
/// 4. 发布状态快照
///
/// 使用绝对截止时间 + `spin_sleep` 定时：落后时连续补跑，每个周期恰好执行一次，不合并。
///
/// 退出时（`is_running` 为 false 或达到 `max_iterations`）通过
/// [`CommandSink::publish_final`] 输出一条零速指令。
pub fn control_loop<S, K>(
    mut controller: MotionController<S>,
    mut sink: K,
    ctx: ControlContext,
    config: LoopConfig,
) where
    S: TurnSource,
    K: CommandSink,
{
    let sleeper = SpinSleeper::default();
    let period = config.tick_period;
    let overrun_threshold = period.mul_f64(config.overrun_warn_multiplier);

    info!(
        frequency_hz = config.frequency_hz(),
        "Control loop started"
    );

    let mut last_sequence: u64 = 0;
    let mut last_command = None;
    let mut last_summary = None;
    let mut ticks: u64 = 0;
    let mut deadline = Instant::now();

    while ctx.is_running.load(Ordering::Acquire) {
        if let Some(max_iter) = config.max_iterations
            && ticks >= max_iter
        {
            debug!(ticks, "Reached max_iterations");
            break;
        }

        let started = Instant::now();

        match ctx.slot.latest_sequenced() {
            None => {
                ctx.metrics.idle_ticks.fetch_add(1, Ordering::Relaxed);
            },
            Some(entry) => {
                if last_sequence == 0 {
                    debug!(samples = entry.scan.len(), "First scan received");
                } else if entry.sequence == last_sequence {
                    ctx.metrics.stale_ticks.fetch_add(1, Ordering::Relaxed);
                }

                let outcome = controller.evaluate(&entry.scan);
                publish_command(&mut sink, outcome.command, &ctx.metrics);
                last_command = Some(outcome.command);
                last_summary = Some(outcome.summary);
                last_sequence = entry.sequence;
            },
        }

        ticks += 1;
        ctx.metrics.ticks.fetch_add(1, Ordering::Relaxed);
        ctx.snapshot.store(Arc::new(ControllerSnapshot {
            state: *controller.state(),
            phase_timer: controller.phase_timer(),
            last_command,
            last_summary,
            ticks,
            scan_sequence: last_sequence,
        }));

        let elapsed = started.elapsed();
        if elapsed > overrun_threshold {
            ctx.metrics.overruns.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Control tick took {:?} (period {:?})",
                elapsed, period
            );
        }

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            sleeper.sleep(deadline - now);
        }
    }

    // 安全停止：无论以何种方式退出，最后一条指令都是零速
    match sink.publish_final(VelocityCommand::STOP) {
        Ok(()) => {
            ctx.metrics.commands_published.fetch_add(1, Ordering::Relaxed);
        },
        Err(e) => {
            ctx.metrics.sink_errors.fetch_add(1, Ordering::Relaxed);
            error!("Failed to deliver final zero velocity command: {}", e);
        },
    }
    let last = **ctx.snapshot.load();
    ctx.snapshot.store(Arc::new(ControllerSnapshot {
        last_command: Some(VelocityCommand::STOP),
        ..last
    }));
    info!(ticks, "Control loop stopped, zero velocity sent");
}

fn publish_command<K: CommandSink>(sink: &mut K, command: VelocityCommand, metrics: &PipelineMetrics) {
    match sink.publish(command) {
        Ok(()) => {
            metrics.commands_published.fetch_add(1, Ordering::Relaxed);
        },
        Err(e) => {
            metrics.sink_errors.fetch_add(1, Ordering::Relaxed);
            warn!("Failed to publish velocity command: {}", e);
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{ChannelSink, FnSink};
    use crossbeam_channel::unbounded;
    use roamer_control::{FixedTurn, MotionState, TurnDirection};
    use std::thread;

    fn context() -> ControlContext {
        ControlContext {
            slot: Arc::new(ScanSlot::new()),
            snapshot: Arc::new(ArcSwap::from_pointee(ControllerSnapshot::default())),
            metrics: Arc::new(PipelineMetrics::new()),
            is_running: Arc::new(AtomicBool::new(true)),
        }
    }

    fn fast_loop(iterations: u64) -> LoopConfig {
        LoopConfig {
            tick_period: Duration::from_millis(1),
            max_iterations: Some(iterations),
            overrun_warn_multiplier: 1000.0,
            ..LoopConfig::default()
        }
    }

    fn controller() -> MotionController<FixedTurn> {
        MotionController::new(AvoidanceConfig::default(), FixedTurn(TurnDirection::Left))
    }

    #[test]
    fn test_loop_config_default() {
        let config = LoopConfig::default();
        assert_eq!(config.tick_period, Duration::from_millis(100));
        assert_eq!(config.max_iterations, None);
        assert!((config.frequency_hz() - 10.0).abs() < 1e-9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_loop_config_from_avoidance() {
        let avoidance = AvoidanceConfig {
            tick_period: 0.05,
            ..AvoidanceConfig::default()
        };
        let config = LoopConfig::from_avoidance(&avoidance);
        assert_eq!(config.tick_period, Duration::from_millis(50));
    }

    #[test]
    fn test_loop_config_invalid() {
        let config = LoopConfig {
            tick_period: Duration::ZERO,
            ..LoopConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DriverError::InvalidLoopConfig(_))
        ));

        let config = LoopConfig {
            overrun_warn_multiplier: 0.0,
            ..LoopConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_scan_only_final_stop() {
        let ctx = context();
        let metrics = ctx.metrics.clone();
        let (sink, rx) = ChannelSink::bounded(64);

        let shared = ctx.snapshot.clone();

        control_loop(controller(), sink, ctx, fast_loop(5));

        let commands: Vec<_> = rx.try_iter().collect();
        assert_eq!(commands, vec![VelocityCommand::STOP]);
        assert!(!shared.load().has_scan());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks, 5);
        assert_eq!(snapshot.idle_ticks, 5);
        assert_eq!(snapshot.commands_published, 1);
    }

    #[test]
    fn test_one_command_per_tick_then_stop() {
        let ctx = context();
        ctx.slot.publish(RangeScan::new(vec![3.0; 360], 0.12, 8.0));
        let metrics = ctx.metrics.clone();
        let shared = ctx.snapshot.clone();
        let (sink, rx) = ChannelSink::bounded(64);

        control_loop(controller(), sink, ctx, fast_loop(10));

        let commands: Vec<_> = rx.try_iter().collect();
        assert_eq!(commands.len(), 11);
        assert!(commands[..10].iter().all(|c| *c == VelocityCommand::new(0.12, 0.0)));
        assert!(commands[10].is_stop());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.stale_ticks, 9);
        assert_eq!(snapshot.commands_published, 11);

        let state = shared.load();
        assert_eq!(state.ticks, 10);
        assert_eq!(state.scan_sequence, 1);
        assert_eq!(state.last_command, Some(VelocityCommand::STOP));
    }

    #[test]
    fn test_sink_errors_do_not_stop_loop() {
        let ctx = context();
        ctx.slot.publish(RangeScan::new(vec![3.0; 360], 0.12, 8.0));
        let metrics = ctx.metrics.clone();
        let (sink, rx) = ChannelSink::bounded(2);

        control_loop(controller(), sink, ctx, fast_loop(6));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks, 6);
        assert_eq!(snapshot.commands_published, 3);
        assert_eq!(snapshot.sink_errors, 4);
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_final_stop_delivered_through_full_channel() {
        let ctx = context();
        ctx.slot.publish(RangeScan::new(vec![3.0; 360], 0.12, 8.0));
        let (sink, rx) = ChannelSink::bounded(2);

        control_loop(controller(), sink, ctx, fast_loop(6));

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received.last(), Some(&VelocityCommand::STOP));
    }

    #[test]
    fn test_final_stop_failure_is_counted() {
        let ctx = context();
        let metrics = ctx.metrics.clone();
        let sink = FnSink::new(|_cmd: VelocityCommand| Err(DriverError::ChannelClosed));

        control_loop(controller(), sink, ctx, fast_loop(2));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.commands_published, 0);
        assert_eq!(snapshot.sink_errors, 1);
    }

    #[test]
    fn test_snapshot_reports_sequence_of_used_scan() {
        let ctx = context();
        ctx.slot.publish(RangeScan::new(vec![3.0; 360], 0.12, 8.0));
        let slot = ctx.slot.clone();
        let shared = ctx.snapshot.clone();

        // 第一个周期输出指令时写入更新的扫描，该周期并未使用它
        let sink = {
            let slot = slot.clone();
            FnSink::new(move |cmd: VelocityCommand| {
                if !cmd.is_stop() {
                    slot.publish(RangeScan::new(vec![0.2; 360], 0.12, 8.0));
                }
                Ok(())
            })
        };

        control_loop(controller(), sink, ctx, fast_loop(1));

        assert_eq!(slot.sequence(), 2);
        let state = shared.load();
        assert_eq!(state.scan_sequence, 1);
        assert_eq!(state.last_summary.map(|s| s.front_min), Some(3.0));
    }

    #[test]
    fn test_snapshot_tracks_state() {
        let ctx = context();
        ctx.slot.publish(RangeScan::new(vec![0.2; 360], 0.12, 8.0));
        let shared = ctx.snapshot.clone();
        let (sink, _rx) = ChannelSink::bounded(64);

        control_loop(controller(), sink, ctx, fast_loop(3));

        let state = shared.load();
        assert_eq!(state.state, MotionState::BackingUp { ticks: 2 });
        assert!((state.phase_timer - 0.2).abs() < 1e-9);
        assert_eq!(state.last_summary.map(|s| s.front_min), Some(0.2f32 as f64));
    }

    #[test]
    fn test_ingest_loop_publishes_until_disconnect() {
        let (tx, rx) = unbounded();
        let slot = Arc::new(ScanSlot::new());
        let metrics = Arc::new(PipelineMetrics::new());
        let is_running = Arc::new(AtomicBool::new(true));

        for i in 0..3 {
            tx.send(RangeScan::new(vec![i as f32 + 1.0; 360], 0.12, 8.0))
                .unwrap();
        }
        drop(tx);

        let handle = {
            let slot = slot.clone();
            let metrics = metrics.clone();
            thread::spawn(move || {
                ingest_loop(rx, slot, metrics, is_running, Duration::from_millis(5))
            })
        };
        handle.join().unwrap();

        assert_eq!(slot.sequence(), 3);
        assert_eq!(slot.latest().unwrap().ranges[0], 3.0);
        assert_eq!(metrics.snapshot().scans_received, 3);
    }
}
