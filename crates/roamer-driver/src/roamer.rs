//! 运行时句柄
//!
//! 提供对外的 `Roamer` 结构体，封装后台线程和状态同步细节。

use crate::error::DriverError;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::slot::ScanSlot;
use crate::state::ControllerSnapshot;
use arc_swap::ArcSwap;
use crossbeam_channel::Sender;
use roamer_protocol::RangeScan;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{error, info};

const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// 带超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 看门狗线程代为 join，主线程只等待有限时间
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 避障运行时（对外 API）
///
/// 持有两个后台线程：
/// - `roamer-ingest`：把 [`Roamer::scan_sender`] 发来的扫描写入扫描槽
/// - `roamer-control`：按周期推进状态机并输出指令
///
/// 通过 [`RoamerBuilder`](crate::RoamerBuilder) 创建。
///
/// # 停止
///
/// `stop()` 或 `Drop` 时控制线程输出最后一条零速指令后退出。
pub struct Roamer {
    /// 扫描发送端（停止时先关闭，让 ingest 线程收到 `Disconnected`）
    scan_tx: Option<Sender<RangeScan>>,
    slot: Arc<ScanSlot>,
    snapshot: Arc<ArcSwap<ControllerSnapshot>>,
    metrics: Arc<PipelineMetrics>,
    is_running: Arc<AtomicBool>,
    ingest_thread: Option<JoinHandle<()>>,
    control_thread: Option<JoinHandle<()>>,
}

impl Roamer {
    pub(crate) fn from_parts(
        scan_tx: Sender<RangeScan>,
        slot: Arc<ScanSlot>,
        snapshot: Arc<ArcSwap<ControllerSnapshot>>,
        metrics: Arc<PipelineMetrics>,
        is_running: Arc<AtomicBool>,
        ingest_thread: JoinHandle<()>,
        control_thread: JoinHandle<()>,
    ) -> Self {
        Self {
            scan_tx: Some(scan_tx),
            slot,
            snapshot,
            metrics,
            is_running,
            ingest_thread: Some(ingest_thread),
            control_thread: Some(control_thread),
        }
    }

    /// 直接写入扫描槽（绕过通道），返回扫描序号
    pub fn submit_scan(&self, scan: RangeScan) -> u64 {
        let sequence = self.slot.publish(scan);
        self.metrics.scans_received.fetch_add(1, Ordering::Relaxed);
        sequence
    }

    /// 获取扫描发送端，可以克隆后交给传感器线程
    ///
    /// 停止后返回 [`DriverError::ChannelClosed`]。
    pub fn scan_sender(&self) -> Result<Sender<RangeScan>, DriverError> {
        self.scan_tx.clone().ok_or(DriverError::ChannelClosed)
    }

    /// 最新控制器状态
    ///
    /// # 性能
    /// - 无锁读取（ArcSwap::load）
    pub fn snapshot(&self) -> ControllerSnapshot {
        **self.snapshot.load()
    }

    /// 运行期指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 已写入扫描槽的扫描总数
    pub fn scan_sequence(&self) -> u64 {
        self.slot.sequence()
    }

    /// 控制线程是否仍在运行
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
            && self
                .control_thread
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// 停止运行时
    ///
    /// 通知两个线程退出并等待它们结束；控制线程退出前输出一条零速指令。
    /// 可以重复调用，第二次起直接返回 `Ok(())`。
    pub fn stop(&mut self) -> Result<(), DriverError> {
        if self.control_thread.is_none() && self.ingest_thread.is_none() {
            return Ok(());
        }

        info!("Stopping roamer");
        self.is_running.store(false, Ordering::Release);
        // 先关闭发送端再 join，否则 ingest 线程只能等轮询超时
        self.scan_tx = None;

        let mut result = Ok(());

        if let Some(handle) = self.control_thread.take()
            && let Err(_e) = handle.join_timeout(JOIN_TIMEOUT)
        {
            error!(
                "Control thread panicked or failed to shut down within {:?}",
                JOIN_TIMEOUT
            );
            result = Err(DriverError::ThreadJoin("control thread".to_string()));
        }

        if let Some(handle) = self.ingest_thread.take()
            && let Err(_e) = handle.join_timeout(JOIN_TIMEOUT)
        {
            error!(
                "Ingest thread panicked or failed to shut down within {:?}",
                JOIN_TIMEOUT
            );
            if result.is_ok() {
                result = Err(DriverError::ThreadJoin("ingest thread".to_string()));
            }
        }

        result
    }

    /// 阻塞直到控制循环结束（达到 `max_iterations`），然后清理 ingest 线程
    ///
    /// 未设置 `max_iterations` 时会一直阻塞，直到其他线程把运行标志置为 false。
    pub fn wait(&mut self) -> Result<(), DriverError> {
        if let Some(handle) = self.control_thread.take()
            && handle.join().is_err()
        {
            error!("Control thread panicked");
            self.is_running.store(false, Ordering::Release);
            self.scan_tx = None;
            if let Some(ingest) = self.ingest_thread.take() {
                let _ = ingest.join_timeout(JOIN_TIMEOUT);
            }
            return Err(DriverError::ThreadJoin("control thread".to_string()));
        }
        self.stop()
    }

    /// 运行标志（交给 Ctrl+C 处理器等外部停止源）
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.is_running.clone()
    }
}

impl Drop for Roamer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Roamer shutdown error: {}", e);
        }
    }
}
