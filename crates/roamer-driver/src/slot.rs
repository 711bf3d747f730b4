//! 最新扫描槽
//!
//! 扫描投递与控制周期之间唯一的共享单元：写入方原子替换，读取方原子加载。
//! 后写入者覆盖先写入者，不排队。

use arc_swap::ArcSwapOption;
use roamer_protocol::RangeScan;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 带序号的扫描
///
/// 序号与扫描一起替换，读取方拿到的一定是同一次写入的两者。
#[derive(Debug, Clone)]
pub struct SequencedScan {
    /// 写入序号（从 1 开始）
    pub sequence: u64,
    pub scan: Arc<RangeScan>,
}

/// 单槽扫描快照
///
/// # 性能特性
///
/// - `publish`：一次原子自增 + 一次 `ArcSwap::store`，无锁
/// - `latest`：一次 `ArcSwap::load_full`，Wait-Free
#[derive(Debug, Default)]
pub struct ScanSlot {
    latest: ArcSwapOption<SequencedScan>,
    sequence: AtomicU64,
}

impl ScanSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入新扫描，返回写入后的序号（从 1 开始）
    pub fn publish(&self, scan: RangeScan) -> u64 {
        self.publish_arc(Arc::new(scan))
    }

    /// 写入已共享的扫描
    pub fn publish_arc(&self, scan: Arc<RangeScan>) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        self.latest
            .store(Some(Arc::new(SequencedScan { sequence, scan })));
        sequence
    }

    /// 读取最新扫描及其序号（从未写入时为 `None`）
    pub fn latest_sequenced(&self) -> Option<Arc<SequencedScan>> {
        self.latest.load_full()
    }

    /// 读取最新扫描（从未写入时为 `None`）
    pub fn latest(&self) -> Option<Arc<RangeScan>> {
        self.latest_sequenced().map(|entry| entry.scan.clone())
    }

    /// 已写入的扫描总数
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// 清空槽（序号不回退）
    pub fn clear(&self) {
        self.latest.store(None);
    }
}
