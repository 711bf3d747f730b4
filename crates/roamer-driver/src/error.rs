//! 驱动层错误类型定义

use roamer_control::ConfigError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 避障配置非法
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 控制循环配置非法
    #[error("Invalid loop config: {0}")]
    InvalidLoopConfig(String),

    /// 未设置指令输出
    #[error("Command sink not set. Call `sink()` before `build()`")]
    MissingSink,

    /// 指令通道已满（消费者跟不上）
    #[error("Command channel full")]
    ChannelFull,

    /// 通道已关闭（对端退出）
    #[error("Channel closed")]
    ChannelClosed,

    /// 指令输出失败（自定义 sink）
    #[error("Command sink error: {0}")]
    Sink(String),

    /// 线程创建失败
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// 线程 panic 或未能在超时内退出
    #[error("Thread join error: {0}")]
    ThreadJoin(String),
}
