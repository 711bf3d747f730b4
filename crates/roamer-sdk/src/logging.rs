//! 日志初始化
//!
//! 库 crate 只产生 `tracing` 事件，由可执行程序调用 [`init_logger`] 安装订阅者。

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;

/// 日志初始化错误
#[derive(Error, Debug)]
pub enum LoggerError {
    /// 默认过滤指令无法解析
    #[error("Invalid log directive: {0}")]
    Directive(#[from] tracing_subscriber::filter::ParseError),

    /// 全局订阅者已经安装
    #[error("Global tracing subscriber already set: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// `log` 桥接已经安装
    #[error("Log bridge already set: {0}")]
    LogBridge(#[from] tracing_log::log::SetLoggerError),
}

/// 安装全局 `fmt` 订阅者
///
/// - 优先使用 `RUST_LOG` 环境变量，未设置时使用 `default_directive`（如 `"info"`）
/// - 同时把 `log` crate 的记录转发到 `tracing`
/// - 输出到 stderr，stdout 留给命令输出
///
/// 重复调用返回错误而不是 panic。
pub fn init_logger(default_directive: &str) -> Result<(), LoggerError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)?,
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        );

    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_twice_returns_error() {
        // 同一进程内只有第一次成功
        let first = init_logger("debug");
        let second = init_logger("debug");
        assert!(first.is_ok());
        assert!(second.is_err());
    }
}
