//! # Roamer Protocol
//!
//! 避障控制器与外部协作方之间交换的数据类型（无硬件依赖）
//!
//! ## 模块
//!
//! - `scan`: 激光雷达扫描快照（`RangeScan`）
//! - `command`: 速度指令（`VelocityCommand`）
//! - `codec`: JSON Lines 编解码（需要 `serde` feature）
//!
//! ## 坐标约定
//!
//! 扫描索引 0 指向机器人正前方，索引按逆时针方向递增（左侧为 +90°）。
//! 角速度为正表示逆时针（向左）转动。

pub mod command;
pub mod scan;

#[cfg(feature = "serde")]
pub mod codec;

// 重新导出常用类型
pub use command::VelocityCommand;
pub use scan::RangeScan;

use thiserror::Error;

/// 协议层错误类型
///
/// 只在解码不可信输入（文件、网络）时产生。
/// 控制核心本身从不因为扫描数据异常而报错。
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid range_max: {value} (must be finite and > 0)")]
    InvalidRangeMax { value: f32 },

    #[error("Invalid range_min: {value} (must be finite and < range_max)")]
    InvalidRangeMin { value: f32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[cfg(feature = "serde")]
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidRangeMax { value: -1.0 };
        assert!(format!("{}", err).contains("range_max"));

        let err = ProtocolError::ParseError {
            line: 3,
            message: "expected value".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("line 3") && msg.contains("expected value"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_encode_error_display() {
        let err: ProtocolError = serde_json::from_str::<u8>("x").unwrap_err().into();
        assert!(matches!(err, ProtocolError::Encode(_)));
        assert!(format!("{}", err).starts_with("Encode error"));
    }
}
