//! 控制层错误类型定义

use thiserror::Error;

/// 配置错误
///
/// 控制核心在运行期不会产生错误：异常扫描数据在扇区分析中被就地消化。
/// 错误只出现在配置加载和校验阶段。
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 读写配置文件失败
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 解析失败
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML 序列化失败
    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// 字段取值非法
    #[error("Invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("tick_period", "must be > 0");
        assert_eq!(
            format!("{}", err),
            "Invalid config field `tick_period`: must be > 0"
        );

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ConfigError = io.into();
        assert!(format!("{}", err).contains("missing"));
    }
}
