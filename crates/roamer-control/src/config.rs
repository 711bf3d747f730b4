//! # 避障配置
//!
//! 阈值、速度和时序常量。构造控制器时一次性确定，运行期不可修改。
//!
//! ```toml
//! safe_distance = 0.7
//! min_distance = 0.3
//! forward_speed = 0.12
//!
//! [sectors]
//! front_half_width_deg = 30.0
//! ```
//!
//! 缺省字段取默认值，加载时总会执行 [`AvoidanceConfig::validate`]。

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 避障配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// 前方距离低于此值开始减速转向（米）
    pub safe_distance: f64,

    /// 前方距离低于此值立即倒车（米）
    pub min_distance: f64,

    /// 巡航线速度（m/s）
    pub forward_speed: f64,

    /// 转向角速度（rad/s）
    pub turn_speed: f64,

    /// 倒车线速度（m/s，负值）
    pub backup_speed: f64,

    /// 左右空间差超过此值才认为某一侧更空旷（米）
    pub hysteresis_margin: f64,

    /// 倒车阶段时长（秒）
    pub backup_duration: f64,

    /// 从进入倒车开始累计的转向截止时间（秒）
    ///
    /// 倒车与转向共用同一个计时器，转向阶段实际时长为
    /// `turning_cutoff - backup_duration`。
    pub turning_cutoff: f64,

    /// 控制周期（秒）
    pub tick_period: f64,

    /// 采样有效下限（米），不高于此值的采样视为噪声
    pub noise_floor: f64,

    /// 接近障碍物转向时的线速度系数
    pub approach_speed_factor: f64,

    /// 扇区划分
    pub sectors: SectorConfig,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            safe_distance: 0.7,
            min_distance: 0.3,
            forward_speed: 0.12,
            turn_speed: 0.8,
            backup_speed: -0.1,
            hysteresis_margin: 0.3,
            backup_duration: 1.5,
            turning_cutoff: 3.5,
            tick_period: 0.1,
            noise_floor: 0.1,
            approach_speed_factor: 0.3,
            sectors: SectorConfig::default(),
        }
    }
}

/// 扇区划分（度，0° 为正前方，逆时针递增）
///
/// 左右扇区为半开区间 `[start, end)`；前方扇区为 `[-half_width, half_width)`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorConfig {
    pub front_half_width_deg: f64,
    pub left_start_deg: f64,
    pub left_end_deg: f64,
    pub right_start_deg: f64,
    pub right_end_deg: f64,
}

impl Default for SectorConfig {
    fn default() -> Self {
        Self {
            front_half_width_deg: 30.0,
            left_start_deg: 60.0,
            left_end_deg: 120.0,
            right_start_deg: 240.0,
            right_end_deg: 300.0,
        }
    }
}

/// 时长换算为控制周期数（向上取整）
///
/// 先减去一个极小量，吸收 `1.5 / 0.1 = 15.000000000000002` 这类浮点误差。
pub fn ticks_for(duration: f64, tick_period: f64) -> u32 {
    let ticks = (duration / tick_period - 1e-9).ceil();
    if ticks <= 0.0 { 0 } else { ticks as u32 }
}

impl AvoidanceConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 TOML 字符串
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 倒车阶段的周期数：`ceil(backup_duration / tick_period)`
    pub fn backup_ticks(&self) -> u32 {
        ticks_for(self.backup_duration, self.tick_period)
    }

    /// 倒车 + 转向的累计周期数：`ceil(turning_cutoff / tick_period)`
    pub fn turning_cutoff_ticks(&self) -> u32 {
        ticks_for(self.turning_cutoff, self.tick_period)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("safe_distance", self.safe_distance),
            ("min_distance", self.min_distance),
            ("forward_speed", self.forward_speed),
            ("turn_speed", self.turn_speed),
            ("backup_speed", self.backup_speed),
            ("hysteresis_margin", self.hysteresis_margin),
            ("backup_duration", self.backup_duration),
            ("turning_cutoff", self.turning_cutoff),
            ("tick_period", self.tick_period),
            ("noise_floor", self.noise_floor),
            ("approach_speed_factor", self.approach_speed_factor),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::invalid(field, "must be finite"));
            }
        }

        if self.min_distance <= 0.0 {
            return Err(ConfigError::invalid("min_distance", "must be > 0"));
        }
        if self.min_distance >= self.safe_distance {
            return Err(ConfigError::invalid(
                "min_distance",
                format!(
                    "must be < safe_distance ({} >= {})",
                    self.min_distance, self.safe_distance
                ),
            ));
        }
        if self.forward_speed <= 0.0 {
            return Err(ConfigError::invalid("forward_speed", "must be > 0"));
        }
        if self.turn_speed <= 0.0 {
            return Err(ConfigError::invalid("turn_speed", "must be > 0"));
        }
        if self.backup_speed >= 0.0 {
            return Err(ConfigError::invalid(
                "backup_speed",
                "must be < 0 (reverse)",
            ));
        }
        if self.hysteresis_margin < 0.0 {
            return Err(ConfigError::invalid("hysteresis_margin", "must be >= 0"));
        }
        if self.tick_period <= 0.0 {
            return Err(ConfigError::invalid("tick_period", "must be > 0"));
        }
        if self.backup_duration <= 0.0 {
            return Err(ConfigError::invalid("backup_duration", "must be > 0"));
        }
        if self.turning_cutoff < self.backup_duration {
            return Err(ConfigError::invalid(
                "turning_cutoff",
                format!(
                    "must be >= backup_duration ({} < {})",
                    self.turning_cutoff, self.backup_duration
                ),
            ));
        }
        if self.noise_floor < 0.0 {
            return Err(ConfigError::invalid("noise_floor", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.approach_speed_factor) {
            return Err(ConfigError::invalid(
                "approach_speed_factor",
                "must be within [0, 1]",
            ));
        }

        self.sectors.validate()
    }
}

impl SectorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let half = self.front_half_width_deg;
        if !half.is_finite() || half <= 0.0 || half >= 180.0 {
            return Err(ConfigError::invalid(
                "sectors.front_half_width_deg",
                "must be within (0, 180)",
            ));
        }

        let sides = [
            ("sectors.left", self.left_start_deg, self.left_end_deg),
            ("sectors.right", self.right_start_deg, self.right_end_deg),
        ];
        for (field, start, end) in sides {
            if !start.is_finite() || !end.is_finite() {
                return Err(ConfigError::invalid(field, "bounds must be finite"));
            }
            if start < 0.0 || end > 360.0 || start >= end {
                return Err(ConfigError::invalid(
                    field,
                    format!("expected 0 <= start < end <= 360, got [{}, {})", start, end),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AvoidanceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.safe_distance, 0.7);
        assert_eq!(config.min_distance, 0.3);
        assert_eq!(config.forward_speed, 0.12);
        assert_eq!(config.turn_speed, 0.8);
        assert_eq!(config.backup_speed, -0.1);
        assert_eq!(config.hysteresis_margin, 0.3);
        assert_eq!(config.backup_duration, 1.5);
        assert_eq!(config.turning_cutoff, 3.5);
        assert_eq!(config.tick_period, 0.1);
        assert_eq!(config.sectors.front_half_width_deg, 30.0);
    }

    #[test]
    fn test_tick_counts() {
        let config = AvoidanceConfig::default();
        assert_eq!(config.backup_ticks(), 15);
        assert_eq!(config.turning_cutoff_ticks(), 35);

        // 非整数倍时向上取整
        assert_eq!(ticks_for(0.25, 0.1), 3);
        assert_eq!(ticks_for(0.0, 0.1), 0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AvoidanceConfig::from_toml_str(
            r#"
            safe_distance = 1.0

            [sectors]
            front_half_width_deg = 45.0
            "#,
        )
        .unwrap();

        assert_eq!(config.safe_distance, 1.0);
        assert_eq!(config.min_distance, 0.3);
        assert_eq!(config.sectors.front_half_width_deg, 45.0);
        assert_eq!(config.sectors.left_start_deg, 60.0);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let err = AvoidanceConfig::from_toml_str("safe_distance = 0.2").unwrap_err();
        match err {
            ConfigError::Invalid { field, .. } => assert_eq!(field, "min_distance"),
            other => panic!("Expected Invalid, got {:?}", other),
        }

        let err = AvoidanceConfig::from_toml_str("safe_distance = \"far\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: Vec<(&str, Box<dyn Fn(&mut AvoidanceConfig)>)> = vec![
            ("tick_period", Box::new(|c: &mut AvoidanceConfig| c.tick_period = 0.0)),
            ("backup_speed", Box::new(|c: &mut AvoidanceConfig| c.backup_speed = 0.1)),
            ("turning_cutoff", Box::new(|c: &mut AvoidanceConfig| c.turning_cutoff = 1.0)),
            ("forward_speed", Box::new(|c: &mut AvoidanceConfig| c.forward_speed = f64::NAN)),
            ("approach_speed_factor", Box::new(|c: &mut AvoidanceConfig| c.approach_speed_factor = 1.5)),
            (
                "sectors.front_half_width_deg",
                Box::new(|c: &mut AvoidanceConfig| c.sectors.front_half_width_deg = 0.0),
            ),
            ("sectors.left", Box::new(|c: &mut AvoidanceConfig| c.sectors.left_end_deg = 30.0)),
            ("sectors.right", Box::new(|c: &mut AvoidanceConfig| c.sectors.right_end_deg = 400.0)),
        ];

        for (expected, mutate) in cases {
            let mut config = AvoidanceConfig::default();
            mutate(&mut config);
            match config.validate() {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
                other => panic!("{}: expected Invalid, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roamer.toml");

        let mut config = AvoidanceConfig::default();
        config.forward_speed = 0.2;
        config.sectors.left_start_deg = 45.0;
        config.save_to_file(&path).unwrap();

        let loaded = AvoidanceConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = AvoidanceConfig::load_from_file("/nonexistent/roamer.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
