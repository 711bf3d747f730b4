//! 配置管理命令
//!
//! 避障参数保存在 `<config_dir>/roamer/config.toml`，可以用 `--config` 覆盖。

use anyhow::{Context, Result};
use clap::Subcommand;
use roamer_sdk::AvoidanceConfig;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("roamer");
    path.push("config.toml");
    Ok(path)
}

/// 加载生效的配置
///
/// - 显式路径：文件必须存在
/// - 否则使用默认路径（存在时）
/// - 都没有时使用内置默认值
///
/// 返回配置和实际读取的文件路径。
pub fn load_config(explicit: Option<&Path>) -> Result<(AvoidanceConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let config = AvoidanceConfig::load_from_file(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display()))?;
        return Ok((config, Some(path.to_path_buf())));
    }

    if let Ok(path) = default_config_file()
        && path.exists()
    {
        let config = AvoidanceConfig::load_from_file(&path)
            .with_context(|| format!("加载配置文件失败: {}", path.display()))?;
        return Ok((config, Some(path)));
    }

    Ok((AvoidanceConfig::default(), None))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 输出默认配置（TOML）
    Default {
        /// 写入文件而不是 stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 显示当前生效的配置
    Show {
        /// 配置文件路径（覆盖默认路径）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 校验配置文件
    Check {
        /// 配置文件路径（默认为 `<config_dir>/roamer/config.toml`）
        path: Option<PathBuf>,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Default { output } => Self::default_(output),
            ConfigCommand::Show { config } => Self::show_(config),
            ConfigCommand::Check { path } => Self::check_(path),
        }
    }

    fn default_(output: Option<PathBuf>) -> Result<()> {
        let config = AvoidanceConfig::default();
        match output {
            Some(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent).context("创建配置目录失败")?;
                }
                config
                    .save_to_file(&path)
                    .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
                println!("✅ 已写入默认配置: {}", path.display());
            },
            None => {
                print!("{}", config.to_toml_string()?);
            },
        }
        Ok(())
    }

    fn show_(config: Option<PathBuf>) -> Result<()> {
        let (config, source) = load_config(config.as_deref())?;
        match source {
            Some(path) => println!("# source: {}", path.display()),
            None => println!("# source: built-in defaults"),
        }
        println!(
            "# backup: {} ticks, backup + turn: {} ticks",
            config.backup_ticks(),
            config.turning_cutoff_ticks()
        );
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn check_(path: Option<PathBuf>) -> Result<()> {
        let path = match path {
            Some(path) => path,
            None => default_config_file()?,
        };
        if !path.exists() {
            anyhow::bail!("❌ 配置文件不存在: {}", path.display());
        }

        match AvoidanceConfig::load_from_file(&path) {
            Ok(_) => {
                println!("✅ 配置有效: {}", path.display());
                Ok(())
            },
            Err(e) => Err(anyhow::anyhow!("❌ 配置无效: {}: {}", path.display(), e)),
        }
    }
}
