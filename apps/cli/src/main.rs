//! # Roamer CLI
//!
//! 激光雷达反应式避障的命令行工具。
//!
//! ```bash
//! # 在仿真房间里漫游 60 秒，4 倍速
//! roamer-cli run --duration 60 --speed 4
//!
//! # 离线回放扫描文件，输出每帧指令
//! roamer-cli replay scans.jsonl --seed 7
//!
//! # 生成、查看和校验配置
//! roamer-cli config default --output ~/.config/roamer/config.toml
//! roamer-cli config show
//! roamer-cli config check
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod sim;

use commands::{ConfigCommand, ReplayCommand, RunCommand};

/// Roamer CLI - 反应式避障命令行工具
#[derive(Parser, Debug)]
#[command(name = "roamer-cli")]
#[command(about = "Reactive lidar obstacle avoidance for mobile robots", long_about = None)]
#[command(version)]
struct Cli {
    /// 默认日志级别（`RUST_LOG` 优先）
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 在内置仿真环境中运行避障
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 回放扫描文件
    Replay {
        #[command(flatten)]
        args: ReplayCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志（输出到 stderr）
    roamer_sdk::init_logger(&cli.log_level)?;

    match cli.command {
        Commands::Run { args } => args.execute(),
        Commands::Replay { args } => args.execute(),
        Commands::Config(cmd) => cmd.execute(),
    }
}
