//! run 命令
//!
//! 在内置二维仿真环境中运行完整的避障运行时（后台线程 + 扫描槽 + 安全停止）。

use anyhow::Result;
use clap::Args;
use roamer_sdk::driver::{ChannelSink, LoopConfig};
use roamer_sdk::{RoamerBuilder, VelocityCommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::config::load_config;
use crate::sim::World;

/// 仿真运行参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 仿真时长（秒，仿真时间）
    #[arg(short, long, default_value_t = 30.0)]
    pub duration: f64,

    /// 随机种子（障碍物布局、测距噪声和平局转向）
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// 配置文件路径（覆盖默认路径）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 障碍物数量
    #[arg(long, default_value_t = 6)]
    pub obstacles: usize,

    /// 房间边长（米）
    #[arg(long, default_value_t = 6.0)]
    pub room: f64,

    /// 仿真加速倍数（1.0 = 实时）
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,
}

impl RunCommand {
    pub fn execute(&self) -> Result<()> {
        // === 1. 参数检查 ===

        const MAX_SPEED_FACTOR: f64 = 100.0;

        if !(self.duration.is_finite() && self.duration > 0.0) {
            anyhow::bail!("❌ 仿真时长必须为正数，当前: {}", self.duration);
        }
        if !(self.speed > 0.0 && self.speed <= MAX_SPEED_FACTOR) {
            anyhow::bail!(
                "❌ 加速倍数必须在 (0, {}] 范围内，当前: {}",
                MAX_SPEED_FACTOR,
                self.speed
            );
        }
        if !(self.room.is_finite() && self.room >= 3.0) {
            anyhow::bail!("❌ 房间边长至少 3 米，当前: {}", self.room);
        }

        let (config, source) = load_config(self.config.as_deref())?;
        if let Some(path) = &source {
            info!("Using config {}", path.display());
        }

        // === 2. 仿真环境与运行时 ===

        let mut world = World::random(self.room, self.room, self.obstacles, self.seed);
        let sim_dt = config.tick_period / 2.0;
        let wall_dt = Duration::from_secs_f64(sim_dt / self.speed);
        let steps = (self.duration / sim_dt).ceil() as u64;

        let (sink, commands) = ChannelSink::bounded(1024);
        let loop_config = LoopConfig {
            tick_period: Duration::from_secs_f64(config.tick_period / self.speed),
            ..LoopConfig::default()
        };
        let mut roamer = RoamerBuilder::new()
            .config(config)
            .loop_config(loop_config)
            .seed(self.seed)
            .sink(sink)
            .build()?;

        // Ctrl+C 只设置标志，由主循环负责安全停止
        let interrupted = Arc::new(AtomicBool::new(false));
        {
            let interrupted = interrupted.clone();
            ctrlc::set_handler(move || {
                interrupted.store(true, Ordering::SeqCst);
            })?;
        }

        println!("🤖 仿真开始");
        println!(
            "   房间: {:.1} x {:.1} m, 障碍物: {}, 种子: {}",
            world.width,
            world.height,
            world.obstacles.len(),
            self.seed
        );
        println!("   时长: {:.1} s (x{:.1})", self.duration, self.speed);
        println!();

        // === 3. 主循环：积分 -> 扫描 -> 提交 ===

        let started = Instant::now();
        let mut command = VelocityCommand::STOP;
        let mut executed = 0u64;

        for step in 0..steps {
            if interrupted.load(Ordering::SeqCst) {
                warn!("Interrupted, stopping");
                break;
            }

            // 执行器总是使用最新一条指令
            if let Some(latest) = commands.try_iter().last() {
                command = latest;
            }

            world.advance(command, sim_dt);
            roamer.submit_scan(world.scan());
            executed = step + 1;

            let deadline = started + wall_dt.mul_f64((step + 1) as f64);
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
        }

        // === 4. 安全停止 ===

        roamer.stop()?;
        let final_command = commands.try_iter().last();
        let snapshot = roamer.snapshot();
        let metrics = roamer.metrics();

        println!("📊 仿真结果:");
        println!("  仿真时间: {:.1} s", executed as f64 * sim_dt);
        println!("  行驶里程: {:.2} m", world.distance);
        println!("  碰撞步数: {}", world.collisions);
        println!(
            "  最终位姿: ({:.2}, {:.2}, {:.0}°)",
            world.pose.x,
            world.pose.y,
            world.pose.theta.to_degrees()
        );
        println!("  最终状态: {}", snapshot.state_name());
        println!("  控制周期: {}", metrics.ticks);
        println!("  空闲周期: {}", metrics.idle_ticks);
        println!("  复用扫描: {} ({:.1}%)", metrics.stale_ticks, metrics.stale_rate());
        println!("  输出指令: {}", metrics.commands_published);
        println!("  输出失败: {}", metrics.sink_errors);
        println!("  周期超时: {}", metrics.overruns);
        match final_command {
            Some(cmd) if cmd.is_stop() => println!("✅ 已发送零速指令"),
            _ => println!("⚠️  未确认零速指令"),
        }

        Ok(())
    }
}
