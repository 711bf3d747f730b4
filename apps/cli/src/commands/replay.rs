//! replay 命令
//!
//! 离线回放扫描文件：每行一帧扫描，同步推进一个控制周期，每行输出一条 JSON 指令。

use anyhow::{Context, Result};
use clap::Args;
use roamer_sdk::control::{MotionController, SeededTurns};
use roamer_sdk::protocol::codec::ScanReader;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

use super::config::load_config;

/// 回放命令参数
#[derive(Args, Debug)]
pub struct ReplayCommand {
    /// 扫描文件路径（JSON Lines，`-` 表示 stdin）
    pub input: PathBuf,

    /// 随机种子（平局转向可复现）
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// 配置文件路径（覆盖默认路径）
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// 每个周期的输出记录
#[derive(Debug, Serialize)]
struct ReplayRecord {
    line: usize,
    linear: f64,
    angular: f64,
    state: &'static str,
    phase_timer: f64,
    front: f64,
    left: f64,
    right: f64,
}

impl ReplayCommand {
    pub fn execute(&self) -> Result<()> {
        let (config, _) = load_config(self.config.as_deref())?;

        let reader: Box<dyn BufRead> = if self.input.as_os_str() == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            let file = File::open(&self.input)
                .with_context(|| format!("❌ 无法打开扫描文件: {}", self.input.display()))?;
            Box::new(BufReader::new(file))
        };

        let mut controller = MotionController::try_new(config, SeededTurns::new(self.seed))?;
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());

        let mut reader = ScanReader::new(reader);
        let mut frames = 0usize;
        while let Some(scan) = reader.next() {
            let scan = scan.with_context(|| format!("第 {} 行解析失败", reader.line_no()))?;
            let outcome = controller.evaluate(&scan);
            frames += 1;

            let record = ReplayRecord {
                line: reader.line_no(),
                linear: outcome.command.linear,
                angular: outcome.command.angular,
                state: outcome.state.name(),
                phase_timer: controller.phase_timer(),
                front: outcome.summary.front_min,
                left: outcome.summary.left_min,
                right: outcome.summary.right_min,
            };
            serde_json::to_writer(&mut out, &record)?;
            writeln!(out)?;
        }
        out.flush()?;

        info!(frames, "Replay finished");
        Ok(())
    }
}
