//! 转向决策
//!
//! 根据扇区摘要选择转向方向。左右空间差距在迟滞阈值以内时，
//! 由注入的 [`TurnSource`] 随机决定，这是系统中唯一的非确定性决策。
//!
//! # 可复现性
//!
//! 随机源必须显式注入，不使用任何全局随机数生成器：
//!
//! ```
//! use roamer_control::policy::{choose_turn, FixedTurn, TurnDirection};
//! use roamer_control::sector::SectorSummary;
//!
//! let summary = SectorSummary::from_distances(0.5, 0.9, 0.9, 0.3);
//! let mut source = FixedTurn(TurnDirection::Left);
//! assert_eq!(choose_turn(&summary, &mut source), TurnDirection::Left);
//! ```

use crate::sector::{SectorSummary, SideBalance};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 转向方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    /// 向左（逆时针，角速度为正）
    Left,
    /// 向右（顺时针，角速度为负）
    Right,
}

impl TurnDirection {
    /// 角速度符号：左 +1，右 -1
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            TurnDirection::Left => 1.0,
            TurnDirection::Right => -1.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TurnDirection::Left => "left",
            TurnDirection::Right => "right",
        }
    }
}

/// 平局时的随机方向来源
///
/// 实现必须是非阻塞的：每个控制周期最多调用一次。
pub trait TurnSource: Send {
    /// 等概率给出一个方向
    fn pick(&mut self) -> TurnDirection;
}

impl<T: TurnSource + ?Sized> TurnSource for Box<T> {
    fn pick(&mut self) -> TurnDirection {
        (**self).pick()
    }
}

/// 基于可设种子的 `StdRng` 的随机来源（默认实现）
#[derive(Debug, Clone)]
pub struct SeededTurns {
    rng: StdRng,
}

impl SeededTurns {
    /// 固定种子，结果可复现
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 从操作系统熵源初始化
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for SeededTurns {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl TurnSource for SeededTurns {
    fn pick(&mut self) -> TurnDirection {
        if self.rng.gen_bool(0.5) {
            TurnDirection::Left
        } else {
            TurnDirection::Right
        }
    }
}

/// 总是给出同一方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTurn(pub TurnDirection);

impl TurnSource for FixedTurn {
    fn pick(&mut self) -> TurnDirection {
        self.0
    }
}

/// 按固定序列循环给出方向
#[derive(Debug, Clone)]
pub struct ScriptedTurns {
    script: Vec<TurnDirection>,
    cursor: usize,
}

impl ScriptedTurns {
    /// 空序列退化为总是向左
    pub fn new(script: Vec<TurnDirection>) -> Self {
        Self { script, cursor: 0 }
    }

    /// 已经给出的方向数
    pub fn picks(&self) -> usize {
        self.cursor
    }
}

impl TurnSource for ScriptedTurns {
    fn pick(&mut self) -> TurnDirection {
        let direction = if self.script.is_empty() {
            TurnDirection::Left
        } else {
            self.script[self.cursor % self.script.len()]
        };
        self.cursor += 1;
        direction
    }
}

/// 选择转向方向
///
/// 只有 `equal` 时才会消耗随机源。
pub fn choose_turn<S: TurnSource + ?Sized>(summary: &SectorSummary, source: &mut S) -> TurnDirection {
    match summary.balance {
        SideBalance::LeftBetter => TurnDirection::Left,
        SideBalance::RightBetter => TurnDirection::Right,
        SideBalance::Equal => source.pick(),
    }
}

/// 持有随机源的转向策略
#[derive(Debug, Clone)]
pub struct DirectionPolicy<S> {
    source: S,
}

impl<S: TurnSource> DirectionPolicy<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn choose_turn(&mut self, summary: &SectorSummary) -> TurnDirection {
        choose_turn(summary, &mut self.source)
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(left: f64, right: f64) -> SectorSummary {
        SectorSummary::from_distances(0.5, left, right, 0.3)
    }

    #[test]
    fn test_sign() {
        assert_eq!(TurnDirection::Left.sign(), 1.0);
        assert_eq!(TurnDirection::Right.sign(), -1.0);
    }

    #[test]
    fn test_clear_side_wins_without_consuming_source() {
        let mut source = ScriptedTurns::new(vec![TurnDirection::Right]);
        assert_eq!(choose_turn(&summary(1.2, 0.5), &mut source), TurnDirection::Left);
        assert_eq!(choose_turn(&summary(0.5, 1.2), &mut source), TurnDirection::Right);
        assert_eq!(source.picks(), 0);
    }

    #[test]
    fn test_tie_uses_injected_source() {
        let mut policy = DirectionPolicy::new(FixedTurn(TurnDirection::Left));
        let tie = summary(0.9, 0.9);
        assert!(tie.equal());
        assert_eq!(policy.choose_turn(&tie), TurnDirection::Left);
        assert_eq!(policy.choose_turn(&tie).sign(), 1.0);

        let mut policy = DirectionPolicy::new(FixedTurn(TurnDirection::Right));
        assert_eq!(policy.choose_turn(&tie), TurnDirection::Right);
    }

    #[test]
    fn test_scripted_turns_cycle() {
        let mut source = ScriptedTurns::new(vec![TurnDirection::Left, TurnDirection::Right]);
        let picks: Vec<_> = (0..4).map(|_| source.pick()).collect();
        assert_eq!(
            picks,
            vec![
                TurnDirection::Left,
                TurnDirection::Right,
                TurnDirection::Left,
                TurnDirection::Right
            ]
        );
        assert_eq!(ScriptedTurns::new(Vec::new()).pick(), TurnDirection::Left);
    }

    #[test]
    fn test_seeded_turns_are_reproducible() {
        let mut a = SeededTurns::new(7);
        let mut b = SeededTurns::new(7);
        let seq_a: Vec<_> = (0..64).map(|_| a.pick()).collect();
        let seq_b: Vec<_> = (0..64).map(|_| b.pick()).collect();
        assert_eq!(seq_a, seq_b);

        // 64 次等概率抽样不应全部相同
        assert!(seq_a.contains(&TurnDirection::Left));
        assert!(seq_a.contains(&TurnDirection::Right));
    }

    #[test]
    fn test_boxed_source() {
        let mut source: Box<dyn TurnSource> = Box::new(FixedTurn(TurnDirection::Right));
        assert_eq!(choose_turn(&summary(0.9, 0.9), &mut source), TurnDirection::Right);
    }
}
