//! 二维仿真环境
//!
//! 矩形房间 + 轴对齐箱体障碍物，360 线激光雷达，独轮车运动学。
//! 只用于 `run` 命令演示控制器，不追求物理精度。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roamer_sdk::{RangeScan, VelocityCommand};
use std::f64::consts::{PI, TAU};

/// 机器人半径（米）
pub const ROBOT_RADIUS: f64 = 0.17;

/// 轴对齐箱体
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Obstacle {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// 射线与箱体的相交距离（slab 方法），不相交时为 `None`
    fn ray_hit(&self, ox: f64, oy: f64, dx: f64, dy: f64) -> Option<f64> {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;

        for (origin, dir, lo, hi) in [(ox, dx, self.min_x, self.max_x), (oy, dy, self.min_y, self.max_y)] {
            if dir.abs() < 1e-12 {
                if origin < lo || origin > hi {
                    return None;
                }
            } else {
                let t1 = (lo - origin) / dir;
                let t2 = (hi - origin) / dir;
                t_min = t_min.max(t1.min(t2));
                t_max = t_max.min(t1.max(t2));
            }
        }

        if t_max < t_min.max(0.0) {
            None
        } else {
            Some(t_min.max(0.0))
        }
    }

    /// 圆与箱体是否重叠
    fn overlaps_circle(&self, x: f64, y: f64, radius: f64) -> bool {
        let cx = x.clamp(self.min_x, self.max_x);
        let cy = y.clamp(self.min_y, self.max_y);
        (x - cx).powi(2) + (y - cy).powi(2) < radius * radius
    }
}

/// 机器人位姿
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    /// 朝向（弧度，逆时针为正）
    pub theta: f64,
}

/// 仿真世界
#[derive(Debug, Clone)]
pub struct World {
    pub width: f64,
    pub height: f64,
    pub obstacles: Vec<Obstacle>,
    pub pose: Pose,
    /// 雷达线数
    pub beams: usize,
    pub range_min: f32,
    pub range_max: f32,
    /// 测距噪声幅度（均匀分布，米）
    pub noise: f32,
    rng: StdRng,
    /// 行驶里程
    pub distance: f64,
    /// 被墙或障碍物挡住的步数
    pub collisions: u64,
}

impl World {
    /// 空房间，机器人位于中心朝向 +x
    pub fn empty(width: f64, height: f64, seed: u64) -> Self {
        Self {
            width,
            height,
            obstacles: Vec::new(),
            pose: Pose {
                x: width / 2.0,
                y: height / 2.0,
                theta: 0.0,
            },
            beams: 360,
            range_min: 0.12,
            range_max: 8.0,
            noise: 0.0,
            rng: StdRng::seed_from_u64(seed),
            distance: 0.0,
            collisions: 0,
        }
    }

    /// 随机放置 `count` 个箱体，与起点保持至少 1 米距离
    pub fn random(width: f64, height: f64, count: usize, seed: u64) -> Self {
        let mut world = Self::empty(width, height, seed);
        world.noise = 0.01;

        let start = world.pose;
        let mut attempts = 0;
        while world.obstacles.len() < count && attempts < count * 50 {
            attempts += 1;
            let w = world.rng.gen_range(0.3..0.8);
            let h = world.rng.gen_range(0.3..0.8);
            let x = world.rng.gen_range(0.2..(width - w - 0.2));
            let y = world.rng.gen_range(0.2..(height - h - 0.2));
            let obstacle = Obstacle::new(x, y, x + w, y + h);
            if !obstacle.overlaps_circle(start.x, start.y, 1.0) {
                world.obstacles.push(obstacle);
            }
        }
        world
    }

    /// 沿 `angle` 方向（世界坐标）的测距
    fn cast(&self, angle: f64) -> f64 {
        let (dy, dx) = angle.sin_cos();
        let Pose { x, y, .. } = self.pose;

        let mut best = f64::INFINITY;
        if dx > 0.0 {
            best = best.min((self.width - x) / dx);
        } else if dx < 0.0 {
            best = best.min(-x / dx);
        }
        if dy > 0.0 {
            best = best.min((self.height - y) / dy);
        } else if dy < 0.0 {
            best = best.min(-y / dy);
        }

        for obstacle in &self.obstacles {
            if let Some(t) = obstacle.ray_hit(x, y, dx, dy) {
                best = best.min(t);
            }
        }
        best
    }

    /// 生成一帧扫描：索引 0 为正前方，逆时针递增；超出量程为无穷大
    pub fn scan(&mut self) -> RangeScan {
        let step = TAU / self.beams as f64;
        let mut ranges: Vec<f32> = (0..self.beams)
            .map(|i| self.cast(self.pose.theta + i as f64 * step) as f32)
            .collect();

        for d in ranges.iter_mut() {
            if *d >= self.range_max {
                *d = f32::INFINITY;
            } else if self.noise > 0.0 {
                *d += self.rng.gen_range(-self.noise..=self.noise);
            }
        }
        RangeScan::new(ranges, self.range_min, self.range_max)
    }

    /// 机器人位于 (x, y) 时是否与环境碰撞
    pub fn collides(&self, x: f64, y: f64) -> bool {
        x < ROBOT_RADIUS
            || y < ROBOT_RADIUS
            || x > self.width - ROBOT_RADIUS
            || y > self.height - ROBOT_RADIUS
            || self
                .obstacles
                .iter()
                .any(|o| o.overlaps_circle(x, y, ROBOT_RADIUS))
    }

    /// 按速度指令积分 `dt` 秒；会碰撞时只转向不平移
    pub fn advance(&mut self, command: VelocityCommand, dt: f64) {
        let theta = self.pose.theta;
        let nx = self.pose.x + command.linear * theta.cos() * dt;
        let ny = self.pose.y + command.linear * theta.sin() * dt;

        if self.collides(nx, ny) {
            self.collisions += 1;
        } else {
            self.distance += (nx - self.pose.x).hypot(ny - self.pose.y);
            self.pose.x = nx;
            self.pose.y = ny;
        }

        self.pose.theta = normalize_angle(theta + command.angular * dt);
    }
}

/// 归一化到 (-π, π]
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a > PI { a - TAU } else { a }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_in_empty_room() {
        let mut world = World::empty(4.0, 6.0, 0);
        let scan = world.scan();
        assert_eq!(scan.len(), 360);

        // 前方（+x）距墙 2 米，左侧（+y）3 米
        assert!((scan.ranges[0] - 2.0).abs() < 1e-4);
        assert!((scan.ranges[90] - 3.0).abs() < 1e-4);
        assert!((scan.ranges[180] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_out_of_range_is_infinite() {
        let mut world = World::empty(20.0, 4.0, 0);
        let scan = world.scan();
        assert!(scan.ranges[0].is_infinite());
        assert!(scan.ranges[90].is_finite());
    }

    #[test]
    fn test_obstacle_hit() {
        let mut world = World::empty(6.0, 6.0, 0);
        world.obstacles.push(Obstacle::new(3.5, 2.5, 4.0, 3.5));
        let scan = world.scan();
        assert!((scan.ranges[0] - 0.5).abs() < 1e-4);
        // 右侧不受影响
        assert!((scan.ranges[270] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_advance_and_collision() {
        let mut world = World::empty(6.0, 6.0, 0);
        world.advance(VelocityCommand::new(0.1, 0.0), 1.0);
        assert!((world.pose.x - 3.1).abs() < 1e-9);
        assert!((world.distance - 0.1).abs() < 1e-9);

        world.pose.x = 6.0 - ROBOT_RADIUS - 0.01;
        world.advance(VelocityCommand::new(0.1, 0.0), 1.0);
        assert_eq!(world.collisions, 1);
        assert!((world.pose.x - (6.0 - ROBOT_RADIUS - 0.01)).abs() < 1e-9);

        world.advance(VelocityCommand::new(0.0, PI / 2.0), 1.0);
        assert!((world.pose.theta - PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_random_world_keeps_start_clear() {
        let world = World::random(6.0, 6.0, 8, 42);
        assert!(!world.obstacles.is_empty());
        assert!(!world.collides(world.pose.x, world.pose.y));

        let again = World::random(6.0, 6.0, 8, 42);
        assert_eq!(world.obstacles, again.obstacles);
    }

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(2.5 * PI) - PI / 2.0).abs() < 1e-9);
        assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-9);
    }
}
