//! FAST 拥塞控制
//!
//! 以时延为信号：窗口朝"链路里恰好排队 alpha 个包"的均衡点平滑收敛，
//! 每个 ACK 更新一次；增长被 2x 封顶，丢包时对半退让。

use super::cc::{CongestionControl, LossKind};
use crate::sim::SimTime;

/// 均衡排队包数
const DEFAULT_ALPHA: f64 = 50.0;
/// 平滑系数 γ ∈ (0, 1]
const DEFAULT_GAMMA: f64 = 0.5;

#[derive(Debug)]
pub struct Fast {
    window: f64,
    alpha: f64,
    gamma: f64,
    min_rtt: Option<SimTime>,
    last_rtt: Option<SimTime>,
}

impl Default for Fast {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA, DEFAULT_GAMMA)
    }
}

impl Fast {
    pub fn new(alpha: f64, gamma: f64) -> Self {
        Self {
            window: 1.0,
            alpha,
            gamma,
            min_rtt: None,
            last_rtt: None,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn last_rtt(&self) -> Option<SimTime> {
        self.last_rtt
    }
}

impl CongestionControl for Fast {
    fn window(&self) -> f64 {
        self.window
    }

    fn on_ack(&mut self, rtt: SimTime) {
        let min = self.min_rtt.map_or(rtt, |m| m.min(rtt));
        self.min_rtt = Some(min);
        self.last_rtt = Some(rtt);

        let ratio = if rtt.0 == 0 {
            1.0
        } else {
            min.as_secs_f64() / rtt.as_secs_f64()
        };
        let w = self.window;
        let target = (1.0 - self.gamma) * w + self.gamma * (ratio * w + self.alpha);
        self.window = target.min(2.0 * w).max(1.0);
    }

    fn on_drop(&mut self, _kind: LossKind) {
        // FAST 主要依赖时延信号，但丢包仍然对半退让兜底
        self.window = (self.window / 2.0).max(1.0);
    }

    fn min_rtt(&self) -> Option<SimTime> {
        self.min_rtt
    }

    fn name(&self) -> &'static str {
        "fast"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
