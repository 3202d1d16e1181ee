//! TCP Reno 拥塞控制
//!
//! 慢启动 / 拥塞避免 / 快速恢复三相状态机，窗口以包为单位。

use super::cc::{CongestionControl, LossKind};
use crate::sim::SimTime;

/// 初始慢启动阈值（包）
const DEFAULT_SSTHRESH: f64 = 1200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenoPhase {
    SlowStart,
    CongestionAvoidance,
    FastRecovery,
}

#[derive(Debug)]
pub struct Reno {
    window: f64,
    ssthresh: f64,
    phase: RenoPhase,
    min_rtt: Option<SimTime>,
}

impl Default for Reno {
    fn default() -> Self {
        Self::with_ssthresh(DEFAULT_SSTHRESH)
    }
}

impl Reno {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ssthresh(ssthresh: f64) -> Self {
        Self {
            window: 1.0,
            ssthresh,
            phase: RenoPhase::SlowStart,
            min_rtt: None,
        }
    }

    pub fn phase(&self) -> RenoPhase {
        self.phase
    }

    pub fn ssthresh(&self) -> f64 {
        self.ssthresh
    }
}

impl CongestionControl for Reno {
    fn window(&self) -> f64 {
        self.window
    }

    fn on_ack(&mut self, rtt: SimTime) {
        self.min_rtt = Some(self.min_rtt.map_or(rtt, |m| m.min(rtt)));
        match self.phase {
            RenoPhase::SlowStart => {
                self.window += 1.0;
                if self.window >= self.ssthresh {
                    self.phase = RenoPhase::CongestionAvoidance;
                }
            }
            RenoPhase::CongestionAvoidance => {
                self.window += 1.0 / self.window;
            }
            RenoPhase::FastRecovery => {
                // 新 ACK：窗口回落到 ssthresh，退出快速恢复
                self.window = self.ssthresh;
                self.phase = RenoPhase::CongestionAvoidance;
            }
        }
    }

    fn on_dup_ack(&mut self) {
        // 快速恢复期间，每个额外的重复 ACK 把窗口充气 1 个包
        if self.phase == RenoPhase::FastRecovery {
            self.window += 1.0;
        }
    }

    fn on_drop(&mut self, kind: LossKind) {
        match kind {
            LossKind::TripleDupAck => {
                self.ssthresh = (self.window / 2.0).max(1.0);
                self.window = self.ssthresh + 3.0;
                self.phase = RenoPhase::FastRecovery;
            }
            LossKind::Timeout => {
                self.ssthresh = (self.window / 2.0).max(1.0);
                self.window = 1.0;
                self.phase = RenoPhase::SlowStart;
            }
        }
    }

    fn min_rtt(&self) -> Option<SimTime> {
        self.min_rtt
    }

    fn name(&self) -> &'static str {
        "reno"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
