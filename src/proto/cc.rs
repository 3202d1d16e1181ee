//! 拥塞控制策略抽象
//!
//! 所有流共享的能力集；具体算法（Reno / FAST）在各自模块中实现，
//! 由流通过 trait 对象持有。

use std::any::Any;
use std::fmt;

use crate::sim::SimTime;

/// 每包重传超时的下限
const TIMEOUT_FLOOR: SimTime = SimTime(1_000_000_000);

/// 丢包的判定方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    /// 超过每包超时仍未收到 ACK
    Timeout,
    /// 连续三个携带相同 expected_seq_no 的 ACK
    TripleDupAck,
}

/// 拥塞控制器能力集
///
/// ACK / 重复 ACK / 重传的簿记由流负责并在此回调；
/// 控制器只维护窗口和由 RTT 推导的超时。
pub trait CongestionControl: fmt::Debug + Send {
    /// 当前窗口（以包为单位），恒 >= 1.0
    fn window(&self) -> f64;

    /// 一个新的累计 ACK 确认了一个在途包
    fn on_ack(&mut self, rtt: SimTime);

    /// 第三个之后的重复 ACK（Reno 快速恢复期间据此充气）
    fn on_dup_ack(&mut self) {}

    /// 一个包被判定丢失
    fn on_drop(&mut self, kind: LossKind);

    /// 迄今观测到的最小 RTT；尚无 ACK 样本时为 None
    fn min_rtt(&self) -> Option<SimTime>;

    /// 统一的每包超时：`max(2 * min_rtt, 1s)`
    fn timeout(&self) -> SimTime {
        match self.min_rtt() {
            Some(r) => SimTime(r.0.saturating_mul(2).max(TIMEOUT_FLOOR.0)),
            None => TIMEOUT_FLOOR,
        }
    }

    fn is_timed_out(&self, dispatch_time: SimTime, now: SimTime) -> bool {
        now.0.saturating_sub(dispatch_time.0) >= self.timeout().0
    }

    fn name(&self) -> &'static str;

    /// 用于测试/诊断时向下转型
    fn as_any(&self) -> &dyn Any;
}
