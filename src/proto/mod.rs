//! 传输层/协议模块
//!
//! 包含可靠按序传输的流状态机，以及可互换的拥塞控制策略（Reno / FAST）。

pub mod cc;
pub mod fast;
pub mod flow;
pub mod reno;

pub use cc::{CongestionControl, LossKind};
pub use fast::Fast;
pub use flow::{Flow, FlowSet, FlowStart, FlowWake};
pub use reno::{Reno, RenoPhase};
