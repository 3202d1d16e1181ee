//! 事件 trait
//!
//! 定义仿真事件接口。

use super::simulator::Simulator;
use super::world::World;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 调度句柄：用于取消一个尚未执行的事件。
///
/// 内部是事件的插入序列号，全局唯一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(pub(crate) u64);
