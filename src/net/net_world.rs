//! 网络世界实现
//!
//! 定义网络仿真的世界（World）实现，持有网络拓扑。

use super::network::Network;
use crate::sim::World;
use std::any::Any;
use std::fmt;

/// 一个默认的网络世界实现：持有 Network。
#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
}

impl fmt::Debug for NetWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetWorld").finish_non_exhaustive()
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    /// 所有流传输完毕即视为完成。
    ///
    /// 路由通告会无限重排自己，事件队列永远不会排空；
    /// 流的完成状态才是自然的终止信号。没有流的世界交给 `run_until` 约束。
    fn is_done(&self) -> bool {
        !self.net.flows.is_empty() && self.net.flows.all_done()
    }
}
