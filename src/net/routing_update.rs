//! 路由通告定时事件
//!
//! 每台主机周期性地向网络发出路由通告，并把下一次通告重新排入队列。

use super::id::NodeId;
use super::net_world::NetWorld;
use crate::sim::{Event, Simulator, World};

/// 事件：主机发出一个路由通告，然后按通告周期重新调度自己。
#[derive(Debug)]
pub struct RoutingUpdate {
    pub host: NodeId,
}

impl Event for RoutingUpdate {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let RoutingUpdate { host } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");

        w.net.emit_beacon(host, sim);
        let interval = w.net.beacon_interval;
        sim.schedule_in(interval, RoutingUpdate { host });
    }
}
