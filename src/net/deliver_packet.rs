//! 数据包到达事件
//!
//! 链路在到达时刻把 packet 交给目标设备处理。

use super::id::{LinkId, NodeId};
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};
use tracing::{debug, info};

/// 事件：把一个 packet 连同它的来路链路交给某个节点处理。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub via: LinkId,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.pkt.id, to = ?self.to))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, via, pkt } = *self;

        info!("📨 数据包到达事件执行");
        debug!(
            pkt_id = pkt.id,
            size_bytes = pkt.size_bytes,
            via = ?via,
            now = ?sim.now(),
            "数据包到达节点"
        );

        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.deliver(to, via, pkt, sim);
    }
}
