//! 节点类型
//!
//! 定义网络节点，包括节点 trait 和具体实现（主机、路由器）。

use std::any::Any;
use std::collections::HashMap;

use tracing::{debug, trace, warn};

use super::id::{FlowId, LinkId, NodeId};
use super::network::Network;
use super::packet::{Packet, PacketKind};
use super::routing::{RouteUpdate, RoutingTable};
use super::tracker::PacketTracker;
use crate::log::DropReason;
use crate::sim::Simulator;

/// 节点接口
pub trait Node: Send {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    /// 处理从链路 `via` 到达的数据包
    fn on_packet(&mut self, pkt: Packet, via: LinkId, sim: &mut Simulator, net: &mut Network);

    /// 用于测试/诊断时向下转型
    fn as_any(&self) -> &dyn Any;
}

/// 主机节点：流量端点。
///
/// 收到发给自己的载荷包时按累计确认规则回 ACK；
/// 收到发给自己的 ACK 时转交对应的流做簿记。
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
    /// 按流区分的接收端序号簿记，首个载荷包到达时惰性创建
    trackers: HashMap<FlowId, PacketTracker>,
}

impl Host {
    /// 创建新主机
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            trackers: HashMap::new(),
        }
    }

    pub fn tracker(&self, flow: FlowId) -> Option<&PacketTracker> {
        self.trackers.get(&flow)
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    #[tracing::instrument(skip(self, pkt, sim, net), fields(node_name = %self.name, pkt_id = pkt.id))]
    fn on_packet(&mut self, pkt: Packet, via: LinkId, sim: &mut Simulator, net: &mut Network) {
        debug!("🖥️  Host 处理数据包");
        match &pkt.kind {
            PacketKind::Routing { .. } => {
                // 只有两台主机直连时才会出现，忽略即可
                trace!("主机收到路由通告，忽略");
            }
            PacketKind::Payload {
                flow,
                seq_no,
                duplicate_no,
                src,
                dst,
            } if *dst == self.id => {
                net.stats.delivered_pkts += 1;
                net.stats.delivered_bytes += pkt.size_bytes as u64;

                let tracker = self.trackers.entry(*flow).or_default();
                let expected = tracker.record(*seq_no);
                trace!(seq_no, expected, "载荷包到达，回累计 ACK");

                let ack = net.make_packet(PacketKind::Ack {
                    flow: *flow,
                    expected_seq_no: expected,
                    duplicate_no: *duplicate_no,
                    src: self.id,
                    dst: *src,
                });
                let Some(link) = net.host_link(self.id) else {
                    warn!("主机没有接入链路，无法回 ACK");
                    return;
                };
                let toward = net.link(link).peer(self.id);
                net.send_on_link(link, ack, toward, sim);
            }
            PacketKind::Ack {
                flow,
                expected_seq_no,
                duplicate_no,
                dst,
                ..
            } if *dst == self.id => {
                trace!(expected_seq_no, "ACK 到达，转交流");
                // 规避同时借用 `net` 与 `net.flows`
                let (flow, expected, dup) = (*flow, *expected_seq_no, *duplicate_no);
                let mut flows = std::mem::take(&mut net.flows);
                flows.acknowledgement_received(flow, expected, dup, sim, net);
                net.flows = flows;
            }
            _ => {
                warn!(pkt_id = pkt.id, "主机收到不属于自己的数据包，丢弃");
                net.drop_packet(&pkt, via, DropReason::Unexpected, sim.now());
            }
        }
    }
}

/// 路由器节点
#[derive(Debug)]
pub struct Router {
    id: NodeId,
    name: String,
    table: RoutingTable,
}

impl Router {
    /// 创建新路由器
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            table: RoutingTable::new(),
        }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }
}

impl Node for Router {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    #[tracing::instrument(skip(self, pkt, sim, net), fields(node_name = %self.name, pkt_id = pkt.id))]
    fn on_packet(&mut self, pkt: Packet, via: LinkId, sim: &mut Simulator, net: &mut Network) {
        debug!("🔀 Router 处理数据包");
        match &pkt.kind {
            PacketKind::Routing {
                source_host,
                origin_time,
            } => {
                let result = self.table.update(*source_host, via, *origin_time);
                trace!(?source_host, ?result, "路由通告");
                if matches!(result, RouteUpdate::Inserted | RouteUpdate::Refreshed) {
                    // 学到新路由：把同一个通告洪泛到除来路外的所有链路
                    let outs = net.attached_links(self.id).to_vec();
                    for lid in outs {
                        if lid == via {
                            continue;
                        }
                        let toward = net.link(lid).peer(self.id);
                        net.send_on_link(lid, pkt.clone(), toward, sim);
                    }
                }
            }
            PacketKind::Payload { dst, .. } | PacketKind::Ack { dst, .. } => {
                let dst = *dst;
                match self.table.lookup(dst) {
                    Some(out) => {
                        let toward = net.link(out).peer(self.id);
                        trace!(?dst, ?out, "按路由表转发");
                        net.send_on_link(out, pkt, toward, sim);
                    }
                    None => {
                        warn!(?dst, "无路由，丢弃数据包");
                        net.drop_packet(&pkt, via, DropReason::NoRoute, sim.now());
                    }
                }
            }
        }
    }
}
