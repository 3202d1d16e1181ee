//! 网络拓扑管理
//!
//! 定义网络拓扑结构，包含节点、链路、流集合、数据包收发与统计信息。
//! 节点与链路互相只通过整数 id 引用，注册表由 Network 统一持有。

use tracing::{debug, trace, warn};

use super::deliver_packet::DeliverPacket;
use super::id::{LinkId, NodeId};
use super::link::Link;
use super::link_ready::LinkReady;
use super::node::{Host, Node, Router};
use super::packet::{Packet, PacketKind};
use super::stats::Stats;
use crate::log::{DropReason, SimLog};
use crate::proto::FlowSet;
use crate::sim::{SimTime, Simulator};

/// 路由通告默认周期
const DEFAULT_BEACON_INTERVAL: SimTime = SimTime(1_000_000_000);

/// 网络拓扑
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    node_names: Vec<String>,
    links: Vec<Link>,
    link_names: Vec<String>,
    /// 每个节点挂接的链路（注册表侧的邻接信息）
    attached: Vec<Vec<LinkId>>,
    pub flows: FlowSet,
    pub log: SimLog,
    pub stats: Stats,
    pub beacon_interval: SimTime,
    next_pkt_id: u64,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            node_names: Vec::new(),
            links: Vec::new(),
            link_names: Vec::new(),
            attached: Vec::new(),
            flows: FlowSet::default(),
            log: SimLog::default(),
            stats: Stats::default(),
            beacon_interval: DEFAULT_BEACON_INTERVAL,
            next_pkt_id: 0,
        }
    }
}

impl Network {
    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let name = name.into();
        self.node_names.push(name.clone());
        self.nodes.push(Some(Box::new(Host::new(id, name))));
        self.attached.push(Vec::new());
        id
    }

    /// 添加路由器节点
    pub fn add_router(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let name = name.into();
        self.node_names.push(name.clone());
        self.nodes.push(Some(Box::new(Router::new(id, name))));
        self.attached.push(Vec::new());
        id
    }

    /// 连接两个节点（创建一条半双工双向链路）
    pub fn connect(
        &mut self,
        a: NodeId,
        b: NodeId,
        latency: SimTime,
        rate_bytes_per_sec: u64,
        buffer_capacity_bytes: u64,
        name: impl Into<String>,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(Link::new(
            id,
            a,
            b,
            latency,
            rate_bytes_per_sec,
            buffer_capacity_bytes,
        ));
        self.link_names.push(name.into());
        self.attached[a.0].push(id);
        self.attached[b.0].push(id);
        id
    }

    /// 创建数据包（分配全局唯一 id，大小由变体决定）
    pub fn make_packet(&mut self, kind: PacketKind) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet::new(id, kind)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    pub fn node_name(&self, id: NodeId) -> &str {
        &self.node_names[id.0]
    }

    pub fn link_name(&self, id: LinkId) -> &str {
        &self.link_names[id.0]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    /// 节点引用（节点正在处理数据包时暂不可用）
    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.nodes.get(id.0).and_then(|n| n.as_deref())
    }

    pub fn attached_links(&self, n: NodeId) -> &[LinkId] {
        &self.attached[n.0]
    }

    /// 主机的唯一接入链路（按构建约定，主机恰好挂一条链路）
    pub fn host_link(&self, n: NodeId) -> Option<LinkId> {
        self.attached.get(n.0).and_then(|ls| ls.first().copied())
    }

    /// 所有主机节点 id
    pub fn host_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| {
                let node = n.as_deref()?;
                node.as_any().downcast_ref::<Host>().map(|_| NodeId(i))
            })
            .collect()
    }

    /// 主机周期性发出路由通告
    pub fn emit_beacon(&mut self, host: NodeId, sim: &mut Simulator) {
        let now = sim.now();
        let Some(link) = self.host_link(host) else {
            warn!(?host, "主机没有接入链路，跳过路由通告");
            return;
        };
        let pkt = self.make_packet(PacketKind::Routing {
            source_host: host,
            origin_time: now,
        });
        trace!(?host, pkt_id = pkt.id, "发出路由通告");
        let toward = self.links[link.0].peer(host);
        self.send_on_link(link, pkt, toward, sim);
    }

    /// 经链路 `link` 向 `toward` 端发送数据包。
    ///
    /// 入队后若链路空闲则立即开始发送队头；队列满则 DropTail 丢弃并记录。
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, link = ?link, toward = ?toward))]
    pub fn send_on_link(
        &mut self,
        link: LinkId,
        pkt: Packet,
        toward: NodeId,
        sim: &mut Simulator,
    ) {
        let now = sim.now();
        let dir = self.links[link.0].direction_toward(toward);

        match self.links[link.0].buffer.enqueue(pkt, dir) {
            Ok(()) => {
                let used = self.links[link.0].buffer.bytes();
                self.log.record_buffer(now, link, used);
                trace!(
                    q_len = self.links[link.0].buffer.len(),
                    q_bytes = used,
                    "packet 入队成功"
                );
            }
            Err(pkt) => {
                debug!(pkt_id = pkt.id, "队列已满，DropTail 丢弃 packet");
                self.drop_packet(&pkt, link, DropReason::BufferFull, now);
                return;
            }
        }

        // 若链路空闲，则立即开始发送队头 packet
        if now >= self.links[link.0].busy_until {
            self.transmit_next_on_link(link, sim);
        }
    }

    /// depart 时刻触发：链路完成一次序列化发送，尝试发送下一个队头 packet
    pub(crate) fn on_link_ready(&mut self, link: LinkId, sim: &mut Simulator) {
        let now = sim.now();
        let busy_until = self.links[link.0].busy_until;
        // 可能会遇到同一时刻的竞态（LinkReady 与新的 send_on_link 同时发生）
        if busy_until > now {
            return;
        }
        trace!(?now, ?busy_until, "链路空闲，尝试发送下一个队头 packet");
        self.transmit_next_on_link(link, sim);
    }

    fn transmit_next_on_link(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let now = sim.now();

        // 先取出必要的链路参数，避免同时持有 link 的可变借用与 schedule
        let (latency, entry) = {
            let link = &mut self.links[link_id.0];
            (link.latency, link.buffer.dequeue())
        };

        let Some((pkt, dir)) = entry else {
            return;
        };

        let (to, tx_time, used) = {
            let link = &self.links[link_id.0];
            (link.endpoint(dir), link.tx_time(pkt.size_bytes), link.buffer.bytes())
        };
        let depart = now + tx_time;
        self.links[link_id.0].busy_until = depart;
        let arrive = depart + latency;

        self.log.record_sent(now, pkt.id, link_id, dir);
        self.log.record_buffer(now, link_id, used);

        trace!(
            ?now,
            ?to,
            ?tx_time,
            ?depart,
            ?arrive,
            "链路发送队头 packet"
        );

        // 到达事件（序列化时延 + 传播时延）
        sim.schedule(
            arrive,
            DeliverPacket {
                to,
                via: link_id,
                pkt,
            },
        );
        // depart 时刻再次触发，继续出队
        sim.schedule(depart, LinkReady { link_id });
    }

    /// 将数据包交付给节点处理
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, to = ?to))]
    pub fn deliver(&mut self, to: NodeId, via: LinkId, pkt: Packet, sim: &mut Simulator) {
        debug!("📬 将数据包交付给节点处理");
        self.log.record_arrived(sim.now(), pkt.id, to);

        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let mut node = self.nodes[to.0].take().expect("node exists");
        node.on_packet(pkt, via, sim, self);
        self.nodes[to.0] = Some(node);
    }

    /// 丢弃数据包并记录（缓冲区满 / 无路由 / 意外到达）
    pub(crate) fn drop_packet(
        &mut self,
        pkt: &Packet,
        link: LinkId,
        reason: DropReason,
        now: SimTime,
    ) {
        self.stats.dropped_pkts += 1;
        self.stats.dropped_bytes += pkt.size_bytes as u64;
        self.log.record_dropped(now, pkt.id, link, reason);
    }
}
