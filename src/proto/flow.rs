//! 流（可靠按序字节流）实现
//!
//! 一个流从源主机向目的主机传输定量数据：
//! - 唤醒（定时器或 ACK 触发）时先识别可判丢的包（超时 / 三次重复 ACK），
//!   再在窗口允许的范围内优先重传、其次发新包；
//! - ACK 簿记按累计确认进行；RTT 取 `ACK 到达时刻 - 对应发送时刻`，
//!   且只记在 `duplicate_no` 匹配的那次发送上。
//!
//! 流集合由 Network 持有；事件处理通过 `std::mem::take` 规避
//! 与 `net` 的重叠借用。

use std::collections::BTreeMap;

use tracing::{debug, info, trace, warn};

use super::cc::{CongestionControl, LossKind};
use crate::net::{FlowId, NetWorld, Network, NodeId, PacketKind, PAYLOAD_BYTES};
use crate::sim::{Event, EventHandle, SimTime, Simulator, World};

/// 一次在途发送的元数据
#[derive(Debug, Clone, Copy)]
struct SentMeta {
    dispatch_time: SimTime,
    duplicate_no: u32,
}

/// 一条源到目的的流
#[derive(Debug)]
pub struct Flow {
    pub id: FlowId,
    pub src: NodeId,
    pub dst: NodeId,
    name: String,
    total_bytes: u64,
    bytes_remaining: u64,
    next_seq_to_emit: u64,
    start_time: SimTime,

    /// seq -> 最近一次发送的元数据
    unacked: BTreeMap<u64, SentMeta>,
    /// 待重传：seq -> 上一次发送的 duplicate_no
    retransmit_q: BTreeMap<u64, u32>,
    /// 迄今见过的最大 expected_seq_no
    last_expected_seen: u64,
    dup_acks: u32,
    /// 三次重复 ACK 标记的丢包，下次唤醒时处理
    marked_lost: Option<u64>,

    cc: Box<dyn CongestionControl>,
    wake_handle: Option<EventHandle>,

    // 统计
    pkts_sent: u64,
    pkts_acked: u64,
    start_at: Option<SimTime>,
    done_at: Option<SimTime>,
}

impl Flow {
    pub fn new(
        id: FlowId,
        name: impl Into<String>,
        src: NodeId,
        dst: NodeId,
        total_bytes: u64,
        start_time: SimTime,
        cc: Box<dyn CongestionControl>,
    ) -> Self {
        Self {
            id,
            src,
            dst,
            name: name.into(),
            total_bytes,
            bytes_remaining: total_bytes,
            next_seq_to_emit: 0,
            start_time,
            unacked: BTreeMap::new(),
            retransmit_q: BTreeMap::new(),
            last_expected_seen: 0,
            dup_acks: 0,
            marked_lost: None,
            cc,
            wake_handle: None,
            pkts_sent: 0,
            pkts_acked: 0,
            start_at: None,
            done_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn bytes_remaining(&self) -> u64 {
        self.bytes_remaining
    }

    pub fn start_time(&self) -> SimTime {
        self.start_time
    }

    /// 所有数据都已确认且没有在途包
    pub fn is_finished(&self) -> bool {
        self.bytes_remaining == 0 && self.unacked.is_empty()
    }

    pub fn start_at(&self) -> Option<SimTime> {
        self.start_at
    }

    pub fn done_at(&self) -> Option<SimTime> {
        self.done_at
    }

    pub fn pkts_sent(&self) -> u64 {
        self.pkts_sent
    }

    pub fn pkts_acked(&self) -> u64 {
        self.pkts_acked
    }

    pub fn controller(&self) -> &dyn CongestionControl {
        &*self.cc
    }

    pub(crate) fn unacked_len(&self) -> usize {
        self.unacked.len()
    }

    pub(crate) fn unacked_duplicate_no(&self, seq: u64) -> Option<u32> {
        self.unacked.get(&seq).map(|m| m.duplicate_no)
    }

    pub(crate) fn dup_acks(&self) -> u32 {
        self.dup_acks
    }

    pub(crate) fn last_expected_seen(&self) -> u64 {
        self.last_expected_seen
    }
}

/// 流集合，由 Network 持有。
///
/// 用 BTreeMap 保证任何跨流遍历的顺序确定（日志需要逐字节可复现）。
#[derive(Debug, Default)]
pub struct FlowSet {
    flows: BTreeMap<FlowId, Flow>,
}

impl FlowSet {
    pub fn insert(&mut self, flow: Flow) {
        self.flows.insert(flow.id, flow);
    }

    pub fn get(&self, id: FlowId) -> Option<&Flow> {
        self.flows.get(&id)
    }

    pub fn get_mut(&mut self, id: FlowId) -> Option<&mut Flow> {
        self.flows.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flow> {
        self.flows.values()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn all_done(&self) -> bool {
        self.flows.values().all(|f| f.is_finished())
    }

    /// FlowWake 事件触发：清掉已触发的句柄再唤醒。
    pub(crate) fn on_wake_event(&mut self, id: FlowId, sim: &mut Simulator, net: &mut Network) {
        if let Some(flow) = self.flows.get_mut(&id) {
            flow.wake_handle = None;
        }
        self.wake(id, sim, net);
    }

    /// 唤醒一条流：判丢、发送、重排定时器。
    #[tracing::instrument(skip(self, sim, net), fields(flow = ?id))]
    pub fn wake(&mut self, id: FlowId, sim: &mut Simulator, net: &mut Network) {
        let Some(flow) = self.flows.get_mut(&id) else {
            warn!("唤醒了不存在的流");
            return;
        };
        let now = sim.now();

        // 取消挂起的唤醒定时器（本次唤醒接管一切）
        if let Some(h) = flow.wake_handle.take() {
            sim.cancel(h);
        }

        if flow.is_finished() {
            if flow.done_at.is_none() {
                flow.done_at = Some(now);
                info!(flow = %flow.name, ?now, "🏁 流传输完成");
            }
            return;
        }

        if flow.start_at.is_none() {
            flow.start_at = Some(now);
            net.log.record_window(now, flow.id, flow.cc.window());
        }

        // 超时判丢
        let timed_out: Vec<u64> = flow
            .unacked
            .iter()
            .filter(|(_, m)| flow.cc.is_timed_out(m.dispatch_time, now))
            .map(|(&s, _)| s)
            .collect();
        for seq in timed_out {
            if let Some(meta) = flow.unacked.remove(&seq) {
                debug!(seq, "包超时，进入重传队列");
                flow.retransmit_q.insert(seq, meta.duplicate_no);
                flow.cc.on_drop(LossKind::Timeout);
                net.log.record_window(now, flow.id, flow.cc.window());
            }
        }

        // 三次重复 ACK 判丢
        if let Some(seq) = flow.marked_lost.take() {
            if let Some(meta) = flow.unacked.remove(&seq) {
                debug!(seq, "三次重复 ACK，进入重传队列");
                flow.retransmit_q.insert(seq, meta.duplicate_no);
                flow.cc.on_drop(LossKind::TripleDupAck);
                net.log.record_window(now, flow.id, flow.cc.window());
            }
        }

        // 发送循环：重传优先，其次新数据
        let window = flow.cc.window().floor() as u64;
        while (flow.unacked.len() as u64) < window {
            let head = flow.retransmit_q.iter().next().map(|(&s, &d)| (s, d));
            if let Some((seq, prev_dup)) = head {
                flow.retransmit_q.remove(&seq);
                if seq < flow.last_expected_seen {
                    // 已被累计确认，不必重传
                    continue;
                }
                let dup = prev_dup.saturating_add(1);
                flow.unacked.insert(
                    seq,
                    SentMeta {
                        dispatch_time: now,
                        duplicate_no: dup,
                    },
                );
                Self::emit_payload(flow, seq, dup, sim, net);
            } else if flow.next_seq_to_emit * (PAYLOAD_BYTES as u64) < flow.total_bytes {
                let seq = flow.next_seq_to_emit;
                flow.next_seq_to_emit += 1;
                flow.unacked.insert(
                    seq,
                    SentMeta {
                        dispatch_time: now,
                        duplicate_no: 0,
                    },
                );
                Self::emit_payload(flow, seq, 0, sim, net);
            } else {
                break;
            }
        }

        // 只要还有在途或未发完的数据，就安排下一次唤醒
        if !flow.unacked.is_empty() || flow.bytes_remaining > 0 {
            let h = sim.schedule_in(flow.cc.timeout(), FlowWake { flow: id });
            flow.wake_handle = Some(h);
        }
    }

    /// ACK 簿记（主机收到发给自己的 ACK 后调用），随后唤醒流。
    pub fn acknowledgement_received(
        &mut self,
        id: FlowId,
        expected_seq_no: u64,
        duplicate_no: u32,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(flow) = self.flows.get_mut(&id) else {
            warn!(?id, "收到未知流的 ACK，忽略");
            return;
        };
        let now = sim.now();

        if expected_seq_no > flow.last_expected_seen {
            // 累计确认推进：清掉所有 seq < expected 的在途包。
            // 剩余字节量跟随累计确认边界（而不是逐包扣减）：判丢后又被
            // 后续 ACK 覆盖的包不会留下永远扣不掉的账。
            flow.last_expected_seen = expected_seq_no;
            flow.bytes_remaining = flow
                .total_bytes
                .saturating_sub(expected_seq_no.saturating_mul(PAYLOAD_BYTES as u64));
            flow.dup_acks = 0;
            // 边界以下的 seq 必然已送达，无条件移出在途表——哪怕送达的是
            // 另一个重传代数（否则被迟到 ACK 跨过的表项会永远留在 unacked，
            // 流无法终结）。重传代数匹配只决定是否把这次 RTT 记在该次发送上。
            let acked: Vec<u64> = flow
                .unacked
                .range(..expected_seq_no)
                .map(|(&s, _)| s)
                .collect();
            for seq in acked {
                if let Some(meta) = flow.unacked.remove(&seq) {
                    if meta.duplicate_no != duplicate_no {
                        trace!(seq, "累计确认覆盖了其他重传代数的在途包");
                        continue;
                    }
                    let rtt = now - meta.dispatch_time;
                    flow.cc.on_ack(rtt);
                    flow.pkts_acked += 1;
                    trace!(seq, rtt_ns = rtt.0, "包已确认");
                    net.log.record_rtt(now, flow.id, rtt);
                    net.log.record_window(now, flow.id, flow.cc.window());
                }
            }
        } else if expected_seq_no == flow.last_expected_seen {
            flow.dup_acks += 1;
            if flow.dup_acks == 3 {
                debug!(seq = expected_seq_no, "三次重复 ACK，标记丢包");
                flow.marked_lost = Some(expected_seq_no);
            } else if flow.dup_acks > 3 {
                flow.cc.on_dup_ack();
                net.log.record_window(now, flow.id, flow.cc.window());
            }
        }
        // 更旧的 ACK（expected 落后于已见最大值）直接忽略

        self.wake(id, sim, net);
    }

    fn emit_payload(flow: &mut Flow, seq: u64, duplicate_no: u32, sim: &mut Simulator, net: &mut Network) {
        let pkt = net.make_packet(PacketKind::Payload {
            flow: flow.id,
            seq_no: seq,
            duplicate_no,
            src: flow.src,
            dst: flow.dst,
        });
        let Some(link) = net.host_link(flow.src) else {
            warn!(flow = %flow.name, "源主机没有接入链路，无法发送");
            return;
        };
        trace!(seq, duplicate_no, pkt_id = pkt.id, "发出载荷包");
        flow.pkts_sent += 1;
        let toward = net.link(link).peer(flow.src);
        net.send_on_link(link, pkt, toward, sim);
    }
}

/// 启动一条流（到达配置的开始时刻）
#[derive(Debug)]
pub struct FlowStart {
    pub flow: FlowId,
}

impl Event for FlowStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let FlowStart { flow } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");

        // 规避同时借用 `w.net` 与 `w.net.flows`
        let mut flows = std::mem::take(&mut w.net.flows);
        flows.wake(flow, sim, &mut w.net);
        w.net.flows = flows;
    }
}

/// 流唤醒定时器：超时重查在途包并继续发送
#[derive(Debug)]
pub struct FlowWake {
    pub flow: FlowId,
}

impl Event for FlowWake {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let FlowWake { flow } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");

        let mut flows = std::mem::take(&mut w.net.flows);
        flows.on_wake_event(flow, sim, &mut w.net);
        w.net.flows = flows;
    }
}
