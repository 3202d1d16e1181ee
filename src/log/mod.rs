//! 结构化日志通道
//!
//! 仿真过程中逐条追加的记录，供外部统计/绘图工具消费。
//! 每个通道一种固定形状的记录；本模块只负责收集，不负责呈现。

use serde::Serialize;

use crate::net::{Direction, FlowId, LinkId, NodeId};
use crate::sim::SimTime;

/// 丢包原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// 链路缓冲区容量不足
    BufferFull,
    /// 路由器查不到去往目的主机的路由
    NoRoute,
    /// 包到达了无法处理它的设备
    Unexpected,
}

#[derive(Debug, Clone, Serialize)]
pub struct PacketSent {
    pub t_ns: u64,
    pub packet_id: u64,
    pub link_id: usize,
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize)]
pub struct PacketArrived {
    pub t_ns: u64,
    pub packet_id: u64,
    pub device_id: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PacketDropped {
    pub t_ns: u64,
    pub packet_id: u64,
    pub link_id: usize,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct BufferOccupancy {
    pub t_ns: u64,
    pub link_id: usize,
    pub used_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowSize {
    pub t_ns: u64,
    pub flow_id: u64,
    pub window: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RttSample {
    pub t_ns: u64,
    pub flow_id: u64,
    pub rtt_ns: u64,
}

/// 仿真日志：每个通道一个只追加的记录序列。
#[derive(Debug, Default, Serialize)]
pub struct SimLog {
    pub packet_sent: Vec<PacketSent>,
    pub packet_arrived: Vec<PacketArrived>,
    pub packet_dropped: Vec<PacketDropped>,
    pub buffer_occupancy: Vec<BufferOccupancy>,
    pub window_size: Vec<WindowSize>,
    pub rtt_sample: Vec<RttSample>,
}

impl SimLog {
    pub fn record_sent(&mut self, t: SimTime, packet_id: u64, link: LinkId, direction: Direction) {
        self.packet_sent.push(PacketSent {
            t_ns: t.0,
            packet_id,
            link_id: link.0,
            direction,
        });
    }

    pub fn record_arrived(&mut self, t: SimTime, packet_id: u64, device: NodeId) {
        self.packet_arrived.push(PacketArrived {
            t_ns: t.0,
            packet_id,
            device_id: device.0,
        });
    }

    pub fn record_dropped(&mut self, t: SimTime, packet_id: u64, link: LinkId, reason: DropReason) {
        self.packet_dropped.push(PacketDropped {
            t_ns: t.0,
            packet_id,
            link_id: link.0,
            reason,
        });
    }

    pub fn record_buffer(&mut self, t: SimTime, link: LinkId, used_bytes: u64) {
        self.buffer_occupancy.push(BufferOccupancy {
            t_ns: t.0,
            link_id: link.0,
            used_bytes,
        });
    }

    pub fn record_window(&mut self, t: SimTime, flow: FlowId, window: f64) {
        self.window_size.push(WindowSize {
            t_ns: t.0,
            flow_id: flow.0,
            window,
        });
    }

    pub fn record_rtt(&mut self, t: SimTime, flow: FlowId, rtt: SimTime) {
        self.rtt_sample.push(RttSample {
            t_ns: t.0,
            flow_id: flow.0,
            rtt_ns: rtt.0,
        });
    }
}
