//! 数据包类型
//!
//! 定义网络数据包及其变体。只建模大小，不建模载荷内容。

use super::id::{FlowId, NodeId};
use crate::sim::SimTime;

/// 载荷包大小（字节）
pub const PAYLOAD_BYTES: u32 = 1024;
/// ACK 包大小（字节）
pub const ACK_BYTES: u32 = 64;
/// 路由通告包大小（字节）
pub const ROUTING_BYTES: u32 = 64;

/// 网络数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub size_bytes: u32,
    pub kind: PacketKind,
}

/// 数据包变体：扁平 sum type，按 kind 分派。
#[derive(Debug, Clone)]
pub enum PacketKind {
    /// 路由通告：主机周期性发出，路由器据此学习去往该主机的出链路。
    Routing {
        source_host: NodeId,
        origin_time: SimTime,
    },
    /// 载荷包：流的数据段。`duplicate_no` 区分同一 seq 的历次重传。
    Payload {
        flow: FlowId,
        seq_no: u64,
        duplicate_no: u32,
        src: NodeId,
        dst: NodeId,
    },
    /// 累计 ACK：`expected_seq_no` 是接收端尚未收到的最小序号；
    /// `duplicate_no` 回显触发它的那个载荷包的重传代数。
    Ack {
        flow: FlowId,
        expected_seq_no: u64,
        duplicate_no: u32,
        src: NodeId,
        dst: NodeId,
    },
}

impl PacketKind {
    pub fn size_bytes(&self) -> u32 {
        match self {
            PacketKind::Routing { .. } => ROUTING_BYTES,
            PacketKind::Payload { .. } => PAYLOAD_BYTES,
            PacketKind::Ack { .. } => ACK_BYTES,
        }
    }
}

impl Packet {
    pub fn new(id: u64, kind: PacketKind) -> Self {
        let size_bytes = kind.size_bytes();
        Self {
            id,
            size_bytes,
            kind,
        }
    }

    /// 目的节点；路由通告按洪泛转发，没有单一目的地。
    pub fn dst(&self) -> Option<NodeId> {
        match &self.kind {
            PacketKind::Routing { .. } => None,
            PacketKind::Payload { dst, .. } | PacketKind::Ack { dst, .. } => Some(*dst),
        }
    }

    pub fn is_routing(&self) -> bool {
        matches!(self.kind, PacketKind::Routing { .. })
    }

    pub fn is_payload(&self) -> bool {
        matches!(self.kind, PacketKind::Payload { .. })
    }

    pub fn is_ack(&self) -> bool {
        matches!(self.kind, PacketKind::Ack { .. })
    }
}
