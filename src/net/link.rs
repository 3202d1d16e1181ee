//! 链路类型
//!
//! 定义半双工网络链路及其传输时延计算。
//! 同一时刻线路上只有一个方向在发送；两个方向共享同一个缓冲区，
//! 排队顺序与方向无关（严格 FIFO）。

use serde::Serialize;

use super::buffer::Buffer;
use super::id::{LinkId, NodeId};
use crate::sim::SimTime;

/// 传输方向：驶向链路的哪一端。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ToA,
    ToB,
}

/// 半双工网络链路
#[derive(Debug)]
pub struct Link {
    pub id: LinkId,
    pub a: NodeId,
    pub b: NodeId,
    pub latency: SimTime,
    pub rate_bytes_per_sec: u64,
    pub busy_until: SimTime,
    pub buffer: Buffer,
}

impl Link {
    pub fn new(
        id: LinkId,
        a: NodeId,
        b: NodeId,
        latency: SimTime,
        rate_bytes_per_sec: u64,
        buffer_capacity_bytes: u64,
    ) -> Self {
        Self {
            id,
            a,
            b,
            latency,
            rate_bytes_per_sec,
            busy_until: SimTime::ZERO,
            buffer: Buffer::new(buffer_capacity_bytes),
        }
    }

    /// `dir` 方向的终点节点
    pub fn endpoint(&self, dir: Direction) -> NodeId {
        match dir {
            Direction::ToA => self.a,
            Direction::ToB => self.b,
        }
    }

    /// 驶向节点 `n` 的方向
    pub fn direction_toward(&self, n: NodeId) -> Direction {
        if n == self.a {
            Direction::ToA
        } else if n == self.b {
            Direction::ToB
        } else {
            panic!("node {:?} is not an endpoint of link {:?}", n, self.id)
        }
    }

    /// 链路另一端
    pub fn peer(&self, n: NodeId) -> NodeId {
        if n == self.a {
            self.b
        } else if n == self.b {
            self.a
        } else {
            panic!("node {:?} is not an endpoint of link {:?}", n, self.id)
        }
    }

    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        // ceil(bytes / Bps) 秒 -> 纳秒
        if self.rate_bytes_per_sec == 0 {
            return SimTime(u64::MAX / 4);
        }
        let nanos = ((bytes as u128).saturating_mul(1_000_000_000u128)
            + (self.rate_bytes_per_sec as u128 - 1))
            / self.rate_bytes_per_sec as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}
