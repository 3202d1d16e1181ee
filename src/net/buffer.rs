//! 链路缓冲区（尾丢弃）
//!
//! 有界 FIFO，按字节计容量；容量不足时直接丢弃新到达的 packet。
//! 每个表项带方向标记，标识该 packet 正在驶向链路的哪一端。

use std::collections::VecDeque;

use super::link::Direction;
use super::packet::Packet;

#[derive(Debug)]
pub struct Buffer {
    max_bytes: u64,
    cur_bytes: u64,
    q: VecDeque<(Packet, Direction)>,
}

impl Buffer {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            cur_bytes: 0,
            q: VecDeque::new(),
        }
    }

    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    pub fn enqueue(&mut self, pkt: Packet, dir: Direction) -> Result<(), Packet> {
        let sz = pkt.size_bytes as u64;
        if self.cur_bytes.saturating_add(sz) > self.max_bytes {
            return Err(pkt);
        }
        self.cur_bytes = self.cur_bytes.saturating_add(sz);
        self.q.push_back((pkt, dir));
        Ok(())
    }

    /// 出队：FIFO 队头
    pub fn dequeue(&mut self) -> Option<(Packet, Direction)> {
        let (pkt, dir) = self.q.pop_front()?;
        self.cur_bytes = self.cur_bytes.saturating_sub(pkt.size_bytes as u64);
        Some((pkt, dir))
    }

    /// 队头方向（不出队），用于调度判断
    pub fn peek_direction(&self) -> Option<Direction> {
        self.q.front().map(|(_, d)| *d)
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn bytes(&self) -> u64 {
        self.cur_bytes
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.max_bytes
    }
}
