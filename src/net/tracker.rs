//! 接收端序号簿记
//!
//! 跟踪先于更小序号到达的"早到"包，并维护下一个期待的最小序号，
//! 供主机生成正确的累计 ACK。

use std::collections::BTreeSet;

/// 不变式：`next_expected` 不在 `early` 中；`early` 中的元素都大于 `next_expected`。
#[derive(Debug, Default)]
pub struct PacketTracker {
    next_expected: u64,
    early: BTreeSet<u64>,
}

impl PacketTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个收到的序号，返回更新后的 `next_expected`。
    ///
    /// 小于 `next_expected` 的序号是重复接收，直接忽略。
    pub fn record(&mut self, seq_no: u64) -> u64 {
        if seq_no == self.next_expected {
            self.next_expected += 1;
            // 新的期待序号可能早已到达，一路收拢
            while self.early.remove(&self.next_expected) {
                self.next_expected += 1;
            }
        } else if seq_no > self.next_expected {
            self.early.insert(seq_no);
        }
        self.next_expected
    }

    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    /// 已收到的包总数
    pub fn count_received(&self) -> u64 {
        self.next_expected + self.early.len() as u64
    }
}
