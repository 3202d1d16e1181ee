//! 路由表
//!
//! 路由器按目的主机记录出链路，由周期性的路由通告驱动更新。
//! 同一主机更早时间戳的通告不会覆盖已有表项，因此在静态拓扑下
//! 表项收敛到首先送达通告的那条路径（即时延最短的路径）。

use std::collections::HashMap;

use super::id::{LinkId, NodeId};
use crate::sim::SimTime;

/// 表项：去往某主机的出链路及其最近一次更新的时间戳。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub link: LinkId,
    pub updated_at: SimTime,
}

/// `update` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteUpdate {
    Inserted,
    Refreshed,
    Ignored,
}

#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: HashMap<NodeId, RouteEntry>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询去往 `host` 的出链路
    pub fn lookup(&self, host: NodeId) -> Option<LinkId> {
        self.routes.get(&host).map(|e| e.link)
    }

    pub fn entry(&self, host: NodeId) -> Option<RouteEntry> {
        self.routes.get(&host).copied()
    }

    /// 记录或刷新一条路由。
    ///
    /// 不存在则插入；时间戳严格更新则刷新；否则忽略（同一轮通告
    /// 经较慢路径重复到达时走到这里，洪泛因此自然终止）。
    pub fn update(&mut self, host: NodeId, link: LinkId, timestamp: SimTime) -> RouteUpdate {
        match self.routes.get_mut(&host) {
            None => {
                self.routes.insert(
                    host,
                    RouteEntry {
                        link,
                        updated_at: timestamp,
                    },
                );
                RouteUpdate::Inserted
            }
            Some(entry) => {
                if timestamp > entry.updated_at {
                    entry.link = link;
                    entry.updated_at = timestamp;
                    RouteUpdate::Refreshed
                } else {
                    RouteUpdate::Ignored
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
