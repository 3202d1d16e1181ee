//! 预置拓扑构建
//!
//! 测试与实验共用的小拓扑：单链路、菱形（两条不等时延的并行路由器路径）。

use crate::net::{LinkId, NetWorld, NodeId};
use crate::sim::SimTime;

/// 单链路拓扑配置选项
#[derive(Debug, Clone)]
pub struct SingleLinkOpts {
    pub rate_bytes_per_sec: u64,
    pub latency: SimTime,
    pub buffer_bytes: u64,
}

impl Default for SingleLinkOpts {
    fn default() -> Self {
        Self {
            // 10 Mbps
            rate_bytes_per_sec: 1_250_000,
            latency: SimTime::from_millis(10),
            buffer_bytes: 64 * 1024,
        }
    }
}

/// 构建单链路拓扑
///
/// 拓扑结构：h0 <-> h1
/// 返回：(h0, h1, 链路)
pub fn build_single_link(world: &mut NetWorld, opts: &SingleLinkOpts) -> (NodeId, NodeId, LinkId) {
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    let link = world.net.connect(
        h0,
        h1,
        opts.latency,
        opts.rate_bytes_per_sec,
        opts.buffer_bytes,
        "l0",
    );
    (h0, h1, link)
}

/// 菱形拓扑配置选项
#[derive(Debug, Clone)]
pub struct DiamondOpts {
    pub rate_bytes_per_sec: u64,
    /// 主机接入链路时延
    pub edge_latency: SimTime,
    /// 上路（快路径）单链路时延
    pub fast_latency: SimTime,
    /// 下路（慢路径）单链路时延
    pub slow_latency: SimTime,
    pub buffer_bytes: u64,
}

impl Default for DiamondOpts {
    fn default() -> Self {
        Self {
            rate_bytes_per_sec: 1_250_000,
            edge_latency: SimTime::from_millis(1),
            fast_latency: SimTime::from_millis(5),
            slow_latency: SimTime::from_millis(50),
            buffer_bytes: 64 * 1024,
        }
    }
}

/// 菱形拓扑的节点与链路
#[derive(Debug, Clone)]
pub struct DiamondIds {
    pub h0: NodeId,
    pub h1: NodeId,
    /// h0 侧汇聚路由器
    pub r_in: NodeId,
    /// 快路径中间路由器
    pub r_fast: NodeId,
    /// 慢路径中间路由器
    pub r_slow: NodeId,
    /// h1 侧汇聚路由器
    pub r_out: NodeId,
    pub fast_in: LinkId,
    pub fast_out: LinkId,
    pub slow_in: LinkId,
    pub slow_out: LinkId,
}

/// 构建菱形拓扑
///
/// 拓扑结构：
/// ```text
///          r_fast
///         /      \
/// h0 - r_in      r_out - h1
///         \      /
///          r_slow
/// ```
pub fn build_diamond(world: &mut NetWorld, opts: &DiamondOpts) -> DiamondIds {
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    let r_in = world.net.add_router("r_in");
    let r_fast = world.net.add_router("r_fast");
    let r_slow = world.net.add_router("r_slow");
    let r_out = world.net.add_router("r_out");

    let rate = opts.rate_bytes_per_sec;
    let buf = opts.buffer_bytes;
    world
        .net
        .connect(h0, r_in, opts.edge_latency, rate, buf, "l_h0");
    let fast_in = world
        .net
        .connect(r_in, r_fast, opts.fast_latency, rate, buf, "l_fast_in");
    let slow_in = world
        .net
        .connect(r_in, r_slow, opts.slow_latency, rate, buf, "l_slow_in");
    let fast_out = world
        .net
        .connect(r_fast, r_out, opts.fast_latency, rate, buf, "l_fast_out");
    let slow_out = world
        .net
        .connect(r_slow, r_out, opts.slow_latency, rate, buf, "l_slow_out");
    world
        .net
        .connect(r_out, h1, opts.edge_latency, rate, buf, "l_h1");

    DiamondIds {
        h0,
        h1,
        r_in,
        r_fast,
        r_slow,
        r_out,
        fast_in,
        fast_out,
        slow_in,
        slow_out,
    }
}
