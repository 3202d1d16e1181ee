//! 拓扑构建与校验
//!
//! 把外部 JSON 描述（主机/路由器/链路/流）构建成可运行的 NetWorld，
//! 所有引用完整性问题在仿真开始前报错。

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use super::spec::{CcAlgorithm, SimConfig, TopologySpec};
use crate::net::{FlowId, NetWorld, NodeId, RoutingUpdate};
use crate::proto::{CongestionControl, Fast, Flow, FlowStart, Reno};
use crate::sim::{SimTime, Simulator};

/// 拓扑描述的静态错误，仿真开始前即致命。
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("duplicate device id `{0}`")]
    DuplicateDevice(String),
    #[error("duplicate link id `{0}`")]
    DuplicateLink(String),
    #[error("duplicate flow id `{0}`")]
    DuplicateFlow(String),
    #[error("link `{link}` references unknown endpoint `{endpoint}`")]
    UnknownEndpoint { link: String, endpoint: String },
    #[error("link `{0}` has zero rate")]
    ZeroRate(String),
    #[error("flow `{flow}` references unknown host `{host}`")]
    UnknownFlowHost { flow: String, host: String },
    #[error("flow `{flow}` endpoint `{device}` is a router, not a host")]
    FlowEndpointNotHost { flow: String, device: String },
    #[error("host `{host}` must have exactly one attached link, found {count}")]
    HostLinkCount { host: String, count: usize },
}

fn mbps_to_bytes_per_sec(mbps: f64) -> u64 {
    (mbps * 125_000.0).round() as u64
}

fn make_controller(alg: CcAlgorithm) -> Box<dyn CongestionControl> {
    match alg {
        CcAlgorithm::Reno => Box::new(Reno::new()),
        CcAlgorithm::Fast => Box::new(Fast::default()),
    }
}

/// 按拓扑描述构建网络世界。
pub fn build(spec: &TopologySpec, cfg: &SimConfig) -> Result<NetWorld, TopologyError> {
    let mut world = NetWorld::default();

    // 设备：主机在前，路由器在后；id 不得重复
    let mut hosts: HashMap<&str, NodeId> = HashMap::new();
    let mut routers: HashMap<&str, NodeId> = HashMap::new();
    for h in &spec.hosts {
        let id = world.net.add_host(h.id.clone());
        if hosts.insert(h.id.as_str(), id).is_some() {
            return Err(TopologyError::DuplicateDevice(h.id.clone()));
        }
    }
    for r in &spec.routers {
        if hosts.contains_key(r.id.as_str()) {
            return Err(TopologyError::DuplicateDevice(r.id.clone()));
        }
        let id = world.net.add_router(r.id.clone());
        if routers.insert(r.id.as_str(), id).is_some() {
            return Err(TopologyError::DuplicateDevice(r.id.clone()));
        }
    }
    let device = |name: &str| -> Option<NodeId> {
        hosts.get(name).or_else(|| routers.get(name)).copied()
    };

    // 链路：端点必须存在，速率必须非零
    let mut link_ids: HashMap<&str, ()> = HashMap::new();
    for l in &spec.links {
        if link_ids.insert(l.id.as_str(), ()).is_some() {
            return Err(TopologyError::DuplicateLink(l.id.clone()));
        }
        let a = device(&l.endpoint_a_id).ok_or_else(|| TopologyError::UnknownEndpoint {
            link: l.id.clone(),
            endpoint: l.endpoint_a_id.clone(),
        })?;
        let b = device(&l.endpoint_b_id).ok_or_else(|| TopologyError::UnknownEndpoint {
            link: l.id.clone(),
            endpoint: l.endpoint_b_id.clone(),
        })?;
        let rate = mbps_to_bytes_per_sec(l.rate_mbps);
        if rate == 0 {
            return Err(TopologyError::ZeroRate(l.id.clone()));
        }
        let latency = SimTime::from_secs_f64(l.delay_ms / 1_000.0);
        let buffer = (l.buffer_kb * 1024.0).round() as u64;
        world.net.connect(a, b, latency, rate, buffer, l.id.clone());
    }

    // 主机必须恰好挂一条链路
    for h in &spec.hosts {
        let id = hosts[h.id.as_str()];
        let count = world.net.attached_links(id).len();
        if count != 1 {
            return Err(TopologyError::HostLinkCount {
                host: h.id.clone(),
                count,
            });
        }
    }

    // 流：端点必须是主机
    let mut flow_ids: HashMap<&str, ()> = HashMap::new();
    for (i, f) in spec.flows.iter().enumerate() {
        if flow_ids.insert(f.id.as_str(), ()).is_some() {
            return Err(TopologyError::DuplicateFlow(f.id.clone()));
        }
        let resolve_host = |name: &str| -> Result<NodeId, TopologyError> {
            if let Some(&id) = hosts.get(name) {
                Ok(id)
            } else if routers.contains_key(name) {
                Err(TopologyError::FlowEndpointNotHost {
                    flow: f.id.clone(),
                    device: name.to_string(),
                })
            } else {
                Err(TopologyError::UnknownFlowHost {
                    flow: f.id.clone(),
                    host: name.to_string(),
                })
            }
        };
        let src = resolve_host(&f.source_host_id)?;
        let dst = resolve_host(&f.dest_host_id)?;
        let total_bytes = (f.total_mb * 1_000_000.0).round() as u64;
        let start = SimTime::from_secs_f64(f.start_time_s);
        world.net.flows.insert(Flow::new(
            FlowId(i as u64),
            f.id.clone(),
            src,
            dst,
            total_bytes,
            start,
            make_controller(cfg.congestion_algorithm),
        ));
    }

    debug!(
        nodes = world.net.num_nodes(),
        links = world.net.num_links(),
        flows = world.net.flows.len(),
        "拓扑构建完成"
    );
    Ok(world)
}

/// 调度初始事件：t=0 的路由通告，以及每条流的启动。
pub fn prime(world: &NetWorld, sim: &mut Simulator) {
    for host in world.net.host_ids() {
        sim.schedule(SimTime::ZERO, RoutingUpdate { host });
    }
    for flow in world.net.flows.iter() {
        sim.schedule(flow.start_time(), FlowStart { flow: flow.id });
    }
}
