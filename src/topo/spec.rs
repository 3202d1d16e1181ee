use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySpec {
    pub hosts: Vec<HostSpec>,
    #[serde(default)]
    pub routers: Vec<RouterSpec>,
    pub links: Vec<LinkSpec>,
    #[serde(default)]
    pub flows: Vec<FlowSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSpec {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSpec {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub id: String,
    pub rate_mbps: f64,
    pub delay_ms: f64,
    pub buffer_kb: f64,
    pub endpoint_a_id: String,
    pub endpoint_b_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSpec {
    pub id: String,
    pub source_host_id: String,
    pub dest_host_id: String,
    pub total_mb: f64,
    pub start_time_s: f64,
}

/// 拥塞控制算法选择（作用于所有流）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CcAlgorithm {
    #[default]
    Reno,
    Fast,
}

/// 仿真配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub congestion_algorithm: CcAlgorithm,
    /// 输出人类可读 trace（tracing 日志级别）
    #[serde(default)]
    pub verbose: bool,
    /// 提示外部工具绘图；核心忽略
    #[serde(default)]
    pub emit_graphs: bool,
}
