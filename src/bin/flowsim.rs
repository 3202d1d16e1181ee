//! 网络仿真 CLI
//!
//! 读取拓扑 JSON，运行事件驱动仿真，输出每条流的完成时间与结构化日志。

use clap::Parser;
use flowsim_rs::net::NetWorld;
use flowsim_rs::sim::{SimTime, Simulator};
use flowsim_rs::topo::{self, CcAlgorithm, SimConfig, TopologySpec};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "flowsim", about = "事件驱动网络仿真：拓扑 JSON 输入，结构化日志输出")]
struct Args {
    /// 拓扑描述 JSON 文件
    #[arg(long)]
    topology: PathBuf,

    /// 拥塞控制算法（作用于所有流）
    #[arg(long, value_enum, default_value_t = CcAlgorithm::Reno)]
    cc: CcAlgorithm,

    /// 输出人类可读 trace（等价于 RUST_LOG=debug）
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// 提示外部统计工具绘图；核心忽略
    #[arg(long, default_value_t = false)]
    emit_graphs: bool,

    /// 仿真运行到多少毫秒；不填则运行到所有流完成
    #[arg(long)]
    until_ms: Option<u64>,

    /// 把结构化日志写成 JSON 文件；不填则不生成
    #[arg(long)]
    log_json: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .init();

    let raw = match fs::read_to_string(&args.topology) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("error: cannot read {}: {e}", args.topology.display());
            std::process::exit(2);
        }
    };
    let spec: TopologySpec = match serde_json::from_str(&raw) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("error: invalid topology json: {e}");
            std::process::exit(2);
        }
    };

    let cfg = SimConfig {
        congestion_algorithm: args.cc,
        verbose: args.verbose,
        emit_graphs: args.emit_graphs,
    };
    let mut world: NetWorld = match topo::build(&spec, &cfg) {
        Ok(world) => world,
        Err(e) => {
            eprintln!("error: invalid topology: {e}");
            std::process::exit(2);
        }
    };

    let mut sim = Simulator::default();
    topo::prime(&world, &mut sim);

    match args.until_ms {
        Some(ms) => sim.run_until(SimTime::from_millis(ms), &mut world),
        None if spec.flows.is_empty() => {
            // 没有流时事件队列不会排空（路由通告无限重排），给个默认上界
            warn!("拓扑没有流，默认只仿真 10s 虚拟时间");
            sim.run_until(SimTime::from_secs(10), &mut world);
        }
        None => sim.run(&mut world),
    }

    // 每条流一行完成摘要（供外部脚本采集）
    for flow in world.net.flows.iter() {
        let fct = match (flow.start_at(), flow.done_at()) {
            (Some(s), Some(d)) => format!("{:.6}", (d - s).as_secs_f64()),
            _ => "unfinished".to_string(),
        };
        println!(
            "flow_fct {} algo={} fct_s={} sent={} acked={}",
            flow.name(),
            flow.controller().name(),
            fct,
            flow.pkts_sent(),
            flow.pkts_acked(),
        );
    }
    let stats = &world.net.stats;
    println!(
        "sim_total now_s={:.6} delivered_pkts={} delivered_bytes={} dropped_pkts={} dropped_bytes={}",
        sim.now().as_secs_f64(),
        stats.delivered_pkts,
        stats.delivered_bytes,
        stats.dropped_pkts,
        stats.dropped_bytes,
    );

    if let Some(path) = &args.log_json {
        let json = match serde_json::to_string_pretty(&world.net.log) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("error: cannot serialize log: {e}");
                std::process::exit(1);
            }
        };
        if let Err(e) = fs::write(path, json) {
            eprintln!("error: cannot write {}: {e}", path.display());
            std::process::exit(1);
        }
        info!(path = %path.display(), "结构化日志已写出");
    }

    if args.emit_graphs {
        info!("emit_graphs: 绘图由外部统计工具处理，核心忽略");
    }
}
