use crate::net::{FlowId, NetWorld, Network};
use crate::proto::{CongestionControl, Flow, FlowSet, FlowStart, Reno, RenoPhase};
use crate::sim::{SimTime, Simulator};
use crate::topo::{build_single_link, SingleLinkOpts};

fn with_flows<F>(world: &mut NetWorld, sim: &mut Simulator, f: F)
where
    F: FnOnce(&mut FlowSet, &mut Simulator, &mut Network),
{
    let mut flows = std::mem::take(&mut world.net.flows);
    f(&mut flows, sim, &mut world.net);
    world.net.flows = flows;
}

fn single_link_flow(total_bytes: u64) -> (NetWorld, Simulator, FlowId) {
    let mut world = NetWorld::default();
    let (h0, h1, _link) = build_single_link(&mut world, &SingleLinkOpts::default());
    let id = FlowId(0);
    world.net.flows.insert(Flow::new(
        id,
        "f0",
        h0,
        h1,
        total_bytes,
        SimTime::ZERO,
        Box::new(Reno::new()),
    ));
    (world, Simulator::default(), id)
}

fn reno_phase(world: &NetWorld, id: FlowId) -> RenoPhase {
    world
        .net
        .flows
        .get(id)
        .expect("flow")
        .controller()
        .as_any()
        .downcast_ref::<Reno>()
        .expect("reno controller")
        .phase()
}

#[test]
fn first_wake_sends_one_packet_and_arms_the_timer() {
    let (mut world, mut sim, id) = single_link_flow(16 * 1024);

    with_flows(&mut world, &mut sim, |flows, sim, net| {
        flows.wake(id, sim, net);
    });

    let flow = world.net.flows.get(id).expect("flow");
    assert_eq!(flow.pkts_sent(), 1);
    assert_eq!(flow.unacked_len(), 1);
    assert_eq!(flow.unacked_duplicate_no(0), Some(0));
    assert!(!flow.is_finished());
    assert_eq!(world.net.log.packet_sent.len(), 1);
}

#[test]
fn fresh_acks_open_the_window_and_send_more() {
    let (mut world, mut sim, id) = single_link_flow(16 * 1024);

    with_flows(&mut world, &mut sim, |flows, sim, net| {
        flows.wake(id, sim, net);
        flows.acknowledgement_received(id, 1, 0, sim, net);
    });

    let flow = world.net.flows.get(id).expect("flow");
    // 慢启动：窗口 1 -> 2，seq1/seq2 出发
    assert_eq!(flow.pkts_acked(), 1);
    assert_eq!(flow.pkts_sent(), 3);
    assert_eq!(flow.unacked_len(), 2);
    assert_eq!(flow.last_expected_seen(), 1);
    // 唤醒后窗口约束成立
    let window = flow.controller().window();
    assert!(flow.unacked_len() as f64 <= window.ceil());
}

#[test]
fn triple_duplicate_acks_trigger_fast_retransmit() {
    let (mut world, mut sim, id) = single_link_flow(16 * 1024);

    with_flows(&mut world, &mut sim, |flows, sim, net| {
        flows.wake(id, sim, net); // seq0 出发，窗口 1
        flows.acknowledgement_received(id, 1, 0, sim, net); // 窗口 2，seq1/2
        flows.acknowledgement_received(id, 2, 0, sim, net); // 窗口 3，seq3/4
        // seq2 丢失：三个携带相同 expected 的重复 ACK
        flows.acknowledgement_received(id, 2, 0, sim, net);
        flows.acknowledgement_received(id, 2, 0, sim, net);
        flows.acknowledgement_received(id, 2, 0, sim, net);
    });

    let flow = world.net.flows.get(id).expect("flow");
    let reno = flow
        .controller()
        .as_any()
        .downcast_ref::<Reno>()
        .expect("reno controller");

    // 窗口 3 -> ssthresh 1.5、窗口 4.5，进入快速恢复
    assert_eq!(reno.phase(), RenoPhase::FastRecovery);
    assert_eq!(reno.ssthresh(), 1.5);
    assert_eq!(reno.window(), 4.5);
    assert_eq!(flow.dup_acks(), 3);

    // 丢失的 seq2 以 duplicate_no=1 重发，且补了一个新包
    assert_eq!(flow.unacked_duplicate_no(2), Some(1));
    assert_eq!(flow.unacked_len(), 4);
    assert_eq!(flow.pkts_sent(), 7);
    assert!(flow.unacked_len() as f64 <= reno.window().ceil());
}

#[test]
fn cumulative_ack_clears_the_frontier_but_credits_matching_sends_only() {
    let (mut world, mut sim, id) = single_link_flow(16 * 1024);

    with_flows(&mut world, &mut sim, |flows, sim, net| {
        flows.wake(id, sim, net);
        flows.acknowledgement_received(id, 1, 0, sim, net);
        flows.acknowledgement_received(id, 2, 0, sim, net);
        flows.acknowledgement_received(id, 2, 0, sim, net);
        flows.acknowledgement_received(id, 2, 0, sim, net);
        flows.acknowledgement_received(id, 2, 0, sim, net);
        // 重传到达接收端后的累计 ACK，回显重传代数 1
        flows.acknowledgement_received(id, 6, 1, sim, net);
    });

    let flow = world.net.flows.get(id).expect("flow");
    // 边界以下的 seq2/3/4/5 全部移出在途表（不论重传代数），
    // 但只有 duplicate_no 匹配的 seq2 记入确认计数/RTT
    assert_eq!(flow.unacked_duplicate_no(2), None);
    assert_eq!(flow.unacked_duplicate_no(3), None);
    assert_eq!(flow.unacked_duplicate_no(4), None);
    assert_eq!(flow.unacked_duplicate_no(5), None);
    assert_eq!(flow.pkts_acked(), 3);
    assert_eq!(flow.last_expected_seen(), 6);

    // 在途表清空后窗口（floor 1.5 = 1）放行一个新包
    assert_eq!(flow.unacked_duplicate_no(6), Some(0));
    assert_eq!(flow.unacked_len(), 1);
    assert_eq!(flow.pkts_sent(), 8);

    // 快速恢复中的新 ACK 把窗口放回 ssthresh
    assert_eq!(reno_phase(&world, id), RenoPhase::CongestionAvoidance);
    assert_eq!(
        world.net.flows.get(id).expect("flow").controller().window(),
        1.5
    );
}

#[test]
fn stale_acks_are_ignored() {
    let (mut world, mut sim, id) = single_link_flow(16 * 1024);

    with_flows(&mut world, &mut sim, |flows, sim, net| {
        flows.wake(id, sim, net);
        flows.acknowledgement_received(id, 2, 0, sim, net);
        // 乱序迟到的更旧 ACK：既不是新确认也不算重复
        flows.acknowledgement_received(id, 1, 0, sim, net);
    });

    let flow = world.net.flows.get(id).expect("flow");
    assert_eq!(flow.last_expected_seen(), 2);
    assert_eq!(flow.dup_acks(), 0);
}

#[test]
fn unroutable_flow_times_out_and_retransmits() {
    // h0 - r - h1，但从不发路由通告：载荷在路由器处因无路由被丢弃
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    let r = world.net.add_router("r");
    let rate = 1_250_000;
    let lat = SimTime::from_millis(10);
    world.net.connect(h0, r, lat, rate, 64 * 1024, "l0");
    world.net.connect(r, h1, lat, rate, 64 * 1024, "l1");

    let id = FlowId(0);
    world.net.flows.insert(Flow::new(
        id,
        "f0",
        h0,
        h1,
        4 * 1024,
        SimTime::ZERO,
        Box::new(Reno::new()),
    ));

    let mut sim = Simulator::default();
    sim.schedule(SimTime::ZERO, FlowStart { flow: id });
    sim.run_until(SimTime::from_secs_f64(3.5), &mut world);

    let flow = world.net.flows.get(id).expect("flow");
    // 初始发送 + t=1s/2s/3s 三次超时重传
    assert_eq!(flow.pkts_sent(), 4);
    assert_eq!(flow.unacked_len(), 1);
    assert_eq!(flow.unacked_duplicate_no(0), Some(3));
    assert!(!flow.is_finished());
    // 超时把窗口压回 1，留在慢启动
    assert_eq!(flow.controller().window(), 1.0);
    assert_eq!(reno_phase(&world, id), RenoPhase::SlowStart);

    let drops = &world.net.log.packet_dropped;
    assert_eq!(drops.len(), 4);
    assert!(drops
        .iter()
        .all(|d| matches!(d.reason, crate::log::DropReason::NoRoute)));
}

#[test]
fn late_ack_after_timeout_retransmit_still_finishes_the_flow() {
    // ACK 只是被拖过了超时而没有丢：超时重传把在途表项的重传代数
    // 改写成 1 之后，迟到的原始 ACK（代数 0）仍然必须清掉该表项，
    // 否则流永远无法终结。
    let mut world = NetWorld::default();
    let h0 = world.net.add_host("h0");
    let h1 = world.net.add_host("h1");
    let r = world.net.add_router("r");
    let rate = 1_250_000;
    let lat = SimTime::from_millis(10);
    world.net.connect(h0, r, lat, rate, 64 * 1024, "l0");
    world.net.connect(r, h1, lat, rate, 64 * 1024, "l1");

    let id = FlowId(0);
    world.net.flows.insert(Flow::new(
        id,
        "f0",
        h0,
        h1,
        1024,
        SimTime::ZERO,
        Box::new(Reno::new()),
    ));

    let mut sim = Simulator::default();
    sim.schedule(SimTime::ZERO, FlowStart { flow: id });
    // t=1s 超时：seq0 以 duplicate_no=1 重发
    sim.run_until(SimTime::from_secs_f64(1.5), &mut world);
    assert_eq!(
        world.net.flows.get(id).expect("flow").unacked_duplicate_no(0),
        Some(1)
    );

    // 原始发送（代数 0）的 ACK 姗姗来迟
    with_flows(&mut world, &mut sim, |flows, sim, net| {
        flows.acknowledgement_received(id, 1, 0, sim, net);
    });

    let flow = world.net.flows.get(id).expect("flow");
    assert!(flow.is_finished());
    assert!(flow.done_at().is_some());
    assert_eq!(flow.unacked_len(), 0);
    assert_eq!(flow.bytes_remaining(), 0);
    // 代数不匹配：不记确认计数（也不产生 RTT 样本）
    assert_eq!(flow.pkts_acked(), 0);
    assert_eq!(flow.pkts_sent(), 2);
}
