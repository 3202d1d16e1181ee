//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列。

use super::event::{Event, EventHandle};
use super::scheduled_event::ScheduledEvent;
use super::time::{Clock, SimTime};
use super::world::World;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    clock: Clock,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    cancelled: HashSet<u64>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// 调度事件在指定的绝对时间执行。
    ///
    /// `at` 早于当前时间视为调度方的 bug，直接 panic。
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventHandle {
        assert!(
            at >= self.clock.now(),
            "invalid schedule: at={:?} is before now={:?}",
            at,
            self.clock.now()
        );
        let seq = self.next_seq;
        trace!(now = ?self.clock.now(), seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), "事件已加入队列");
        EventHandle(seq)
    }

    /// 调度事件在 `delay` 之后执行（相对当前时间）。
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> EventHandle {
        self.schedule(self.clock.now() + delay, ev)
    }

    /// 取消一个已调度的事件。
    ///
    /// 事件仍留在堆里，出队时被静默丢弃；即便其调度时间已到也不会执行。
    pub fn cancel(&mut self, handle: EventHandle) {
        trace!(seq = handle.0, "取消事件");
        self.cancelled.insert(handle.0);
    }

    /// 弹出下一个未被取消的事件。
    fn pop_live(&mut self) -> Option<ScheduledEvent> {
        while let Some(item) = self.q.pop() {
            if self.cancelled.remove(&item.seq) {
                trace!(seq = item.seq, at = ?item.at, "丢弃已取消事件");
                continue;
            }
            return Some(item);
        }
        None
    }

    /// 运行直到事件队列为空、世界完成或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        loop {
            if world.is_done() {
                break;
            }
            let Some(top) = self.q.peek() else {
                break;
            };
            if top.at > until {
                break;
            }
            let Some(item) = self.pop_live() else {
                break;
            };
            // 被取消事件的堆顶可能超过 until，再检查一次
            if item.at > until {
                // pop_live 已将其移出堆；时间未到，放回去
                self.q.push(item);
                break;
            }
            self.clock.advance_to(item.at);
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        self.clock.advance_to(until.max(self.clock.now()));
    }

    /// 运行所有事件，直到队列为空或世界完成。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.clock.now(), queue_size = self.q.len(), "初始状态");

        let mut event_count = 0u64;
        while !world.is_done() {
            let Some(item) = self.pop_live() else {
                break;
            };
            event_count += 1;
            self.clock.advance_to(item.at);

            trace!(
                event_num = event_count,
                now = ?self.clock.now(),
                seq = item.seq,
                remaining_queue = self.q.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.clock.now(),
            "✅ 仿真完成"
        );
    }
}
