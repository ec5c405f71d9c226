//! Event queue entries. A turn is organized as a queue of discrete events,
//! consumed strictly highest-ordering-key-first:
//!
//! - forced replacement switches (400) before voluntary switches (300)
//! - post-switch-ins (350) between those
//! - mega evolutions (200) before moves
//! - moves at 100 + move priority, ordered by effective speed
//! - one residual marker at (-1, 0, 0) closing the turn

use crate::sim::effect::MonRef;

/// Ordering key: (category priority, effective speed + priority offset is
/// folded into the first field for moves, random tiebreak). Compared
/// lexicographically; the queue is kept ascending and popped from the back.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct OrderKey {
    pub category: i32,
    pub speed: i32,
    pub tiebreak: u32,
}

#[derive(Clone, Debug)]
pub enum EventKind {
    Move {
        user: MonRef,
        /// Moveset slot; `None` is struggle.
        slot: Option<usize>,
    },
    Switch {
        /// `None` when replacing a fainted (already vacated) slot.
        outgoing: Option<MonRef>,
        incoming: MonRef,
    },
    PostSwitchIn {
        mon: MonRef,
    },
    MegaEvo {
        mon: MonRef,
    },
    Residual,
}

#[derive(Clone, Debug)]
pub struct Event {
    pub kind: EventKind,
    pub order: OrderKey,
}

pub const MOVE_PRIORITY_BASE: i32 = 100;
pub const MEGA_EVO_PRIORITY: i32 = 200;
pub const SWITCH_PRIORITY: i32 = 300;
pub const POST_SWITCH_PRIORITY: i32 = 350;
pub const INSTA_SWITCH_PRIORITY: i32 = 400;

impl Event {
    pub fn residual() -> Self {
        Event { kind: EventKind::Residual, order: OrderKey { category: -1, speed: 0, tiebreak: 0 } }
    }

    pub fn is_switch(&self) -> bool {
        matches!(self.kind, EventKind::Switch { .. })
    }
}

/// Insert preserving ascending order (stable to the right of equal keys, so
/// equal-key entries pop in LIFO insertion order only via their random
/// tiebreak — keys are unique in practice).
pub fn insort(queue: &mut Vec<Event>, event: Event) {
    let pos = queue.partition_point(|e| e.order <= event.order);
    queue.insert(pos, event);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mon() -> MonRef {
        MonRef { side: 0, slot: 0 }
    }

    #[test]
    fn test_order_key_lexicographic() {
        let fast_move = OrderKey { category: 100, speed: 300, tiebreak: 0 };
        let slow_move = OrderKey { category: 100, speed: 100, tiebreak: 9 };
        let priority_move = OrderKey { category: 101, speed: 1, tiebreak: 0 };
        let switch = OrderKey { category: SWITCH_PRIORITY, speed: 1, tiebreak: 0 };
        assert!(switch > priority_move);
        assert!(priority_move > fast_move);
        assert!(fast_move > slow_move);
    }

    #[test]
    fn test_residual_pops_last() {
        let mut queue = Vec::new();
        insort(&mut queue, Event::residual());
        insort(
            &mut queue,
            Event {
                kind: EventKind::Move { user: mon(), slot: Some(0) },
                order: OrderKey { category: 100, speed: 50, tiebreak: 1 },
            },
        );
        insort(
            &mut queue,
            Event {
                kind: EventKind::Switch { outgoing: Some(mon()), incoming: mon() },
                order: OrderKey { category: SWITCH_PRIORITY, speed: 50, tiebreak: 1 },
            },
        );
        // popped from the back: switch, then move, then residual
        assert!(queue.pop().unwrap().is_switch());
        assert!(matches!(queue.pop().unwrap().kind, EventKind::Move { .. }));
        assert!(matches!(queue.pop().unwrap().kind, EventKind::Residual));
    }
}
