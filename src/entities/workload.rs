use std::collections::{vec_deque, VecDeque};

use rand::Rng;
use rand_distr::{Distribution, Exp};

use crate::units::{Bytes, Millisecs};

use super::flow::{CcKind, Flow, FlowId};

/// Short flows are numbered from here so they never collide with long flows.
const SHORT_FLOW_ID_BASE: FlowId = FlowId::new(10_000);

/// Pending short flows, kept in arrival order.
#[derive(Debug, Clone, derive_new::new)]
pub(crate) struct Workload {
    #[new(default)]
    pending: VecDeque<Flow>,
    #[new(value = "SHORT_FLOW_ID_BASE")]
    next_id: FlowId,
}

impl Default for Workload {
    fn default() -> Self {
        Self::new()
    }
}

impl Workload {
    delegate::delegate! {
        to self.pending {
            pub(crate) fn len(&self) -> usize;

            pub(crate) fn iter(&self) -> vec_deque::Iter<'_, Flow>;
        }
    }

    /// Draws Poisson arrivals over `[0, horizon)` and returns how many flows were added.
    pub(crate) fn generate<R: Rng>(
        &mut self,
        rng: &mut R,
        horizon: Millisecs,
        lam_per_sec: f64,
        size: Bytes,
        cc: CcKind,
        rtt_base: Millisecs,
    ) -> usize {
        let gaps = match Exp::new(lam_per_sec / 1_000.0) {
            Ok(exp) if lam_per_sec > 0.0 => exp,
            _ => {
                tracing::warn!(lam_per_sec, %cc, "arrival rate is not positive; no short flows scheduled");
                return 0;
            }
        };
        let mut t = Millisecs::ZERO;
        let mut count = 0;
        while t < horizon {
            t += Millisecs::new(gaps.sample(rng));
            if t < horizon {
                let mut flow = Flow::builder()
                    .id(self.next_id)
                    .cc(cc)
                    .rtt_base(rtt_base)
                    .size(size)
                    .build();
                flow.start = t;
                self.pending.push_back(flow);
                self.next_id += FlowId::ONE;
                count += 1;
            }
        }
        // Merge with flows from earlier calls
        self.pending
            .make_contiguous()
            .sort_by(|a, b| a.start.total_cmp(&b.start));
        count
    }

    /// Removes the earliest pending flow if it has arrived by `now`.
    pub(crate) fn pop_due(&mut self, now: Millisecs) -> Option<Flow> {
        if self.pending.front().is_some_and(|flow| flow.start <= now) {
            self.pending.pop_front()
        } else {
            None
        }
    }
}
