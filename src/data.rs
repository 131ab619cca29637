use crate::{
    units::{Bytes, Millisecs},
    CcKind, FlowId,
};

/// A snapshot of the bottleneck taken at the end of each step.
#[derive(Debug, Clone, Copy, PartialEq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct Metrics {
    /// The time at the start of the step.
    pub time: Millisecs,
    /// Queue occupancy after draining.
    pub queue: Bytes,
    pub queue_delay: Millisecs,
    /// Bytes served over the step's link capacity.
    pub util: f64,
    pub served: Bytes,
}

/// A flow completion time record.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FctRecord {
    /// The flow ID.
    pub id: FlowId,
    /// The congestion control the flow ran.
    pub cc: CcKind,
    /// The flow size.
    pub size: Bytes,
    /// The time the flow became active.
    pub start: Millisecs,
    /// The flow completion time. A flow is complete once all of its bytes were admitted by the
    /// bottleneck.
    pub fct: Millisecs,
}

impl FctRecord {
    pub fn finish(&self) -> Millisecs {
        self.start + self.fct
    }
}

/// Everything a run produces, in time order.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Report {
    pub metrics: Vec<Metrics>,
    pub records: Vec<FctRecord>,
}
