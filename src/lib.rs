pub mod driver;
pub mod experiment;
pub mod stats;
pub mod units;

pub(crate) mod data;
pub(crate) mod entities;
pub(crate) mod simulation;

pub use data::{FctRecord, Metrics, Report};
pub use entities::{
    flow::{Cc, CcKind, Feedback, Flow, FlowId, ParseCcError},
    switch::Switch,
};
pub use simulation::{OutageModel, Simulator};

use units::{Bytes, Gbps};

/// Size of a full packet; windows and buffers are counted in these.
pub const PKT_SIZE: Bytes = Bytes::new(1_500.0);

/// Bottleneck link rate unless a switch is built with its own.
pub const LINK_RATE: Gbps = Gbps::new(10);
