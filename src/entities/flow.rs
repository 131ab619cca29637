use std::str::FromStr;

use crate::{
    data::FctRecord,
    units::{Bytes, BytesPerMs, Millisecs},
    PKT_SIZE,
};

entity_id!(FlowId);

const INIT_CWND: f64 = 10.0;
const MIN_CWND: f64 = 2.0;
/// Per-step multiplicative growth shared by Reno and DCTCP.
const GROWTH: f64 = 0.1;
const DCTCP_GAIN: f64 = 1.0 / 16.0;
// SpaceCC keeps 0.9 of the smoothed RTT and takes 0.1 of each new sample
const SPACECC_KEEP: f64 = 0.9;
const SPACECC_SAMPLE: f64 = 0.1;
const SPACECC_MAX_RTT_RATIO: f64 = 1.25;
// Floors for RTTs used as divisors
const MIN_BASE_RTT: Millisecs = Millisecs::new(0.01);
const MIN_SAMPLE_RTT: Millisecs = Millisecs::new(0.1);

/// The congestion-control algorithm a flow runs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    derive_more::Display,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CcKind {
    #[display(fmt = "reno")]
    Reno,
    #[display(fmt = "dctcp")]
    Dctcp,
    #[display(fmt = "spacecc")]
    SpaceCc,
}

impl CcKind {
    pub const ALL: [CcKind; 3] = [CcKind::Reno, CcKind::Dctcp, CcKind::SpaceCc];
}

impl FromStr for CcKind {
    type Err = ParseCcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reno" => Ok(CcKind::Reno),
            "dctcp" => Ok(CcKind::Dctcp),
            "spacecc" => Ok(CcKind::SpaceCc),
            _ => Err(ParseCcError(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown congestion control `{0}` (expected reno, dctcp or spacecc)")]
pub struct ParseCcError(String);

/// Congestion-control state, carrying only what each algorithm needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cc {
    Reno,
    Dctcp {
        /// EWMA of the marked fraction.
        alpha: f64,
    },
    SpaceCc {
        /// EWMA of RTT samples; `None` until the first sample arrives.
        rtt_smooth: Option<Millisecs>,
    },
}

impl Cc {
    pub fn kind(&self) -> CcKind {
        match self {
            Cc::Reno => CcKind::Reno,
            Cc::Dctcp { .. } => CcKind::Dctcp,
            Cc::SpaceCc { .. } => CcKind::SpaceCc,
        }
    }
}

impl From<CcKind> for Cc {
    fn from(kind: CcKind) -> Self {
        match kind {
            CcKind::Reno => Cc::Reno,
            CcKind::Dctcp => Cc::Dctcp { alpha: 0.0 },
            CcKind::SpaceCc => Cc::SpaceCc { rtt_smooth: None },
        }
    }
}

/// Congestion signals delivered to a flow once per step.
#[derive(Debug, Clone, Copy, PartialEq, derive_new::new)]
pub struct Feedback {
    /// The RTT sample, including queueing delay and jitter.
    pub rtt: Millisecs,
    pub queue_delay: Millisecs,
    /// 1.0 if the bottleneck is marking, 0.0 otherwise.
    pub ecn_frac: f64,
    /// Whether any send was tail-dropped this step.
    pub loss: bool,
}

/// A fluid flow. Long-lived flows have no target size.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct Flow {
    id: FlowId,
    #[builder(setter(into))]
    cc: Cc,
    #[builder(setter(into))]
    rtt_base: Millisecs,
    #[builder(default, setter(strip_option, into))]
    size: Option<Bytes>,

    // Window management
    #[builder(default = INIT_CWND, setter(skip))]
    cwnd: f64,
    #[builder(default, setter(skip))]
    sent: Bytes,

    // Lifecycle
    #[builder(default, setter(skip))]
    pub(crate) start: Millisecs,
    #[builder(default, setter(skip))]
    finish: Option<Millisecs>,
}

impl Flow {
    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn kind(&self) -> CcKind {
        self.cc.kind()
    }

    pub fn cc(&self) -> &Cc {
        &self.cc
    }

    /// Congestion window, in packets.
    pub fn cwnd(&self) -> f64 {
        self.cwnd
    }

    pub fn rtt_base(&self) -> Millisecs {
        self.rtt_base
    }

    pub fn size(&self) -> Option<Bytes> {
        self.size
    }

    pub fn sent(&self) -> Bytes {
        self.sent
    }

    pub fn start(&self) -> Millisecs {
        self.start
    }

    pub fn finish(&self) -> Option<Millisecs> {
        self.finish
    }

    pub fn is_finished(&self) -> bool {
        self.finish.is_some()
    }

    /// Sending rate implied by the window over the base RTT.
    pub fn rate(&self) -> BytesPerMs {
        let rtt = self.rtt_base.max(MIN_BASE_RTT);
        BytesPerMs::new(self.cwnd * PKT_SIZE.into_f64() / rtt.into_f64())
    }

    pub(crate) fn credit(&mut self, bytes: Bytes) {
        self.sent += bytes;
    }

    pub(crate) fn reached_target(&self) -> bool {
        self.size.is_some_and(|size| self.sent >= size)
    }

    pub(crate) fn finish_at(&mut self, now: Millisecs) -> FctRecord {
        debug_assert!(self.finish.is_none(), "flow {} finished twice", self.id);
        self.finish = Some(now);
        FctRecord {
            id: self.id,
            cc: self.kind(),
            size: self.size.unwrap_or(self.sent),
            start: self.start,
            fct: now - self.start,
        }
    }

    pub fn on_ack(&mut self, fb: Feedback) {
        let cwnd = self.cwnd;
        let grown = cwnd + GROWTH * cwnd;
        let next = match &mut self.cc {
            Cc::Reno => {
                if fb.loss || fb.ecn_frac > 0.0 {
                    cwnd / 2.0
                } else {
                    grown
                }
            }
            Cc::Dctcp { alpha } => {
                *alpha = (1.0 - DCTCP_GAIN) * *alpha + DCTCP_GAIN * fb.ecn_frac;
                if fb.ecn_frac > 0.0 {
                    cwnd * (2.0 - *alpha) / 2.0
                } else {
                    grown
                }
            }
            Cc::SpaceCc { rtt_smooth } => {
                let smooth = match *rtt_smooth {
                    None => fb.rtt,
                    Some(prev) => prev.scale_by(SPACECC_KEEP) + fb.rtt.scale_by(SPACECC_SAMPLE),
                };
                *rtt_smooth = Some(smooth);
                let ratio = smooth.frac(self.rtt_base.max(MIN_BASE_RTT));
                if ratio > SPACECC_MAX_RTT_RATIO {
                    cwnd * 0.5
                } else {
                    // Roughly a fixed increase per round trip, whatever the RTT
                    let per_ms = GROWTH / fb.rtt.max(MIN_SAMPLE_RTT).into_f64();
                    cwnd + cwnd * 0.5 * per_ms
                }
            }
        };
        self.cwnd = next.max(MIN_CWND);
    }
}
