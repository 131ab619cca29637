//! Trial recipes for the data-center and space-DC comparisons.

use rand::{rngs::StdRng, SeedableRng};
use rustc_hash::FxHashMap;

use crate::{
    driver::Error,
    stats,
    units::{Bytes, Millisecs},
    CcKind, FctRecord, Flow, FlowId, Metrics, OutageModel, Report, Simulator, Switch,
};

/// A single-bottleneck data center where Reno and DCTCP share the link.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, typed_builder::TypedBuilder)]
pub struct DcConfig {
    #[serde(rename = "dt_ms")]
    #[builder(setter(into))]
    pub dt: Millisecs,
    #[serde(rename = "duration_ms")]
    #[builder(setter(into))]
    pub duration: Millisecs,
    pub buffer_pkts: u64,
    pub ecn_thresh_pkts: u64,
    #[serde(rename = "rtt_base_ms")]
    #[builder(setter(into))]
    pub rtt_base: Millisecs,
    /// Long flows per congestion control.
    pub long_flows_per_cc: u64,
    /// Short-flow arrivals per second, per congestion control.
    pub short_lambda: f64,
    #[serde(rename = "short_size_bytes")]
    #[builder(setter(into))]
    pub short_size: Bytes,
}

/// A long-RTT space link with outages and jitter, run with one congestion control at a time.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, typed_builder::TypedBuilder)]
pub struct SpaceConfig {
    #[serde(rename = "dt_ms")]
    #[builder(setter(into))]
    pub dt: Millisecs,
    #[serde(rename = "duration_ms")]
    #[builder(setter(into))]
    pub duration: Millisecs,
    pub buffer_pkts: u64,
    pub ecn_thresh_pkts: u64,
    #[serde(rename = "rtt_base_ms")]
    #[builder(setter(into))]
    pub rtt_base: Millisecs,
    pub num_long_flows: u64,
    pub short_lambda: f64,
    #[serde(rename = "short_size_bytes")]
    #[builder(setter(into))]
    pub short_size: Bytes,
    #[serde(default = "SpaceConfig::default_outage_prob")]
    #[builder(default = SpaceConfig::default_outage_prob())]
    pub outage_prob_per_sec: f64,
    #[serde(rename = "outage_duration_ms", default = "SpaceConfig::default_outage_duration")]
    #[builder(default = SpaceConfig::default_outage_duration(), setter(into))]
    pub outage_duration: Millisecs,
    #[serde(rename = "rtt_jitter_std_ms", default = "SpaceConfig::default_jitter")]
    #[builder(default = SpaceConfig::default_jitter(), setter(into))]
    pub rtt_jitter_std: Millisecs,
}

impl SpaceConfig {
    fn default_outage_prob() -> f64 {
        0.1
    }

    fn default_outage_duration() -> Millisecs {
        Millisecs::new(1_000.0)
    }

    fn default_jitter() -> Millisecs {
        Millisecs::new(50.0)
    }
}

pub fn dc_trial(cfg: &DcConfig, seed: u64) -> Report {
    let mut sim = Simulator::builder()
        .dt(cfg.dt)
        .duration(cfg.duration)
        .switch(Switch::new(cfg.buffer_pkts, cfg.ecn_thresh_pkts))
        .rng(StdRng::seed_from_u64(seed))
        .build();

    let mut id = FlowId::ZERO;
    for cc in [CcKind::Reno, CcKind::Dctcp] {
        for _ in 0..cfg.long_flows_per_cc {
            sim.add_flow(Flow::builder().id(id).cc(cc).rtt_base(cfg.rtt_base).build());
            id += FlowId::ONE;
        }
    }
    for cc in [CcKind::Reno, CcKind::Dctcp] {
        sim.schedule_short_flows(cfg.short_lambda, cfg.short_size, cc, cfg.rtt_base);
    }
    sim.run()
}

pub fn space_trial(cfg: &SpaceConfig, cc: CcKind, seed: u64) -> Report {
    let mut sim = Simulator::builder()
        .dt(cfg.dt)
        .duration(cfg.duration)
        .switch(Switch::new(cfg.buffer_pkts, cfg.ecn_thresh_pkts))
        .rng(StdRng::seed_from_u64(seed))
        .outage(OutageModel::new(cfg.outage_prob_per_sec, cfg.outage_duration))
        .rtt_jitter_std(cfg.rtt_jitter_std)
        .build();

    for i in 0..cfg.num_long_flows {
        sim.add_flow(
            Flow::builder()
                .id(FlowId::new(i))
                .cc(cc)
                .rtt_base(cfg.rtt_base)
                .build(),
        );
    }
    sim.schedule_short_flows(cfg.short_lambda, cfg.short_size, cc, cfg.rtt_base);
    sim.run()
}

/// Queue statistics shared by both experiments.
#[derive(Debug, Clone, Copy, PartialEq)]
struct QueueSummary {
    mean_delay: f64,
    p99_delay: f64,
    mean_util: f64,
}

impl QueueSummary {
    fn of(metrics: &[Metrics]) -> Result<Self, Error> {
        let delays = metrics
            .iter()
            .map(|m| m.queue_delay.into_f64())
            .collect::<Vec<_>>();
        let utils = metrics.iter().map(|m| m.util).collect::<Vec<_>>();
        match (
            stats::mean(&delays),
            stats::percentile(&delays, 99.0),
            stats::mean(&utils),
        ) {
            (Some(mean_delay), Some(p99_delay), Some(mean_util)) => Ok(Self {
                mean_delay,
                p99_delay,
                mean_util,
            }),
            _ => Err(Error::NoMetrics),
        }
    }
}

fn fcts_by_cc(records: &[FctRecord]) -> FxHashMap<CcKind, Vec<f64>> {
    let mut fcts = FxHashMap::<CcKind, Vec<f64>>::default();
    for record in records {
        fcts.entry(record.cc).or_default().push(record.fct.into_f64());
    }
    fcts
}

fn p99_for(fcts: &FxHashMap<CcKind, Vec<f64>>, cc: CcKind) -> Option<f64> {
    fcts.get(&cc).and_then(|v| stats::percentile(v, 99.0))
}

/// One seed of the data-center experiment.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DcRow {
    pub seed: u64,
    pub mean_queue_delay_ms: f64,
    pub p99_queue_delay_ms: f64,
    pub mean_util: f64,
    pub reno_fct_p99_ms: Option<f64>,
    pub dctcp_fct_p99_ms: Option<f64>,
    pub num_short_flows: usize,
}

impl DcRow {
    pub fn summarise(report: &Report, seed: u64) -> Result<Self, Error> {
        let queue = QueueSummary::of(&report.metrics)?;
        let fcts = fcts_by_cc(&report.records);
        Ok(Self {
            seed,
            mean_queue_delay_ms: queue.mean_delay,
            p99_queue_delay_ms: queue.p99_delay,
            mean_util: queue.mean_util,
            reno_fct_p99_ms: p99_for(&fcts, CcKind::Reno),
            dctcp_fct_p99_ms: p99_for(&fcts, CcKind::Dctcp),
            num_short_flows: report.records.len(),
        })
    }
}

/// One (congestion control, seed) trial of the space-DC experiment.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SpaceRow {
    pub cc: CcKind,
    pub seed: u64,
    pub mean_queue_delay_ms: f64,
    pub p99_queue_delay_ms: f64,
    pub mean_util: f64,
    pub fct_p99_ms: Option<f64>,
    pub num_short_flows: usize,
}

impl SpaceRow {
    pub fn summarise(report: &Report, cc: CcKind, seed: u64) -> Result<Self, Error> {
        let queue = QueueSummary::of(&report.metrics)?;
        let fcts = report
            .records
            .iter()
            .map(|r| r.fct.into_f64())
            .collect::<Vec<_>>();
        Ok(Self {
            cc,
            seed,
            mean_queue_delay_ms: queue.mean_delay,
            p99_queue_delay_ms: queue.p99_delay,
            mean_util: queue.mean_util,
            fct_p99_ms: stats::percentile(&fcts, 99.0),
            num_short_flows: report.records.len(),
        })
    }
}
