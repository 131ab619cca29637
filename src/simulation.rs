mod outage;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{
    data::{Metrics, Report},
    entities::{
        flow::{CcKind, Feedback, Flow},
        switch::Switch,
        workload::Workload,
    },
    units::{Bytes, Millisecs},
};

use self::outage::Link;

pub use self::outage::OutageModel;

/// Jitter never pulls an RTT sample below this fraction of the base RTT.
const MIN_RTT_FRACTION: f64 = 0.1;

/// A fixed time-step fluid simulation of one bottleneck.
///
/// Each step admits arrived short flows, samples the link's outage state, lets every active flow
/// offer `rate * dt` bytes to the switch, drains the switch at link rate and, unless the link is
/// down, feeds the post-drain queueing delay and marking state back to every flow. All randomness
/// comes from `rng`, so a run is reproducible from its seed and call order.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct Simulator<R: Rng> {
    // Run-time
    #[builder(default, setter(skip))]
    cur_time: Millisecs,
    #[builder(default, setter(skip))]
    link: Link,
    #[builder(default, setter(skip))]
    flows: Vec<Flow>,
    #[builder(default, setter(skip))]
    workload: Workload,
    #[builder(default, setter(skip))]
    report: Report,

    // Entities
    switch: Switch,
    rng: R,

    // Stepping
    #[builder(setter(into))]
    dt: Millisecs,
    #[builder(setter(into))]
    duration: Millisecs,

    // Impairments
    #[builder(default)]
    outage: OutageModel,
    #[builder(default, setter(into))]
    rtt_jitter_std: Millisecs,
}

impl<R: Rng> Simulator<R> {
    /// Adds a flow that is active from the current time on.
    pub fn add_flow(&mut self, mut flow: Flow) {
        flow.start = self.cur_time;
        self.flows.push(flow);
    }

    /// Pre-generates Poisson short-flow arrivals over the whole run. Returns the number of flows
    /// scheduled.
    pub fn schedule_short_flows(
        &mut self,
        lam_per_sec: f64,
        size: impl Into<Bytes>,
        cc: CcKind,
        rtt_base: impl Into<Millisecs>,
    ) -> usize {
        let n = self.workload.generate(
            &mut self.rng,
            self.duration,
            lam_per_sec,
            size.into(),
            cc,
            rtt_base.into(),
        );
        tracing::debug!(n, lam_per_sec, %cc, "scheduled short flows");
        n
    }

    pub fn set_outage(&mut self, outage: OutageModel) {
        self.outage = outage;
    }

    pub fn set_rtt_jitter_std(&mut self, std: impl Into<Millisecs>) {
        self.rtt_jitter_std = std.into();
    }

    /// The number of steps in a full run.
    pub fn steps(&self) -> u64 {
        let steps = self.duration.into_f64() / self.dt.into_f64();
        if steps.is_finite() && steps > 0.0 {
            steps as u64
        } else {
            0
        }
    }

    pub fn now(&self) -> Millisecs {
        self.cur_time
    }

    pub fn in_outage(&self) -> bool {
        self.link.is_down()
    }

    /// Flows active after the last step.
    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    /// Short flows that have not arrived yet, in arrival order.
    pub fn pending(&self) -> impl Iterator<Item = &Flow> {
        self.workload.iter()
    }

    pub fn switch(&self) -> &Switch {
        &self.switch
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn run(mut self) -> Report {
        let steps = self.steps();
        if steps == 0 {
            tracing::warn!(dt = %self.dt, duration = %self.duration, "run has no steps");
        }
        tracing::debug!(
            steps,
            long_flows = self.flows.len(),
            short_flows = self.workload.len(),
            "starting run"
        );
        for _ in 0..steps {
            self.step();
        }
        self.finish()
    }

    pub fn finish(self) -> Report {
        self.report
    }

    /// Advances the simulation by one step.
    pub fn step(&mut self) {
        let now = self.cur_time;
        let dt = self.dt;

        // Admit short flows that have arrived
        while let Some(mut flow) = self.workload.pop_due(now) {
            flow.start = now;
            self.flows.push(flow);
        }

        self.link.evaluate(now, dt, self.outage, &mut self.rng);

        // Send. A rejected send anywhere counts as loss for every flow.
        let mut loss = false;
        for flow in self.flows.iter_mut().filter(|f| !f.is_finished()) {
            let offered = flow.rate().width(dt);
            if self.switch.enqueue(offered) {
                flow.credit(offered);
            } else {
                loss = true;
            }
            if flow.reached_target() {
                let record = flow.finish_at(now);
                tracing::debug!(id = %record.id, cc = %record.cc, fct = %record.fct, "flow finished");
                self.report.records.push(record);
            }
        }

        // Drain
        let served = self.switch.dequeue(dt);
        let util = served.frac(self.switch.rate().width(dt));

        // Feedback, unless the link is down
        if !self.link.is_down() {
            let queue_delay = self.switch.queue_delay();
            let ecn_frac = self.switch.ecn_fraction();
            let jitter = self.jitter();
            for flow in self.flows.iter_mut().filter(|f| !f.is_finished()) {
                let noise = jitter.as_ref().map_or(0.0, |d| d.sample(&mut self.rng));
                let floor = -(1.0 - MIN_RTT_FRACTION) * flow.rtt_base().into_f64();
                let rtt = flow.rtt_base() + queue_delay + Millisecs::new(noise.max(floor));
                flow.on_ack(Feedback::new(rtt, queue_delay, ecn_frac, loss));
            }
        }

        self.report.metrics.push(Metrics::new(
            now,
            self.switch.queue(),
            self.switch.queue_delay(),
            util,
            served,
        ));

        // Retire finished flows
        self.flows.retain(|f| !f.is_finished());
        self.cur_time += dt;
    }

    fn jitter(&self) -> Option<Normal<f64>> {
        let std = self.rtt_jitter_std.into_f64();
        if std > 0.0 {
            Normal::new(0.0, std).ok()
        } else {
            None
        }
    }
}
