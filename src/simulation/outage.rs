use rand::Rng;

use crate::units::Millisecs;

/// Random link blackouts: onsets form a Poisson process, each lasting a fixed time.
#[derive(Debug, Default, Clone, Copy, PartialEq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct OutageModel {
    pub prob_per_sec: f64,
    pub duration: Millisecs,
}

#[derive(Debug, Clone, Copy, PartialEq, derivative::Derivative)]
#[derivative(Default)]
pub(crate) enum Link {
    #[derivative(Default)]
    Up,
    Down {
        until: Millisecs,
    },
}

impl Link {
    pub(crate) fn is_down(&self) -> bool {
        matches!(self, Link::Down { .. })
    }

    /// Updates the link state for the step starting at `now`.
    pub(crate) fn evaluate<R: Rng>(
        &mut self,
        now: Millisecs,
        dt: Millisecs,
        model: OutageModel,
        rng: &mut R,
    ) {
        if let Link::Down { until } = *self {
            if now < until {
                return;
            }
        }
        *self = Link::Up;
        if model.prob_per_sec > 0.0 {
            // Per-step Bernoulli approximation of the onset process
            let p = model.prob_per_sec * dt.into_secs();
            if rng.gen::<f64>() < p {
                let until = now + model.duration;
                tracing::debug!(%now, %until, "link outage");
                *self = Link::Down { until };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn disabled_model_never_goes_down() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut link = Link::default();
        for i in 0..10_000 {
            link.evaluate(
                Millisecs::new(i as f64),
                Millisecs::ONE,
                OutageModel::default(),
                &mut rng,
            );
            assert!(!link.is_down());
        }
    }

    #[test]
    fn outage_lasts_its_duration() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut link = Link::default();
        // One onset per step in expectation, so the first draw always fires
        let model = OutageModel::new(1_000.0, Millisecs::new(5.0));
        link.evaluate(Millisecs::ZERO, Millisecs::ONE, model, &mut rng);
        assert_eq!(
            link,
            Link::Down {
                until: Millisecs::new(5.0)
            }
        );
        // No draws while the outage is in progress
        let never = OutageModel::default();
        for t in 1..5 {
            link.evaluate(Millisecs::new(t as f64), Millisecs::ONE, never, &mut rng);
            assert!(link.is_down());
        }
        link.evaluate(Millisecs::new(5.0), Millisecs::ONE, never, &mut rng);
        assert!(!link.is_down());
    }
}
