use tutor_core::config::ConfidenceConfig;
use tutor_core::Strategy;

/// Scalar confidence from the terminating strategy and evidence distances.
#[derive(Debug, Clone)]
pub struct ConfidenceEstimator {
    config: ConfidenceConfig,
}

impl ConfidenceEstimator {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    pub fn estimate(&self, strategy: Strategy, distances: &[f32]) -> f32 {
        let c = &self.config;
        match strategy {
            Strategy::Precomputed => c.precomputed,
            Strategy::TemplateFallback => c.template,
            Strategy::ErrorFallback => c.error,
            Strategy::RetrievalGenerated => {
                let finite: Vec<f32> = distances.iter().copied().filter(|d| d.is_finite()).collect();
                if finite.is_empty() {
                    return c.template;
                }
                let avg = finite.iter().sum::<f32>() / finite.len() as f32;
                let proximity = (1.0 - avg / c.distance_scale).clamp(0.0, 1.0);
                let saturation = c.coverage_saturation.max(1);
                let coverage = finite.len().min(saturation) as f32 / saturation as f32;
                (proximity * (c.coverage_floor + (1.0 - c.coverage_floor) * coverage)).clamp(0.0, 1.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn est() -> ConfidenceEstimator {
        ConfidenceEstimator::new(ConfidenceConfig::default())
    }

    #[test]
    fn fixed_strategies_use_constants() {
        assert_eq!(est().estimate(Strategy::Precomputed, &[]), 0.9);
        assert_eq!(est().estimate(Strategy::TemplateFallback, &[0.1]), 0.35);
        assert_eq!(est().estimate(Strategy::ErrorFallback, &[]), 0.1);
    }

    #[test]
    fn retrieval_confidence_falls_with_distance() {
        let e = est();
        let mut last = f32::INFINITY;
        for d in [0.0, 0.2, 0.5, 1.0, 1.5, 2.0, 3.0] {
            let c = e.estimate(Strategy::RetrievalGenerated, &[d, d, d]);
            assert!((0.0..=1.0).contains(&c));
            assert!(c <= last, "confidence rose at distance {d}");
            last = c;
        }
        assert!((e.estimate(Strategy::RetrievalGenerated, &[0.0, 0.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(e.estimate(Strategy::RetrievalGenerated, &[2.5]), 0.0);
    }

    #[test]
    fn retrieval_confidence_grows_with_evidence_count() {
        let e = est();
        let one = e.estimate(Strategy::RetrievalGenerated, &[0.5]);
        let two = e.estimate(Strategy::RetrievalGenerated, &[0.5, 0.5]);
        let three = e.estimate(Strategy::RetrievalGenerated, &[0.5, 0.5, 0.5]);
        let four = e.estimate(Strategy::RetrievalGenerated, &[0.5, 0.5, 0.5, 0.5]);
        assert!(one < two && two < three);
        assert_eq!(three, four);
    }
}
