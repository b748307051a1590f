use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Frame;
use crate::vision::{CascadeStrategy, FrameOutcome, LandmarkStrategy, MotionSkinHeuristic};

/// Detection strategies in priority order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyKind {
    Landmark,
    Cascade,
    Heuristic,
    #[default]
    None,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Landmark => "landmark",
            StrategyKind::Cascade => "cascade",
            StrategyKind::Heuristic => "heuristic",
            StrategyKind::None => "none",
        }
    }

    /// The next cheaper strategy to fall back to.
    pub fn next(&self) -> Option<StrategyKind> {
        match self {
            StrategyKind::Landmark => Some(StrategyKind::Cascade),
            StrategyKind::Cascade => Some(StrategyKind::Heuristic),
            StrategyKind::Heuristic | StrategyKind::None => None,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The strategy bound to a running loop. Owns its classifier state, so
/// dropping it discards every counter.
pub enum ActiveStrategy {
    Landmark(LandmarkStrategy),
    Cascade(CascadeStrategy),
    Heuristic(MotionSkinHeuristic),
}

impl ActiveStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ActiveStrategy::Landmark(_) => StrategyKind::Landmark,
            ActiveStrategy::Cascade(_) => StrategyKind::Cascade,
            ActiveStrategy::Heuristic(_) => StrategyKind::Heuristic,
        }
    }

    pub fn process(&mut self, frame: &Frame) -> FrameOutcome {
        match self {
            ActiveStrategy::Landmark(strategy) => strategy.process(frame),
            ActiveStrategy::Cascade(strategy) => strategy.process(frame),
            ActiveStrategy::Heuristic(strategy) => strategy.process(frame),
        }
    }

    /// A frame that was dropped because the previous one was still being
    /// processed. Detector-backed strategies count it as no face; the
    /// heuristic has nothing to compare it against.
    pub fn miss_frame(&mut self) -> FrameOutcome {
        match self {
            ActiveStrategy::Landmark(strategy) => strategy.miss_frame(),
            ActiveStrategy::Cascade(strategy) => strategy.miss_frame(),
            ActiveStrategy::Heuristic(_) => FrameOutcome::default(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            ActiveStrategy::Landmark(strategy) => strategy.reset(),
            ActiveStrategy::Cascade(strategy) => strategy.reset(),
            ActiveStrategy::Heuristic(strategy) => strategy.reset(),
        }
    }

    /// Releases provider resources held by the strategy.
    pub fn shutdown(&mut self) {
        self.reset();
        if let ActiveStrategy::Landmark(strategy) = self {
            strategy.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_order_ends_at_heuristic() {
        let order: Vec<_> = std::iter::successors(Some(StrategyKind::Landmark), |k| k.next()).collect();
        assert_eq!(
            order,
            vec![StrategyKind::Landmark, StrategyKind::Cascade, StrategyKind::Heuristic]
        );
        assert_eq!(StrategyKind::None.next(), None);
    }

    #[test]
    fn missed_frames_count_as_absence_for_detectors() {
        use crate::vision::{CascadeProvider, HeuristicConfig, HysteresisConfig};
        use crate::models::WarningReason;
        use std::sync::Arc;

        struct Blind;

        impl CascadeProvider for Blind {
            fn load(&self) -> anyhow::Result<()> {
                Ok(())
            }

            fn detect(&self, _frame: &Frame) -> anyhow::Result<bool> {
                Ok(true)
            }
        }

        let mut cascade = ActiveStrategy::Cascade(CascadeStrategy::new(
            Arc::new(Blind),
            HysteresisConfig::cascade(),
        ));
        let fired: Vec<_> = (0..4).flat_map(|_| cascade.miss_frame().candidates).collect();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].cause, WarningReason::NoFace);

        let mut heuristic =
            ActiveStrategy::Heuristic(MotionSkinHeuristic::new(HeuristicConfig::default()));
        for _ in 0..20 {
            assert!(heuristic.miss_frame().candidates.is_empty());
        }
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&StrategyKind::Heuristic).unwrap(), "\"heuristic\"");
        assert_eq!(StrategyKind::default().to_string(), "none");
    }
}
