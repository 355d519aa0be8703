use chess::AnalysisScore;
use cozy_chess::{Color, Move};
use engine::EngineInfo;

/// Latest progress of the running (or last) search.
///
/// Written by the search task, read by the renderer, guarded by its own
/// lock so neither side stalls the other or the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchTelemetry {
    /// Search this telemetry belongs to.
    pub generation: u64,
    /// Side that was on move in the analysed position.
    pub searching_side: Option<Color>,
    pub depth: Option<u8>,
    /// Relative to `searching_side`.
    pub evaluation: Option<AnalysisScore>,
    pub principal_variation: Option<Vec<Move>>,
    pub nodes: Option<u64>,
}

impl SearchTelemetry {
    /// Clear everything and tag with a new search.
    pub fn begin(&mut self, generation: u64, searching_side: Color) {
        *self = Self {
            generation,
            searching_side: Some(searching_side),
            ..Default::default()
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Merge one progress record. Fields absent from `info` keep their
    /// previous value.
    pub fn update(&mut self, info: &EngineInfo) {
        if let Some(depth) = info.depth {
            self.depth = Some(depth);
        }
        if let Some(score) = info.score {
            self.evaluation = Some(score.into());
        }
        if !info.pv.is_empty() {
            self.principal_variation = Some(info.pv.clone());
        }
        if let Some(nodes) = info.nodes {
            self.nodes = Some(nodes);
        }
    }

    /// Evaluation from `viewer`'s point of view.
    pub fn evaluation_for(&self, viewer: Color) -> Option<AnalysisScore> {
        let score = self.evaluation?;
        if self.searching_side? == viewer {
            Some(score)
        } else {
            Some(score.negate())
        }
    }
}
