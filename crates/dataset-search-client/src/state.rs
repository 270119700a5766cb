use crate::results::ResultSet;

/// Which of the three UI phases the accumulated results support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchPhase {
    /// Nothing received yet.
    Loading,
    /// Initial search results are available, rerank still pending.
    Ranked,
    /// The reranked results have arrived.
    Reranked,
}

/// Latest initial and reranked result sets of one session.
///
/// Each slot holds at most one result set; a newer one of the same kind
/// replaces the older one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSlots {
    initial: Option<ResultSet>,
    reranked: Option<ResultSet>,
}

impl ResultSlots {
    pub fn record_initial(&mut self, results: ResultSet) {
        self.initial = Some(results);
    }

    pub fn record_reranked(&mut self, results: ResultSet) {
        self.reranked = Some(results);
    }

    pub fn initial(&self) -> Option<&ResultSet> {
        self.initial.as_ref()
    }

    pub fn reranked(&self) -> Option<&ResultSet> {
        self.reranked.as_ref()
    }

    /// The result set a session resolves with: reranked wins over initial.
    pub fn current(&self) -> Option<&ResultSet> {
        self.reranked.as_ref().or(self.initial.as_ref())
    }

    pub fn phase(&self) -> SearchPhase {
        match (&self.initial, &self.reranked) {
            (_, Some(_)) => SearchPhase::Reranked,
            (Some(_), None) => SearchPhase::Ranked,
            (None, None) => SearchPhase::Loading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(text: &str) -> ResultSet {
        ResultSet {
            hits: Vec::new(),
            summary: Some(text.into()),
        }
    }

    #[test]
    fn empty_slots_are_loading() {
        let slots = ResultSlots::default();
        assert_eq!(slots.phase(), SearchPhase::Loading);
        assert!(slots.current().is_none());
    }

    #[test]
    fn reranked_overrides_initial_regardless_of_arrival_order() {
        let mut slots = ResultSlots::default();
        slots.record_reranked(summary("reranked"));
        slots.record_initial(summary("late initial"));
        assert_eq!(slots.phase(), SearchPhase::Reranked);
        assert_eq!(slots.current(), Some(&summary("reranked")));
        assert_eq!(slots.initial(), Some(&summary("late initial")));
    }

    #[test]
    fn later_result_of_same_kind_replaces_earlier() {
        let mut slots = ResultSlots::default();
        slots.record_initial(summary("first"));
        slots.record_initial(summary("second"));
        assert_eq!(slots.phase(), SearchPhase::Ranked);
        assert_eq!(slots.current(), Some(&summary("second")));
    }
}
