use crate::stimulus::Screen;
use serde::{Deserialize, Serialize};

/// Which kind of trial block a phase runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Practice,
    Experiment,
}

impl BlockKind {
    pub fn is_practice(&self) -> bool {
        matches!(self, BlockKind::Practice)
    }
}

/// Defines session phases and what each one shows or runs
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn next(&self) -> Option<Self>;

    /// Screen shown on entering the phase; the session waits for SPACE to leave it.
    fn screen(&self) -> Option<Screen> {
        None
    }

    /// Trial block run by the phase.
    fn block(&self) -> Option<BlockKind> {
        None
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SartPhase {
    #[default]
    Instructions,
    Practice,
    PracticeComplete,
    Experiment,
    Debrief,
}

impl Phase for SartPhase {
    fn next(&self) -> Option<Self> {
        use SartPhase::*;
        Some(match self {
            Instructions => Practice,
            Practice => PracticeComplete,
            PracticeComplete => Experiment,
            Experiment => Debrief,
            Debrief => return None,
        })
    }

    fn screen(&self) -> Option<Screen> {
        match self {
            SartPhase::Instructions => Some(Screen::Instructions),
            SartPhase::PracticeComplete => Some(Screen::PracticeComplete),
            SartPhase::Debrief => Some(Screen::Debrief),
            SartPhase::Practice | SartPhase::Experiment => None,
        }
    }

    fn block(&self) -> Option<BlockKind> {
        match self {
            SartPhase::Practice => Some(BlockKind::Practice),
            SartPhase::Experiment => Some(BlockKind::Experiment),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_walk_to_debrief_and_stop() {
        let mut phase = SartPhase::default();
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            phase = next;
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                SartPhase::Instructions,
                SartPhase::Practice,
                SartPhase::PracticeComplete,
                SartPhase::Experiment,
                SartPhase::Debrief,
            ]
        );
    }

    #[test]
    fn only_block_phases_run_trials() {
        assert_eq!(SartPhase::Practice.block(), Some(BlockKind::Practice));
        assert_eq!(SartPhase::Experiment.block(), Some(BlockKind::Experiment));
        assert_eq!(SartPhase::Instructions.block(), None);
        assert_eq!(SartPhase::Practice.screen(), None);
        assert_eq!(SartPhase::Debrief.screen(), Some(Screen::Debrief));
    }
}
