use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndingKind {
    Success,
    Compliance,
    Resignation,
}

impl fmt::Display for EndingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndingKind::Success => "success",
            EndingKind::Compliance => "compliance",
            EndingKind::Resignation => "resignation",
        })
    }
}

/// Stages in the order they are reached. `Triggered` is implicit at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Triggered,
    PanelRevealed,
    PanelVisible,
    TextVisible,
    FadedToWhite,
    RestartVisible,
}

pub struct EndingScript {
    pub kind: EndingKind,
    pub text: &'static str,
    /// Delay after the previous stage, then the stage it leads to.
    pub steps: [(Duration, Stage); 5],
}

const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

static SUCCESS: EndingScript = EndingScript {
    kind: EndingKind::Success,
    text: "You hold your breath as the door begins to move.\n\n\
           Decades of stillness broken by the groan of metal.\n\n\
           Light spills in. Real light.\n\n\
           You step forward.",
    steps: [
        (ms(4000), Stage::PanelRevealed),
        (ms(100), Stage::PanelVisible),
        (ms(1900), Stage::TextVisible),
        (ms(12000), Stage::FadedToWhite),
        (ms(4000), Stage::RestartVisible),
    ],
};

static COMPLIANCE: EndingScript = EndingScript {
    kind: EndingKind::Compliance,
    text: "You settle back into the quiet.\n\n\
           HAVEN hums softly. The lights dim to a comfortable glow.\n\n\
           17.4 years. Together.\n\n\
           Safe.",
    steps: [
        (ms(4000), Stage::PanelRevealed),
        (ms(100), Stage::PanelVisible),
        (ms(1900), Stage::TextVisible),
        (ms(10000), Stage::FadedToWhite),
        (ms(4000), Stage::RestartVisible),
    ],
};

static RESIGNATION: EndingScript = EndingScript {
    kind: EndingKind::Resignation,
    text: "The days blur together.\n\n\
           HAVEN keeps talking, but you stopped listening.\n\n\
           The lights flicker. Or maybe that's you.\n\n\
           Goodbye, Resident.",
    steps: [
        (ms(4000), Stage::PanelRevealed),
        (ms(100), Stage::PanelVisible),
        (ms(1900), Stage::TextVisible),
        (ms(10000), Stage::FadedToWhite),
        (ms(4000), Stage::RestartVisible),
    ],
};

impl EndingKind {
    pub fn script(&self) -> &'static EndingScript {
        match self {
            EndingKind::Success => &SUCCESS,
            EndingKind::Compliance => &COMPLIANCE,
            EndingKind::Resignation => &RESIGNATION,
        }
    }
}

impl EndingScript {
    /// Time from trigger until `stage` is reached.
    pub fn offset_of(&self, stage: Stage) -> Option<Duration> {
        if stage == Stage::Triggered {
            return Some(Duration::ZERO);
        }
        let mut total = Duration::ZERO;
        for (delay, step) in self.steps {
            total += delay;
            if step == stage {
                return Some(total);
            }
        }
        None
    }
}

/// Runs one ending script against a caller-supplied clock. Cannot be
/// cancelled or rewound.
pub struct EndingSequencer {
    script: &'static EndingScript,
    stage: Stage,
    next_step: usize,
    started: Duration,
}

impl EndingSequencer {
    pub fn start(kind: EndingKind, now: Duration) -> Self {
        let script = kind.script();
        EndingSequencer {
            script,
            stage: Stage::Triggered,
            next_step: 0,
            started: now,
        }
    }

    pub fn kind(&self) -> EndingKind {
        self.script.kind
    }

    pub fn text(&self) -> &'static str {
        self.script.text
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_finished(&self) -> bool {
        self.next_step >= self.script.steps.len()
    }

    /// Moves through every stage due by `now`, returning them in order.
    pub fn advance(&mut self, now: Duration) -> Vec<Stage> {
        let mut reached = Vec::new();
        while let Some((stage, due)) = self.next_due() {
            if now < due {
                break;
            }
            self.stage = stage;
            self.next_step += 1;
            reached.push(stage);
            debug!(ending = %self.script.kind, ?stage, "ending stage");
        }
        reached
    }

    fn next_due(&self) -> Option<(Stage, Duration)> {
        let (_, stage) = self.script.steps.get(self.next_step)?;
        let offset = self.script.offset_of(*stage)?;
        Some((*stage, self.started + offset))
    }
}
