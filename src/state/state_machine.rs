use thiserror::Error;

/// Lifecycle phase of a single game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Lobby: players may join, no question has been shown yet.
    Waiting,
    /// The question at `index` is live and accepting answers.
    QuestionLive {
        /// Index of the live question within the frozen question set.
        index: usize,
    },
    /// The question at `index` has ended; the correct answer and the
    /// leaderboard are being revealed.
    QuestionResults {
        /// Index of the question whose results are shown.
        index: usize,
    },
    /// Terminal state: every question has been played.
    Finished,
}

impl SessionPhase {
    /// Index of the question the phase refers to, if any.
    pub fn question_index(&self) -> Option<usize> {
        match self {
            SessionPhase::QuestionLive { index } | SessionPhase::QuestionResults { index } => {
                Some(*index)
            }
            _ => None,
        }
    }
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Host starts the game from the lobby.
    Start,
    /// End the live question at `index`, freezing its answer window.
    /// Triggered by the host or by the question timer, whichever fires first.
    EndQuestion {
        /// Index the caller believes is live; mismatches are rejected.
        index: usize,
    },
    /// Leave the results window: show the next question or finish the game.
    Advance,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// State machine driving the `waiting -> live -> results -> ... -> finished`
/// flow of one session.
///
/// Transitions validate against the current phase before being applied, so a
/// duplicate `EndQuestion` (timer racing a host click) fails with
/// [`InvalidTransition`] instead of transitioning twice. The question index is
/// monotonically non-decreasing by construction of the transition table.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: u64,
    question_count: usize,
}

impl SessionStateMachine {
    /// Create a machine in the lobby phase for a frozen set of
    /// `question_count` questions.
    pub fn new(question_count: usize) -> Self {
        Self {
            phase: SessionPhase::Waiting,
            version: 0,
            question_count,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Transition counter; increments exactly once per applied event.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of questions in the frozen sequence.
    pub fn question_count(&self) -> usize {
        self.question_count
    }

    /// Index of the question currently accepting answers, if any.
    pub fn live_index(&self) -> Option<usize> {
        match &self.phase {
            SessionPhase::QuestionLive { index } => Some(*index),
            _ => None,
        }
    }

    /// Apply an event, moving to the next phase when the transition is valid.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    /// Compute the phase an event would lead to without applying it.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Waiting, SessionEvent::Start) => SessionPhase::QuestionLive { index: 0 },
            (SessionPhase::QuestionLive { index }, SessionEvent::EndQuestion { index: expected })
                if index == expected =>
            {
                SessionPhase::QuestionResults { index }
            }
            (SessionPhase::QuestionResults { index }, SessionEvent::Advance) => {
                if index + 1 < self.question_count {
                    SessionPhase::QuestionLive { index: index + 1 }
                } else {
                    SessionPhase::Finished
                }
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionPhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_waiting() {
        let sm = SessionStateMachine::new(3);
        assert_eq!(sm.phase(), SessionPhase::Waiting);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn full_happy_path_through_two_questions() {
        let mut sm = SessionStateMachine::new(2);

        assert_eq!(
            apply(&mut sm, SessionEvent::Start),
            SessionPhase::QuestionLive { index: 0 }
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::EndQuestion { index: 0 }),
            SessionPhase::QuestionResults { index: 0 }
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::Advance),
            SessionPhase::QuestionLive { index: 1 }
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::EndQuestion { index: 1 }),
            SessionPhase::QuestionResults { index: 1 }
        );
        assert_eq!(apply(&mut sm, SessionEvent::Advance), SessionPhase::Finished);
        assert_eq!(sm.version(), 5);
    }

    #[test]
    fn duplicate_end_question_is_rejected() {
        let mut sm = SessionStateMachine::new(1);
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::EndQuestion { index: 0 });

        let err = sm.apply(SessionEvent::EndQuestion { index: 0 }).unwrap_err();
        assert_eq!(err.from, SessionPhase::QuestionResults { index: 0 });
        assert_eq!(sm.version(), 2);
    }

    #[test]
    fn stale_end_question_index_is_rejected() {
        let mut sm = SessionStateMachine::new(2);
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::EndQuestion { index: 0 });
        apply(&mut sm, SessionEvent::Advance);

        // A leaked timer for question 0 must not end question 1.
        assert!(sm.apply(SessionEvent::EndQuestion { index: 0 }).is_err());
        assert_eq!(sm.phase(), SessionPhase::QuestionLive { index: 1 });
    }

    #[test]
    fn cannot_start_twice() {
        let mut sm = SessionStateMachine::new(1);
        apply(&mut sm, SessionEvent::Start);
        let err = sm.apply(SessionEvent::Start).unwrap_err();
        assert_eq!(err.from, SessionPhase::QuestionLive { index: 0 });
        assert_eq!(err.event, SessionEvent::Start);
    }

    #[test]
    fn advance_from_lobby_is_rejected() {
        let mut sm = SessionStateMachine::new(1);
        assert!(sm.apply(SessionEvent::Advance).is_err());
        assert!(sm.apply(SessionEvent::EndQuestion { index: 0 }).is_err());
        assert_eq!(sm.phase(), SessionPhase::Waiting);
    }

    #[test]
    fn finished_is_terminal() {
        let mut sm = SessionStateMachine::new(1);
        apply(&mut sm, SessionEvent::Start);
        apply(&mut sm, SessionEvent::EndQuestion { index: 0 });
        apply(&mut sm, SessionEvent::Advance);
        assert_eq!(sm.phase(), SessionPhase::Finished);

        assert!(sm.apply(SessionEvent::Start).is_err());
        assert!(sm.apply(SessionEvent::Advance).is_err());
        assert!(sm.apply(SessionEvent::EndQuestion { index: 0 }).is_err());
    }
}
