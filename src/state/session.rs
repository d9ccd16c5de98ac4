use std::{
    collections::HashMap,
    time::{Instant, SystemTime},
};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dao::models::{
        AnswerEntity, PlayerEntity, QuestionEntity, SessionEntity, SessionStatusEntity,
    },
    error::SessionError,
    state::{
        scoring,
        state_machine::{SessionEvent, SessionPhase, SessionStateMachine},
    },
};

/// A question frozen into a session at creation time. Immutable thereafter:
/// edits to the source quiz never reach a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Question text shown to players.
    pub text: String,
    /// Answer options; at least two.
    pub options: Vec<String>,
    /// Zero-based index of the correct option.
    pub correct_index: usize,
}

/// Player roster entry tracked during a session.
#[derive(Debug, Clone)]
pub struct Player {
    /// Display nickname, unique (case-sensitive) within the session.
    pub nickname: String,
    /// Cumulative score; only ever incremented.
    pub score: u32,
    /// Wall-clock join timestamp.
    pub joined_at: SystemTime,
}

/// Accepted answer for one (player, question) pair. Created once, immutable.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Chosen option index.
    pub option_index: usize,
    /// Seconds between question start and submission, server-measured.
    pub time_taken_secs: f64,
    /// Whether the chosen option matched the frozen correct index.
    pub is_correct: bool,
    /// Points awarded.
    pub points: u32,
    /// Per-session acceptance order.
    pub order: u64,
}

/// One row of the derived leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Player the entry belongs to.
    pub player_id: Uuid,
    /// Player nickname.
    pub nickname: String,
    /// Cumulative score.
    pub score: u32,
    /// 1-based position in the score-descending order. Ties receive distinct
    /// consecutive ranks, join order breaking them stably.
    pub rank: u32,
}

/// Authoritative state of one hosted quiz session: frozen questions, the
/// lifecycle state machine, the player roster, and the answer ledger.
///
/// All mutation happens behind the per-session lock held by the session
/// handle, so methods here can assume single-writer semantics.
#[derive(Debug)]
pub struct GameSession {
    /// Primary key of the session.
    pub id: Uuid,
    /// Join PIN, unique among active sessions.
    pub pin: String,
    /// Quiz the question snapshot was taken from.
    pub quiz_id: Uuid,
    /// Seconds each question stays live.
    pub time_limit_secs: u32,
    questions: Vec<Question>,
    machine: SessionStateMachine,
    players: IndexMap<Uuid, Player>,
    answers: HashMap<(Uuid, usize), Answer>,
    next_answer_order: u64,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Timestamp of the last accepted mutation; drives idle reclaim.
    pub updated_at: SystemTime,
    question_started_at: Option<Instant>,
}

impl GameSession {
    /// Build a fresh session in the lobby phase around a frozen question
    /// snapshot. The PIN must already be claimed by the caller.
    pub fn new(quiz_id: Uuid, pin: String, time_limit_secs: u32, questions: Vec<Question>) -> Self {
        let now = SystemTime::now();
        let machine = SessionStateMachine::new(questions.len());
        Self {
            id: Uuid::new_v4(),
            pin,
            quiz_id,
            time_limit_secs,
            questions,
            machine,
            players: IndexMap::new(),
            answers: HashMap::new(),
            next_answer_order: 0,
            created_at: now,
            updated_at: now,
            question_started_at: None,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Transition counter of the underlying state machine.
    pub fn version(&self) -> u64 {
        self.machine.version()
    }

    /// Number of questions frozen into the session.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Question at `index` within the frozen sequence.
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Roster of joined players in join order.
    pub fn players(&self) -> &IndexMap<Uuid, Player> {
        &self.players
    }

    /// Look up a single player.
    pub fn player(&self, id: Uuid) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Seconds elapsed since the live question started, measured on the
    /// server clock. `None` outside a live question.
    pub fn elapsed_secs(&self) -> Option<f64> {
        self.question_started_at
            .map(|started| started.elapsed().as_secs_f64())
    }

    /// Add a player to the roster.
    ///
    /// The nickname is trimmed, must be non-empty, and must be unique
    /// (case-sensitive) within the session. Check-and-insert happens under
    /// the session lock, so two simultaneous joiners with the same nickname
    /// cannot both succeed. Phase gating (lobby only) is the caller's job.
    pub fn join(&mut self, nickname: &str) -> Result<(Uuid, Player), SessionError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(SessionError::InvalidNickname);
        }
        if self.players.values().any(|p| p.nickname == nickname) {
            return Err(SessionError::NicknameTaken(nickname.to_owned()));
        }

        let id = Uuid::new_v4();
        let player = Player {
            nickname: nickname.to_owned(),
            score: 0,
            joined_at: SystemTime::now(),
        };
        self.players.insert(id, player.clone());
        self.touch();
        Ok((id, player))
    }

    /// Start the game: requires at least one joined player, then transitions
    /// to the first live question and stamps its start instant.
    pub fn start(&mut self) -> Result<SessionPhase, SessionError> {
        if self.players.is_empty() {
            return Err(SessionError::NoPlayers);
        }
        let next = self.machine.apply(SessionEvent::Start)?;
        self.question_started_at = Some(Instant::now());
        self.touch();
        Ok(next)
    }

    /// Freeze the answer window of the question at `index`.
    ///
    /// Valid only while that exact question is live; a duplicate trigger
    /// (host click racing the timer) fails the transition and leaves the
    /// session untouched, so the caller broadcasts at most once.
    pub fn end_question(&mut self, index: usize) -> Result<SessionPhase, SessionError> {
        let next = self.machine.apply(SessionEvent::EndQuestion { index })?;
        self.question_started_at = None;
        self.touch();
        Ok(next)
    }

    /// Leave the results window: next question or the terminal phase.
    pub fn advance(&mut self) -> Result<SessionPhase, SessionError> {
        let next = self.machine.apply(SessionEvent::Advance)?;
        if matches!(next, SessionPhase::QuestionLive { .. }) {
            self.question_started_at = Some(Instant::now());
        }
        self.touch();
        Ok(next)
    }

    /// Record an answer and apply its score delta.
    ///
    /// Preconditions, checked in order: the submitted question must be the
    /// live one (`StaleQuestion`), the player must exist (`UnknownPlayer`),
    /// no prior answer for this (player, question) may exist
    /// (`DuplicateAnswer`), and the option must be in bounds
    /// (`InvalidOption`). Insert and score increment happen together under
    /// the session lock, so concurrent duplicates cannot both land.
    pub fn submit_answer(
        &mut self,
        player_id: Uuid,
        question_index: usize,
        option_index: usize,
        time_taken_secs: f64,
    ) -> Result<Answer, SessionError> {
        if self.machine.live_index() != Some(question_index) {
            return Err(SessionError::StaleQuestion {
                submitted: question_index,
            });
        }
        if !self.players.contains_key(&player_id) {
            return Err(SessionError::UnknownPlayer { player_id });
        }
        if self.answers.contains_key(&(player_id, question_index)) {
            return Err(SessionError::DuplicateAnswer { question_index });
        }

        // live_index is a valid index into the frozen sequence by the state
        // machine's construction.
        let question = &self.questions[question_index];
        if option_index >= question.options.len() {
            return Err(SessionError::InvalidOption {
                option_index,
                option_count: question.options.len(),
            });
        }

        let is_correct = option_index == question.correct_index;
        let points = scoring::points(is_correct, time_taken_secs, self.time_limit_secs);

        let answer = Answer {
            option_index,
            time_taken_secs,
            is_correct,
            points,
            order: self.next_answer_order,
        };
        self.next_answer_order += 1;
        self.answers.insert((player_id, question_index), answer.clone());
        if let Some(player) = self.players.get_mut(&player_id) {
            player.score += points;
        }
        self.touch();
        Ok(answer)
    }

    /// Number of answers accepted for the question at `index`.
    pub fn answer_count(&self, index: usize) -> usize {
        self.answers.keys().filter(|(_, q)| *q == index).count()
    }

    /// Recompute the leaderboard from current scores.
    ///
    /// Sorted descending by score; the sort is stable over join order, so
    /// tied players keep their relative order and receive distinct
    /// consecutive ranks.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<(Uuid, &Player)> =
            self.players.iter().map(|(id, p)| (*id, p)).collect();
        entries.sort_by(|a, b| b.1.score.cmp(&a.1.score));

        entries
            .into_iter()
            .enumerate()
            .map(|(position, (player_id, player))| LeaderboardEntry {
                player_id,
                nickname: player.nickname.clone(),
                score: player.score,
                rank: position as u32 + 1,
            })
            .collect()
    }

    /// Coarse status used for persistence and REST summaries.
    pub fn status(&self) -> SessionStatusEntity {
        match self.phase() {
            SessionPhase::Waiting => SessionStatusEntity::Waiting,
            SessionPhase::QuestionLive { .. } | SessionPhase::QuestionResults { .. } => {
                SessionStatusEntity::Active
            }
            SessionPhase::Finished => SessionStatusEntity::Finished,
        }
    }

    fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Self {
            text: value.text,
            options: value.options,
            correct_index: value.correct_index,
        }
    }
}

impl From<Question> for QuestionEntity {
    fn from(value: Question) -> Self {
        Self {
            text: value.text,
            options: value.options,
            correct_index: value.correct_index,
        }
    }
}

impl From<&GameSession> for SessionEntity {
    fn from(session: &GameSession) -> Self {
        let mut answers: Vec<AnswerEntity> = session
            .answers
            .iter()
            .map(|((player_id, question_index), answer)| AnswerEntity {
                player_id: *player_id,
                question_index: *question_index,
                option_index: answer.option_index,
                time_taken_secs: answer.time_taken_secs,
                points: answer.points,
                order: answer.order,
            })
            .collect();
        answers.sort_by_key(|a| a.order);

        Self {
            id: session.id,
            pin: session.pin.clone(),
            quiz_id: session.quiz_id,
            status: session.status(),
            current_question_index: session.phase().question_index(),
            players: session
                .players
                .iter()
                .map(|(id, player)| PlayerEntity {
                    id: *id,
                    nickname: player.nickname.clone(),
                    score: player.score,
                    joined_at: player.joined_at,
                })
                .collect(),
            answers,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_questions() -> Vec<Question> {
        vec![
            Question {
                text: "What is 2 + 2?".into(),
                options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
                correct_index: 1,
            },
            Question {
                text: "Largest planet?".into(),
                options: vec!["Mars".into(), "Jupiter".into()],
                correct_index: 1,
            },
        ]
    }

    fn session() -> GameSession {
        GameSession::new(Uuid::new_v4(), "123456".into(), 10, sample_questions())
    }

    #[test]
    fn join_trims_and_rejects_empty_nicknames() {
        let mut s = session();
        assert!(matches!(
            s.join("   "),
            Err(SessionError::InvalidNickname)
        ));
        let (_, player) = s.join("  alice  ").unwrap();
        assert_eq!(player.nickname, "alice");
    }

    #[test]
    fn join_rejects_duplicate_nicknames_case_sensitively() {
        let mut s = session();
        s.join("alice").unwrap();
        assert!(matches!(
            s.join("alice"),
            Err(SessionError::NicknameTaken(_))
        ));
        // Different case is a different nickname.
        s.join("Alice").unwrap();
        assert_eq!(s.players().len(), 2);
    }

    #[test]
    fn start_requires_a_player() {
        let mut s = session();
        assert!(matches!(s.start(), Err(SessionError::NoPlayers)));
        s.join("alice").unwrap();
        assert_eq!(s.start().unwrap(), SessionPhase::QuestionLive { index: 0 });
    }

    #[test]
    fn submit_rejects_answers_outside_the_live_window() {
        let mut s = session();
        let (alice, _) = s.join("alice").unwrap();

        // Nothing live yet.
        assert!(matches!(
            s.submit_answer(alice, 0, 1, 1.0),
            Err(SessionError::StaleQuestion { submitted: 0 })
        ));

        s.start().unwrap();
        // Wrong index while question 0 is live.
        assert!(matches!(
            s.submit_answer(alice, 1, 1, 1.0),
            Err(SessionError::StaleQuestion { submitted: 1 })
        ));

        s.end_question(0).unwrap();
        // Results window is frozen.
        assert!(matches!(
            s.submit_answer(alice, 0, 1, 1.0),
            Err(SessionError::StaleQuestion { submitted: 0 })
        ));
    }

    #[test]
    fn submit_rejects_duplicates_and_out_of_bounds_options() {
        let mut s = session();
        let (alice, _) = s.join("alice").unwrap();
        s.start().unwrap();

        assert!(matches!(
            s.submit_answer(alice, 0, 9, 1.0),
            Err(SessionError::InvalidOption {
                option_index: 9,
                option_count: 4
            })
        ));

        s.submit_answer(alice, 0, 1, 2.0).unwrap();
        assert!(matches!(
            s.submit_answer(alice, 0, 0, 3.0),
            Err(SessionError::DuplicateAnswer { question_index: 0 })
        ));
        // The rejected duplicate must not touch the score.
        assert_eq!(s.player(alice).unwrap().score, 900);
    }

    #[test]
    fn submit_rejects_unknown_players() {
        let mut s = session();
        s.join("alice").unwrap();
        s.start().unwrap();
        let ghost = Uuid::new_v4();
        assert!(matches!(
            s.submit_answer(ghost, 0, 1, 1.0),
            Err(SessionError::UnknownPlayer { .. })
        ));
    }

    #[test]
    fn reference_scoring_scenario() {
        // Quiz with options ["3","4","5","6"], correct index 1, limit 10s.
        let mut s = session();
        let (alice, _) = s.join("alice").unwrap();
        let (bob, _) = s.join("bob").unwrap();
        s.start().unwrap();

        let a = s.submit_answer(alice, 0, 1, 2.0).unwrap();
        assert!(a.is_correct);
        assert_eq!(a.points, 900);

        let b = s.submit_answer(bob, 0, 0, 5.0).unwrap();
        assert!(!b.is_correct);
        assert_eq!(b.points, 0);

        let board = s.leaderboard();
        assert_eq!(board.len(), 2);
        assert_eq!((board[0].nickname.as_str(), board[0].score, board[0].rank), ("alice", 900, 1));
        assert_eq!((board[1].nickname.as_str(), board[1].score, board[1].rank), ("bob", 0, 2));
    }

    #[test]
    fn leaderboard_breaks_ties_by_join_order() {
        let mut s = session();
        let (_alice, _) = s.join("alice").unwrap();
        let (_bob, _) = s.join("bob").unwrap();
        s.start().unwrap();

        let board = s.leaderboard();
        assert_eq!(board[0].nickname, "alice");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].nickname, "bob");
        assert_eq!(board[1].rank, 2);
    }

    #[test]
    fn answers_accumulate_across_questions() {
        let mut s = session();
        let (alice, _) = s.join("alice").unwrap();
        s.start().unwrap();
        s.submit_answer(alice, 0, 1, 0.0).unwrap();
        s.end_question(0).unwrap();
        s.advance().unwrap();
        s.submit_answer(alice, 1, 1, 0.0).unwrap();

        assert_eq!(s.player(alice).unwrap().score, 2000);
        assert_eq!(s.answer_count(0), 1);
        assert_eq!(s.answer_count(1), 1);
    }

    #[test]
    fn snapshot_entity_reflects_session_state() {
        let mut s = session();
        let (alice, _) = s.join("alice").unwrap();
        s.start().unwrap();
        s.submit_answer(alice, 0, 1, 1.0).unwrap();

        let entity: SessionEntity = (&s).into();
        assert_eq!(entity.status, SessionStatusEntity::Active);
        assert_eq!(entity.current_question_index, Some(0));
        assert_eq!(entity.players.len(), 1);
        assert_eq!(entity.answers.len(), 1);
        assert_eq!(entity.answers[0].player_id, alice);
    }
}
