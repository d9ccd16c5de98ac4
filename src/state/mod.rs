pub mod scoring;
pub mod session;
mod sse;
pub mod state_machine;

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use rand::Rng;
use tokio::sync::{Mutex, RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::quiz_store::QuizStore,
    error::{ServiceError, SessionError},
};

pub use self::session::GameSession;
pub use self::sse::SseHub;
pub use self::state_machine::{SessionEvent, SessionPhase};

pub type SharedState = Arc<AppState>;

/// One hosted session: the locked session data plus its broadcast hub.
///
/// All reads and writes of the session go through the mutex; broadcasting
/// while the lock is held keeps the event stream in mutation order.
pub struct SessionHandle {
    /// Locked session state.
    pub session: Mutex<GameSession>,
    /// Broadcast hub for the session's SSE subscribers.
    pub sse: SseHub,
}

impl SessionHandle {
    fn new(session: GameSession, sse_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(session),
            sse: SseHub::new(sse_capacity),
        })
    }
}

/// Central application state: the session registry, the PIN index, and the
/// database handle.
pub struct AppState {
    config: AppConfig,
    quiz_store: RwLock<Option<Arc<dyn QuizStore>>>,
    sessions: DashMap<Uuid, Arc<SessionHandle>>,
    pins: DashMap<String, Uuid>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            quiz_store: RwLock::new(None),
            sessions: DashMap::new(),
            pins: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current quiz store, if one is installed.
    pub async fn quiz_store(&self) -> Option<Arc<dyn QuizStore>> {
        let guard = self.quiz_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the quiz store or fail with the degraded-mode error.
    pub async fn require_quiz_store(&self) -> Result<Arc<dyn QuizStore>, ServiceError> {
        self.quiz_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new quiz store implementation and leave degraded mode.
    pub async fn install_quiz_store(&self, store: Arc<dyn QuizStore>) {
        {
            let mut guard = self.quiz_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current quiz store and enter degraded mode.
    pub async fn clear_quiz_store(&self) {
        {
            let mut guard = self.quiz_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.quiz_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Registry of live sessions keyed by session id.
    pub fn sessions(&self) -> &DashMap<Uuid, Arc<SessionHandle>> {
        &self.sessions
    }

    /// Handle for the session with the given id.
    pub fn session(&self, id: Uuid) -> Option<Arc<SessionHandle>> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Handle for the session currently holding the given PIN.
    pub fn session_by_pin(&self, pin: &str) -> Option<Arc<SessionHandle>> {
        let id = *self.pins.get(pin)?.value();
        self.session(id)
    }

    /// Register a new session: claim a unique PIN, insert the handle, and
    /// index the PIN.
    pub fn register_session(
        &self,
        build: impl FnOnce(String) -> GameSession,
    ) -> Result<Arc<SessionHandle>, SessionError> {
        let pin = self.claim_pin(
            || random_pin(self.config.pin_length),
            self.config.pin_max_attempts,
        )?;
        let session = build(pin.clone());
        let id = session.id;
        let handle = SessionHandle::new(session, self.config.sse_capacity);
        self.sessions.insert(id, handle.clone());
        // Point the claimed PIN at its session.
        if let Some(mut slot) = self.pins.get_mut(&pin) {
            *slot = id;
        }
        Ok(handle)
    }

    /// Drop a session from the registry and release its PIN.
    pub fn remove_session(&self, id: Uuid, pin: &str) {
        self.sessions.remove(&id);
        self.pins.remove(pin);
    }

    /// Claim a PIN not currently held by any session.
    ///
    /// Candidates come from `generate`; each claim attempt is an atomic
    /// check-and-insert on the PIN index, so two concurrent creators can
    /// never both win the same PIN. Gives up after `max_attempts` collisions.
    fn claim_pin(
        &self,
        mut generate: impl FnMut() -> String,
        max_attempts: u32,
    ) -> Result<String, SessionError> {
        for _ in 0..max_attempts {
            let candidate = generate();
            if let Entry::Vacant(slot) = self.pins.entry(candidate.clone()) {
                slot.insert(Uuid::nil());
                return Ok(candidate);
            }
        }
        Err(SessionError::GenerationExhausted {
            attempts: max_attempts,
        })
    }

    /// Update and broadcast the degraded flag when the value changes.
    async fn update_degraded(&self, value: bool) {
        if self.is_degraded().await == value {
            return;
        }

        let _ = self.degraded.send(value);
    }
}

/// Uniform random numeric PIN of `length` digits, leading zeros allowed.
fn random_pin(length: u32) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::Question;

    fn test_state() -> SharedState {
        AppState::new(AppConfig::default())
    }

    fn one_question() -> Vec<Question> {
        vec![Question {
            text: "q".into(),
            options: vec!["a".into(), "b".into()],
            correct_index: 0,
        }]
    }

    #[test]
    fn random_pin_has_requested_length_and_digits_only() {
        for length in [4, 5, 6] {
            let pin = random_pin(length);
            assert_eq!(pin.len(), length as usize);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn claim_pin_skips_collisions() {
        let state = test_state();
        let mut sequence = vec!["1111", "1111", "2222"].into_iter();
        let first = state
            .claim_pin(|| sequence.next().unwrap().to_owned(), 10)
            .unwrap();
        assert_eq!(first, "1111");

        let mut sequence = vec!["1111", "1111", "2222"].into_iter();
        let second = state
            .claim_pin(|| sequence.next().unwrap().to_owned(), 10)
            .unwrap();
        assert_eq!(second, "2222");
    }

    #[test]
    fn claim_pin_reports_exhaustion() {
        let state = test_state();
        state.claim_pin(|| "9999".to_owned(), 10).unwrap();
        let err = state.claim_pin(|| "9999".to_owned(), 3).unwrap_err();
        assert!(matches!(
            err,
            SessionError::GenerationExhausted { attempts: 3 }
        ));
    }

    #[test]
    fn register_session_indexes_the_pin() {
        let state = test_state();
        let handle = state
            .register_session(|pin| {
                GameSession::new(Uuid::new_v4(), pin, 10, one_question())
            })
            .unwrap();

        let (id, pin) = {
            let session = handle.session.try_lock().unwrap();
            (session.id, session.pin.clone())
        };
        assert!(state.session(id).is_some());
        assert!(state.session_by_pin(&pin).is_some());

        state.remove_session(id, &pin);
        assert!(state.session(id).is_none());
        assert!(state.session_by_pin(&pin).is_none());
    }
}
