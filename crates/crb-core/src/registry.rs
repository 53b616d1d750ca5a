use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    domain::UserId,
    store::{FileStore, Table},
    Result,
};

pub const DEFAULT_TEMPERATURE: f64 = 0.5;

#[derive(Debug, Default)]
struct RegistryState {
    history: BTreeMap<String, Vec<String>>,
    temperature: BTreeMap<String, f64>,
    /// Bumped by every reset. Not persisted.
    topics: HashMap<UserId, u64>,
}

impl RegistryState {
    fn history_mut(&mut self, user: UserId) -> &mut Vec<String> {
        self.history.entry(user.key()).or_default()
    }

    fn temperature_mut(&mut self, user: UserId) -> &mut f64 {
        self.temperature
            .entry(user.key())
            .or_insert(DEFAULT_TEMPERATURE)
    }
}

/// Per-user mutual exclusion for read-modify-persist sequences.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub async fn lock_user(&self, user: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Only the map holds an idle lock; anyone holding or waiting has a clone.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(user)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Owner of all per-user conversation state.
///
/// Constructed from the store at startup, written through on every mutation and
/// flushed once more at shutdown. Reads never fail: unknown users are
/// materialized with an empty history and the default temperature.
pub struct UserStateRegistry {
    store: FileStore,
    state: Mutex<RegistryState>,
    locks: UserLocks,
}

impl UserStateRegistry {
    pub fn open(store: FileStore) -> Result<Self> {
        let history = store.load::<Vec<String>>(Table::ConversationHistory)?;
        let temperature = store.load::<f64>(Table::Temperature)?;
        tracing::info!(
            users_with_history = history.len(),
            users_with_temperature = temperature.len(),
            "loaded user state from {}",
            store.dir().display()
        );

        Ok(Self {
            store,
            state: Mutex::new(RegistryState {
                history,
                temperature,
                topics: HashMap::new(),
            }),
            locks: UserLocks::default(),
        })
    }

    /// Hold this guard across a whole read → complete → append sequence.
    pub async fn lock_user(&self, user: UserId) -> OwnedMutexGuard<()> {
        self.locks.lock_user(user).await
    }

    /// Materialize both defaults for `user` (no persistence).
    pub async fn ensure_user(&self, user: UserId) {
        let mut st = self.state.lock().await;
        st.history_mut(user);
        st.temperature_mut(user);
    }

    pub async fn history(&self, user: UserId) -> Vec<String> {
        let mut st = self.state.lock().await;
        st.history_mut(user).clone()
    }

    pub async fn append_turns<I>(&self, user: UserId, turns: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let mut st = self.state.lock().await;
        st.history_mut(user).extend(turns);
        self.store.save(Table::ConversationHistory, &st.history)
    }

    /// Current topic of `user`. Changes whenever the history is reset.
    pub async fn topic(&self, user: UserId) -> u64 {
        let st = self.state.lock().await;
        st.topics.get(&user).copied().unwrap_or_default()
    }

    /// Append `turns` only if no reset happened since `topic` was read.
    ///
    /// Returns `false` (and writes nothing) when the exchange belongs to a
    /// topic the user has already abandoned.
    pub async fn append_turns_in_topic<I>(
        &self,
        user: UserId,
        topic: u64,
        turns: I,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = String>,
    {
        let mut st = self.state.lock().await;
        if st.topics.get(&user).copied().unwrap_or_default() != topic {
            return Ok(false);
        }
        st.history_mut(user).extend(turns);
        self.store.save(Table::ConversationHistory, &st.history)?;
        Ok(true)
    }

    pub async fn temperature(&self, user: UserId) -> f64 {
        let mut st = self.state.lock().await;
        *st.temperature_mut(user)
    }

    /// Store a new temperature, clamped to `[0.0, 1.0]`. Returns the stored value.
    pub async fn set_temperature(&self, user: UserId, value: f64) -> Result<f64> {
        let value = if value.is_nan() {
            DEFAULT_TEMPERATURE
        } else {
            value.clamp(0.0, 1.0)
        };
        let mut st = self.state.lock().await;
        *st.temperature_mut(user) = value;
        self.store.save(Table::Temperature, &st.temperature)?;
        Ok(value)
    }

    /// Clear history for `user`, keeping the temperature. Idempotent.
    ///
    /// Does not wait for the user lock: an exchange still in flight is dropped
    /// by `append_turns_in_topic` instead of landing in the new topic.
    pub async fn reset(&self, user: UserId) -> Result<()> {
        let mut st = self.state.lock().await;
        *st.topics.entry(user).or_default() += 1;
        st.history_mut(user).clear();
        self.store.save(Table::ConversationHistory, &st.history)
    }

    /// Persist both tables.
    pub async fn flush(&self) -> Result<()> {
        let st = self.state.lock().await;
        self.store.save(Table::ConversationHistory, &st.history)?;
        self.store.save(Table::Temperature, &st.temperature)?;
        Ok(())
    }
}
