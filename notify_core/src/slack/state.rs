//! Thread bookkeeping shared by every send of one configured Slack service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::network::AdaptiveRateLimiter;

/// recipient -> grouping key -> thread parent timestamp
pub type ThreadTimestamps = HashMap<String, HashMap<String, String>>;
/// recipient as supplied -> channel ID resolved by Slack
pub type ChannelIds = HashMap<String, String>;

#[derive(Debug, Default)]
struct Maps {
    thread_timestamps: ThreadTimestamps,
    channel_ids: ChannelIds,
}

/// Thread timestamps and resolved channel IDs behind a single lock, plus the
/// limiter gating calls to the backend.
///
/// Each accessor takes the lock for one map operation only. A caller doing
/// read, network call, write is not atomic as a whole: two concurrent first
/// posts for the same grouping key both post and the last `set_thread_ts`
/// wins.
#[derive(Debug)]
pub struct ThreadState {
    maps: Mutex<Maps>,
    limiter: Arc<AdaptiveRateLimiter>,
}

impl ThreadState {
    pub fn new(limiter: Arc<AdaptiveRateLimiter>) -> Self {
        Self {
            maps: Mutex::new(Maps::default()),
            limiter,
        }
    }

    pub fn limiter(&self) -> &Arc<AdaptiveRateLimiter> {
        &self.limiter
    }

    pub fn thread_ts(&self, recipient: &str, grouping_key: &str) -> Option<String> {
        self.lock()
            .thread_timestamps
            .get(recipient)
            .and_then(|threads| threads.get(grouping_key))
            .cloned()
    }

    pub fn set_thread_ts(&self, recipient: &str, grouping_key: &str, ts: &str) {
        self.lock()
            .thread_timestamps
            .entry(recipient.to_string())
            .or_default()
            .insert(grouping_key.to_string(), ts.to_string());
    }

    pub fn channel_id(&self, recipient: &str) -> Option<String> {
        self.lock().channel_ids.get(recipient).cloned()
    }

    pub fn set_channel_id(&self, recipient: &str, channel_id: &str) {
        self.lock()
            .channel_ids
            .insert(recipient.to_string(), channel_id.to_string());
    }

    /// Snapshot of the thread timestamp map.
    pub fn thread_timestamps(&self) -> ThreadTimestamps {
        self.lock().thread_timestamps.clone()
    }

    /// Snapshot of the channel ID map.
    pub fn channel_ids(&self) -> ChannelIds {
        self.lock().channel_ids.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Maps> {
        // The maps stay consistent even if a holder panicked: every critical
        // section is a single insert or lookup.
        self.maps.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_state() -> ThreadState {
        ThreadState::new(Arc::new(AdaptiveRateLimiter::unlimited()))
    }

    #[test]
    fn test_thread_ts_per_recipient_and_key() {
        let state = new_state();
        assert_eq!(state.thread_ts("#alerts", "deploy"), None);

        state.set_thread_ts("#alerts", "deploy", "1700000000.000100");
        state.set_thread_ts("#alerts", "", "1700000000.000200");
        state.set_thread_ts("#ops", "deploy", "1700000000.000300");

        assert_eq!(
            state.thread_ts("#alerts", "deploy").as_deref(),
            Some("1700000000.000100")
        );
        assert_eq!(
            state.thread_ts("#ops", "deploy").as_deref(),
            Some("1700000000.000300")
        );
        assert_eq!(state.thread_ts("#ops", "other"), None);
        assert_eq!(state.thread_timestamps().len(), 2);
    }

    #[test]
    fn test_set_thread_ts_overwrites() {
        let state = new_state();
        state.set_thread_ts("#alerts", "deploy", "1.0");
        state.set_thread_ts("#alerts", "deploy", "2.0");
        assert_eq!(state.thread_ts("#alerts", "deploy").as_deref(), Some("2.0"));
        assert_eq!(state.thread_timestamps()["#alerts"].len(), 1);
    }

    #[test]
    fn test_channel_ids() {
        let state = new_state();
        assert_eq!(state.channel_id("#alerts"), None);
        state.set_channel_id("#alerts", "C0001");
        state.set_channel_id("#alerts", "C0002");
        assert_eq!(state.channel_id("#alerts").as_deref(), Some("C0002"));
        assert_eq!(state.channel_ids().len(), 1);
    }

    #[test]
    fn test_concurrent_writers() {
        let state = Arc::new(new_state());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        state.set_thread_ts("#alerts", &format!("key-{i}"), &format!("{j}.0"));
                        state.set_channel_id(&format!("#c{i}"), "C1");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(state.thread_timestamps()["#alerts"].len(), 8);
        assert_eq!(state.channel_ids().len(), 8);
        assert_eq!(state.thread_ts("#alerts", "key-3").as_deref(), Some("99.0"));
    }
}
