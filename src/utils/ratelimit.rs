use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Per-user, per-command cooldown owned by the application context
pub struct Cooldowns {
    window: Duration,
    last_used: Mutex<HashMap<(i64, String), Instant>>,
    // When we last warned a user about a cooldown, to avoid message spam
    last_warned: Mutex<HashMap<(i64, String), Instant>>,
}

impl Cooldowns {
    pub fn new(window: Duration) -> Self {
        Cooldowns {
            window,
            last_used: Mutex::new(HashMap::new()),
            last_warned: Mutex::new(HashMap::new()),
        }
    }

    /// Check if a user can execute a command (cooldown not active)
    /// Returns Ok(()) if cooldown has passed and records this use
    /// Returns Err((remaining_seconds, should_send_warning_message)) if still on cooldown
    /// The boolean is true only on the first violation within one cooldown period
    pub async fn check(&self, user_id: i64, command: &str) -> Result<(), (u64, bool)> {
        let now = Instant::now();
        let key = (user_id, command.to_string());

        let mut used = self.last_used.lock().await;
        if let Some(&last_time) = used.get(&key) {
            let elapsed = now.duration_since(last_time);
            if elapsed < self.window {
                let remaining = (self.window - elapsed).as_secs().max(1);

                let mut warned = self.last_warned.lock().await;
                let should_warn = match warned.get(&key) {
                    Some(&last_warning) => last_warning < last_time,
                    None => true,
                };
                if should_warn {
                    warned.insert(key, now);
                }
                return Err((remaining, should_warn));
            }
        }

        used.insert(key, now);
        Ok(())
    }

    /// Forget entries older than the window
    pub async fn prune(&self) {
        let now = Instant::now();
        let window = self.window;
        self.last_used
            .lock()
            .await
            .retain(|_, t| now.duration_since(*t) < window);
        self.last_warned
            .lock()
            .await
            .retain(|_, t| now.duration_since(*t) < window);
    }

    pub fn window_seconds(&self) -> u64 {
        self.window.as_secs()
    }
}
