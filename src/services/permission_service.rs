use tracing::warn;

use crate::config::Config;
use crate::utils::BotError;

/// Only configured administrator ids may run review and catalog actions
pub fn require_admin(config: &Config, user_id: i64) -> Result<(), BotError> {
    if config.is_admin(user_id) {
        Ok(())
    } else {
        warn!("User {} attempted an admin action", user_id);
        Err(BotError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{test_config, ADMIN_ID};

    #[test]
    fn test_admin_gate() {
        let config = test_config();
        assert!(require_admin(&config, ADMIN_ID).is_ok());
        assert!(matches!(require_admin(&config, 1), Err(BotError::Unauthorized)));
    }
}
