//! Binary sensors

use ha_core::{STATE_OFF, STATE_ON};

pub const DOMAIN: &str = "binary_sensor";

/// State value of a binary sensor; `None` when the value is unknown
pub fn state_for(is_on: Option<bool>) -> Option<String> {
    is_on.map(|on| (if on { STATE_ON } else { STATE_OFF }).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_for() {
        assert_eq!(state_for(Some(true)).as_deref(), Some("on"));
        assert_eq!(state_for(Some(false)).as_deref(), Some("off"));
        assert_eq!(state_for(None), None);
    }
}
