/// Limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}

impl MessagingCapabilities {
    /// Largest text we send in one message, leaving headroom under the hard cap.
    pub fn safe_len(&self, configured_safe_limit: usize) -> usize {
        configured_safe_limit.min(self.max_message_len).max(200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_len_respects_hard_cap_and_floor() {
        let caps = MessagingCapabilities { max_message_len: 4096 };
        assert_eq!(caps.safe_len(4000), 4000);
        assert_eq!(caps.safe_len(10_000), 4096);
        assert_eq!(caps.safe_len(10), 200);
    }
}
