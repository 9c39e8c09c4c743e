/// Identifies one computation; stale once its counter has moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u64);

/// Monotonic counter handing out [`Token`]s.
#[derive(Debug, Default)]
pub(crate) struct Generation {
    current: u64,
}

impl Generation {
    /// Invalidates every outstanding token and returns a fresh one.
    pub(crate) fn advance(&mut self) -> Token {
        self.current += 1;
        Token(self.current)
    }

    pub(crate) fn current(&self) -> Token {
        Token(self.current)
    }

    pub(crate) fn is_current(&self, token: Token) -> bool {
        token.0 == self.current
    }
}
