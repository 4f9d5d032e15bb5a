//! Bounded retry with an explicit outcome

/// Result of a bounded retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retry<T> {
    /// An attempt produced a value (`attempts` counts the successful one)
    Found { value: T, attempts: usize },
    /// Every attempt was spent without a value
    Exhausted { attempts: usize },
}

impl<T> Retry<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Retry::Found { .. })
    }

    pub fn attempts(&self) -> usize {
        match self {
            Retry::Found { attempts, .. } | Retry::Exhausted { attempts } => *attempts,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Retry::Found { value, .. } => Some(value),
            Retry::Exhausted { .. } => None,
        }
    }

    /// Value, or the fallback computed on exhaustion
    pub fn or_else(self, fallback: impl FnOnce() -> T) -> T {
        self.into_option().unwrap_or_else(fallback)
    }
}

/// Call `attempt` (with a 0-based attempt index) until it returns `Some`,
/// at most `max_attempts` times
pub fn retry_bounded<T>(max_attempts: usize, mut attempt: impl FnMut(usize) -> Option<T>) -> Retry<T> {
    for i in 0..max_attempts {
        if let Some(value) = attempt(i) {
            return Retry::Found {
                value,
                attempts: i + 1,
            };
        }
    }
    Retry::Exhausted {
        attempts: max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_on_third_attempt() {
        let result = retry_bounded(10, |i| (i == 2).then_some("ok"));
        assert_eq!(
            result,
            Retry::Found {
                value: "ok",
                attempts: 3
            }
        );
    }

    #[test]
    fn test_exhausted() {
        let mut calls = 0;
        let result: Retry<()> = retry_bounded(5, |_| {
            calls += 1;
            None
        });
        assert_eq!(result, Retry::Exhausted { attempts: 5 });
        assert_eq!(calls, 5);
        assert!(result.into_option().is_none());
    }

    #[test]
    fn test_zero_budget() {
        let result = retry_bounded(0, |_| Some(1));
        assert!(!result.is_found());
        assert_eq!(result.or_else(|| 7), 7);
    }
}
