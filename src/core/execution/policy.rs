/// What to do after a poll call itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PollFailurePolicy {
    /// First transport error ends the watch.
    #[default]
    FailFast,
    /// Tolerate up to `max_consecutive_failures - 1` errors in a row, retrying
    /// on the normal interval. A successful poll resets the count.
    Bounded { max_consecutive_failures: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    Retry,
    GiveUp,
}

impl PollFailurePolicy {
    /// Policy for a configured failure budget; 0 and 1 both mean fail-fast.
    pub fn from_max_failures(max_consecutive_failures: u32) -> Self {
        if max_consecutive_failures <= 1 {
            PollFailurePolicy::FailFast
        } else {
            PollFailurePolicy::Bounded {
                max_consecutive_failures,
            }
        }
    }

    pub fn decide(self, consecutive_failures: u32) -> PollDecision {
        match self {
            PollFailurePolicy::FailFast => PollDecision::GiveUp,
            PollFailurePolicy::Bounded {
                max_consecutive_failures,
            } if consecutive_failures < max_consecutive_failures => PollDecision::Retry,
            PollFailurePolicy::Bounded { .. } => PollDecision::GiveUp,
        }
    }
}
