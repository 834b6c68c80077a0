use serde::{Deserialize, Serialize};

/// Lifecycle status of an API test record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Record created, the automation workflow has not picked it up yet
    Pending,
    /// The automation workflow is scanning the targets
    Processing,
    /// Scan finished and a result summary is available
    Completed,
    /// Scan aborted, an error message is available
    Failed,
}

impl TestStatus {
    pub const ALL: [TestStatus; 4] = [
        TestStatus::Pending,
        TestStatus::Processing,
        TestStatus::Completed,
        TestStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pending => "pending",
            TestStatus::Processing => "processing",
            TestStatus::Completed => "completed",
            TestStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TestStatus::Pending),
            "processing" => Some(TestStatus::Processing),
            "completed" => Some(TestStatus::Completed),
            "failed" => Some(TestStatus::Failed),
            _ => None,
        }
    }

    /// Returns true once the external workflow has finished with the record
    pub fn is_terminal(&self) -> bool {
        matches!(self, TestStatus::Completed | TestStatus::Failed)
    }

    /// Position along `pending -> processing -> {completed | failed}`
    fn stage(&self) -> u8 {
        match self {
            TestStatus::Pending => 0,
            TestStatus::Processing => 1,
            TestStatus::Completed | TestStatus::Failed => 2,
        }
    }

    /// Whether a record in this status may move to `next`.
    ///
    /// Staying put is allowed; moving backwards or hopping between the two
    /// terminal states is not.
    pub fn can_transition_to(&self, next: TestStatus) -> bool {
        if *self == next {
            return true;
        }
        !self.is_terminal() && next.stage() > self.stage()
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(TestStatus::Pending.can_transition_to(TestStatus::Processing));
        assert!(TestStatus::Pending.can_transition_to(TestStatus::Completed));
        assert!(TestStatus::Processing.can_transition_to(TestStatus::Failed));
        assert!(TestStatus::Processing.can_transition_to(TestStatus::Processing));
    }

    #[test]
    fn status_never_regresses() {
        assert!(!TestStatus::Processing.can_transition_to(TestStatus::Pending));
        assert!(!TestStatus::Completed.can_transition_to(TestStatus::Processing));
        assert!(!TestStatus::Completed.can_transition_to(TestStatus::Failed));
        assert!(!TestStatus::Failed.can_transition_to(TestStatus::Completed));
    }

    #[test]
    fn parses_wire_names() {
        for status in TestStatus::ALL {
            assert_eq!(TestStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TestStatus::from_str("Completed"), Some(TestStatus::Completed));
        assert_eq!(TestStatus::from_str("queued"), None);
    }

    #[test]
    fn rejects_names_outside_the_status_set() {
        for name in ["running", "done", "cancelled", ""] {
            assert_eq!(TestStatus::from_str(name), None, "{name}");
        }
    }
}
