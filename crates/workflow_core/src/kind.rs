use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How long a polling run waits for content before giving up.
pub const POLL_DEADLINE: Duration = Duration::from_secs(15 * 60);

/// The workflows a client can start; each one knows its init id and cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowKind {
    SetupWithoutKeywords,
    SetupWithKeywords,
    ArticleGeneration,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 3] = [
        WorkflowKind::SetupWithoutKeywords,
        WorkflowKind::SetupWithKeywords,
        WorkflowKind::ArticleGeneration,
    ];

    /// Identifier sent to the relay as `workflowType`.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowKind::SetupWithoutKeywords => "setupWithoutKeywords",
            WorkflowKind::SetupWithKeywords => "setupWithKeywords",
            WorkflowKind::ArticleGeneration => "articleGeneration",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkflowKind::SetupWithoutKeywords => "Ads setup",
            WorkflowKind::SetupWithKeywords => "Ads setup with keyword template",
            WorkflowKind::ArticleGeneration => "Article generation",
        }
    }

    pub fn poll_interval(self) -> Duration {
        match self {
            WorkflowKind::SetupWithoutKeywords | WorkflowKind::SetupWithKeywords => {
                Duration::from_secs(2)
            }
            WorkflowKind::ArticleGeneration => Duration::from_secs(3),
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = WorkflowKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown workflow '{s}', expected one of: {}", known.join(", "))
            })
    }
}

/// Content the workflow hands back at a pause point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checkpoint {
    Outline(String),
    Article(String),
    /// Link to a feedback sheet the user fills in outside the app.
    GetFeedback(String),
    /// Link to the finished deliverable.
    End(String),
}
