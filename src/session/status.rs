use serde::Serialize;

/// Where the session is in the request cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Idle,
    Generating,
    Enhancing,
    /// The last request failed; holds the user-facing message.
    Error(String),
}

impl RequestStatus {
    /// True while a remote edit is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Generating | Self::Enhancing)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// The two user actions that call the edit provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    /// Edit with the user's prompt.
    Generate,
    /// Edit with the built-in enhancement instruction.
    Enhance,
}

impl EditKind {
    pub(crate) fn in_flight(self) -> RequestStatus {
        match self {
            Self::Generate => RequestStatus::Generating,
            Self::Enhance => RequestStatus::Enhancing,
        }
    }

    pub(crate) fn failure_message(self, err: &crate::RetouchError) -> String {
        match self {
            Self::Generate => format!("Failed to generate image: {err}"),
            Self::Enhance => format!("Failed to enhance image: {err}"),
        }
    }

    pub(crate) fn missing_input_message(self) -> &'static str {
        match self {
            Self::Generate => "Please upload an image and enter a prompt.",
            Self::Enhance => "Please upload an image first.",
        }
    }
}

impl std::fmt::Display for EditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Enhance => write!(f, "enhance"),
        }
    }
}
