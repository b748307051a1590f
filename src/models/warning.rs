use serde::{Deserialize, Serialize};

/// Closed set of reasons a warning can be raised for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum WarningReason {
    LookingAway,
    NoFace,
    ExcessMotion,
    NoMotion,
}

impl WarningReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningReason::LookingAway => "looking away from screen",
            WarningReason::NoFace => "no face detected",
            WarningReason::ExcessMotion => "excess motion",
            WarningReason::NoMotion => "no motion / sustained absence",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "looking away from screen" => Some(WarningReason::LookingAway),
            "no face detected" => Some(WarningReason::NoFace),
            "excess motion" => Some(WarningReason::ExcessMotion),
            "no motion / sustained absence" => Some(WarningReason::NoMotion),
            _ => None,
        }
    }
}

impl std::fmt::Display for WarningReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded warning. Append-only once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    /// Milliseconds since the session started.
    pub offset_ms: u64,
    pub reason: WarningReason,
}
