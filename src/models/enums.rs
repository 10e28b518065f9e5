use serde::{Deserialize, Serialize};

/// SOS lifecycle status. Exactly one value is active at a time,
/// owned by the controller.
///
/// Idle → Sending → {Sent, Rejected}; Sent → Accepted;
/// Accepted → Idle (reset); Rejected → Idle (auto, or reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SosStatus {
    Idle,
    Sending,
    Sent,
    Accepted,
    Rejected,
}

impl SosStatus {
    /// Whether `send()` is permitted in this status. Rejected counts
    /// as re-armed idle so the patient can retry without waiting for
    /// the auto-reset.
    pub fn can_send(&self) -> bool {
        matches!(self, SosStatus::Idle | SosStatus::Rejected)
    }

    /// Patient-facing status line shown under the SOS button.
    pub fn patient_message(&self) -> Option<&'static str> {
        match self {
            SosStatus::Idle => None,
            SosStatus::Sending => Some("Contacting nearby doctors..."),
            SosStatus::Sent => Some("Alert sent. Waiting for a doctor to accept."),
            SosStatus::Accepted => {
                Some("A doctor has accepted your request and is en route.")
            }
            SosStatus::Rejected => Some(
                "No doctors were available. Please try again or call emergency services.",
            ),
        }
    }
}

/// Which side of the demo the single browser tab is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
        }
    }
}
