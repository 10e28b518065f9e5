use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Location, MedicalProfile};

/// An outgoing SOS alert. Created once per successful send and never
/// mutated — live position updates are tracked separately, so views
/// must prefer the latest tracked fix over `location` here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosRequest {
    pub id: Uuid,
    pub patient: MedicalProfile,
    /// The initial fix captured when the alert was raised.
    pub location: Location,
    /// Capture time, epoch milliseconds on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl SosRequest {
    pub fn new(patient: MedicalProfile, location: Location) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient,
            location,
            timestamp: Utc::now(),
        }
    }
}
