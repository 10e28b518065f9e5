use serde::{Deserialize, Serialize};

/// The patient's medical card, attached to every SOS request so a
/// responding doctor sees allergies and conditions up front.
/// Static for this demo — supplied at startup, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalProfile {
    pub name: String,
    pub blood_group: String,
    pub allergies: Vec<String>,
    pub medical_conditions: Vec<String>,
    pub emergency_contact: String,
}

impl MedicalProfile {
    /// The built-in demo patient.
    pub fn demo() -> Self {
        Self {
            name: "Alex Doe".to_string(),
            blood_group: "O+".to_string(),
            allergies: vec!["Peanuts".to_string(), "Penicillin".to_string()],
            medical_conditions: vec!["Asthma".to_string()],
            emergency_contact: "+1-555-123-4567".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_string(&MedicalProfile::demo()).unwrap();
        assert!(json.contains("\"bloodGroup\":\"O+\""));
        assert!(json.contains("\"medicalConditions\":[\"Asthma\"]"));
        assert!(json.contains("\"emergencyContact\""));
    }

    #[test]
    fn demo_profile_is_complete() {
        let profile = MedicalProfile::demo();
        assert_eq!(profile.name, "Alex Doe");
        assert_eq!(profile.allergies.len(), 2);
        assert!(!profile.emergency_contact.is_empty());
    }
}
