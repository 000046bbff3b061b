//! Contractors, their client-specific prices and the assignment record

use serde::{Deserialize, Serialize};

/// A contractor known to the directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contractor {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Base price when no standard rate matches
    pub rate: f64,
    /// Comma separated list of areas, e.g. `"north, harbour"`
    #[serde(default)]
    pub service_locations: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Contractor {
    /// Whether `area` is one of the service locations (case-insensitive, per token)
    pub fn serves(&self, area: &str) -> bool {
        let area = area.trim();
        !area.is_empty()
            && self
                .service_locations
                .split(',')
                .any(|location| location.trim().eq_ignore_ascii_case(area))
    }
}

/// Negotiated price of a contractor for one client in one area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardRate {
    pub contractor_id: String,
    pub client: String,
    pub area: String,
    pub rate: f64,
}

impl StandardRate {
    pub fn matches(&self, contractor_id: &str, client: &str, area: &str) -> bool {
        self.contractor_id == contractor_id
            && self.client.trim().eq_ignore_ascii_case(client.trim())
            && self.area.trim().eq_ignore_ascii_case(area.trim())
    }
}

/// A contractor eligible for a work order, with the price that applies to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractorCandidate {
    pub contractor_id: String,
    pub name: String,
    pub email: String,
    pub rate: f64,
    pub service_locations: String,
}

impl ContractorCandidate {
    pub fn from_contractor(contractor: &Contractor, rate: f64) -> Self {
        Self {
            contractor_id: contractor.id.clone(),
            name: contractor.name.clone(),
            email: contractor.email.clone(),
            rate,
            service_locations: contractor.service_locations.clone(),
        }
    }

    pub fn to_assignment(&self) -> ContractorAssignment {
        ContractorAssignment {
            id: self.contractor_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            rate: self.rate,
        }
    }
}

/// Contractor snapshot stored on an assigned work order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractorAssignment {
    pub id: String,
    pub name: String,
    pub email: String,
    pub rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contractor(locations: &str) -> Contractor {
        Contractor {
            id: "c-1".to_string(),
            name: "Acme".to_string(),
            email: "acme@example.com".to_string(),
            rate: 100.0,
            service_locations: locations.to_string(),
            active: true,
        }
    }

    #[test]
    fn test_serves_matches_whole_tokens() {
        let c = contractor("North, Harbour ,east");
        assert!(c.serves("north"));
        assert!(c.serves("HARBOUR"));
        assert!(c.serves(" east "));
        assert!(!c.serves("nor"));
        assert!(!c.serves(""));
    }

    #[test]
    fn test_standard_rate_match_ignores_case() {
        let rate = StandardRate {
            contractor_id: "c-1".to_string(),
            client: "Mall One".to_string(),
            area: "north".to_string(),
            rate: 80.0,
        };
        assert!(rate.matches("c-1", "mall one", "North"));
        assert!(!rate.matches("c-2", "mall one", "North"));
    }

    #[test]
    fn test_active_defaults_to_true() {
        let c: Contractor = serde_json::from_value(serde_json::json!({
            "id": "c-9", "name": "Z", "email": "z@example.com", "rate": 10.0
        }))
        .unwrap();
        assert!(c.active);
        assert!(!c.serves("north"));
    }
}
