//! The ESG record: one value object per scored document.
//!
//! Every optional field may be `None`. Absence is distinct from `false`/`0`
//! and coverage scoring depends on that distinction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EsgRecord {
    pub company: Option<String>,
    pub year: Option<i64>,
    #[serde(default)]
    pub board: BoardInfo,
    #[serde(default)]
    pub ghg: GhgInfo,
    #[serde(default)]
    pub policies: PolicyInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardInfo {
    pub chair: Option<BoardMember>,
    #[serde(default)]
    pub members: Vec<BoardMember>,
    #[serde(default)]
    pub counts: BoardCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardCounts {
    pub total: Option<i64>,
    pub independent: Option<i64>,
    pub women: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardMember {
    pub name: String,
    pub role: Option<String>,
    pub independence: Option<Independence>,
}

impl BoardMember {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
            independence: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Independence {
    #[serde(rename = "Independent")]
    Independent,
    #[serde(rename = "Non-independent")]
    NonIndependent,
    #[serde(rename = "Executive")]
    Executive,
}

impl Independence {
    pub fn label(self) -> &'static str {
        match self {
            Self::Independent => "Independent",
            Self::NonIndependent => "Non-independent",
            Self::Executive => "Executive",
        }
    }

    /// Case-insensitive parse; hyphen, space and underscore spellings of
    /// "non-independent" are equivalent.
    pub fn parse(raw: &str) -> Option<Self> {
        let folded: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match folded.as_str() {
            "independent" => Some(Self::Independent),
            "nonindependent" | "notindependent" => Some(Self::NonIndependent),
            "executive" => Some(Self::Executive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GhgInfo {
    pub base_year: Option<i64>,
    pub scope1_tco2e: Option<f64>,
    pub scope2_market_tco2e: Option<f64>,
    pub scope2_location_tco2e: Option<f64>,
    pub scope3_tco2e: Option<f64>,
    pub total_tco2e: Option<f64>,
    pub intensity_tco2e_per_eur_m: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyInfo {
    pub anti_corruption: Option<bool>,
    pub whistleblowing: Option<bool>,
    pub human_rights: Option<bool>,
    pub climate_policy: Option<bool>,
    pub dei_policy: Option<bool>,
    pub assurance: Option<String>,
}

/// The boolean policy flags, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKey {
    AntiCorruption,
    Whistleblowing,
    HumanRights,
    ClimatePolicy,
    DeiPolicy,
}

impl PolicyKey {
    pub const ALL: [PolicyKey; 5] = [
        PolicyKey::AntiCorruption,
        PolicyKey::Whistleblowing,
        PolicyKey::HumanRights,
        PolicyKey::ClimatePolicy,
        PolicyKey::DeiPolicy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AntiCorruption => "anti_corruption",
            Self::Whistleblowing => "whistleblowing",
            Self::HumanRights => "human_rights",
            Self::ClimatePolicy => "climate_policy",
            Self::DeiPolicy => "dei_policy",
        }
    }

    pub fn from_canonical(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl std::fmt::Display for PolicyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PolicyInfo {
    pub fn get(&self, key: PolicyKey) -> Option<bool> {
        match key {
            PolicyKey::AntiCorruption => self.anti_corruption,
            PolicyKey::Whistleblowing => self.whistleblowing,
            PolicyKey::HumanRights => self.human_rights,
            PolicyKey::ClimatePolicy => self.climate_policy,
            PolicyKey::DeiPolicy => self.dei_policy,
        }
    }

    pub fn slot_mut(&mut self, key: PolicyKey) -> &mut Option<bool> {
        match key {
            PolicyKey::AntiCorruption => &mut self.anti_corruption,
            PolicyKey::Whistleblowing => &mut self.whistleblowing,
            PolicyKey::HumanRights => &mut self.human_rights,
            PolicyKey::ClimatePolicy => &mut self.climate_policy,
            PolicyKey::DeiPolicy => &mut self.dei_policy,
        }
    }
}

/// A single leaf value, tagged by semantic type.
///
/// `Invalid` carries a raw value that failed schema validation; comparators
/// treat it as a type error for the field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Invalid(Value),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Present and well-typed.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Null | Self::Invalid(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Int(v) => Value::from(*v),
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Bool(v) => Value::Bool(*v),
            Self::Text(v) => Value::String(v.clone()),
            Self::Invalid(raw) => raw.clone(),
        }
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Int)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Float)
    }
}

impl From<Option<bool>> for FieldValue {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Null, Self::Bool)
    }
}

impl From<Option<&str>> for FieldValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::Null, |text| Self::Text(text.to_string()))
    }
}

impl From<Option<Independence>> for FieldValue {
    fn from(value: Option<Independence>) -> Self {
        value.map_or(Self::Null, |v| Self::Text(v.label().to_string()))
    }
}

impl BoardMember {
    /// Leaf value for a member attribute (`name`, `role`, `independence`).
    pub fn field_value(&self, attribute: &str) -> FieldValue {
        match attribute {
            "name" => FieldValue::Text(self.name.clone()),
            "role" => self.role.as_deref().into(),
            "independence" => self.independence.into(),
            _ => FieldValue::Null,
        }
    }
}

impl EsgRecord {
    /// Leaf value for a dotted scalar path such as `ghg.scope1_tco2e`.
    ///
    /// Unknown paths resolve to `Null`. Board members are addressed through
    /// alignment, not through this accessor.
    pub fn field_value(&self, path: &str) -> FieldValue {
        if let Some(attribute) = path.strip_prefix("board.chair.") {
            return self
                .board
                .chair
                .as_ref()
                .map_or(FieldValue::Null, |chair| chair.field_value(attribute));
        }
        if let Some(name) = path.strip_prefix("policies.") {
            if name == "assurance" {
                return self.policies.assurance.as_deref().into();
            }
            return PolicyKey::from_canonical(name)
                .map_or(FieldValue::Null, |key| self.policies.get(key).into());
        }
        match path {
            "company" => self.company.as_deref().into(),
            "year" => self.year.into(),
            "board.counts.total" => self.board.counts.total.into(),
            "board.counts.independent" => self.board.counts.independent.into(),
            "board.counts.women" => self.board.counts.women.into(),
            "ghg.base_year" => self.ghg.base_year.into(),
            "ghg.scope1_tco2e" => self.ghg.scope1_tco2e.into(),
            "ghg.scope2_market_tco2e" => self.ghg.scope2_market_tco2e.into(),
            "ghg.scope2_location_tco2e" => self.ghg.scope2_location_tco2e.into(),
            "ghg.scope3_tco2e" => self.ghg.scope3_tco2e.into(),
            "ghg.total_tco2e" => self.ghg.total_tco2e.into(),
            "ghg.intensity_tco2e_per_eur_m" => self.ghg.intensity_tco2e_per_eur_m.into(),
            _ => FieldValue::Null,
        }
    }

    /// The all-null record shape as a JSON mapping.
    pub fn empty_mapping() -> Value {
        serde_json::to_value(Self::default()).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independence_parses_common_spellings() {
        assert_eq!(
            Independence::parse("Independent"),
            Some(Independence::Independent)
        );
        assert_eq!(
            Independence::parse("Non-Independent"),
            Some(Independence::NonIndependent)
        );
        assert_eq!(
            Independence::parse("non independent"),
            Some(Independence::NonIndependent)
        );
        assert_eq!(
            Independence::parse(" EXECUTIVE "),
            Some(Independence::Executive)
        );
        assert_eq!(Independence::parse("sometimes"), None);
    }

    #[test]
    fn field_value_resolves_nested_paths() {
        let mut record = EsgRecord {
            company: Some("Acme".to_string()),
            year: Some(2024),
            ..EsgRecord::default()
        };
        record.ghg.scope1_tco2e = Some(1250.5);
        record.policies.whistleblowing = Some(false);
        record.board.chair = Some(BoardMember {
            name: "Jane Doe".to_string(),
            role: Some("Chair".to_string()),
            independence: Some(Independence::Independent),
        });

        assert_eq!(
            record.field_value("company"),
            FieldValue::Text("Acme".to_string())
        );
        assert_eq!(record.field_value("year"), FieldValue::Int(2024));
        assert_eq!(
            record.field_value("ghg.scope1_tco2e"),
            FieldValue::Float(1250.5)
        );
        assert_eq!(
            record.field_value("policies.whistleblowing"),
            FieldValue::Bool(false)
        );
        assert_eq!(
            record.field_value("board.chair.independence"),
            FieldValue::Text("Independent".to_string())
        );
        assert!(record.field_value("ghg.scope3_tco2e").is_null());
        assert!(record.field_value("governance.anything").is_null());
    }

    #[test]
    fn empty_mapping_has_every_group() {
        let mapping = EsgRecord::empty_mapping();
        assert!(mapping["company"].is_null());
        assert_eq!(mapping["board"]["members"], serde_json::json!([]));
        assert!(mapping["ghg"]["total_tco2e"].is_null());
        assert!(mapping["policies"]["dei_policy"].is_null());
    }
}
