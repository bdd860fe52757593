//! User profile records: identity, schedule, and AI behavior preferences.
//!
//! Same mapping contract as the preference mapper (total, defaulting), plus
//! validated enums for the AI behavior fields: unknown values fall back to the
//! enum default at the boundary, never deeper in the call chain.

use crate::lenient;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant,)+
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl $name {
            /// Canonical stored value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }

            /// Parse a stored value; unknown or non-string input yields the default.
            pub fn from_value(v: Option<&Value>) -> Self {
                match v.and_then(Value::as_str) {
                    $(Some(s) if s.eq_ignore_ascii_case($wire) => Self::$variant,)+
                    _ => Self::default(),
                }
            }
        }
    };
}

choice_enum! {
    /// Assistant tone.
    AiPersonality {
        Friendly => "FRIENDLY",
        Professional => "PROFESSIONAL",
        Casual => "CASUAL",
        Enthusiastic => "ENTHUSIASTIC",
    }
    default Friendly
}

choice_enum! {
    /// How long responses should be.
    ResponseLength {
        Short => "SHORT",
        Medium => "MEDIUM",
        Detailed => "DETAILED",
    }
    default Detailed
}

choice_enum! {
    /// Spending posture for suggestions.
    BudgetLevel {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
    default Medium
}

fn default_true() -> bool {
    true
}

/// Nudge permission: absent defaults to true, present values coerce by
/// truthiness.
fn nudge_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => true,
        other => lenient::truthy(Some(&other)),
    })
}

fn choice<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: ChoiceFromValue,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::choice_from_value(Some(&value)))
}

/// Helper trait so the lenient `choice` deserializer works for every enum.
pub trait ChoiceFromValue: Sized {
    fn choice_from_value(v: Option<&Value>) -> Self;
}

impl ChoiceFromValue for AiPersonality {
    fn choice_from_value(v: Option<&Value>) -> Self {
        Self::from_value(v)
    }
}
impl ChoiceFromValue for ResponseLength {
    fn choice_from_value(v: Option<&Value>) -> Self {
        Self::from_value(v)
    }
}
impl ChoiceFromValue for BudgetLevel {
    fn choice_from_value(v: Option<&Value>) -> Self {
        Self::from_value(v)
    }
}

/// Typed view of a stored profile record. Lenient like [`crate::prefs::UserPreferences`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub full_name: String,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub nickname: String,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub email: String,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub gender: String,
    /// ISO date or empty.
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub birthday: String,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub home_address: String,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub work_address: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub frequent_locations: Vec<String>,
    #[serde(deserialize_with = "lenient::sub_record")]
    pub working_hours: crate::prefs::WorkingHours,
    #[serde(deserialize_with = "choice")]
    pub ai_personality: AiPersonality,
    #[serde(deserialize_with = "choice")]
    pub response_length: ResponseLength,
    #[serde(deserialize_with = "choice")]
    pub budget_level: BudgetLevel,
    #[serde(default = "default_true", deserialize_with = "nudge_flag")]
    pub nudge_permission: bool,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            nickname: String::new(),
            email: String::new(),
            gender: String::new(),
            birthday: String::new(),
            home_address: String::new(),
            work_address: String::new(),
            frequent_locations: Vec::new(),
            working_hours: Default::default(),
            ai_personality: Default::default(),
            response_length: Default::default(),
            budget_level: Default::default(),
            nudge_permission: true,
        }
    }
}

impl UserProfile {
    /// Build from a storage-shape record; never fails.
    pub fn from_record(record: &Value) -> Self {
        serde_json::from_value(record.clone()).unwrap_or_default()
    }
}

/// Convert a client-shape (camelCase) profile to the storage shape.
pub fn to_storage_shape(client: &Value) -> Value {
    json!({
        "full_name": lenient::as_text(client.get("fullName")),
        "nickname": lenient::as_text(client.get("nickname")),
        "email": lenient::as_text(client.get("email")),
        "gender": lenient::as_text(client.get("gender")),
        "birthday": lenient::as_text(client.get("birthday")),
        "home_address": lenient::as_text(client.get("homeAddress")),
        "work_address": lenient::as_text(client.get("workAddress")),
        "frequent_locations": lenient::as_list(client.get("frequentLocations")),
        "working_hours": lenient::as_record(client.get("workingHours")),
        "ai_personality": AiPersonality::from_value(client.get("aiPersonality")).as_str(),
        "response_length": ResponseLength::from_value(client.get("responseLength")).as_str(),
        "budget_level": BudgetLevel::from_value(client.get("budgetLevel")).as_str(),
        "nudge_permission": match client.get("nudgePermission") {
            None | Some(Value::Null) => true,
            v => lenient::truthy(v),
        },
    })
}

/// Convert a storage-shape profile back to the client shape.
pub fn to_client_shape(storage: &Value) -> Value {
    json!({
        "fullName": lenient::as_text(storage.get("full_name")),
        "nickname": lenient::as_text(storage.get("nickname")),
        "email": lenient::as_text(storage.get("email")),
        "gender": lenient::as_text(storage.get("gender")),
        "birthday": lenient::as_text(storage.get("birthday")),
        "homeAddress": lenient::as_text(storage.get("home_address")),
        "workAddress": lenient::as_text(storage.get("work_address")),
        "frequentLocations": lenient::as_list(storage.get("frequent_locations")),
        "workingHours": lenient::as_record(storage.get("working_hours")),
        "aiPersonality": AiPersonality::from_value(storage.get("ai_personality")).as_str(),
        "responseLength": ResponseLength::from_value(storage.get("response_length")).as_str(),
        "budgetLevel": BudgetLevel::from_value(storage.get("budget_level")).as_str(),
        "nudgePermission": match storage.get("nudge_permission") {
            None | Some(Value::Null) => true,
            v => lenient::truthy(v),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_choice_falls_back_to_default() {
        assert_eq!(
            AiPersonality::from_value(Some(&json!("SARCASTIC"))),
            AiPersonality::Friendly
        );
        assert_eq!(
            ResponseLength::from_value(Some(&json!(17))),
            ResponseLength::Detailed
        );
        assert_eq!(BudgetLevel::from_value(None), BudgetLevel::Medium);
    }

    #[test]
    fn test_choice_parse_is_case_insensitive() {
        assert_eq!(
            AiPersonality::from_value(Some(&json!("professional"))),
            AiPersonality::Professional
        );
    }

    #[test]
    fn test_storage_shape_validates_enums_and_defaults_nudge() {
        let storage = to_storage_shape(&json!({
            "fullName": "Asha Rao",
            "aiPersonality": "CASUAL",
            "responseLength": "bogus",
        }));
        assert_eq!(storage["full_name"], json!("Asha Rao"));
        assert_eq!(storage["ai_personality"], json!("CASUAL"));
        assert_eq!(storage["response_length"], json!("DETAILED"));
        assert_eq!(storage["budget_level"], json!("MEDIUM"));
        assert_eq!(storage["nudge_permission"], json!(true));
    }

    #[test]
    fn test_client_shape_round_trip() {
        let client = json!({
            "fullName": "Asha Rao",
            "nickname": "Asha",
            "frequentLocations": ["HSR Layout", "Koramangala"],
            "workingHours": {"start": "10:00", "end": "19:00"},
            "nudgePermission": false,
        });
        let back = to_client_shape(&to_storage_shape(&client));
        assert_eq!(back["fullName"], json!("Asha Rao"));
        assert_eq!(back["frequentLocations"], json!(["HSR Layout", "Koramangala"]));
        assert_eq!(back["nudgePermission"], json!(false));
        assert_eq!(back["birthday"], json!(""));
    }

    #[test]
    fn test_typed_profile_defaults() {
        let profile = UserProfile::from_record(&json!({}));
        assert!(profile.nudge_permission);
        assert_eq!(profile.response_length, ResponseLength::Detailed);
        let profile = UserProfile::from_record(&json!({"nudge_permission": 0}));
        assert!(!profile.nudge_permission);
    }
}
