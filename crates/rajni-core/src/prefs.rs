//! User preference records and the client/storage field mapper.
//!
//! The client shape is camelCase and nested; the persisted shape is flat
//! snake_case. Conversion is a pure, total function: no persisted field is
//! ever absent, and malformed input coerces to the field's declared default.

use crate::lenient;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Declared type of a record field, which fixes its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Array of strings, default `[]`.
    List,
    /// Free-form string, default `""`.
    Text,
    /// Nested object, default `{}`.
    Record,
    /// Boolean via truthiness, default `false`.
    Flag,
}

/// `(client_key, storage_key, kind)` for every preference field.
///
/// Order here is the canonical column order of the persisted record.
pub const PREFERENCE_FIELDS: &[(&str, &str, FieldKind)] = &[
    // Food & grocery
    ("groceryBrands", "grocery_brands", FieldKind::List),
    ("groceryApps", "grocery_apps", FieldKind::List),
    ("foodApps", "food_apps", FieldKind::List),
    ("preferredCuisines", "preferred_cuisines", FieldKind::List),
    (
        "deliveryTimePreference",
        "delivery_time_preference",
        FieldKind::Text,
    ),
    ("goToRestaurants", "go_to_restaurants", FieldKind::List),
    ("usualMealTimes", "usual_meal_times", FieldKind::Record),
    ("isVegetarian", "is_vegetarian", FieldKind::Flag),
    (
        "spiceToleranceLevel",
        "spice_tolerance_level",
        FieldKind::Text,
    ),
    // Travel
    (
        "frequentFlightRoutes",
        "frequent_flight_routes",
        FieldKind::List,
    ),
    ("flightBookingSites", "flight_booking_sites", FieldKind::List),
    ("flightPreferences", "flight_preferences", FieldKind::Record),
    ("cabServices", "cab_services", FieldKind::List),
    ("cabTypePreference", "cab_type_preference", FieldKind::Text),
    // Shopping
    ("productCategories", "product_categories", FieldKind::List),
    ("favoriteBrands", "favorite_brands", FieldKind::List),
    ("ecommerceSites", "ecommerce_sites", FieldKind::List),
    (
        "monthlyShoppingBudget",
        "monthly_shopping_budget",
        FieldKind::Text,
    ),
    (
        "preferredPaymentMethod",
        "preferred_payment_method",
        FieldKind::Text,
    ),
    ("paymentMethods", "payment_methods", FieldKind::List),
    ("spendingLimits", "spending_limits", FieldKind::Record),
    // Location
    ("homeLocation", "home_location", FieldKind::Text),
    ("workLocation", "work_location", FieldKind::Text),
    // Work
    ("calendarApp", "calendar_app", FieldKind::Text),
    ("workingHours", "working_hours", FieldKind::Record),
];

/// Coerce one field to its declared kind.
fn coerce(kind: FieldKind, v: Option<&Value>) -> Value {
    match kind {
        FieldKind::List => lenient::as_list(v),
        FieldKind::Text => lenient::as_text(v),
        FieldKind::Record => lenient::as_record(v),
        FieldKind::Flag => Value::Bool(lenient::truthy(v)),
    }
}

/// Convert a client-shape (camelCase) record to the storage shape
/// (flat snake_case). Total over arbitrary input.
pub fn to_storage_shape(client: &Value) -> Value {
    let mut out = Map::with_capacity(PREFERENCE_FIELDS.len());
    for (client_key, storage_key, kind) in PREFERENCE_FIELDS {
        out.insert(
            (*storage_key).to_string(),
            coerce(*kind, client.get(client_key)),
        );
    }
    Value::Object(out)
}

/// Convert a storage-shape record back to the client shape, filling every
/// absent key with its declared default. Total over arbitrary input.
pub fn to_client_shape(storage: &Value) -> Value {
    let mut out = Map::with_capacity(PREFERENCE_FIELDS.len());
    for (client_key, storage_key, kind) in PREFERENCE_FIELDS {
        out.insert(
            (*client_key).to_string(),
            coerce(*kind, storage.get(storage_key)),
        );
    }
    Value::Object(out)
}

/// Flight class/seat preference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightPreferences {
    #[serde(rename = "class", deserialize_with = "lenient::string_or_empty")]
    pub cabin_class: String,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub seat: String,
}

/// Daily working-hours range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingHours {
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub start: String,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub end: String,
}

/// Typed view of a stored preference record, used by the prompt assembler
/// and the onboarding wizard. Deserialization is lenient: any malformed
/// field falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    #[serde(deserialize_with = "lenient::string_list")]
    pub grocery_brands: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub grocery_apps: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub food_apps: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub preferred_cuisines: Vec<String>,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub delivery_time_preference: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub go_to_restaurants: Vec<String>,
    #[serde(deserialize_with = "lenient::string_map")]
    pub usual_meal_times: BTreeMap<String, String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub is_vegetarian: bool,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub spice_tolerance_level: String,

    #[serde(deserialize_with = "lenient::string_list")]
    pub frequent_flight_routes: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub flight_booking_sites: Vec<String>,
    #[serde(deserialize_with = "lenient::sub_record")]
    pub flight_preferences: FlightPreferences,
    #[serde(deserialize_with = "lenient::string_list")]
    pub cab_services: Vec<String>,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub cab_type_preference: String,

    #[serde(deserialize_with = "lenient::string_list")]
    pub product_categories: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub favorite_brands: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub ecommerce_sites: Vec<String>,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub monthly_shopping_budget: String,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub preferred_payment_method: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub payment_methods: Vec<String>,
    #[serde(deserialize_with = "lenient::string_map")]
    pub spending_limits: BTreeMap<String, String>,

    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub home_location: String,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub work_location: String,

    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub calendar_app: String,
    #[serde(deserialize_with = "lenient::sub_record")]
    pub working_hours: WorkingHours,
}

impl UserPreferences {
    /// Build from a storage-shape record; never fails.
    pub fn from_record(record: &Value) -> Self {
        serde_json::from_value(record.clone()).unwrap_or_default()
    }

    /// Serialize to the storage shape.
    pub fn to_record(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_storage_shape_has_every_declared_field() {
        let out = to_storage_shape(&json!({}));
        let map = out.as_object().unwrap();
        assert_eq!(map.len(), PREFERENCE_FIELDS.len());
        for (_, storage_key, _) in PREFERENCE_FIELDS {
            assert!(map.contains_key(*storage_key), "missing {storage_key}");
            assert!(!map[*storage_key].is_null());
        }
    }

    #[test]
    fn test_client_shape_never_leaves_a_field_absent() {
        // Arbitrary subsets of keys missing — every declared field still comes
        // back with its declared default.
        let out = to_client_shape(&json!({"grocery_apps": ["Blinkit"]}));
        let map = out.as_object().unwrap();
        assert_eq!(map.len(), PREFERENCE_FIELDS.len());
        assert_eq!(map["groceryApps"], json!(["Blinkit"]));
        assert_eq!(map["foodApps"], json!([]));
        assert_eq!(map["usualMealTimes"], json!({}));
        assert_eq!(map["isVegetarian"], json!(false));
        assert_eq!(map["homeLocation"], json!(""));
    }

    #[test]
    fn test_round_trip_is_identity_after_one_normalization() {
        let client = json!({
            "groceryBrands": ["BigBasket"],
            "preferredCuisines": ["South Indian", "Thai"],
            "isVegetarian": true,
            "usualMealTimes": {"lunch": "13:00", "dinner": "20:30"},
            "flightPreferences": {"class": "economy", "seat": "window"},
            "homeLocation": "Indiranagar, Bangalore",
            "workingHours": {"start": "09:30", "end": "18:30"}
        });
        let normalized = to_client_shape(&to_storage_shape(&client));
        // One more pass changes nothing.
        let again = to_client_shape(&to_storage_shape(&normalized));
        assert_eq!(normalized, again);
        assert_eq!(normalized["groceryBrands"], json!(["BigBasket"]));
        assert_eq!(normalized["isVegetarian"], json!(true));
        assert_eq!(normalized["flightPreferences"]["seat"], json!("window"));
    }

    #[test]
    fn test_malformed_fields_coerce_to_defaults() {
        let client = json!({
            "groceryApps": "Zepto",          // non-array
            "usualMealTimes": "whenever",    // non-object
            "isVegetarian": "yes",           // truthy string
            "homeLocation": 42,              // non-string
        });
        let storage = to_storage_shape(&client);
        assert_eq!(storage["grocery_apps"], json!([]));
        assert_eq!(storage["usual_meal_times"], json!({}));
        assert_eq!(storage["is_vegetarian"], json!(true));
        assert_eq!(storage["home_location"], json!(""));
    }

    #[test]
    fn test_mapper_is_total_over_non_object_input() {
        for input in [json!(null), json!("junk"), json!([1, 2]), json!(7)] {
            let storage = to_storage_shape(&input);
            assert_eq!(
                storage.as_object().unwrap().len(),
                PREFERENCE_FIELDS.len()
            );
            let client = to_client_shape(&input);
            assert_eq!(client.as_object().unwrap().len(), PREFERENCE_FIELDS.len());
        }
    }

    #[test]
    fn test_typed_record_from_malformed_storage() {
        let prefs = UserPreferences::from_record(&json!({
            "cab_services": ["Uber", "Ola"],
            "flight_preferences": "window",
            "payment_methods": null,
            "working_hours": {"start": "09:00", "end": "18:00"}
        }));
        assert_eq!(prefs.cab_services, vec!["Uber", "Ola"]);
        assert_eq!(prefs.flight_preferences, FlightPreferences::default());
        assert!(prefs.payment_methods.is_empty());
        assert_eq!(prefs.working_hours.start, "09:00");
    }
}
