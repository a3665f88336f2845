use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use petstore_core::validation::Presence;
use petstore_core::{Entity, Fields, PetId, Schema, ValidationErrors};

/// Upper bound accepted for `age`.
pub const MAX_AGE: u32 = 200;

const AGE_RANGE: std::ops::RangeInclusive<i64> = 0..=MAX_AGE as i64;

/// Stored pet document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: PetId,
    pub species: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub created_date: DateTime<Utc>,
}

impl Entity for Pet {
    type Id = PetId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn collection() -> &'static str {
        "pets"
    }
}

impl Pet {
    pub fn create(new: NewPet, now: DateTime<Utc>) -> Self {
        Self {
            id: PetId::new(),
            species: new.species,
            name: new.name,
            age: new.age,
            gender: new.gender,
            created_date: now,
        }
    }

    /// Apply the fields present in `update`.
    pub fn apply(&mut self, update: &PetUpdate) {
        if let Some(species) = &update.species {
            self.species = species.clone();
        }
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(age) = update.age {
            self.age = age;
        }
        if let Some(gender) = &update.gender {
            self.gender = gender.clone();
        }
    }
}

fn age(fields: &mut Fields<'_>, presence: Presence) -> Option<u32> {
    fields
        .integer("age", AGE_RANGE, presence)
        .and_then(|v| u32::try_from(v).ok())
}

/// Payload for `PUT /api/pet/new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPet {
    pub species: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
}

impl Schema for NewPet {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut f = Fields::new(value);
        let species = f.string("species", 1, Presence::Required);
        let name = f.string("name", 1, Presence::Required);
        let age = age(&mut f, Presence::Required);
        let gender = f.string("gender", 1, Presence::Required);

        f.finish(&["species", "name", "age", "gender"], || {
            Some(NewPet {
                species: species?,
                name: name?,
                age: age?,
                gender: gender?,
            })
        })
    }
}

/// Payload for `PUT /api/pet/:petId`. At least one field is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl Schema for PetUpdate {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        const FIELDS: [&str; 4] = ["species", "name", "age", "gender"];

        let mut f = Fields::new(value);
        f.at_least_one(&FIELDS);
        let species = f.string("species", 1, Presence::Optional);
        let name = f.string("name", 1, Presence::Optional);
        let age = age(&mut f, Presence::Optional);
        let gender = f.string("gender", 1, Presence::Optional);

        f.finish(&FIELDS, || {
            Some(PetUpdate {
                species,
                name,
                age,
                gender,
            })
        })
    }
}

/// Query filter for `GET /api/pet/list`.
///
/// Text fields match case-insensitively; age bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetFilter {
    pub species: Option<String>,
    pub gender: Option<String>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
}

impl PetFilter {
    pub fn matches(&self, pet: &Pet) -> bool {
        let text = |want: &Option<String>, have: &str| {
            want.as_deref().is_none_or(|w| w.eq_ignore_ascii_case(have))
        };
        text(&self.species, &pet.species)
            && text(&self.gender, &pet.gender)
            && self.min_age.is_none_or(|min| pet.age >= min)
            && self.max_age.is_none_or(|max| pet.age <= max)
    }
}

impl Schema for PetFilter {
    fn from_json(value: &Value) -> Result<Self, ValidationErrors> {
        let mut f = Fields::new(value);
        let species = f.string("species", 1, Presence::Optional);
        let gender = f.string("gender", 1, Presence::Optional);
        let min_age = f
            .integer("minAge", AGE_RANGE, Presence::Optional)
            .and_then(|v| u32::try_from(v).ok());
        let max_age = f
            .integer("maxAge", AGE_RANGE, Presence::Optional)
            .and_then(|v| u32::try_from(v).ok());

        let filter = f.finish(&["species", "gender", "minAge", "maxAge"], || {
            Some(PetFilter {
                species,
                gender,
                min_age,
                max_age,
            })
        })?;

        if let (Some(min), Some(max)) = (filter.min_age, filter.max_age) {
            if min > max {
                return Err(ValidationErrors::single(
                    "maxAge",
                    "\"maxAge\" must be greater than or equal to ref:minAge",
                ));
            }
        }
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fido() -> Pet {
        Pet::create(
            NewPet {
                species: "Dog".to_string(),
                name: "Fido".to_string(),
                age: 3,
                gender: "M".to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn new_pet_trims_and_coerces_age() {
        let pet = NewPet::from_json(&json!({
            "species": "  Dog ",
            "name": "Fido",
            "age": "3",
            "gender": "M",
        }))
        .unwrap();

        assert_eq!(pet.species, "Dog");
        assert_eq!(pet.age, 3);
    }

    #[test]
    fn new_pet_collects_every_violation() {
        let err = NewPet::from_json(&json!({
            "species": "",
            "age": 500,
            "color": "brown",
        }))
        .unwrap_err();

        let mut fields = err.fields();
        fields.sort_unstable();
        assert_eq!(fields, vec!["age", "color", "gender", "name", "species"]);
    }

    #[test]
    fn new_pet_rejects_non_object_body() {
        let err = NewPet::from_json(&json!([1, 2])).unwrap_err();
        assert_eq!(err.fields(), vec!["body"]);
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn update_requires_at_least_one_field() {
        let err = PetUpdate::from_json(&json!({})).unwrap_err();
        assert_eq!(err.fields(), vec!["body"]);

        let update = PetUpdate::from_json(&json!({ "age": 4 })).unwrap();
        assert_eq!(update.age, Some(4));
        assert_eq!(update.name, None);
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut pet = fido();
        pet.apply(&PetUpdate {
            name: Some("Rex".to_string()),
            ..PetUpdate::default()
        });

        assert_eq!(pet.name, "Rex");
        assert_eq!(pet.species, "Dog");
        assert_eq!(pet.age, 3);
    }

    #[test]
    fn filter_matches_case_insensitively_with_inclusive_bounds() {
        let pet = fido();
        let filter = PetFilter::from_json(&json!({
            "species": "dog",
            "minAge": "3",
            "maxAge": "3",
        }))
        .unwrap();
        assert!(filter.matches(&pet));

        let cats = PetFilter {
            species: Some("cat".to_string()),
            ..PetFilter::default()
        };
        assert!(!cats.matches(&pet));
        assert!(PetFilter::default().matches(&pet));
    }

    #[test]
    fn filter_rejects_inverted_age_bounds() {
        let err = PetFilter::from_json(&json!({ "minAge": 5, "maxAge": 2 })).unwrap_err();
        assert_eq!(err.fields(), vec!["maxAge"]);
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let value = serde_json::to_value(fido()).unwrap();
        assert!(value.get("createdDate").is_some());
        assert_eq!(value["age"], 3);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any in-range age is accepted, whether sent as a number or a string.
            #[test]
            fn age_accepts_numbers_and_numeric_strings(age in 0u32..=MAX_AGE, as_string in any::<bool>()) {
                let raw = if as_string { json!(age.to_string()) } else { json!(age) };
                let update = PetUpdate::from_json(&json!({ "age": raw })).unwrap();
                prop_assert_eq!(update.age, Some(age));
            }

            #[test]
            fn out_of_range_age_is_rejected(age in (MAX_AGE as i64 + 1)..10_000i64) {
                let err = PetUpdate::from_json(&json!({ "age": age })).unwrap_err();
                prop_assert_eq!(err.fields(), vec!["age"]);
            }
        }
    }
}
