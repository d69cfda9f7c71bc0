//! Coercion of raw multipart form fields into typed listing attributes
//!
//! Creation requests arrive as multipart text fields: numbers and
//! booleans are strings, and multi-valued fields (amenities,
//! highlights) show up either as one comma-delimited string or as a
//! repeated field. Everything is coerced and validated here, before the
//! pipeline makes any external call.

use indexmap::IndexSet;
use validator::Validate;

use crate::core::error::IngestError;
use crate::core::model::{NewProperty, PropertyType};
use crate::geocode::Address;
use crate::ingest::ListingForm;

/// Flatten delimited and/or repeated tag values into one de-duplicated,
/// insertion-ordered list.
pub fn normalize_tags(values: &[String]) -> Vec<String> {
    let mut tags: IndexSet<String> = IndexSet::new();
    for value in values {
        for tag in value.split(',') {
            let tag = tag.trim();
            if !tag.is_empty() {
                tags.insert(tag.to_string());
            }
        }
    }
    tags.into_iter().collect()
}

fn required<'f>(form: &'f ListingForm, field: &'static str) -> Result<&'f str, IngestError> {
    form.first(field)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(IngestError::InvalidPropertyData {
            field,
            value: "<missing>".to_string(),
        })
}

fn optional<'f>(form: &'f ListingForm, field: &'static str) -> Option<&'f str> {
    form.first(field).map(str::trim).filter(|v| !v.is_empty())
}

fn coerce_f64(field: &'static str, raw: &str) -> Result<f64, IngestError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(IngestError::InvalidPropertyData {
            field,
            value: raw.to_string(),
        })
}

fn coerce_i32(field: &'static str, raw: &str) -> Result<i32, IngestError> {
    raw.parse::<i32>().map_err(|_| IngestError::InvalidPropertyData {
        field,
        value: raw.to_string(),
    })
}

/// "true"/"1" mean true; anything else (including absence) is false.
fn coerce_bool(raw: Option<&str>) -> bool {
    matches!(raw, Some(v) if v.eq_ignore_ascii_case("true") || v == "1")
}

/// Coerce the form into a typed address and property draft.
///
/// The returned property has an empty `photo_urls`; the orchestrator
/// fills it in after the uploads complete. Fails with
/// `InvalidPropertyData` on any non-coercible field and with
/// `ConstraintViolation` when a numeric attribute is negative.
pub fn listing_from_form(form: &ListingForm) -> Result<(Address, NewProperty), IngestError> {
    let address = Address {
        street: required(form, "address")?.to_string(),
        city: required(form, "city")?.to_string(),
        state: required(form, "state")?.to_string(),
        postal_code: required(form, "postalCode")?.to_string(),
        country: required(form, "country")?.to_string(),
    };

    let type_raw = required(form, "propertyType")?;
    let property_type: PropertyType =
        type_raw
            .parse()
            .map_err(|_| IngestError::InvalidPropertyData {
                field: "propertyType",
                value: type_raw.to_string(),
            })?;

    let property = NewProperty {
        name: required(form, "name")?.to_string(),
        description: optional(form, "description").unwrap_or_default().to_string(),
        price_per_month: coerce_f64("pricePerMonth", required(form, "pricePerMonth")?)?,
        security_deposit: coerce_f64("securityDeposit", required(form, "securityDeposit")?)?,
        application_fee: coerce_f64("applicationFee", required(form, "applicationFee")?)?,
        photo_urls: vec![],
        amenities: normalize_tags(form.all("amenities")),
        highlights: normalize_tags(form.all("highlights")),
        is_pets_allowed: coerce_bool(optional(form, "isPetsAllowed")),
        is_parking_included: coerce_bool(optional(form, "isParkingIncluded")),
        beds: coerce_i32("beds", required(form, "beds")?)?,
        baths: coerce_f64("baths", required(form, "baths")?)?,
        square_feet: coerce_i32("squareFeet", required(form, "squareFeet")?)?,
        property_type,
        manager_id: required(form, "managerId")?.to_string(),
    };

    property
        .validate()
        .map_err(|e| IngestError::ConstraintViolation {
            message: e.to_string(),
        })?;

    Ok((address, property))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_form() -> ListingForm {
        let mut form = ListingForm::default();
        for (name, value) in [
            ("name", "Sunny loft"),
            ("description", "Top floor, lots of light"),
            ("pricePerMonth", "3000"),
            ("securityDeposit", "1500"),
            ("applicationFee", "50"),
            ("beds", "2"),
            ("baths", "1.5"),
            ("squareFeet", "850"),
            ("propertyType", "Apartment"),
            ("isPetsAllowed", "true"),
            ("address", "1 Market St"),
            ("city", "San Francisco"),
            ("state", "CA"),
            ("postalCode", "94105"),
            ("country", "USA"),
            ("managerId", "mgr-42"),
        ] {
            form.push_field(name, value);
        }
        form
    }

    #[test]
    fn test_normalize_tags_splits_and_dedupes_in_order() {
        let values = vec![
            "wifi,parking".to_string(),
            "gym".to_string(),
            "parking, wifi".to_string(),
        ];
        assert_eq!(normalize_tags(&values), vec!["wifi", "parking", "gym"]);
    }

    #[test]
    fn test_normalize_tags_drops_empty_entries() {
        let values = vec![" , wifi ,, ".to_string()];
        assert_eq!(normalize_tags(&values), vec!["wifi"]);
    }

    #[test]
    fn test_listing_from_form_happy_path() {
        let mut form = base_form();
        form.push_field("amenities", "wifi,parking");

        let (address, property) = listing_from_form(&form).unwrap();
        assert_eq!(address.city, "San Francisco");
        assert_eq!(property.price_per_month, 3000.0);
        assert_eq!(property.beds, 2);
        assert_eq!(property.baths, 1.5);
        assert!(property.is_pets_allowed);
        assert!(!property.is_parking_included);
        assert_eq!(property.amenities, vec!["wifi", "parking"]);
        assert_eq!(property.property_type, PropertyType::Apartment);
    }

    #[test]
    fn test_non_numeric_field_is_invalid_property_data() {
        let mut form = base_form();
        form.set_field("beds", "several");

        let err = listing_from_form(&form).unwrap_err();
        assert!(matches!(
            err,
            IngestError::InvalidPropertyData { field: "beds", .. }
        ));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let mut form = base_form();
        form.remove_field("pricePerMonth");

        let err = listing_from_form(&form).unwrap_err();
        assert!(matches!(
            err,
            IngestError::InvalidPropertyData {
                field: "pricePerMonth",
                ..
            }
        ));
    }

    #[test]
    fn test_negative_price_violates_constraint() {
        let mut form = base_form();
        form.set_field("pricePerMonth", "-10");

        let err = listing_from_form(&form).unwrap_err();
        assert!(matches!(err, IngestError::ConstraintViolation { .. }));
    }

    #[test]
    fn test_unknown_property_type_fails() {
        let mut form = base_form();
        form.set_field("propertyType", "Treehouse");

        assert!(listing_from_form(&form).is_err());
    }

    #[test]
    fn test_bool_coercion_defaults_to_false() {
        assert!(coerce_bool(Some("true")));
        assert!(coerce_bool(Some("TRUE")));
        assert!(coerce_bool(Some("1")));
        assert!(!coerce_bool(Some("yes")));
        assert!(!coerce_bool(None));
    }
}
