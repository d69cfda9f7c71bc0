//! Search filter parsing and predicate compilation
//!
//! Search requests arrive as a bag of optional query parameters. Parsing
//! turns the raw strings into a typed [`FilterCriteria`] (rejecting
//! malformed values before anything touches the database), and
//! compilation turns the criteria into a [`CompiledPredicate`]: an
//! AND-folded list of SQL clause fragments plus their bound parameters.
//!
//! Every recognized field maps to exactly one clause builder, a pure
//! `fn(&FilterCriteria, &CompileContext) -> Option<Clause>`. Absent or
//! sentinel ("any") fields contribute no clause, so an empty criteria
//! compiles to an empty predicate and matches every listing.
//!
//! Bound values are always passed as typed parameters; clause templates
//! carry `$?` markers that are renumbered to positional `$n`
//! placeholders at assembly. No caller-supplied text is ever spliced
//! into the SQL itself.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use crate::core::error::FilterError;
use crate::core::geo::{self, Coordinates};
use crate::core::model::PropertyType;

/// A typed bound parameter. The storage layer maps each variant onto
/// the matching PostgreSQL wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Int(i32),
    Float(f64),
    Text(String),
    TextArray(Vec<String>),
    IntArray(Vec<i32>),
    Date(NaiveDate),
}

/// One filter condition: a SQL fragment with `$?` markers and the
/// values bound to them, in order.
#[derive(Debug, Clone)]
pub struct Clause {
    sql: String,
    binds: Vec<BindValue>,
}

impl Clause {
    pub fn new(sql: impl Into<String>, binds: Vec<BindValue>) -> Self {
        let sql = sql.into();
        debug_assert_eq!(sql.matches("$?").count(), binds.len());
        Self { sql, binds }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }
}

/// An ordered, AND-combined set of compiled clauses.
///
/// Built once per search request and consumed once by the repository.
#[derive(Debug, Clone, Default)]
pub struct CompiledPredicate {
    clauses: Vec<String>,
    binds: Vec<BindValue>,
}

impl CompiledPredicate {
    /// Append a clause, renumbering its `$?` markers to the next free
    /// positional placeholders.
    pub fn push(&mut self, clause: Clause) {
        let Clause { sql, binds } = clause;
        let mut rendered = String::with_capacity(sql.len() + 4);
        let mut next = self.binds.len() + 1;
        let mut rest = sql.as_str();
        while let Some(pos) = rest.find("$?") {
            rendered.push_str(&rest[..pos]);
            rendered.push('$');
            rendered.push_str(&next.to_string());
            next += 1;
            rest = &rest[pos + 2..];
        }
        rendered.push_str(rest);
        self.clauses.push(rendered);
        self.binds.extend(binds);
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// The `WHERE` body (clauses joined with AND), or `None` when the
    /// predicate is empty and every row matches.
    pub fn where_clause(&self) -> Option<String> {
        if self.clauses.is_empty() {
            None
        } else {
            Some(self.clauses.join(" AND "))
        }
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }
}

/// Raw search parameters exactly as they appear on the query string.
///
/// Everything is optional text at this stage; typing happens in
/// [`FilterCriteria::from_query`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    pub favorite_ids: Option<String>,
    pub price_min: Option<String>,
    pub price_max: Option<String>,
    pub beds: Option<String>,
    pub baths: Option<String>,
    pub property_type: Option<String>,
    pub square_feet_min: Option<String>,
    pub square_feet_max: Option<String>,
    pub amenities: Option<String>,
    pub available_from: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

/// Typed, request-scoped search criteria.
///
/// Never persisted; constructed fresh per request and discarded after
/// compilation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub beds_min: Option<i32>,
    pub baths_min: Option<f64>,
    pub square_feet_min: Option<i32>,
    pub square_feet_max: Option<i32>,
    pub property_type: Option<PropertyType>,
    pub amenities: Option<Vec<String>>,
    pub available_from: Option<NaiveDate>,
    pub favorite_ids: Option<Vec<i32>>,
    pub center: Option<Coordinates>,
}

/// The "match anything" sentinel several filters accept.
fn is_any(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("any")
}

fn parse_f64(field: &'static str, raw: &str) -> Result<f64, FilterError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(FilterError::InvalidValue {
            field,
            value: raw.to_string(),
        })
}

fn parse_i32(field: &'static str, raw: &str) -> Result<i32, FilterError> {
    raw.parse::<i32>().map_err(|_| FilterError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

/// Accepts a plain date (`2025-07-01`) or a full RFC 3339 timestamp.
fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, FilterError> {
    raw.parse::<NaiveDate>()
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| FilterError::InvalidValue {
            field,
            value: raw.to_string(),
        })
}

impl FilterCriteria {
    /// Parse raw query parameters into typed criteria.
    ///
    /// Absent fields and the "any" sentinel become `None`; malformed
    /// values fail here, before compilation, so an invalid filter never
    /// reaches the database.
    pub fn from_query(query: &SearchQuery) -> Result<Self, FilterError> {
        let mut criteria = FilterCriteria::default();

        if let Some(raw) = present(&query.price_min) {
            criteria.price_min = Some(parse_f64("priceMin", raw)?);
        }
        if let Some(raw) = present(&query.price_max) {
            criteria.price_max = Some(parse_f64("priceMax", raw)?);
        }
        if let Some(raw) = present(&query.beds) {
            criteria.beds_min = Some(parse_i32("beds", raw)?);
        }
        if let Some(raw) = present(&query.baths) {
            criteria.baths_min = Some(parse_f64("baths", raw)?);
        }
        if let Some(raw) = present(&query.square_feet_min) {
            criteria.square_feet_min = Some(parse_i32("squareFeetMin", raw)?);
        }
        if let Some(raw) = present(&query.square_feet_max) {
            criteria.square_feet_max = Some(parse_i32("squareFeetMax", raw)?);
        }
        if let Some(raw) = present(&query.property_type) {
            criteria.property_type =
                Some(
                    raw.parse::<PropertyType>()
                        .map_err(|_| FilterError::UnknownPropertyType {
                            value: raw.to_string(),
                        })?,
                );
        }
        if let Some(raw) = present(&query.amenities) {
            let tags: Vec<String> = raw
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if !tags.is_empty() {
                criteria.amenities = Some(tags);
            }
        }
        if let Some(raw) = present(&query.available_from) {
            criteria.available_from = Some(parse_date("availableFrom", raw)?);
        }
        if let Some(raw) = present(&query.favorite_ids) {
            let ids = raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| parse_i32("favoriteIds", t))
                .collect::<Result<Vec<i32>, _>>()?;
            if !ids.is_empty() {
                criteria.favorite_ids = Some(ids);
            }
        }

        // The proximity filter needs both halves of the point.
        if let (Some(lat_raw), Some(lon_raw)) =
            (present(&query.latitude), present(&query.longitude))
        {
            let latitude = parse_f64("latitude", lat_raw)?;
            let longitude = parse_f64("longitude", lon_raw)?;
            criteria.center = Some(Coordinates::checked(longitude, latitude)?);
        }

        Ok(criteria)
    }
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !is_any(s))
}

/// Inputs shared by every clause builder.
#[derive(Debug, Clone, Copy)]
pub struct CompileContext {
    /// Proximity search radius in meters (configured, not user-supplied).
    pub radius_meters: f64,
}

type ClauseBuilder = fn(&FilterCriteria, &CompileContext) -> Option<Clause>;

/// One builder per recognized filter, applied in a fixed order.
const CLAUSE_BUILDERS: &[ClauseBuilder] = &[
    favorite_ids_clause,
    price_min_clause,
    price_max_clause,
    beds_clause,
    baths_clause,
    square_feet_min_clause,
    square_feet_max_clause,
    property_type_clause,
    amenities_clause,
    availability_clause,
    proximity_clause,
];

/// Compile typed criteria into one AND-folded predicate.
pub fn compile(criteria: &FilterCriteria, ctx: &CompileContext) -> CompiledPredicate {
    let mut predicate = CompiledPredicate::default();
    for builder in CLAUSE_BUILDERS {
        if let Some(clause) = builder(criteria, ctx) {
            predicate.push(clause);
        }
    }
    predicate
}

fn favorite_ids_clause(criteria: &FilterCriteria, _: &CompileContext) -> Option<Clause> {
    criteria.favorite_ids.as_ref().map(|ids| {
        Clause::new("p.id = ANY($?)", vec![BindValue::IntArray(ids.clone())])
    })
}

fn price_min_clause(criteria: &FilterCriteria, _: &CompileContext) -> Option<Clause> {
    criteria
        .price_min
        .map(|v| Clause::new("p.price_per_month >= $?", vec![BindValue::Float(v)]))
}

fn price_max_clause(criteria: &FilterCriteria, _: &CompileContext) -> Option<Clause> {
    criteria
        .price_max
        .map(|v| Clause::new("p.price_per_month <= $?", vec![BindValue::Float(v)]))
}

fn beds_clause(criteria: &FilterCriteria, _: &CompileContext) -> Option<Clause> {
    criteria
        .beds_min
        .map(|v| Clause::new("p.beds >= $?", vec![BindValue::Int(v)]))
}

fn baths_clause(criteria: &FilterCriteria, _: &CompileContext) -> Option<Clause> {
    criteria
        .baths_min
        .map(|v| Clause::new("p.baths >= $?", vec![BindValue::Float(v)]))
}

fn square_feet_min_clause(criteria: &FilterCriteria, _: &CompileContext) -> Option<Clause> {
    criteria
        .square_feet_min
        .map(|v| Clause::new("p.square_feet >= $?", vec![BindValue::Int(v)]))
}

fn square_feet_max_clause(criteria: &FilterCriteria, _: &CompileContext) -> Option<Clause> {
    criteria
        .square_feet_max
        .map(|v| Clause::new("p.square_feet <= $?", vec![BindValue::Int(v)]))
}

fn property_type_clause(criteria: &FilterCriteria, _: &CompileContext) -> Option<Clause> {
    // The value was validated against the enumeration at parse time;
    // only the canonical string is bound.
    criteria.property_type.map(|ty| {
        Clause::new(
            "p.property_type = $?",
            vec![BindValue::Text(ty.as_str().to_string())],
        )
    })
}

fn amenities_clause(criteria: &FilterCriteria, _: &CompileContext) -> Option<Clause> {
    // Array containment: the listing's amenity set must be a superset
    // of the requested set.
    criteria.amenities.as_ref().map(|tags| {
        Clause::new(
            "p.amenities @> $?",
            vec![BindValue::TextArray(tags.clone())],
        )
    })
}

fn availability_clause(criteria: &FilterCriteria, _: &CompileContext) -> Option<Clause> {
    // Correlated existence check rather than a join, so a property with
    // several qualifying leases still yields a single row.
    criteria.available_from.map(|date| {
        Clause::new(
            "EXISTS (SELECT 1 FROM leases ls WHERE ls.property_id = p.id AND ls.start_date <= $?)",
            vec![BindValue::Date(date)],
        )
    })
}

fn proximity_clause(criteria: &FilterCriteria, ctx: &CompileContext) -> Option<Clause> {
    criteria
        .center
        .map(|center| geo::within_radius(center, ctx.radius_meters))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: CompileContext = CompileContext {
        radius_meters: 50_000.0,
    };

    // SearchQuery fields are all optional strings, so a JSON object of
    // strings deserializes exactly like a query string would.
    fn query(pairs: &[(&str, &str)]) -> SearchQuery {
        let mut map = serde_json::Map::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), serde_json::Value::String(v.to_string()));
        }
        serde_json::from_value(serde_json::Value::Object(map)).unwrap()
    }

    #[test]
    fn test_empty_query_compiles_to_empty_predicate() {
        let criteria = FilterCriteria::from_query(&SearchQuery::default()).unwrap();
        let predicate = compile(&criteria, &CTX);
        assert!(predicate.is_empty());
        assert!(predicate.where_clause().is_none());
        assert!(predicate.binds().is_empty());
    }

    #[test]
    fn test_any_sentinel_is_skipped() {
        let q = query(&[("beds", "any"), ("propertyType", "any"), ("baths", "")]);
        let criteria = FilterCriteria::from_query(&q).unwrap();
        assert_eq!(criteria, FilterCriteria::default());
    }

    #[test]
    fn test_price_range_inclusive_bounds() {
        let q = query(&[("priceMin", "2000"), ("priceMax", "4000")]);
        let criteria = FilterCriteria::from_query(&q).unwrap();
        let predicate = compile(&criteria, &CTX);
        let where_clause = predicate.where_clause().unwrap();
        assert_eq!(
            where_clause,
            "p.price_per_month >= $1 AND p.price_per_month <= $2"
        );
        assert_eq!(
            predicate.binds(),
            &[BindValue::Float(2000.0), BindValue::Float(4000.0)]
        );
    }

    #[test]
    fn test_min_greater_than_max_is_not_an_error() {
        let q = query(&[("priceMin", "4000"), ("priceMax", "2000")]);
        let criteria = FilterCriteria::from_query(&q).unwrap();
        let predicate = compile(&criteria, &CTX);
        // Compiles to a contradictory predicate; the query simply
        // matches nothing.
        assert_eq!(predicate.len(), 2);
    }

    #[test]
    fn test_malformed_number_is_invalid_filter() {
        let q = query(&[("priceMin", "cheap")]);
        let err = FilterCriteria::from_query(&q).unwrap_err();
        assert!(matches!(err, FilterError::InvalidValue { field: "priceMin", .. }));
    }

    #[test]
    fn test_unknown_property_type_is_rejected() {
        let q = query(&[("propertyType", "Castle")]);
        let err = FilterCriteria::from_query(&q).unwrap_err();
        assert!(matches!(err, FilterError::UnknownPropertyType { .. }));
    }

    #[test]
    fn test_property_type_binds_canonical_string() {
        let q = query(&[("propertyType", "apartment")]);
        let criteria = FilterCriteria::from_query(&q).unwrap();
        let predicate = compile(&criteria, &CTX);
        assert_eq!(
            predicate.binds(),
            &[BindValue::Text("Apartment".to_string())]
        );
    }

    #[test]
    fn test_amenities_csv_parses_and_compiles_containment() {
        let q = query(&[("amenities", "wifi, parking,gym")]);
        let criteria = FilterCriteria::from_query(&q).unwrap();
        let predicate = compile(&criteria, &CTX);
        assert_eq!(predicate.where_clause().unwrap(), "p.amenities @> $1");
        assert_eq!(
            predicate.binds(),
            &[BindValue::TextArray(vec![
                "wifi".to_string(),
                "parking".to_string(),
                "gym".to_string(),
            ])]
        );
    }

    #[test]
    fn test_favorite_ids_allow_list() {
        let q = query(&[("favoriteIds", "3,7,12")]);
        let criteria = FilterCriteria::from_query(&q).unwrap();
        let predicate = compile(&criteria, &CTX);
        assert_eq!(predicate.where_clause().unwrap(), "p.id = ANY($1)");
        assert_eq!(predicate.binds(), &[BindValue::IntArray(vec![3, 7, 12])]);
    }

    #[test]
    fn test_favorite_ids_malformed_entry_fails() {
        let q = query(&[("favoriteIds", "3,x,12")]);
        assert!(FilterCriteria::from_query(&q).is_err());
    }

    #[test]
    fn test_availability_uses_correlated_exists() {
        let q = query(&[("availableFrom", "2025-07-01")]);
        let criteria = FilterCriteria::from_query(&q).unwrap();
        let predicate = compile(&criteria, &CTX);
        let where_clause = predicate.where_clause().unwrap();
        assert!(where_clause.starts_with("EXISTS (SELECT 1 FROM leases"));
        assert!(where_clause.contains("ls.start_date <= $1"));
    }

    #[test]
    fn test_availability_accepts_rfc3339() {
        let q = query(&[("availableFrom", "2025-07-01T12:30:00Z")]);
        let criteria = FilterCriteria::from_query(&q).unwrap();
        assert_eq!(
            criteria.available_from,
            Some(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap())
        );
    }

    #[test]
    fn test_proximity_requires_both_coordinates() {
        let q = query(&[("latitude", "37.77")]);
        let criteria = FilterCriteria::from_query(&q).unwrap();
        assert!(criteria.center.is_none());
    }

    #[test]
    fn test_proximity_rejects_malformed_coordinate() {
        let q = query(&[("latitude", "37.77"), ("longitude", "west")]);
        assert!(FilterCriteria::from_query(&q).is_err());

        let q = query(&[("latitude", "NaN"), ("longitude", "10.0")]);
        assert!(FilterCriteria::from_query(&q).is_err());
    }

    #[test]
    fn test_proximity_clause_binds_radius_from_context() {
        let q = query(&[("latitude", "37.7749"), ("longitude", "-122.4194")]);
        let criteria = FilterCriteria::from_query(&q).unwrap();
        let predicate = compile(&criteria, &CTX);
        let where_clause = predicate.where_clause().unwrap();
        assert_eq!(
            where_clause,
            "ST_DWithin(l.coordinates, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3)"
        );
        assert_eq!(
            predicate.binds(),
            &[
                BindValue::Float(-122.4194),
                BindValue::Float(37.7749),
                BindValue::Float(50_000.0),
            ]
        );
    }

    #[test]
    fn test_placeholder_numbering_spans_clauses() {
        let q = query(&[
            ("favoriteIds", "1,2"),
            ("priceMin", "1000"),
            ("beds", "2"),
            ("latitude", "0.5"),
            ("longitude", "10"),
        ]);
        let criteria = FilterCriteria::from_query(&q).unwrap();
        let predicate = compile(&criteria, &CTX);
        let where_clause = predicate.where_clause().unwrap();
        assert_eq!(
            where_clause,
            "p.id = ANY($1) AND p.price_per_month >= $2 AND p.beds >= $3 AND \
             ST_DWithin(l.coordinates, ST_SetSRID(ST_MakePoint($4, $5), 4326)::geography, $6)"
        );
        assert_eq!(predicate.binds().len(), 6);
    }
}
