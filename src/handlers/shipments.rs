//! Shipments resource handler.
//!
//! Request flow is strictly linear: validate the raw query parameters, fill
//! defaults, run the listing query plus one product query per shipment row,
//! then fold everything into the `records` envelope. Only a missing (or
//! unparseable) typed parameter is a hard error; invalid sort, direction,
//! page, and per values are silently coerced to their defaults — existing
//! clients depend on that asymmetry.

use axum::{
    extract::{Query as QueryParams, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    errors::ServiceError,
    queries::{
        shipment_queries::{
            ListShipmentsQuery, ProductRow, ShipmentListArgs, ShipmentRow, SortColumn,
            SortDirection,
        },
        Query,
    },
    AppState,
};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_PER: i64 = 4;

/// Raw query parameters as they arrive on the wire. Every field is kept as an
/// optional string so the validator owns all type coercion and can report
/// every violation at once.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShipmentListQuery {
    /// Owning company; required and must be a non-zero integer
    pub company_id: Option<String>,
    /// Exact-match filter on the transportation mode column
    pub international_transportation_mode: Option<String>,
    /// Sort column; allowlist {id, international_departure_date}
    pub sort: Option<String>,
    /// Sort direction; allowlist {asc, desc}
    pub direction: Option<String>,
    /// Page number, 1-based
    pub page: Option<String>,
    /// Page size
    pub per: Option<String>,
}

/// Typed parameter bag produced by validation, before defaulting.
#[derive(Debug)]
struct TypedParams {
    company_id: i32,
    international_transportation_mode: Option<String>,
    sort: Option<String>,
    direction: Option<String>,
    page: Option<i64>,
    per: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductRecord {
    pub id: i32,
    pub sku: String,
    pub description: String,
    pub quantity: i32,
    /// Count of shipments referencing this product, across all companies
    pub active_shipment_count: i64,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            sku: row.sku,
            description: row.description,
            quantity: row.quantity,
            active_shipment_count: row.active_shipment_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentRecord {
    pub id: i32,
    pub name: String,
    pub products: Vec<ProductRecord>,
}

/// Top-level response envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentList {
    pub records: Vec<ShipmentRecord>,
}

/// Validates the raw parameters into a typed bag, accumulating one message
/// per violation. Further required/well-formed checks belong here: append to
/// `errors` alongside the existing rules.
///
/// A `company_id` of zero is rejected as missing. That matches the truthiness
/// check existing clients were built against, so it stays.
fn validate(raw: &ShipmentListQuery) -> Result<TypedParams, ServiceError> {
    let mut errors = Vec::new();

    let company_id = match raw.company_id.as_deref() {
        None => {
            errors.push("company_id is required".to_string());
            0
        }
        Some(value) => match value.parse::<i32>() {
            Ok(0) => {
                errors.push("company_id is required".to_string());
                0
            }
            Ok(id) => id,
            Err(_) => {
                errors.push("company_id must be an integer".to_string());
                0
            }
        },
    };

    let page = parse_optional_int("page", raw.page.as_deref(), &mut errors);
    let per = parse_optional_int("per", raw.per.as_deref(), &mut errors);

    if !errors.is_empty() {
        return Err(ServiceError::Validation(errors));
    }

    Ok(TypedParams {
        company_id,
        international_transportation_mode: raw.international_transportation_mode.clone(),
        sort: raw.sort.clone(),
        direction: raw.direction.clone(),
        page,
        per,
    })
}

fn parse_optional_int(name: &str, value: Option<&str>, errors: &mut Vec<String>) -> Option<i64> {
    match value {
        None => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                errors.push(format!("{} must be an integer", name));
                None
            }
        },
    }
}

/// Pure defaulting stage: absent or out-of-allowlist optional parameters are
/// replaced with fixed fallbacks, never rejected. An empty transportation
/// mode string counts as absent.
fn apply_defaults(params: TypedParams) -> ShipmentListArgs {
    ShipmentListArgs {
        company_id: params.company_id,
        transportation_mode: params
            .international_transportation_mode
            .filter(|mode| !mode.is_empty()),
        sort: SortColumn::from_param(params.sort.as_deref()),
        direction: SortDirection::from_param(params.direction.as_deref()),
        page: params.page.filter(|page| *page >= 1).unwrap_or(DEFAULT_PAGE),
        per: params.per.filter(|per| *per >= 1).unwrap_or(DEFAULT_PER),
    }
}

/// Folds paired shipment and product rows into the response envelope,
/// preserving query order. Pairing by construction guarantees product list
/// `i` belongs to shipment `i`.
fn assemble(rows: Vec<(ShipmentRow, Vec<ProductRow>)>) -> ShipmentList {
    ShipmentList {
        records: rows
            .into_iter()
            .map(|(shipment, products)| ShipmentRecord {
                id: shipment.id,
                name: shipment.name,
                products: products.into_iter().map(ProductRecord::from).collect(),
            })
            .collect(),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments",
    params(ShipmentListQuery),
    responses(
        (status = 200, description = "Shipments listed", body = ShipmentList),
        (status = 422, description = "Missing or malformed parameters", body = crate::errors::ValidationErrors),
        (status = 500, description = "Store failure", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    QueryParams(raw): QueryParams<ShipmentListQuery>,
) -> Result<Json<ShipmentList>, ServiceError> {
    let params = validate(&raw)?;
    let args = apply_defaults(params);
    let rows = ListShipmentsQuery { args }.execute(&state.db).await?;
    Ok(Json(assemble(rows)))
}
