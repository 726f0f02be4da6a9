//! OpenAPI document for the shipments API.

use utoipa::OpenApi;

use crate::errors::{ErrorResponse, ValidationErrors};
use crate::handlers::shipments::{ProductRecord, ShipmentList, ShipmentRecord};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "glexport-api",
        description = "Read-only shipments API with filtering, sorting, and pagination"
    ),
    paths(crate::handlers::shipments::list_shipments),
    components(schemas(
        ShipmentList,
        ShipmentRecord,
        ProductRecord,
        ValidationErrors,
        ErrorResponse
    )),
    tags((name = "shipments", description = "Shipment listing endpoints"))
)]
pub struct ApiDoc;

/// Returns the generated OpenAPI document.
pub fn api_doc() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
