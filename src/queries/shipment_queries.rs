//! Shipment listing queries.
//!
//! The SQL shape here is fixed and hand-templated for exactly one resource;
//! only values are bound at execution time. The sort column and direction are
//! closed enums mapped to literal fragments, so no request-supplied string is
//! ever spliced into statement text.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, FromQueryResult, Statement, Value};
use tracing::debug;

use super::Query;
use crate::errors::ServiceError;

/// Sortable columns of the shipment listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    InternationalDepartureDate,
}

impl SortColumn {
    /// Maps a raw request value onto the allowlist. Anything unknown falls
    /// back to `Id` without raising an error.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("international_departure_date") => Self::InternationalDepartureDate,
            _ => Self::Id,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::InternationalDepartureDate => "international_departure_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Same silent-fallback contract as [`SortColumn::from_param`].
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("desc") => Self::Desc,
            _ => Self::Asc,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Finalized arguments for one shipment listing request, produced by the
/// validation and defaulting stages.
#[derive(Debug, Clone)]
pub struct ShipmentListArgs {
    pub company_id: i32,
    pub transportation_mode: Option<String>,
    pub sort: SortColumn,
    pub direction: SortDirection,
    pub page: i64,
    pub per: i64,
}

/// One row of the shipment listing SELECT.
#[derive(Debug, Clone, FromQueryResult)]
pub struct ShipmentRow {
    pub id: i32,
    pub name: String,
}

/// One row of the per-shipment product SELECT. `active_shipment_count` is the
/// aggregate computed across all shipments globally, not scoped to the
/// requesting company.
#[derive(Debug, Clone, FromQueryResult)]
pub struct ProductRow {
    pub id: i32,
    pub sku: String,
    pub description: String,
    pub quantity: i32,
    pub active_shipment_count: i64,
}

/// Positional bind placeholder in the backend's dialect. Postgres wants `$n`,
/// SQLite and MySQL want `?`.
fn placeholder(backend: DbBackend, index: usize) -> String {
    match backend {
        DbBackend::Postgres => format!("${}", index),
        _ => "?".to_string(),
    }
}

/// Builds the paginated shipment listing statement. All filter values and
/// pagination bounds are bound parameters.
pub fn shipment_select(backend: DbBackend, args: &ShipmentListArgs) -> Statement {
    let mut values: Vec<Value> = vec![args.company_id.into()];
    let mut sql = format!(
        "SELECT id, name FROM shipments WHERE company_id = {}",
        placeholder(backend, 1)
    );

    if let Some(mode) = &args.transportation_mode {
        values.push(mode.clone().into());
        sql.push_str(&format!(
            " AND international_transportation_mode = {}",
            placeholder(backend, values.len())
        ));
    }

    sql.push_str(&format!(
        " ORDER BY {} {}",
        args.sort.column(),
        args.direction.keyword()
    ));

    values.push(args.per.into());
    sql.push_str(&format!(" LIMIT {}", placeholder(backend, values.len())));

    let offset = args.page.saturating_sub(1).saturating_mul(args.per);
    values.push(offset.into());
    sql.push_str(&format!(" OFFSET {}", placeholder(backend, values.len())));

    Statement::from_sql_and_values(backend, sql, values)
}

/// Builds the product statement for one shipment: product rows joined against
/// the association table and a global active-shipment-count aggregate.
pub fn product_select(backend: DbBackend, shipment_id: i32) -> Statement {
    let sql = format!(
        "SELECT products.id, products.sku, products.description, products.quantity, \
         active_shipments.active_shipment_count \
         FROM products \
         INNER JOIN shipment_products ON shipment_products.product_id = products.id \
         INNER JOIN (\
         SELECT product_id, COUNT(shipment_id) AS active_shipment_count \
         FROM shipment_products GROUP BY product_id\
         ) AS active_shipments ON active_shipments.product_id = products.id \
         WHERE shipment_products.shipment_id = {}",
        placeholder(backend, 1)
    );

    Statement::from_sql_and_values(backend, sql, vec![shipment_id.into()])
}

/// Fetches the product rows belonging to a single shipment.
#[derive(Debug)]
pub struct ProductsForShipmentQuery {
    pub shipment_id: i32,
}

#[async_trait]
impl Query for ProductsForShipmentQuery {
    type Result = Vec<ProductRow>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let stmt = product_select(db.get_database_backend(), self.shipment_id);
        let products = ProductRow::find_by_statement(stmt).all(db).await?;
        Ok(products)
    }
}

/// Pages through one company's shipments and fetches each shipment's product
/// rows. Shipments and product lists stay paired, in listing order; the N
/// product queries run sequentially after the listing query with no spanning
/// transaction.
#[derive(Debug)]
pub struct ListShipmentsQuery {
    pub args: ShipmentListArgs,
}

#[async_trait]
impl Query for ListShipmentsQuery {
    type Result = Vec<(ShipmentRow, Vec<ProductRow>)>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let backend = db.get_database_backend();
        let shipments = ShipmentRow::find_by_statement(shipment_select(backend, &self.args))
            .all(db)
            .await?;
        debug!(
            company_id = self.args.company_id,
            count = shipments.len(),
            "fetched shipment page"
        );

        let mut records = Vec::with_capacity(shipments.len());
        for shipment in shipments {
            let products = ProductsForShipmentQuery {
                shipment_id: shipment.id,
            }
            .execute(db)
            .await?;
            records.push((shipment, products));
        }

        Ok(records)
    }
}
