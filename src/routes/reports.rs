//! Sales and inventory reports, plus the CSV export of sale lines.

use axum::{
    Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use crate::error::ApiResult;
use crate::routes::extractors::{Json, Query};
use crate::server::AppState;
use crate::services::reports::{
    Granularity, InventoryReport, ReportRange, SalesReport, build_inventory_report,
    build_sales_report, sales_csv,
};
use crate::services::stock::optional_text;
use crate::state_structs::SalesReportQuery;

fn resolve(query: &SalesReportQuery) -> ApiResult<(ReportRange, Granularity)> {
    let range = ReportRange::resolve(query.from, query.to, Utc::now())?;
    let granularity = optional_text(query.granularity.clone())
        .map(|g| g.parse::<Granularity>())
        .transpose()?
        .unwrap_or_default();
    Ok((range, granularity))
}

pub async fn sales_report(
    State(app_state): State<AppState>,
    Query(query): Query<SalesReportQuery>,
) -> ApiResult<Json<SalesReport>> {
    let (range, granularity) = resolve(&query)?;
    let lines = app_state.db.sale_lines(&range).await?;
    Ok(Json(build_sales_report(&lines, range, granularity)))
}

pub async fn export_sales(
    State(app_state): State<AppState>,
    Query(query): Query<SalesReportQuery>,
) -> ApiResult<impl IntoResponse> {
    let (range, _) = resolve(&query)?;
    let lines = app_state.db.sale_lines(&range).await?;
    let body = sales_csv(&lines)?;
    let filename = format!(
        "sales-{}-to-{}.csv",
        range.from.format("%Y%m%d"),
        range.to.format("%Y%m%d")
    );
    tracing::info!("Exporting {} sale lines as {}", lines.len(), filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}

pub async fn inventory_report(State(app_state): State<AppState>) -> ApiResult<Json<InventoryReport>> {
    let items = app_state.db.list_inventory(None, None, None).await?;
    Ok(Json(build_inventory_report(&items)))
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports/sales", get(sales_report))
        .route("/api/reports/sales/export", get(export_sales))
        .route("/api/reports/inventory", get(inventory_report))
}
