use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    Json,
};

use petstore_infra::EditRecord;

use crate::app::dto::EditsQuery;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::validation::validate_query;

/// Audit trail, oldest first, optionally narrowed to one collection/target.
pub async fn list_edits(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<EditRecord>>, ApiError> {
    let query: EditsQuery = validate_query(params)?;
    let edits = services
        .edits
        .find_edits(query.collection.as_deref(), query.target.as_deref())
        .await?;
    Ok(Json(edits))
}
