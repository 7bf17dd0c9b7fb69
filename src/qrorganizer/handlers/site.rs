use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    internal_error,
    types::{ErrorResponse, SiteInfo},
};
use crate::{account::AccountService, subscription::SubscriptionCatalog};

#[utoipa::path(
    get,
    path = "/api/site",
    responses(
        (status = 200, description = "Site configuration", body = SiteInfo),
        (status = 500, description = "Catalog unavailable", body = ErrorResponse)
    ),
    tag = "site"
)]
#[instrument(skip_all)]
pub async fn site(
    accounts: Extension<AccountService>,
    catalog: Extension<Arc<dyn SubscriptionCatalog>>,
) -> impl IntoResponse {
    match catalog.list_levels().await {
        Ok(subscription_levels) => (
            StatusCode::OK,
            Json(SiteInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                restricted_environment: accounts.is_restricted(),
                subscription_levels,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to list subscription levels: {err:#}");
            internal_error()
        }
    }
}
