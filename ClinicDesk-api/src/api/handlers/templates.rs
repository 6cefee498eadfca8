use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use clinic_desk_domain::entities::template::{
    CreateTemplateRequest, Template, TemplateListQuery, UpdateTemplateRequest,
};

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::state::AppState;
use crate::entities::PublicErrorResponse;

/// Create a prescription, advice or billing template
#[utoipa::path(
    post,
    path = "/api/v1/templates",
    request_body = CreateTemplateRequest,
    responses(
        (status = 201, description = "Template created", body = Template),
        (status = 400, description = "Content does not match the template type", body = PublicErrorResponse),
        (status = 409, description = "Name already used for this type", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "templates"
)]
#[instrument(skip(state, payload))]
pub async fn create_template(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateTemplateRequest>,
) -> ApiResult<(StatusCode, Json<Template>)> {
    let template = state.templates.create_template(payload).await?;
    info!("Created {} template {}", template.template_type, template.id);
    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    get,
    path = "/api/v1/templates",
    params(TemplateListQuery),
    responses((status = 200, description = "Matching templates", body = [Template])),
    security(("jwt_auth" = [])),
    tag = "templates"
)]
pub async fn list_templates(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TemplateListQuery>,
) -> ApiResult<Json<Vec<Template>>> {
    Ok(Json(state.templates.list_templates(query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/templates/{id}",
    params(("id" = String, Path, description = "Template id")),
    responses(
        (status = 200, description = "Template found", body = Template),
        (status = 404, description = "Template not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "templates"
)]
pub async fn get_template(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Template>> {
    Ok(Json(state.templates.get_template(&id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/templates/{id}",
    params(("id" = String, Path, description = "Template id")),
    request_body = UpdateTemplateRequest,
    responses(
        (status = 200, description = "Template updated", body = Template),
        (status = 400, description = "Invalid content", body = PublicErrorResponse),
        (status = 404, description = "Template not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "templates"
)]
#[instrument(skip(state, payload))]
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateTemplateRequest>,
) -> ApiResult<Json<Template>> {
    let template = state.templates.update_template(&id, payload).await?;
    info!("Updated template {}", id);
    Ok(Json(template))
}

#[utoipa::path(
    delete,
    path = "/api/v1/templates/{id}",
    params(("id" = String, Path, description = "Template id")),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 404, description = "Template not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "templates"
)]
pub async fn delete_template(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.templates.delete_template(&id).await?;
    info!("Deleted template {}", id);
    Ok(StatusCode::NO_CONTENT)
}
