use crate::errors::AppError;
use crate::export::{self, ExportFormat};
use crate::models::{
    AppData, DashboardResponse, KpiRecord, LabelRequest, PeriodSelection, RecordFields, Settings,
    SettingsPatch,
};
use crate::state::AppState;
use crate::stats::{build_dashboard, filter_period};
use crate::ui::render_index;
use axum::{
    Form, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::info;

#[derive(Debug, Clone, Copy)]
enum LabelList {
    Buyers,
    Categories,
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let data = state.data.lock().await;
    Html(render_index(&build_dashboard(&data)))
}

pub async fn get_state(State(state): State<AppState>) -> Json<AppData> {
    let data = state.data.lock().await;
    Json(data.clone())
}

pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardResponse> {
    let data = state.data.lock().await;
    Json(build_dashboard(&data))
}

pub async fn create_record(
    State(state): State<AppState>,
    Json(fields): Json<RecordFields>,
) -> Result<(StatusCode, Json<KpiRecord>), AppError> {
    let record = apply_create(&state, fields).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(fields): Json<RecordFields>,
) -> Result<Json<KpiRecord>, AppError> {
    Ok(Json(apply_update(&state, &id, fields).await?))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<KpiRecord>, AppError> {
    Ok(Json(apply_delete(&state, &id).await?))
}

pub async fn put_period(
    State(state): State<AppState>,
    Json(selection): Json<PeriodSelection>,
) -> Result<Json<DashboardResponse>, AppError> {
    let dashboard = state
        .update(|data| {
            data.select_period(selection.year, &selection.month)?;
            Ok(build_dashboard(data))
        })
        .await?;
    Ok(Json(dashboard))
}

pub async fn put_settings(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<Settings>, AppError> {
    Ok(Json(apply_settings(&state, patch).await?))
}

pub async fn add_buyer(
    State(state): State<AppState>,
    Json(request): Json<LabelRequest>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(add_label(&state, LabelList::Buyers, &request.name).await?))
}

pub async fn remove_buyer(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(remove_label(&state, LabelList::Buyers, &name).await?))
}

pub async fn add_category(
    State(state): State<AppState>,
    Json(request): Json<LabelRequest>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(add_label(&state, LabelList::Categories, &request.name).await?))
}

pub async fn remove_category(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(remove_label(&state, LabelList::Categories, &name).await?))
}

pub async fn form_period(
    State(state): State<AppState>,
    Form(selection): Form<PeriodSelection>,
) -> Result<Redirect, AppError> {
    state
        .update(|data| Ok(data.select_period(selection.year, &selection.month)?))
        .await?;
    Ok(Redirect::to("/"))
}

pub async fn form_settings(
    State(state): State<AppState>,
    Form(patch): Form<SettingsPatch>,
) -> Result<Redirect, AppError> {
    apply_settings(&state, patch).await?;
    Ok(Redirect::to("/"))
}

pub async fn form_create_record(
    State(state): State<AppState>,
    Form(fields): Form<RecordFields>,
) -> Result<Redirect, AppError> {
    apply_create(&state, fields).await?;
    Ok(Redirect::to("/"))
}

pub async fn form_update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(fields): Form<RecordFields>,
) -> Result<Redirect, AppError> {
    apply_update(&state, &id, fields).await?;
    Ok(Redirect::to("/"))
}

pub async fn form_delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    apply_delete(&state, &id).await?;
    Ok(Redirect::to("/"))
}

pub async fn form_add_buyer(
    State(state): State<AppState>,
    Form(request): Form<LabelRequest>,
) -> Result<Redirect, AppError> {
    add_label(&state, LabelList::Buyers, &request.name).await?;
    Ok(Redirect::to("/"))
}

pub async fn form_remove_buyer(
    State(state): State<AppState>,
    Form(request): Form<LabelRequest>,
) -> Result<Redirect, AppError> {
    remove_label(&state, LabelList::Buyers, &request.name).await?;
    Ok(Redirect::to("/"))
}

pub async fn form_add_category(
    State(state): State<AppState>,
    Form(request): Form<LabelRequest>,
) -> Result<Redirect, AppError> {
    add_label(&state, LabelList::Categories, &request.name).await?;
    Ok(Redirect::to("/"))
}

pub async fn form_remove_category(
    State(state): State<AppState>,
    Form(request): Form<LabelRequest>,
) -> Result<Redirect, AppError> {
    remove_label(&state, LabelList::Categories, &request.name).await?;
    Ok(Redirect::to("/"))
}

pub async fn export_period(
    State(state): State<AppState>,
    Path(format): Path<String>,
) -> Result<Response, AppError> {
    let format: ExportFormat = format.parse()?;
    let data = state.data.lock().await;
    let rows = filter_period(&data.rows, data.year, &data.month);
    let bytes = export::export(format, &rows, data.year, &data.month)?;
    let name = export::file_name(data.year, &data.month, format);
    info!(file = %name, rows = rows.len(), "exported period");

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

async fn apply_create(state: &AppState, fields: RecordFields) -> Result<KpiRecord, AppError> {
    let record = state.update(|data| Ok(data.insert_record(fields))).await?;
    info!(id = %record.id, buyer = %record.buyer, category = %record.category, "record created");
    Ok(record)
}

async fn apply_update(
    state: &AppState,
    id: &str,
    fields: RecordFields,
) -> Result<KpiRecord, AppError> {
    let record = state
        .update(|data| data.update_record(id, fields).ok_or_else(|| missing_record(id)))
        .await?;
    info!(id, "record updated");
    Ok(record)
}

async fn apply_delete(state: &AppState, id: &str) -> Result<KpiRecord, AppError> {
    let record = state
        .update(|data| data.remove_record(id).ok_or_else(|| missing_record(id)))
        .await?;
    info!(id, "record deleted");
    Ok(record)
}

async fn apply_settings(state: &AppState, patch: SettingsPatch) -> Result<Settings, AppError> {
    let settings = state
        .update(|data| {
            data.apply_settings(patch);
            Ok(data.settings)
        })
        .await?;
    info!(?settings, "settings updated");
    Ok(settings)
}

async fn add_label(state: &AppState, list: LabelList, name: &str) -> Result<Vec<String>, AppError> {
    state
        .update(|data| {
            match list {
                LabelList::Buyers => data.add_buyer(name)?,
                LabelList::Categories => data.add_category(name)?,
            };
            Ok(labels(data, list))
        })
        .await
}

async fn remove_label(
    state: &AppState,
    list: LabelList,
    name: &str,
) -> Result<Vec<String>, AppError> {
    state
        .update(|data| {
            let removed = match list {
                LabelList::Buyers => data.remove_buyer(name),
                LabelList::Categories => data.remove_category(name),
            };
            if !removed {
                return Err(AppError::not_found(format!("'{name}' is not in the list")));
            }
            Ok(labels(data, list))
        })
        .await
}

fn labels(data: &AppData, list: LabelList) -> Vec<String> {
    match list {
        LabelList::Buyers => data.buyers.clone(),
        LabelList::Categories => data.categories.clone(),
    }
}

fn missing_record(id: &str) -> AppError {
    AppError::not_found(format!("no record with id '{id}'"))
}
