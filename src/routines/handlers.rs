use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::repo::User,
    auth::session::AuthUser,
    error::ApiError,
    extract::ValidJson,
    routines::dto::{
        MonthlyRoutinesResponse, RoutineResponse, RoutinesResponse, SaveRoutineRequest,
        SavedRoutineResponse,
    },
    routines::repo::{NewRoutine, Routine},
    routines::service::{group_by_month, long_weekday, parse_date},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/save-routine", post(save_routine))
        .route("/weekly-routines/:user_id", get(weekly_routines))
        .route("/monthly-routines/:user_id", get(monthly_routines))
        .route("/routine/:user_id/:routine_id", get(get_routine))
}

/// A caller may only act on their own routines.
fn require_owner(caller: &AuthUser, target: Uuid) -> Result<(), ApiError> {
    if caller.user_id != target {
        warn!(caller = %caller.user_id, target = %target, "cross-user routine access denied");
        return Err(ApiError::Forbidden(
            "You can only access your own routines".into(),
        ));
    }
    Ok(())
}

fn non_empty(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
async fn save_routine(
    State(state): State<AppState>,
    caller: AuthUser,
    ValidJson(payload): ValidJson<SaveRoutineRequest>,
) -> Result<Json<SavedRoutineResponse>, ApiError> {
    non_empty(&payload.duration, "duration")?;
    non_empty(&payload.routine_type, "type")?;
    non_empty(&payload.level, "level")?;
    if payload.exercises.is_empty() {
        return Err(ApiError::Validation(
            "exercises must be a non-empty array of strings".into(),
        ));
    }
    let date = parse_date(&payload.date)?;

    require_owner(&caller, payload.user_id)?;

    let new = NewRoutine {
        duration: payload.duration,
        routine_type: payload.routine_type,
        level: payload.level,
        date: payload.date,
        weekday: long_weekday(date),
        exercises: payload.exercises,
    };
    let routine = Routine::insert(&state.db, payload.user_id, new)
        .await
        .map_err(|e| {
            // The owning user row can disappear between token issuance and
            // the insert; the foreign key catches it.
            if e.as_database_error()
                .is_some_and(|d| d.is_foreign_key_violation())
            {
                ApiError::NotFound("User not found".into())
            } else {
                error!(error = %e, user_id = %payload.user_id, "insert routine failed");
                ApiError::Database(e)
            }
        })?;

    info!(user_id = %payload.user_id, routine_id = %routine.id, "routine saved");
    Ok(Json(SavedRoutineResponse {
        message: "Routine saved successfully!".into(),
        routine,
    }))
}

#[instrument(skip(state))]
async fn weekly_routines(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<RoutinesResponse>, ApiError> {
    require_owner(&caller, user_id)?;

    if User::find_by_id(&state.db, user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    // The full list; the client windows it to the last seven days.
    let routines = Routine::list_by_user(&state.db, user_id).await?;
    Ok(Json(RoutinesResponse { routines }))
}

#[instrument(skip(state))]
async fn monthly_routines(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<MonthlyRoutinesResponse>, ApiError> {
    require_owner(&caller, user_id)?;

    if User::find_by_id(&state.db, user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let routines = Routine::list_by_user(&state.db, user_id).await?;
    Ok(Json(MonthlyRoutinesResponse {
        monthly_routines: group_by_month(routines),
    }))
}

#[instrument(skip(state))]
async fn get_routine(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((user_id, routine_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RoutineResponse>, ApiError> {
    require_owner(&caller, user_id)?;

    let routine = Routine::find_one(&state.db, user_id, routine_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Routine not found".into()))?;
    Ok(Json(RoutineResponse { routine }))
}
