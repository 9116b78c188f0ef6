use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::routines::repo::Routine;

/// Request body for saving a routine. `weekday` is accepted for
/// compatibility with the form payload but the stored value is derived
/// from `date`.
#[derive(Debug, Deserialize)]
pub struct SaveRoutineRequest {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub duration: String,
    #[serde(rename = "type")]
    pub routine_type: String,
    pub level: String,
    pub date: String,
    pub weekday: String,
    pub exercises: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SavedRoutineResponse {
    pub message: String,
    pub routine: Routine,
}

#[derive(Debug, Serialize)]
pub struct RoutinesResponse {
    pub routines: Vec<Routine>,
}

#[derive(Debug, Serialize)]
pub struct RoutineResponse {
    pub routine: Routine,
}

/// One month's bucket of routines.
#[derive(Debug, Serialize)]
pub struct MonthlyGroup {
    pub month: u8,
    pub year: i32,
    pub routines: Vec<Routine>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyRoutinesResponse {
    #[serde(rename = "monthlyRoutines")]
    pub monthly_routines: Vec<MonthlyGroup>,
}
