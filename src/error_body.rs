use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ErrorBodyDoc {
    pub error: String,
    pub code: String,
    pub trace_id: Option<String>,
}
