use axum::{body::Bytes, extract::State, Json};

use crate::audit::RequestOrigin;
use crate::contact::{ContactReceipt, ContactService};
use crate::error::ApiError;
use crate::routes::json_body;

/// POST /api/contact
pub async fn submit(
    State(contact): State<ContactService>,
    origin: RequestOrigin,
    body: Bytes,
) -> Result<Json<ContactReceipt>, ApiError> {
    let body = json_body(&body)?;
    contact.submit(&origin, &body).await.map(Json)
}
