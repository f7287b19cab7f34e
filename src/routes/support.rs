use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    CreateTicketRequest, MessageSender, SupportTicket, TicketDetailResponse, TicketMessageRequest,
};
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/support/tickets", web::post().to(create_ticket))
        .route("/support/tickets", web::get().to(list_tickets))
        .route("/support/tickets/{id}", web::get().to(get_ticket))
        .route("/support/tickets/{id}/messages", web::post().to(add_message))
        .route("/support/tickets/{id}/close", web::post().to(close_ticket));
}

async fn owned_ticket(
    state: &AppState,
    user: &AuthUser,
    ticket_id: Uuid,
) -> Result<SupportTicket, ApiError> {
    state
        .postgres
        .get_ticket(user.user_id, ticket_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))
}

/// Open a support ticket
///
/// POST /api/v1/support/tickets
async fn create_ticket(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CreateTicketRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let (ticket, message) = state
        .postgres
        .create_ticket(
            user.user_id,
            req.subject.trim(),
            req.category.as_deref(),
            req.message.trim(),
        )
        .await?;

    // Notification to the support inbox is best-effort
    if let Err(e) = state
        .email
        .notify_support(&ticket.id.to_string(), &ticket.subject)
        .await
    {
        tracing::warn!("Support notification failed for ticket {}: {}", ticket.id, e);
    }

    Ok(HttpResponse::Created().json(TicketDetailResponse {
        ticket,
        messages: vec![message],
    }))
}

async fn list_tickets(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let tickets = state.postgres.list_tickets(user.user_id).await?;
    Ok(HttpResponse::Ok().json(tickets))
}

async fn get_ticket(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let ticket = owned_ticket(&state, &user, path.into_inner()).await?;
    let messages = state.postgres.list_ticket_messages(ticket.id).await?;

    Ok(HttpResponse::Ok().json(TicketDetailResponse { ticket, messages }))
}

/// Add a message to an open ticket; reopens an answered one
///
/// POST /api/v1/support/tickets/{id}/messages
async fn add_message(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    req: web::Json<TicketMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let ticket = owned_ticket(&state, &user, path.into_inner()).await?;

    let next_status = ticket
        .status
        .after_user_message()
        .ok_or_else(|| ApiError::Conflict("Ticket is closed".to_string()))?;

    let message = state
        .postgres
        .insert_ticket_message(ticket.id, MessageSender::User, req.body.trim())
        .await?;

    if next_status != ticket.status {
        state.postgres.set_ticket_status(ticket.id, next_status).await?;
    }

    Ok(HttpResponse::Created().json(message))
}

async fn close_ticket(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let ticket = owned_ticket(&state, &user, path.into_inner()).await?;

    if !ticket.status.can_close() {
        return Err(ApiError::Conflict("Ticket is already closed".to_string()));
    }

    state
        .postgres
        .set_ticket_status(ticket.id, crate::core::TicketStatus::Closed)
        .await?;

    let closed = owned_ticket(&state, &user, ticket.id).await?;
    Ok(HttpResponse::Ok().json(closed))
}
