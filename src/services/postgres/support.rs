use uuid::Uuid;

use super::{PostgresClient, PostgresError};
use crate::core::TicketStatus;
use crate::models::{MessageSender, SupportMessage, SupportTicket};

impl PostgresClient {
    /// Open a ticket with its first message
    pub async fn create_ticket(
        &self,
        user_id: Uuid,
        subject: &str,
        category: Option<&str>,
        message: &str,
    ) -> Result<(SupportTicket, SupportMessage), PostgresError> {
        let ticket_query = r#"
            INSERT INTO support_tickets (id, user_id, subject, category, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'open', NOW(), NOW())
            RETURNING *
        "#;

        let ticket = sqlx::query_as::<_, SupportTicket>(ticket_query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(subject)
            .bind(category)
            .fetch_one(self.pool())
            .await?;

        let first_message = self
            .insert_ticket_message(ticket.id, MessageSender::User, message)
            .await?;

        Ok((ticket, first_message))
    }

    pub async fn list_tickets(&self, user_id: Uuid) -> Result<Vec<SupportTicket>, PostgresError> {
        let tickets = sqlx::query_as::<_, SupportTicket>(
            "SELECT * FROM support_tickets WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(tickets)
    }

    pub async fn get_ticket(
        &self,
        user_id: Uuid,
        ticket_id: Uuid,
    ) -> Result<Option<SupportTicket>, PostgresError> {
        let ticket = sqlx::query_as::<_, SupportTicket>(
            "SELECT * FROM support_tickets WHERE id = $1 AND user_id = $2",
        )
        .bind(ticket_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(ticket)
    }

    pub async fn list_ticket_messages(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<SupportMessage>, PostgresError> {
        let messages = sqlx::query_as::<_, SupportMessage>(
            "SELECT * FROM support_messages WHERE ticket_id = $1 ORDER BY created_at",
        )
        .bind(ticket_id)
        .fetch_all(self.pool())
        .await?;

        Ok(messages)
    }

    pub async fn insert_ticket_message(
        &self,
        ticket_id: Uuid,
        sender: MessageSender,
        body: &str,
    ) -> Result<SupportMessage, PostgresError> {
        let query = r#"
            INSERT INTO support_messages (id, ticket_id, sender, body, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
        "#;

        let message = sqlx::query_as::<_, SupportMessage>(query)
            .bind(Uuid::new_v4())
            .bind(ticket_id)
            .bind(sender)
            .bind(body)
            .fetch_one(self.pool())
            .await?;

        Ok(message)
    }

    pub async fn set_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<(), PostgresError> {
        sqlx::query("UPDATE support_tickets SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(ticket_id)
            .bind(status)
            .execute(self.pool())
            .await?;

        Ok(())
    }
}
