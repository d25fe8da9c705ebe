use std::time::Duration;

use async_trait::async_trait;
use axum::http::header;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::directive::DirectiveSink;
use crate::models::NoteStatus;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned {status}: {detail}")]
    Rejected { status: u16, detail: String },

    #[error("empty response from store")]
    EmptyResponse,
}

/// Gateway to the hosted table store's data API. Every operation is scoped by
/// the verified caller's user id; a row belonging to someone else behaves
/// exactly like a row that does not exist.
pub struct Store {
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
    timeout: Duration,
}

impl Store {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Store {
            http,
            rest_url: format!("{}/rest/v1", config.supabase_url.trim_end_matches('/')),
            anon_key: config.supabase_key.clone(),
            timeout: config.store_timeout,
        }
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.anon_key))
            .timeout(self.timeout)
    }

    async fn rows(response: reqwest::Response) -> Result<Vec<serde_json::Value>, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response.json().await?)
    }

    /// Inserts one row and returns it as stored (id and timestamps filled in
    /// by the store).
    pub async fn insert(
        &self,
        table: &str,
        row: &serde_json::Value,
    ) -> Result<serde_json::Value, StoreError> {
        let response = self
            .request(reqwest::Method::POST, table)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;

        let mut rows = Self::rows(response).await?;
        if rows.is_empty() {
            return Err(StoreError::EmptyResponse);
        }
        Ok(rows.remove(0))
    }

    pub async fn select_by_owner(
        &self,
        table: &str,
        user_id: Uuid,
        columns: &str,
        order: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let mut query = vec![
            ("select".to_string(), columns.to_string()),
            ("user_id".to_string(), format!("eq.{}", user_id)),
        ];
        if let Some(order) = order {
            query.push(("order".to_string(), order.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit".to_string(), limit.to_string()));
        }

        let response = self
            .request(reqwest::Method::GET, table)
            .query(&query)
            .send()
            .await?;

        Self::rows(response).await
    }

    /// Applies a partial update; None means no row matched both the id and
    /// the owner.
    pub async fn update_by_id_and_owner(
        &self,
        table: &str,
        id: &str,
        user_id: Uuid,
        patch: &serde_json::Value,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let response = self
            .request(reqwest::Method::PATCH, table)
            .header("Prefer", "return=representation")
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", user_id)),
            ])
            .json(patch)
            .send()
            .await?;

        let mut rows = Self::rows(response).await?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.remove(0)))
        }
    }

    /// Returns false when no row matched both the id and the owner.
    pub async fn delete_by_id_and_owner(
        &self,
        table: &str,
        id: &str,
        user_id: Uuid,
    ) -> Result<bool, StoreError> {
        let response = self
            .request(reqwest::Method::DELETE, table)
            .header("Prefer", "return=representation")
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", user_id)),
            ])
            .send()
            .await?;

        let rows = Self::rows(response).await?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl DirectiveSink for Store {
    async fn create_note(
        &self,
        user_id: Uuid,
        title: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        self.insert(
            "notes",
            &serde_json::json!({
                "title": title,
                "content": content,
                "status": NoteStatus::Pending.as_str(),
                "user_id": user_id,
            }),
        )
        .await?;
        Ok(())
    }

    async fn create_event(
        &self,
        user_id: Uuid,
        title: &str,
        description: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.insert(
            "events",
            &serde_json::json!({
                "title": title,
                "description": description,
                "start_time": start.to_rfc3339(),
                "end_time": end.to_rfc3339(),
                "user_id": user_id,
            }),
        )
        .await?;
        Ok(())
    }
}
