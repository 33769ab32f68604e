use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_database::StoreError;

use crate::models::{DaySchedule, Professional, WeeklySchedule};

/// Durable record of professionals and their weekly schedules.
#[async_trait]
pub trait ProfessionalStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Professional>, StoreError>;

    /// Professionals with the global `available` switch on, ordered by name.
    async fn list_available(&self) -> Result<Vec<Professional>, StoreError>;

    async fn insert(&self, professional: Professional) -> Result<Professional, StoreError>;

    async fn update_schedule(
        &self,
        id: Uuid,
        schedule: WeeklySchedule,
        now: DateTime<Utc>,
    ) -> Result<Professional, StoreError>;

    async fn set_available(
        &self,
        id: Uuid,
        available: bool,
        now: DateTime<Utc>,
    ) -> Result<Professional, StoreError>;
}

const TABLE_PATH: &str = "/rest/v1/healthcare_professionals";

pub struct SupabaseProfessionalStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseProfessionalStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn patch(&self, id: Uuid, body: serde_json::Value) -> Result<Professional, StoreError> {
        let path = format!("{}?id=eq.{}", TABLE_PATH, id);
        let rows: Vec<Professional> = self
            .supabase
            .request_returning(Method::PATCH, &path, body)
            .await?;

        rows.into_iter().next().ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl ProfessionalStore for SupabaseProfessionalStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Professional>, StoreError> {
        debug!("Fetching professional: {}", id);
        let path = format!("{}?id=eq.{}", TABLE_PATH, id);
        let rows: Vec<Professional> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_available(&self) -> Result<Vec<Professional>, StoreError> {
        let path = format!("{}?available=eq.true&order=name.asc", TABLE_PATH);
        let rows: Vec<Professional> = self.supabase.request(Method::GET, &path, None).await?;
        debug!("Found {} available professionals", rows.len());
        Ok(rows)
    }

    async fn insert(&self, professional: Professional) -> Result<Professional, StoreError> {
        let body = serde_json::to_value(&professional)
            .map_err(|e| StoreError::Backend(format!("Failed to encode professional: {}", e)))?;

        let rows: Vec<Professional> = self
            .supabase
            .request_returning(Method::POST, TABLE_PATH, body)
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Insert returned no rows".to_string()))
    }

    async fn update_schedule(
        &self,
        id: Uuid,
        schedule: WeeklySchedule,
        now: DateTime<Utc>,
    ) -> Result<Professional, StoreError> {
        let days: Vec<DaySchedule> = schedule.into();
        self.patch(
            id,
            json!({
                "available_days": days,
                "updated_at": now.to_rfc3339_opts(SecondsFormat::Secs, true),
            }),
        )
        .await
    }

    async fn set_available(
        &self,
        id: Uuid,
        available: bool,
        now: DateTime<Utc>,
    ) -> Result<Professional, StoreError> {
        self.patch(
            id,
            json!({
                "available": available,
                "updated_at": now.to_rfc3339_opts(SecondsFormat::Secs, true),
            }),
        )
        .await
    }
}

/// Process-local professional store, used when no database is configured.
#[derive(Default)]
pub struct InMemoryProfessionalStore {
    professionals: RwLock<HashMap<Uuid, Professional>>,
}

impl InMemoryProfessionalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_professionals(professionals: Vec<Professional>) -> Self {
        Self {
            professionals: RwLock::new(professionals.into_iter().map(|p| (p.id, p)).collect()),
        }
    }
}

#[async_trait]
impl ProfessionalStore for InMemoryProfessionalStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Professional>, StoreError> {
        Ok(self.professionals.read().await.get(&id).cloned())
    }

    async fn list_available(&self) -> Result<Vec<Professional>, StoreError> {
        let guard = self.professionals.read().await;
        let mut available: Vec<Professional> = guard.values().filter(|p| p.available).cloned().collect();
        available.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(available)
    }

    async fn insert(&self, professional: Professional) -> Result<Professional, StoreError> {
        self.professionals
            .write()
            .await
            .insert(professional.id, professional.clone());
        Ok(professional)
    }

    async fn update_schedule(
        &self,
        id: Uuid,
        schedule: WeeklySchedule,
        now: DateTime<Utc>,
    ) -> Result<Professional, StoreError> {
        let mut guard = self.professionals.write().await;
        let record = guard.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.schedule = schedule;
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn set_available(
        &self,
        id: Uuid,
        available: bool,
        now: DateTime<Utc>,
    ) -> Result<Professional, StoreError> {
        let mut guard = self.professionals.write().await;
        let record = guard.get_mut(&id).ok_or(StoreError::NotFound)?;
        record.available = available;
        record.updated_at = now;
        Ok(record.clone())
    }
}
