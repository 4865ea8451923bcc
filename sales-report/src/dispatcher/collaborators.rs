//! Dispatcher collaborator seams
//!
//! The batch loop only sees these traits. The binary wires
//! [`MasterKey`](super::vault::MasterKey),
//! [`SqliteRegistry`](super::registry::SqliteRegistry) and
//! [`TelegramDelivery`](super::delivery::TelegramDelivery); tests wire
//! in-memory fakes.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use shared::ReportResult;
use zeroize::Zeroizing;

/// Delivery address of a tenant (the chat id)
pub type TenantId = i64;

/// One subscribed tenant with its sealed upstream credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub tenant_id: TenantId,
    pub encrypted_credential: String,
}

/// Registry view of a tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantProfile {
    /// Registry row id, used for audit records
    pub user_id: i64,
    pub tenant_id: TenantId,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub notification_enabled: bool,
    pub default_report_type: String,
    pub timezone: String,
    pub created_at: Option<NaiveDateTime>,
    pub last_active: Option<NaiveDateTime>,
}

/// Opens stored credential blobs
pub trait CredentialVault: Send + Sync {
    /// Plaintext credential; wiped from memory when dropped
    fn decrypt(&self, blob: &str) -> ReportResult<Zeroizing<String>>;
}

/// Source of subscribed tenants and sink for audit records
#[async_trait]
pub trait SubscriberRegistry: Send + Sync {
    /// Tenants that should receive scheduled reports
    async fn subscribers(&self) -> ReportResult<Vec<Subscriber>>;

    async fn profile(&self, tenant: TenantId) -> ReportResult<Option<TenantProfile>>;

    /// Record one served request, e.g. `("scheduled_daily", "2024-01-14")`
    async fn log_request(&self, tenant: TenantId, request_type: &str, period: &str)
    -> ReportResult<()>;
}

/// Outbound message channel
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn deliver(&self, tenant: TenantId, text: &str) -> ReportResult<()>;
}
