//! Request and response records for the marketplace REST API.
//!
//! Every payload crossing the transport boundary is decoded into one of
//! these types; a body that does not match surfaces as a decode error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Auth and users
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
  Customer,
  Vendor,
  Admin,
  #[serde(other)]
  Unknown,
}

impl UserRole {
  pub fn as_str(&self) -> &'static str {
    match self {
      UserRole::Customer => "customer",
      UserRole::Vendor => "vendor",
      UserRole::Admin => "admin",
      UserRole::Unknown => "unknown",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: String,
  pub name: String,
  pub email: String,
  pub role: UserRole,
  pub phone: Option<String>,
  pub avatar_url: Option<String>,
  #[serde(default = "default_true")]
  pub is_active: bool,
  pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
  pub name: String,
  pub email: String,
  pub password: String,
  pub role: UserRole,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
  /// Empty when registration does not sign the user in
  #[serde(default)]
  pub token: String,
  pub refresh_token: Option<String>,
  pub user: User,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

/// Avatar upload; sent as multipart.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
  pub file_name: String,
  pub content_type: String,
  pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserStatusRequest {
  pub is_active: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
  pub id: String,
  pub business_name: String,
  pub user_id: Option<String>,
  pub email: Option<String>,
  #[serde(default)]
  pub verified: bool,
  pub rating: Option<f64>,
}

// ============================================================================
// Jobs and bids
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
  Open,
  InProgress,
  Completed,
  Cancelled,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub category: Option<String>,
  pub budget: Option<f64>,
  pub location: Option<String>,
  pub status: JobStatus,
  pub customer_id: Option<String>,
  pub vendor_id: Option<String>,
  #[serde(default)]
  pub bid_count: u32,
  pub created_at: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
  pub title: String,
  pub description: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub budget: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub budget: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
  Pending,
  Accepted,
  Rejected,
  Withdrawn,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
  pub id: String,
  pub job_id: String,
  pub vendor_id: Option<String>,
  pub amount: f64,
  pub message: Option<String>,
  pub status: BidStatus,
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidRequest {
  pub amount: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub estimated_days: Option<u32>,
}

// ============================================================================
// Services
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
  pub id: String,
  pub name: String,
  pub description: Option<String>,
  pub category: Option<String>,
  pub price: Option<f64>,
  pub vendor_id: Option<String>,
  #[serde(default = "default_true")]
  pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub price: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
}

// ============================================================================
// Payments
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Held,
  Released,
  Refunded,
  Failed,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
  pub id: String,
  pub job_id: String,
  pub amount: f64,
  pub currency: Option<String>,
  pub status: PaymentStatus,
  pub customer_id: Option<String>,
  pub vendor_id: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
  pub job_id: String,
  pub amount: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub method: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RefundRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
}

// ============================================================================
// Support
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
  Open,
  InProgress,
  Resolved,
  Closed,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
  pub author_id: Option<String>,
  pub body: String,
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
  pub id: String,
  pub subject: String,
  pub description: Option<String>,
  pub status: TicketStatus,
  pub priority: Option<String>,
  pub user_id: Option<String>,
  #[serde(default)]
  pub messages: Vec<TicketMessage>,
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
  pub subject: String,
  pub description: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<TicketStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assignee_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketReplyRequest {
  pub message: String,
}

// ============================================================================
// Dashboards
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDashboard {
  pub active_jobs: u64,
  pub completed_jobs: u64,
  pub total_spent: f64,
  pub pending_payments: u64,
  pub recent_jobs: Vec<Job>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VendorDashboard {
  pub active_bids: u64,
  pub won_jobs: u64,
  pub total_earnings: f64,
  pub recent_bids: Vec<Bid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminDashboard {
  pub total_users: u64,
  pub total_vendors: u64,
  pub total_jobs: u64,
  pub open_tickets: u64,
  pub revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VendorSummary {
  pub active_jobs: u64,
  pub pending_bids: u64,
  pub completed_jobs: u64,
  pub rating: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Earnings {
  pub total: f64,
  pub pending: f64,
  pub paid_out: f64,
  pub payments: Vec<Payment>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_job_decodes_camel_case_and_unknown_status() {
    let job: Job = serde_json::from_value(serde_json::json!({
      "id": "j1",
      "title": "Paint fence",
      "status": "on_hold",
      "customerId": "u1",
      "bidCount": 3,
      "createdAt": "2024-05-01T10:00:00Z"
    }))
    .unwrap();

    assert_eq!(job.status, JobStatus::Unknown);
    assert_eq!(job.customer_id.as_deref(), Some("u1"));
    assert_eq!(job.bid_count, 3);
    assert_eq!(job.description, "");
  }

  #[test]
  fn test_job_missing_required_field_fails() {
    let result = serde_json::from_value::<Job>(serde_json::json!({"id": "j1"}));
    assert!(result.is_err());
  }

  #[test]
  fn test_update_request_omits_unset_fields() {
    let body = serde_json::to_value(UpdateJobRequest {
      status: Some(JobStatus::InProgress),
      ..Default::default()
    })
    .unwrap();
    assert_eq!(body, serde_json::json!({"status": "in_progress"}));
  }

  #[test]
  fn test_dashboard_tolerates_partial_body() {
    let dash: CustomerDashboard =
      serde_json::from_value(serde_json::json!({"activeJobs": 2})).unwrap();
    assert_eq!(dash.active_jobs, 2);
    assert!(dash.recent_jobs.is_empty());
  }
}
