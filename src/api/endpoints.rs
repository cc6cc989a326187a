//! Endpoint registry: logical operation names mapped to backend paths.
//!
//! Leaves are either literal paths or pure functions of entity ids.

pub mod auth {
  pub const LOGIN: &str = "/api/auth/login";
  pub const REGISTER: &str = "/api/auth/register";
  pub const REFRESH: &str = "/api/auth/refresh";
  pub const LOGOUT: &str = "/api/auth/logout";
  pub const ME: &str = "/api/auth/me";
  pub const AVATAR: &str = "/api/auth/avatar";
}

pub mod jobs {
  pub const LIST: &str = "/api/jobs";
  pub const OPEN: &str = "/api/jobs/open";
  pub const CREATE: &str = "/api/jobs";

  pub fn by_id(id: &str) -> String {
    format!("/api/jobs/{}", id)
  }

  pub fn place_bid(job_id: &str) -> String {
    format!("/api/jobs/{}/bid", job_id)
  }

  pub fn bids(job_id: &str) -> String {
    format!("/api/jobs/{}/bids", job_id)
  }

  pub fn accept_bid(job_id: &str, bid_id: &str) -> String {
    format!("/api/jobs/{}/bids/{}/accept", job_id, bid_id)
  }

  pub fn reject_bid(job_id: &str, bid_id: &str) -> String {
    format!("/api/jobs/{}/bids/{}/reject", job_id, bid_id)
  }
}

pub mod services {
  pub const LIST: &str = "/api/services";

  pub fn by_id(id: &str) -> String {
    format!("/api/services/{}", id)
  }
}

pub mod payments {
  pub const LIST: &str = "/api/payments";

  pub fn by_id(id: &str) -> String {
    format!("/api/payments/{}", id)
  }

  pub fn release(id: &str) -> String {
    format!("/api/payments/{}/release", id)
  }

  pub fn refund(id: &str) -> String {
    format!("/api/payments/{}/refund", id)
  }
}

pub mod support {
  pub const TICKETS: &str = "/api/support/tickets";
  pub const ADMIN_TICKETS: &str = "/api/support/admin/tickets";

  pub fn ticket(id: &str) -> String {
    format!("/api/support/tickets/{}", id)
  }

  pub fn ticket_messages(id: &str) -> String {
    format!("/api/support/tickets/{}/messages", id)
  }

  pub fn admin_ticket(id: &str) -> String {
    format!("/api/support/admin/tickets/{}", id)
  }
}

pub mod dashboard {
  pub const CUSTOMER: &str = "/api/dashboard/customer";
  pub const VENDOR: &str = "/api/dashboard/vendor";
  pub const ADMIN: &str = "/api/dashboard/admin";
}

pub mod vendor {
  pub const SUMMARY: &str = "/api/vendor/dashboard/summary";
  pub const AVAILABLE_JOBS: &str = "/api/vendor/jobs/available";
  pub const BIDS: &str = "/api/vendor/bids";
  pub const EARNINGS: &str = "/api/vendor/earnings";

  pub fn bid(id: &str) -> String {
    format!("/api/vendor/bids/{}", id)
  }
}

pub mod admin {
  pub const USERS: &str = "/api/admin/users";
  pub const VENDORS: &str = "/api/admin/vendors";

  pub fn user(id: &str) -> String {
    format!("/api/admin/users/{}", id)
  }

  pub fn user_status(id: &str) -> String {
    format!("/api/admin/users/{}/status", id)
  }

  pub fn vendor(id: &str) -> String {
    format!("/api/admin/vendors/{}", id)
  }

  pub fn verify_vendor(id: &str) -> String {
    format!("/api/admin/vendors/{}/verify", id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parameterized_paths() {
    assert_eq!(jobs::by_id("j1"), "/api/jobs/j1");
    assert_eq!(jobs::place_bid("j1"), "/api/jobs/j1/bid");
    assert_eq!(jobs::bids("j1"), "/api/jobs/j1/bids");
    assert_eq!(jobs::accept_bid("j1", "b1"), "/api/jobs/j1/bids/b1/accept");
    assert_eq!(jobs::reject_bid("j1", "b1"), "/api/jobs/j1/bids/b1/reject");
    assert_eq!(payments::release("p9"), "/api/payments/p9/release");
    assert_eq!(payments::refund("p9"), "/api/payments/p9/refund");
    assert_eq!(support::admin_ticket("t3"), "/api/support/admin/tickets/t3");
    assert_eq!(vendor::bid("b2"), "/api/vendor/bids/b2");
  }
}
