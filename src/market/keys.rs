//! Canonical cache key schema for every marketplace query.
//!
//! One hierarchy per domain. Lists are `[domain]` or `[domain, qualifier]`,
//! single entities are `[domain, "byId", id]`, relationships nest under the
//! owning entity as `[domain, id, relation]`.

use crate::cache::{CacheKey, Operation};

pub mod auth {
  use super::*;

  pub fn profile() -> CacheKey {
    CacheKey::for_operation("auth", Operation::Qualified("me"))
  }
}

pub mod jobs {
  use super::*;

  const DOMAIN: &str = "jobs";

  pub fn all() -> CacheKey {
    CacheKey::for_operation(DOMAIN, Operation::List)
  }

  pub fn open() -> CacheKey {
    CacheKey::for_operation(DOMAIN, Operation::Qualified("open"))
  }

  pub fn customer() -> CacheKey {
    CacheKey::for_operation(DOMAIN, Operation::Qualified("customer"))
  }

  pub fn vendor() -> CacheKey {
    CacheKey::for_operation(DOMAIN, Operation::Qualified("vendor"))
  }

  pub fn by_id(id: &str) -> CacheKey {
    CacheKey::for_operation(DOMAIN, Operation::ById(id))
  }

  pub fn bids(job_id: &str) -> CacheKey {
    CacheKey::for_operation(
      DOMAIN,
      Operation::Related {
        id: job_id,
        relation: "bids",
      },
    )
  }
}

pub mod services {
  use super::*;

  pub fn all() -> CacheKey {
    CacheKey::for_operation("services", Operation::List)
  }

  pub fn by_id(id: &str) -> CacheKey {
    CacheKey::for_operation("services", Operation::ById(id))
  }
}

pub mod payments {
  use super::*;

  pub fn all() -> CacheKey {
    CacheKey::for_operation("payments", Operation::List)
  }

  pub fn by_id(id: &str) -> CacheKey {
    CacheKey::for_operation("payments", Operation::ById(id))
  }
}

pub mod support {
  use super::*;

  pub fn all() -> CacheKey {
    CacheKey::for_operation("support", Operation::List)
  }

  pub fn tickets() -> CacheKey {
    CacheKey::for_operation("support", Operation::Qualified("tickets"))
  }

  pub fn ticket(id: &str) -> CacheKey {
    tickets().child("byId").child(id)
  }

  pub fn admin_tickets() -> CacheKey {
    CacheKey::for_operation("support", Operation::Qualified("admin")).child("tickets")
  }
}

pub mod dashboard {
  use super::*;

  pub fn all() -> CacheKey {
    CacheKey::for_operation("dashboard", Operation::List)
  }

  pub fn customer() -> CacheKey {
    CacheKey::for_operation("dashboard", Operation::Qualified("customer"))
  }

  pub fn vendor() -> CacheKey {
    CacheKey::for_operation("dashboard", Operation::Qualified("vendor"))
  }

  pub fn admin() -> CacheKey {
    CacheKey::for_operation("dashboard", Operation::Qualified("admin"))
  }
}

pub mod vendor {
  use super::*;

  pub fn summary() -> CacheKey {
    CacheKey::for_operation("vendor", Operation::Qualified("summary"))
  }

  pub fn available_jobs() -> CacheKey {
    CacheKey::for_operation("vendor", Operation::Qualified("jobs")).child("available")
  }

  pub fn bids() -> CacheKey {
    CacheKey::for_operation("vendor", Operation::Qualified("bids"))
  }

  pub fn bid(id: &str) -> CacheKey {
    bids().child("byId").child(id)
  }

  pub fn earnings() -> CacheKey {
    CacheKey::for_operation("vendor", Operation::Qualified("earnings"))
  }
}

pub mod users {
  use super::*;

  pub fn all() -> CacheKey {
    CacheKey::for_operation("users", Operation::List)
  }

  pub fn by_role(role: &str) -> CacheKey {
    all().child("role").child(role)
  }

  pub fn by_id(id: &str) -> CacheKey {
    CacheKey::for_operation("users", Operation::ById(id))
  }
}

pub mod vendors {
  use super::*;

  pub fn all() -> CacheKey {
    CacheKey::for_operation("vendors", Operation::List)
  }

  pub fn by_id(id: &str) -> CacheKey {
    CacheKey::for_operation("vendors", Operation::ById(id))
  }
}
