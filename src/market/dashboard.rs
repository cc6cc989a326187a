use crate::api::endpoints;
use crate::api::types::{AdminDashboard, CustomerDashboard, VendorDashboard};
use crate::query::{Query, QueryOptions};

use super::{keys, MarketClient, DASHBOARD_STALE_TIME};

fn dashboard_options() -> QueryOptions {
  QueryOptions::default().stale_time(DASHBOARD_STALE_TIME)
}

impl MarketClient {
  pub fn customer_dashboard(&self) -> Query<CustomerDashboard> {
    self.get_query(keys::dashboard::customer(), dashboard_options(), endpoints::dashboard::CUSTOMER)
  }

  pub fn vendor_dashboard(&self) -> Query<VendorDashboard> {
    self.get_query(keys::dashboard::vendor(), dashboard_options(), endpoints::dashboard::VENDOR)
  }

  pub fn admin_dashboard(&self) -> Query<AdminDashboard> {
    self.get_query(keys::dashboard::admin(), dashboard_options(), endpoints::dashboard::ADMIN)
  }
}
