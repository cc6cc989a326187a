use crate::api::endpoints;
use crate::api::types::{Bid, Earnings, Job, VendorSummary};
use crate::api::ApiClient;
use crate::mutation::Mutation;
use crate::query::{Query, QueryOptions};

use super::{detail_options, keys, MarketClient, DASHBOARD_STALE_TIME};

impl MarketClient {
  pub fn vendor_summary(&self) -> Query<VendorSummary> {
    let options = QueryOptions::default().stale_time(DASHBOARD_STALE_TIME);
    self.get_query(keys::vendor::summary(), options, endpoints::vendor::SUMMARY)
  }

  /// Open jobs the signed-in vendor can still bid on.
  pub fn available_jobs(&self) -> Query<Vec<Job>> {
    self.get_query(
      keys::vendor::available_jobs(),
      QueryOptions::default(),
      endpoints::vendor::AVAILABLE_JOBS,
    )
  }

  pub fn vendor_bids(&self) -> Query<Vec<Bid>> {
    self.get_query(keys::vendor::bids(), QueryOptions::default(), endpoints::vendor::BIDS)
  }

  pub fn vendor_bid(&self, id: &str) -> Query<Bid> {
    self.get_query(keys::vendor::bid(id), detail_options(id), endpoints::vendor::bid(id))
  }

  pub fn earnings(&self) -> Query<Earnings> {
    self.get_query(keys::vendor::earnings(), QueryOptions::default(), endpoints::vendor::EARNINGS)
  }

  /// Withdraw a pending bid. Bid counts on job lists change with it.
  pub fn withdraw_bid(&self) -> Mutation<String, ()> {
    self
      .mutation(|api: ApiClient, id: String| async move {
        api.delete(&endpoints::vendor::bid(&id)).await
      })
      .invalidates(|_: &(), _: &String| vec![keys::vendor::bids(), keys::jobs::all()])
  }
}
