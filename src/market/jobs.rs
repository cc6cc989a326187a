use crate::api::endpoints;
use crate::api::types::{Bid, CreateJobRequest, Job, PlaceBidRequest, UpdateJobRequest};
use crate::api::{ApiClient, ApiRequest};
use crate::mutation::Mutation;
use crate::query::{Query, QueryOptions};

use super::{detail_options, keys, MarketClient};

/// A bid on a specific job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidRef {
  pub job_id: String,
  pub bid_id: String,
}

impl BidRef {
  pub fn new(job_id: impl Into<String>, bid_id: impl Into<String>) -> Self {
    Self {
      job_id: job_id.into(),
      bid_id: bid_id.into(),
    }
  }
}

impl MarketClient {
  pub fn jobs(&self) -> Query<Vec<Job>> {
    self.get_query(keys::jobs::all(), QueryOptions::default(), endpoints::jobs::LIST)
  }

  pub fn open_jobs(&self) -> Query<Vec<Job>> {
    self.get_query(keys::jobs::open(), QueryOptions::default(), endpoints::jobs::OPEN)
  }

  /// Jobs posted by the signed-in customer.
  pub fn customer_jobs(&self) -> Query<Vec<Job>> {
    let request = ApiRequest::get(endpoints::jobs::LIST)
      .authenticated()
      .query_param("scope", "customer");
    self.query(keys::jobs::customer(), QueryOptions::default(), request)
  }

  /// Jobs assigned to the signed-in vendor.
  pub fn vendor_jobs(&self) -> Query<Vec<Job>> {
    let request = ApiRequest::get(endpoints::jobs::LIST)
      .authenticated()
      .query_param("scope", "vendor");
    self.query(keys::jobs::vendor(), QueryOptions::default(), request)
  }

  pub fn job(&self, id: &str) -> Query<Job> {
    self.get_query(keys::jobs::by_id(id), detail_options(id), endpoints::jobs::by_id(id))
  }

  pub fn job_bids(&self, job_id: &str) -> Query<Vec<Bid>> {
    let options = QueryOptions::default().enabled(!job_id.is_empty());
    self.get_query(keys::jobs::bids(job_id), options, endpoints::jobs::bids(job_id))
  }

  pub fn create_job(&self) -> Mutation<CreateJobRequest, Job> {
    self
      .mutation(|api: ApiClient, req: CreateJobRequest| async move {
        api.post::<_, Job>(endpoints::jobs::CREATE, &req).await
      })
      .invalidates(|_: &Job, _: &CreateJobRequest| {
        vec![
          keys::jobs::all(),
          keys::jobs::open(),
          keys::jobs::customer(),
          keys::dashboard::customer(),
        ]
      })
  }

  pub fn update_job(&self) -> Mutation<(String, UpdateJobRequest), Job> {
    self
      .mutation(|api: ApiClient, (id, req): (String, UpdateJobRequest)| async move {
        api.put::<_, Job>(&endpoints::jobs::by_id(&id), &req).await
      })
      .invalidates(|_: &Job, (id, _): &(String, UpdateJobRequest)| {
        vec![keys::jobs::by_id(id), keys::jobs::all()]
      })
  }

  pub fn delete_job(&self) -> Mutation<String, ()> {
    self
      .mutation(|api: ApiClient, id: String| async move {
        api.delete(&endpoints::jobs::by_id(&id)).await
      })
      .invalidates(|_: &(), _: &String| vec![keys::jobs::all(), keys::dashboard::customer()])
  }

  pub fn place_bid(&self) -> Mutation<(String, PlaceBidRequest), Bid> {
    self
      .mutation(|api: ApiClient, (job_id, req): (String, PlaceBidRequest)| async move {
        api.post::<_, Bid>(&endpoints::jobs::place_bid(&job_id), &req).await
      })
      .invalidates(|_: &Bid, (job_id, _): &(String, PlaceBidRequest)| {
        vec![
          keys::jobs::bids(job_id),
          keys::vendor::bids(),
          keys::vendor::available_jobs(),
        ]
      })
  }

  /// Accept a bid. The job, its bids and both parties' job lists change.
  pub fn accept_bid(&self) -> Mutation<BidRef, Bid> {
    self
      .mutation(|api: ApiClient, bid: BidRef| async move {
        api
          .send::<Bid>(ApiRequest::post(endpoints::jobs::accept_bid(&bid.job_id, &bid.bid_id)).authenticated())
          .await
      })
      .invalidates(|_: &Bid, bid: &BidRef| {
        vec![
          keys::jobs::by_id(&bid.job_id),
          keys::jobs::bids(&bid.job_id),
          keys::jobs::customer(),
          keys::jobs::vendor(),
        ]
      })
  }

  pub fn reject_bid(&self) -> Mutation<BidRef, Bid> {
    self
      .mutation(|api: ApiClient, bid: BidRef| async move {
        api
          .send::<Bid>(ApiRequest::post(endpoints::jobs::reject_bid(&bid.job_id, &bid.bid_id)).authenticated())
          .await
      })
      .invalidates(|_: &Bid, bid: &BidRef| vec![keys::jobs::bids(&bid.job_id)])
  }
}

#[cfg(test)]
mod tests {
  use super::super::test_support::*;
  use super::*;
  use crate::api::ApiError;
  use crate::cache::QueryStatus;
  use crate::testing::MockTransport;
  use serde_json::json;
  use tokio::sync::oneshot;

  fn job_json(id: &str) -> serde_json::Value {
    json!({"id": id, "title": format!("Job {}", id), "status": "open"})
  }

  fn bid_json(id: &str, job_id: &str) -> serde_json::Value {
    json!({"id": id, "jobId": job_id, "amount": 120.0, "status": "accepted"})
  }

  #[tokio::test]
  async fn test_create_job_refreshes_observed_list() {
    let mock = MockTransport::new();
    let market = client(&mock);
    let (release, gate) = oneshot::channel();
    mock.respond("GET", endpoints::jobs::LIST, json!([job_json("j0")]));
    mock.respond_after("GET", endpoints::jobs::LIST, gate, json!([job_json("j0"), job_json("j1")]));
    mock.respond("POST", endpoints::jobs::CREATE, job_json("j1"));

    let mut jobs = market.jobs();
    jobs.resolve().await.unwrap();
    assert_eq!(jobs.status(), QueryStatus::Fresh);

    let created = market
      .create_job()
      .mutate(CreateJobRequest {
        title: "Job j1".to_string(),
        description: "Paint the fence".to_string(),
        category: None,
        budget: Some(200.0),
        location: None,
        deadline: None,
      })
      .await
      .unwrap();
    assert_eq!(created.id, "j1");

    assert_eq!(jobs.status(), QueryStatus::StaleRefetching);
    assert_eq!(jobs.data().map(|d| d.len()), Some(1));

    release.send(()).unwrap();
    settle().await;

    assert_eq!(jobs.status(), QueryStatus::Fresh);
    let data = jobs.data().unwrap();
    assert!(data.iter().any(|j| j.id == "j1"));
    assert_eq!(mock.call_count("GET", endpoints::jobs::LIST), 2);
  }

  #[tokio::test]
  async fn test_accept_bid_invalidates_job_families_only() {
    let mock = MockTransport::new();
    let market = client(&mock);
    mock.respond("GET", &endpoints::jobs::by_id("j1"), job_json("j1"));
    mock.respond("GET", &endpoints::jobs::bids("j1"), json!([bid_json("b1", "j1")]));
    mock.respond("GET", endpoints::jobs::LIST, json!([job_json("j1")]));
    mock.respond("GET", endpoints::payments::LIST, json!([]));
    mock.respond("POST", &endpoints::jobs::accept_bid("j1", "b1"), bid_json("b1", "j1"));

    let mut job = market.job("j1");
    let mut bids = market.job_bids("j1");
    let mut customer = market.customer_jobs();
    let mut vendor = market.vendor_jobs();
    let mut payments = market.payments();
    job.resolve().await.unwrap();
    bids.resolve().await.unwrap();
    customer.resolve().await.unwrap();
    vendor.resolve().await.unwrap();
    payments.resolve().await.unwrap();

    market.accept_bid().mutate(BidRef::new("j1", "b1")).await.unwrap();

    for status in [job.status(), bids.status(), customer.status(), vendor.status()] {
      assert_eq!(status, QueryStatus::StaleRefetching);
    }
    assert_eq!(payments.status(), QueryStatus::Fresh);

    settle().await;
    assert_eq!(job.status(), QueryStatus::Fresh);
    assert_eq!(mock.call_count("GET", &endpoints::jobs::by_id("j1")), 2);
    assert_eq!(mock.call_count("GET", endpoints::jobs::LIST), 4);
    assert_eq!(mock.call_count("GET", endpoints::payments::LIST), 1);
  }

  #[tokio::test]
  async fn test_failed_delete_leaves_cache_alone() {
    let mock = MockTransport::new();
    let market = client(&mock);
    market.cache().set_query_data(&keys::jobs::all(), vec![1u32]);
    market.cache().set_query_data(&keys::jobs::by_id("j1"), 1u32);
    mock.fail(
      "DELETE",
      &endpoints::jobs::by_id("j1"),
      ApiError::from_response(403, br#"{"message":"Not your job"}"#),
    );

    let err = market.delete_job().mutate("j1".to_string()).await.unwrap_err();

    assert_eq!(err.to_string(), "Not your job");
    assert_eq!(market.cache().status(&keys::jobs::all()), QueryStatus::Fresh);
    assert_eq!(market.cache().status(&keys::jobs::by_id("j1")), QueryStatus::Fresh);
  }

  #[tokio::test]
  async fn test_job_detail_disabled_for_empty_id() {
    let mock = MockTransport::new();
    let market = client(&mock);

    let mut job = market.job("");
    assert!(job.resolve().await.unwrap().is_none());
    assert_eq!(job.status(), QueryStatus::Idle);
    assert!(mock.calls().is_empty());
  }

  #[tokio::test]
  async fn test_scoped_lists_send_query_param() {
    let mock = MockTransport::new();
    let market = client(&mock);
    mock.respond("GET", endpoints::jobs::LIST, json!([]));

    market.customer_jobs().resolve().await.unwrap();

    let calls = mock.calls();
    assert_eq!(calls[0].query, vec![("scope".to_string(), "customer".to_string())]);
    assert!(calls[0].require_auth);
  }

  #[tokio::test]
  async fn test_place_bid_invalidations() {
    let mock = MockTransport::new();
    let market = client(&mock);
    let cache = market.cache();
    cache.set_query_data(&keys::jobs::bids("j1"), 0u32);
    cache.set_query_data(&keys::jobs::bids("j2"), 0u32);
    cache.set_query_data(&keys::vendor::available_jobs(), 0u32);
    cache.set_query_data(&keys::vendor::bid("b9"), 0u32);
    mock.respond("POST", &endpoints::jobs::place_bid("j1"), bid_json("b1", "j1"));

    market
      .place_bid()
      .mutate((
        "j1".to_string(),
        PlaceBidRequest {
          amount: 120.0,
          message: None,
          estimated_days: Some(3),
        },
      ))
      .await
      .unwrap();

    assert_eq!(cache.status(&keys::jobs::bids("j1")), QueryStatus::Stale);
    assert_eq!(cache.status(&keys::vendor::available_jobs()), QueryStatus::Stale);
    assert_eq!(cache.status(&keys::vendor::bid("b9")), QueryStatus::Stale);
    assert_eq!(cache.status(&keys::jobs::bids("j2")), QueryStatus::Fresh);
  }
}
