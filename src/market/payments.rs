use crate::api::endpoints;
use crate::api::types::{CreatePaymentRequest, Payment, RefundRequest};
use crate::api::{ApiClient, ApiRequest};
use crate::cache::CacheKey;
use crate::mutation::Mutation;
use crate::query::{Query, QueryOptions};

use super::{detail_options, keys, MarketClient};

/// Moving money changes payments, the job it pays for and every dashboard.
fn settlement_keys() -> Vec<CacheKey> {
  vec![keys::payments::all(), keys::jobs::all(), keys::dashboard::all()]
}

impl MarketClient {
  pub fn payments(&self) -> Query<Vec<Payment>> {
    self.get_query(keys::payments::all(), QueryOptions::default(), endpoints::payments::LIST)
  }

  pub fn payment(&self, id: &str) -> Query<Payment> {
    self.get_query(keys::payments::by_id(id), detail_options(id), endpoints::payments::by_id(id))
  }

  pub fn create_payment(&self) -> Mutation<CreatePaymentRequest, Payment> {
    self
      .mutation(|api: ApiClient, req: CreatePaymentRequest| async move {
        api.post::<_, Payment>(endpoints::payments::LIST, &req).await
      })
      .invalidates(|_: &Payment, _: &CreatePaymentRequest| {
        vec![keys::payments::all(), keys::dashboard::all()]
      })
  }

  /// Release escrowed funds to the vendor.
  pub fn release_payment(&self) -> Mutation<String, Payment> {
    self
      .mutation(|api: ApiClient, id: String| async move {
        api
          .send::<Payment>(ApiRequest::post(endpoints::payments::release(&id)).authenticated())
          .await
      })
      .invalidates(|_: &Payment, _: &String| settlement_keys())
  }

  pub fn refund_payment(&self) -> Mutation<(String, RefundRequest), Payment> {
    self
      .mutation(|api: ApiClient, (id, req): (String, RefundRequest)| async move {
        api.post::<_, Payment>(&endpoints::payments::refund(&id), &req).await
      })
      .invalidates(|_: &Payment, _: &(String, RefundRequest)| settlement_keys())
  }
}
