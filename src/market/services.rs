use crate::api::endpoints;
use crate::api::types::{Service, ServiceRequest};
use crate::api::ApiClient;
use crate::mutation::Mutation;
use crate::query::{Query, QueryOptions};

use super::{detail_options, keys, MarketClient};

impl MarketClient {
  pub fn services(&self) -> Query<Vec<Service>> {
    self.get_query(keys::services::all(), QueryOptions::default(), endpoints::services::LIST)
  }

  pub fn service(&self, id: &str) -> Query<Service> {
    self.get_query(keys::services::by_id(id), detail_options(id), endpoints::services::by_id(id))
  }

  pub fn create_service(&self) -> Mutation<ServiceRequest, Service> {
    self
      .mutation(|api: ApiClient, req: ServiceRequest| async move {
        api.post::<_, Service>(endpoints::services::LIST, &req).await
      })
      .invalidates(|_: &Service, _: &ServiceRequest| vec![keys::services::all()])
  }

  pub fn update_service(&self) -> Mutation<(String, ServiceRequest), Service> {
    self
      .mutation(|api: ApiClient, (id, req): (String, ServiceRequest)| async move {
        api.put::<_, Service>(&endpoints::services::by_id(&id), &req).await
      })
      .invalidates(|_: &Service, _: &(String, ServiceRequest)| vec![keys::services::all()])
  }

  pub fn delete_service(&self) -> Mutation<String, ()> {
    self
      .mutation(|api: ApiClient, id: String| async move {
        api.delete(&endpoints::services::by_id(&id)).await
      })
      .invalidates(|_: &(), _: &String| vec![keys::services::all()])
  }
}
