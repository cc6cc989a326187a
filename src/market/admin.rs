use crate::api::endpoints;
use crate::api::types::{UpdateUserStatusRequest, User, UserRole, Vendor};
use crate::api::{ApiClient, ApiRequest};
use crate::mutation::Mutation;
use crate::query::{Query, QueryOptions};

use super::{detail_options, keys, MarketClient};

impl MarketClient {
  /// All users, optionally restricted to one role.
  pub fn users(&self, role: Option<UserRole>) -> Query<Vec<User>> {
    match role {
      Some(role) => {
        let request = ApiRequest::get(endpoints::admin::USERS)
          .authenticated()
          .query_param("role", role.as_str());
        self.query(keys::users::by_role(role.as_str()), QueryOptions::default(), request)
      }
      None => self.get_query(keys::users::all(), QueryOptions::default(), endpoints::admin::USERS),
    }
  }

  pub fn user(&self, id: &str) -> Query<User> {
    self.get_query(keys::users::by_id(id), detail_options(id), endpoints::admin::user(id))
  }

  /// Activate or suspend an account.
  pub fn set_user_status(&self) -> Mutation<(String, UpdateUserStatusRequest), User> {
    self
      .mutation(|api: ApiClient, (id, req): (String, UpdateUserStatusRequest)| async move {
        api.patch::<_, User>(&endpoints::admin::user_status(&id), &req).await
      })
      .invalidates(|_: &User, _: &(String, UpdateUserStatusRequest)| {
        vec![keys::users::all(), keys::dashboard::admin()]
      })
  }

  pub fn vendors(&self) -> Query<Vec<Vendor>> {
    self.get_query(keys::vendors::all(), QueryOptions::default(), endpoints::admin::VENDORS)
  }

  pub fn vendor(&self, id: &str) -> Query<Vendor> {
    self.get_query(keys::vendors::by_id(id), detail_options(id), endpoints::admin::vendor(id))
  }

  pub fn verify_vendor(&self) -> Mutation<String, Vendor> {
    self
      .mutation(|api: ApiClient, id: String| async move {
        api
          .send::<Vendor>(ApiRequest::post(endpoints::admin::verify_vendor(&id)).authenticated())
          .await
      })
      .invalidates(|_: &Vendor, _: &String| vec![keys::vendors::all(), keys::dashboard::admin()])
  }
}
