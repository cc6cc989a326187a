use crate::api::endpoints;
use crate::api::types::{CreateTicketRequest, SupportTicket, TicketReplyRequest, UpdateTicketRequest};
use crate::api::ApiClient;
use crate::mutation::Mutation;
use crate::query::{Query, QueryOptions};

use super::{detail_options, keys, MarketClient};

impl MarketClient {
  /// Tickets opened by the signed-in user.
  pub fn tickets(&self) -> Query<Vec<SupportTicket>> {
    self.get_query(keys::support::tickets(), QueryOptions::default(), endpoints::support::TICKETS)
  }

  pub fn ticket(&self, id: &str) -> Query<SupportTicket> {
    self.get_query(keys::support::ticket(id), detail_options(id), endpoints::support::ticket(id))
  }

  /// Every ticket, for support staff.
  pub fn admin_tickets(&self) -> Query<Vec<SupportTicket>> {
    self.get_query(
      keys::support::admin_tickets(),
      QueryOptions::default(),
      endpoints::support::ADMIN_TICKETS,
    )
  }

  pub fn create_ticket(&self) -> Mutation<CreateTicketRequest, SupportTicket> {
    self
      .mutation(|api: ApiClient, req: CreateTicketRequest| async move {
        api.post::<_, SupportTicket>(endpoints::support::TICKETS, &req).await
      })
      .invalidates(|_: &SupportTicket, _: &CreateTicketRequest| vec![keys::support::all()])
  }

  /// Change status, priority or assignee of a ticket (support staff).
  pub fn update_ticket(&self) -> Mutation<(String, UpdateTicketRequest), SupportTicket> {
    self
      .mutation(|api: ApiClient, (id, req): (String, UpdateTicketRequest)| async move {
        api
          .patch::<_, SupportTicket>(&endpoints::support::admin_ticket(&id), &req)
          .await
      })
      .invalidates(|_: &SupportTicket, _: &(String, UpdateTicketRequest)| vec![keys::support::all()])
  }

  pub fn reply_ticket(&self) -> Mutation<(String, TicketReplyRequest), SupportTicket> {
    self
      .mutation(|api: ApiClient, (id, req): (String, TicketReplyRequest)| async move {
        api
          .post::<_, SupportTicket>(&endpoints::support::ticket_messages(&id), &req)
          .await
      })
      .invalidates(|_: &SupportTicket, _: &(String, TicketReplyRequest)| vec![keys::support::all()])
  }
}
