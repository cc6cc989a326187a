//! CLI subcommands. Every command prints its result as pretty JSON.

use clap::{Subcommand, ValueEnum};
use color_eyre::Result;
use serde::Serialize;

use marketq::api::types::{LoginRequest, PlaceBidRequest, RegisterRequest, UserRole};
use marketq::market::{BidRef, MarketClient};
use marketq::query::Query;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Sign in and store the session token
  Login {
    email: String,
    #[arg(long, env = "MARKETQ_PASSWORD", hide_env_values = true)]
    password: String,
  },
  /// Create an account
  Register {
    name: String,
    email: String,
    #[arg(long, env = "MARKETQ_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, value_enum, default_value_t = Role::Customer)]
    role: Role,
    #[arg(long)]
    phone: Option<String>,
  },
  /// Sign out and forget the session token
  Logout,
  /// Show the signed-in user
  Me,
  /// List jobs
  Jobs {
    /// Only jobs open for bidding
    #[arg(long, conflicts_with_all = ["mine", "vendor"])]
    open: bool,
    /// Only jobs I posted
    #[arg(long, conflicts_with = "vendor")]
    mine: bool,
    /// Only jobs assigned to me as a vendor
    #[arg(long)]
    vendor: bool,
  },
  /// Show one job
  Job { id: String },
  /// List the bids on a job
  Bids { job_id: String },
  /// Bid on a job
  Bid {
    job_id: String,
    #[arg(long)]
    amount: f64,
    #[arg(long)]
    message: Option<String>,
    #[arg(long)]
    days: Option<u32>,
  },
  /// Accept a bid on one of my jobs
  Accept { job_id: String, bid_id: String },
  /// Reject a bid on one of my jobs
  Reject { job_id: String, bid_id: String },
  /// List payments
  Payments,
  /// Show a dashboard
  Dashboard {
    #[arg(value_enum)]
    kind: DashboardKind,
  },
  /// List my support tickets
  Tickets,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Role {
  Customer,
  Vendor,
}

impl From<Role> for UserRole {
  fn from(role: Role) -> Self {
    match role {
      Role::Customer => UserRole::Customer,
      Role::Vendor => UserRole::Vendor,
    }
  }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DashboardKind {
  Customer,
  Vendor,
  Admin,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

async fn show<T>(mut query: Query<T>) -> Result<()>
where
  T: Serialize + Send + Sync + 'static,
{
  let data = query.resolve().await?;
  print_json(&data.as_deref())
}

pub async fn run(market: &MarketClient, command: Command) -> Result<()> {
  match command {
    Command::Login { email, password } => {
      let resp = market.login().mutate(LoginRequest { email, password }).await?;
      print_json(&resp.user)
    }
    Command::Register {
      name,
      email,
      password,
      role,
      phone,
    } => {
      let req = RegisterRequest {
        name,
        email,
        password,
        role: role.into(),
        phone,
      };
      let resp = market.register().mutate(req).await?;
      print_json(&resp.user)
    }
    Command::Logout => {
      market.logout().mutate(()).await?;
      print_json(&serde_json::json!({ "signedOut": true }))
    }
    Command::Me => show(market.profile()).await,
    Command::Jobs { open, mine, vendor } => {
      let query = if open {
        market.open_jobs()
      } else if mine {
        market.customer_jobs()
      } else if vendor {
        market.vendor_jobs()
      } else {
        market.jobs()
      };
      show(query).await
    }
    Command::Job { id } => show(market.job(&id)).await,
    Command::Bids { job_id } => show(market.job_bids(&job_id)).await,
    Command::Bid {
      job_id,
      amount,
      message,
      days,
    } => {
      let req = PlaceBidRequest {
        amount,
        message,
        estimated_days: days,
      };
      let bid = market.place_bid().mutate((job_id, req)).await?;
      print_json(&bid)
    }
    Command::Accept { job_id, bid_id } => {
      let bid = market.accept_bid().mutate(BidRef::new(job_id, bid_id)).await?;
      print_json(&bid)
    }
    Command::Reject { job_id, bid_id } => {
      let bid = market.reject_bid().mutate(BidRef::new(job_id, bid_id)).await?;
      print_json(&bid)
    }
    Command::Payments => show(market.payments()).await,
    Command::Dashboard { kind } => match kind {
      DashboardKind::Customer => show(market.customer_dashboard()).await,
      DashboardKind::Vendor => show(market.vendor_dashboard()).await,
      DashboardKind::Admin => show(market.admin_dashboard()).await,
    },
    Command::Tickets => show(market.tickets()).await,
  }
}
