use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Write;
use swift_orders::{ApplyOutcome, OrderId, OrderSyncState};
use thiserror::Error;
use tracing::{error, info};

use crate::endpoints::{CreateOrderRequest, SignUp};
use crate::env::Env;
use crate::error::StreamError;
use crate::sync::OrderSync;
use crate::{CustomerPortal, DriverDesk};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid amount: {value}. Amount must be a finite number of zero or more")]
    InvalidAmount { value: f64 },
    #[error("Order {order_id} was not found for customer {customer_id}")]
    OrderNotFound {
        order_id: OrderId,
        customer_id: String,
    },
    #[error("Lost tracking for order {order_id}: {source}")]
    TrackingLost {
        order_id: OrderId,
        source: StreamError,
    },
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in as a customer
    SignIn {
        #[arg(short = 'u', long)]
        username: String,
        #[arg(short = 'p', long)]
        password: String,
    },
    /// Register a new customer account
    SignUp {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in as a driver
    DriverSignIn {
        #[arg(long)]
        email: String,
        #[arg(short = 'p', long)]
        password: String,
    },
    /// List a customer's orders
    Orders {
        #[arg(short = 'c', long)]
        customer_id: String,
    },
    /// Create an order and show the refreshed order list
    CreateOrder {
        #[arg(short = 'c', long)]
        customer_id: String,
        #[arg(long)]
        delivery_address: String,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        postal_code: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        total_amount: Option<f64>,
    },
    /// Follow one order until it reaches a final status
    Track {
        #[arg(short = 'c', long)]
        customer_id: String,
        #[arg(short = 'o', long)]
        order_id: String,
    },
    /// Follow every open order of a customer until interrupted
    Watch {
        #[arg(short = 'c', long)]
        customer_id: String,
    },
    /// List a driver's assigned deliveries
    Deliveries {
        #[arg(short = 'd', long)]
        driver_id: String,
    },
    /// Show a driver's planned route
    Route {
        #[arg(short = 'd', long)]
        driver_id: String,
    },
    /// Mark an assigned delivery as in transit
    Start {
        #[arg(short = 'd', long)]
        driver_id: String,
        #[arg(short = 'o', long)]
        order_id: String,
    },
    /// Mark an in-transit delivery as completed
    Complete {
        #[arg(short = 'd', long)]
        driver_id: String,
        #[arg(short = 'o', long)]
        order_id: String,
    },
    /// Mark an in-transit delivery as failed
    Fail {
        #[arg(short = 'd', long)]
        driver_id: String,
        #[arg(short = 'o', long)]
        order_id: String,
        #[arg(short = 'r', long)]
        reason: Option<String>,
    },
}

#[derive(Debug, Parser)]
#[command(name = "swift-track")]
#[command(about = "Order tracking and delivery management client")]
#[command(version)]
pub struct CliEnv {
    #[clap(flatten)]
    pub env: Env,
    #[command(subcommand)]
    pub command: Commands,
}

impl CliEnv {
    /// Parse CLI arguments into the runtime environment and the command to run.
    ///
    /// `--help`, `--version` and usage errors are printed by clap, which then
    /// exits the process with its own status code.
    pub fn parse_and_convert() -> anyhow::Result<(Env, Commands)> {
        let cli_env = Self::parse();
        Ok((cli_env.env, cli_env.command))
    }
}

fn validate_amount(value: f64) -> Result<f64, CliError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CliError::InvalidAmount { value })
    }
}

pub async fn run_command(env: Env, command: Commands) -> anyhow::Result<()> {
    run_command_with_writers(env, command, &mut std::io::stdout()).await
}

async fn run_command_with_writers<W: Write + Send>(
    env: Env,
    command: Commands,
    stdout: &mut W,
) -> anyhow::Result<()> {
    let api = env.api_client();

    match command {
        Commands::SignIn { username, password } => {
            let customer = api.sign_in(&username, &password).await?;
            writeln!(stdout, "✅ Signed in as customer {}", customer.customer_id)?;
            if let Some(name) = &customer.customer_name {
                writeln!(stdout, "   Name: {name}")?;
            }
        }
        Commands::SignUp {
            name,
            email,
            password,
        } => {
            let form = SignUp {
                name,
                email,
                password,
            };
            let response = api.sign_up(&form).await?;
            writeln!(stdout, "✅ Account created")?;
            writeln!(stdout, "   {response}")?;
        }
        Commands::DriverSignIn { email, password } => {
            let response = api.driver_sign_in(&email, &password).await?;
            writeln!(stdout, "✅ Driver sign-in response: {response}")?;
        }
        Commands::Orders { customer_id } => {
            let mut portal = CustomerPortal::new(api, customer_id, env.live_tracking());
            portal.refresh().await?;
            print_orders(portal.sync().state(), stdout)?;
        }
        Commands::CreateOrder {
            customer_id,
            delivery_address,
            city,
            postal_code,
            country,
            total_amount,
        } => {
            let total_amount = total_amount.map(validate_amount).transpose()?;
            let request = CreateOrderRequest {
                customer_id: customer_id.clone(),
                delivery_address,
                city,
                postal_code,
                country,
                total_amount,
            };

            let mut portal = CustomerPortal::new(api, customer_id, env.live_tracking());
            let response = portal.create_order(request).await?;
            writeln!(stdout, "✅ Order created: {response}")?;
            print_orders(portal.sync().state(), stdout)?;
        }
        Commands::Track {
            customer_id,
            order_id,
        } => {
            let order_id = OrderId::from(order_id);
            let mut portal = CustomerPortal::new(api, customer_id.clone(), env.live_tracking());
            portal.refresh().await?;

            let Some(order) = portal.sync().state().order(&order_id) else {
                return Err(CliError::OrderNotFound {
                    order_id,
                    customer_id,
                }
                .into());
            };
            writeln!(stdout, "📦 {order_id}: {}", order.status.label())?;

            if !order.status.is_terminal() {
                portal.sync_mut().track(&order_id);
                follow_order(portal.sync_mut(), &order_id, stdout).await?;
            }
        }
        Commands::Watch { customer_id } => {
            let mut portal = CustomerPortal::new(api, customer_id, env.live_tracking());
            portal.refresh().await?;
            print_orders(portal.sync().state(), stdout)?;

            if portal.sync_mut().track_all() > 0 {
                watch_orders(portal.sync_mut(), stdout).await?;
            }
        }
        Commands::Deliveries { driver_id } => {
            let mut desk = DriverDesk::new(api, driver_id, env.live_tracking());
            desk.refresh().await?;
            print_orders(desk.sync().state(), stdout)?;
            if let Some(next) = desk.next_delivery() {
                writeln!(stdout, "➡️  Next delivery: {}", next.order_id)?;
            }
        }
        Commands::Route { driver_id } => {
            let desk = DriverDesk::new(api, driver_id, env.live_tracking());
            let route = desk.route().await?;
            writeln!(
                stdout,
                "🗺️  Route {}",
                route.route_id.as_deref().unwrap_or("(unassigned)")
            )?;
            for (index, waypoint) in route.waypoints.iter().enumerate() {
                writeln!(stdout, "   {}. {waypoint}", index + 1)?;
            }
            for order in &route.orders {
                writeln!(stdout, "   {} {}", order.order_id, order.status.label())?;
            }
        }
        Commands::Start {
            driver_id,
            order_id,
        } => {
            let mut desk = DriverDesk::new(api, driver_id, env.live_tracking());
            desk.refresh().await?;
            let outcome = desk.start(&OrderId::from(order_id)).await?;
            print_transition(desk.sync().state(), &outcome, stdout)?;
        }
        Commands::Complete {
            driver_id,
            order_id,
        } => {
            let mut desk = DriverDesk::new(api, driver_id, env.live_tracking());
            desk.refresh().await?;
            let outcome = desk.complete(&OrderId::from(order_id)).await?;
            print_transition(desk.sync().state(), &outcome, stdout)?;
        }
        Commands::Fail {
            driver_id,
            order_id,
            reason,
        } => {
            let mut desk = DriverDesk::new(api, driver_id, env.live_tracking());
            desk.refresh().await?;
            let outcome = desk.fail(&OrderId::from(order_id), reason).await?;
            print_transition(desk.sync().state(), &outcome, stdout)?;
        }
    }

    info!("CLI operation completed successfully");
    Ok(())
}

fn print_orders<W: Write>(state: &OrderSyncState, stdout: &mut W) -> std::io::Result<()> {
    writeln!(
        stdout,
        "📦 {} orders ({} pending, {} completed)",
        state.orders().len(),
        state.pending_count(),
        state.completed_count()
    )?;

    for order in state.orders() {
        let address = order.delivery_address.as_deref().unwrap_or("-");
        writeln!(
            stdout,
            "   {:<14} {:<13} {address}",
            order.order_id.as_str(),
            order.status.label()
        )?;
    }

    Ok(())
}

fn print_transition<W: Write>(
    state: &OrderSyncState,
    outcome: &ApplyOutcome,
    stdout: &mut W,
) -> std::io::Result<()> {
    if let ApplyOutcome::Merged { order_id, .. } = outcome {
        if let Some(order) = state.order(order_id) {
            writeln!(stdout, "✅ {order_id} is now {}", order.status.label())?;
        }
    }
    Ok(())
}

fn print_new_notifications<W: Write>(
    state: &OrderSyncState,
    seen: &mut u64,
    stdout: &mut W,
) -> std::io::Result<()> {
    let now = Utc::now();
    let mut fresh: Vec<_> = state.notifications().filter(|n| n.id > *seen).collect();
    fresh.reverse();

    for notification in fresh {
        writeln!(
            stdout,
            "🔔 {} ({})",
            notification.message,
            notification.relative_time(now)
        )?;
        *seen = notification.id;
    }

    Ok(())
}

/// Applies live events for one order until it reaches a final status.
async fn follow_order<W: Write + Send>(
    sync: &mut OrderSync,
    order_id: &OrderId,
    stdout: &mut W,
) -> anyhow::Result<()> {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut seen = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received shutdown signal, stopping tracking");
                break;
            }
            event = sync.next_event() => {
                let Some(event) = event else { break };

                match sync.handle(event) {
                    Ok(_) => print_new_notifications(sync.state(), &mut seen, stdout)?,
                    Err(err) if err.is_fatal() => {
                        error!(%order_id, "Tracking stopped: {err}");
                        writeln!(stdout, "❌ {err}")?;
                        return Err(CliError::TrackingLost {
                            order_id: order_id.clone(),
                            source: err,
                        }
                        .into());
                    }
                    Err(err) => writeln!(stdout, "⚠️  {err}")?,
                }

                if sync
                    .state()
                    .order(order_id)
                    .is_some_and(|order| order.status.is_terminal())
                {
                    writeln!(stdout, "🏁 {order_id} reached a final status")?;
                    break;
                }
            }
        }
    }

    sync.close_all();
    Ok(())
}

/// Applies live events for every tracked order until interrupted or until no
/// channel is left open.
async fn watch_orders<W: Write + Send>(sync: &mut OrderSync, stdout: &mut W) -> anyhow::Result<()> {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut seen = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received shutdown signal, stopping watch");
                break;
            }
            event = sync.next_event() => {
                let Some(event) = event else { break };

                if let Err(err) = sync.handle(event) {
                    writeln!(stdout, "⚠️  {err}")?;
                }
                print_new_notifications(sync.state(), &mut seen, stdout)?;

                if sync.active_subscriptions() == 0 {
                    writeln!(stdout, "🏁 No open tracking channels left")?;
                    break;
                }
            }
        }
    }

    sync.close_all();
    Ok(())
}
