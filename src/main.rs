use clap::{ArgAction, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info};

use txcache::api::{MockRemote, TransactionClient};
use txcache::cache::Session;
use txcache::config::Config;
use txcache::logging;
use txcache::resources::{
  EmployeesResource, PaginatedTransactionsResource, ResourceState, TransactionsByEmployeeResource,
};

#[derive(Parser, Debug)]
#[command(name = "txcache")]
#[command(about = "Run a cached transactions session against an in-memory remote")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/txcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Maximum number of cached responses (0 = unbounded)
  #[arg(long)]
  capacity: Option<usize>,

  /// Simulated remote latency in milliseconds
  #[arg(long)]
  latency_ms: Option<u64>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List employees
  Employees,
  /// List transactions, either paged or for one employee
  Transactions {
    /// Only show transactions for this employee id
    #[arg(short, long)]
    employee: Option<String>,
    /// Number of pages to load
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pages: u32,
  },
  /// Set a transaction's approval and show the cached first page before and after
  Approve {
    transaction_id: String,
    #[arg(action = ArgAction::Set)]
    value: bool,
  },
  /// Warm the cache and list its entries
  Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration, then apply command line overrides
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(capacity) = args.capacity {
    config.cache.capacity = Some(capacity);
  }
  if let Some(latency_ms) = args.latency_ms {
    config.remote.latency_ms = latency_ms;
  }

  let _log_guard = logging::init(&config.logging)?;

  let session = Session::new(config.cache.build());
  let client = TransactionClient::new(config.remote.build()?, &session);

  let mut loading = client.subscribe_loading();
  tokio::spawn(async move {
    while loading.changed().await.is_ok() {
      debug!(loading = *loading.borrow(), "loading flag changed");
    }
  });

  match args.command {
    Command::Employees => employees(&client).await,
    Command::Transactions { employee, pages } => transactions(&client, employee, pages).await,
    Command::Approve {
      transaction_id,
      value,
    } => approve(&client, &transaction_id, value).await,
    Command::Stats => stats(&client).await,
  }
}

async fn employees(client: &TransactionClient<MockRemote>) -> Result<()> {
  let mut employees = EmployeesResource::new(client.clone());
  employees.fetch_all().await?;
  print_json(&employees.state().data())
}

async fn transactions(
  client: &TransactionClient<MockRemote>,
  employee: Option<String>,
  pages: u32,
) -> Result<()> {
  if let Some(employee_id) = employee {
    let mut by_employee = TransactionsByEmployeeResource::new(client.clone());
    by_employee.fetch_by_id(&employee_id).await?;
    return print_json(&by_employee.state().data());
  }

  let mut paginated = PaginatedTransactionsResource::new(client.clone());
  for _ in 0..pages {
    if !paginated.has_more() {
      break;
    }
    paginated.fetch_all().await?;
  }

  match paginated.state() {
    ResourceState::Ready(loaded) => print_json(loaded),
    other => Err(eyre!("Transactions did not load: {:?}", other.error())),
  }
}

async fn approve(
  client: &TransactionClient<MockRemote>,
  transaction_id: &str,
  value: bool,
) -> Result<()> {
  let before = client.transactions_page(0).await?;
  let summary = client.set_transaction_approval(transaction_id, value).await?;
  let after = client.transactions_page(0).await?;

  info!(transaction_id, value, "approval updated");
  print_json(&json!({
    "before": before,
    "after": after,
    "patched": summary.patched,
    "evicted": summary.evicted,
    "skipped": summary.skipped,
  }))
}

async fn stats(client: &TransactionClient<MockRemote>) -> Result<()> {
  futures::try_join!(
    client.employees(),
    client.transactions_page(0),
    client.transactions_by_employee("e1"),
  )?;

  let cache = client.session().cache();
  let mut entries = Vec::new();
  for key in cache.keys()? {
    if let Some(entry) = cache.peek(&key)? {
      entries.push(json!({
        "key": key.as_str(),
        "endpoint": key.endpoint(),
        "cachedAt": entry.cached_at,
        "bytes": entry.body.len(),
      }));
    }
  }

  print_json(&json!({
    "entries": entries,
    "loading": client.loading(),
  }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  let rendered = serde_json::to_string_pretty(value)
    .map_err(|e| eyre!("Failed to render output: {}", e))?;
  println!("{}", rendered);
  Ok(())
}
