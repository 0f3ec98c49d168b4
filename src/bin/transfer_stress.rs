//! Transfer Stress Tool
//!
//! Fires concurrent random transfers at an in-memory store and checks that
//! no value was created or destroyed.
//!
//! Run with: cargo run --bin transfer_stress --release -- --transfers 10000 --accounts 8

use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use simple_bank::domain::{CreateAccountParams, CreateUserParams, Currency};
use simple_bank::store::{AccountStore, InMemoryStore, UserStore};
use simple_bank::{RetryPolicy, TransferCommand, TransferEngine, TransferError};

const INITIAL_BALANCE: i64 = 1_000;

fn arg<T: std::str::FromStr>(args: &[String], name: &str, default: T) -> T {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let transfer_count: usize = arg(&args, "--transfers", 10_000);
    let account_count: usize = arg(&args, "--accounts", 8).max(2);
    let concurrency: usize = arg(&args, "--concurrency", 64).max(1);

    println!(
        "Transfer Stress - {} transfers across {} accounts, {} workers",
        transfer_count, account_count, concurrency
    );

    let store = Arc::new(InMemoryStore::new());
    let mut account_ids = Vec::with_capacity(account_count);
    for i in 0..account_count {
        let username = format!("user{}", i);
        store
            .create_user(CreateUserParams {
                username: username.clone(),
                hashed_password: String::new(),
                full_name: username.clone(),
                email: format!("{}@stress.test", username),
            })
            .await?;
        let account = store
            .create_account(CreateAccountParams {
                owner: username,
                balance: INITIAL_BALANCE,
                currency: Currency::USD,
            })
            .await?;
        account_ids.push(account.id);
    }
    let account_ids = Arc::new(account_ids);

    let engine = TransferEngine::new(store.clone(), RetryPolicy::default());
    let start = Instant::now();

    let per_worker = transfer_count.div_ceil(concurrency);
    let mut workers = Vec::with_capacity(concurrency);
    for worker in 0..concurrency {
        let engine = engine.clone();
        let account_ids = account_ids.clone();
        let todo = per_worker.min(transfer_count.saturating_sub(worker * per_worker));

        workers.push(tokio::spawn(async move {
            let (mut committed, mut insufficient) = (0u64, 0u64);
            for _ in 0..todo {
                let command = {
                    let mut rng = rand::thread_rng();
                    let from = rng.gen_range(0..account_ids.len());
                    let mut to = rng.gen_range(0..account_ids.len() - 1);
                    if to >= from {
                        to += 1;
                    }
                    TransferCommand::new(
                        account_ids[from],
                        account_ids[to],
                        rng.gen_range(1..=50),
                        Currency::USD,
                    )
                };

                match engine.execute(command).await {
                    Ok(_) => committed += 1,
                    Err(TransferError::InsufficientFunds { .. }) => insufficient += 1,
                    Err(e) => return Err(e),
                }
            }
            Ok((committed, insufficient))
        }));
    }

    let (mut committed, mut insufficient) = (0u64, 0u64);
    for worker in workers {
        let (c, i) = worker.await??;
        committed += c;
        insufficient += i;
    }

    let elapsed = start.elapsed();
    let total: i64 = store.accounts().await.iter().map(|a| a.balance).sum();
    let expected = INITIAL_BALANCE * account_count as i64;

    println!("\n=== Transfer Stress Results ===");
    println!("Committed: {}", committed);
    println!("Rejected (insufficient funds): {}", insufficient);
    println!("Transfers recorded: {}", store.transfers().await.len());
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!(
        "Rate: {:.0} transfers/sec",
        committed as f64 / elapsed.as_secs_f64()
    );
    println!("Total balance: {} (expected {})", total, expected);

    if total != expected {
        anyhow::bail!("value not conserved: {} != {}", total, expected);
    }

    Ok(())
}
