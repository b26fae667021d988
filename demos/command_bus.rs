//! Command bus demonstration.
//!
//! This example shows a dispatcher wired the way an application would:
//! 1. Register services in a `Container`
//! 2. Register named pipes in a `StageRegistry`
//! 3. Configure the dispatcher with pipe specifiers
//! 4. Dispatch commands and observe pipe order, short-circuits and binding
//!
//! Run with: `cargo run --example command_bus`

use std::sync::{Arc, Mutex};

use pipeline_bus::{
    Arguments, Command, Container, Dispatcher, Next, Param, Pipe, Result, Stage, StageRegistry,
};

/// Storage service bound in the container.
#[derive(Debug, Default)]
struct Ledger {
    entries: Mutex<Vec<(String, i64)>>,
}

/// Record a payment into the ledger.
#[derive(Debug)]
struct RecordPayment {
    account: String,
    cents: i64,
}

impl Command for RecordPayment {
    type Output = String;

    fn name(&self) -> &str {
        "RecordPayment"
    }

    fn params(&self, method: &str) -> Option<Vec<Param>> {
        (method == "handle").then(|| {
            vec![
                Param::new("ledger").typed::<Ledger>(),
                Param::new("currency").default_value("EUR"),
            ]
        })
    }

    fn call(self, _method: &str, args: Arguments) -> Result<String> {
        let currency = args.get::<&'static str>("currency").map(|c| *c).unwrap_or("???");
        if let Some(ledger) = args.get::<Ledger>("ledger") {
            ledger
                .entries
                .lock()
                .expect("ledger lock poisoned")
                .push((self.account.clone(), self.cents));
        }
        Ok(format!("recorded {} {} for {}", self.cents, currency, self.account))
    }
}

/// Rejects payments above the limit given as first argument.
struct Limit;

impl Pipe<RecordPayment, String> for Limit {
    fn handle(
        &self,
        cmd: RecordPayment,
        next: Next<'_, RecordPayment, String>,
        args: &[String],
    ) -> Result<String> {
        let max: i64 = args.first().and_then(|a| a.parse().ok()).unwrap_or(i64::MAX);
        if cmd.cents > max {
            next.log()
                .info(format_args!("payment of {} exceeds limit {}", cmd.cents, max));
            return Ok(format!("rejected {} for {}: over limit", cmd.cents, cmd.account));
        }
        next.run(cmd)
    }
}

/// Normalizes account identifiers.
struct Normalize;

impl Pipe<RecordPayment, String> for Normalize {
    fn handle(
        &self,
        cmd: RecordPayment,
        next: Next<'_, RecordPayment, String>,
        _args: &[String],
    ) -> Result<String> {
        next.run(RecordPayment {
            account: cmd.account.trim().to_uppercase(),
            ..cmd
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let container = Arc::new(Container::new().instance(Ledger::default()));
    let ledger = container.make::<Ledger>()?;

    let pipes = StageRegistry::<RecordPayment, String>::new()
        .register("limit", || Limit)
        .register("normalize", || Normalize);

    let dispatcher = Dispatcher::<RecordPayment>::new(container)
        .with_stage_registry(Arc::new(pipes))
        .pipe_through([Stage::parse("normalize")?, Stage::parse("limit:10000")?]);

    for (account, cents) in [(" acme-01 ", 2_500), ("globex", 50_000), ("initech ", 9_999)] {
        let outcome = dispatcher.dispatch(RecordPayment {
            account: account.to_string(),
            cents,
        })?;
        tracing::info!(%outcome, "dispatched");
    }

    let entries = ledger.entries.lock().expect("ledger lock poisoned");
    tracing::info!(count = entries.len(), entries = ?entries.as_slice(), "ledger contents");

    Ok(())
}
