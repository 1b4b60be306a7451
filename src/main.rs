// src/main.rs

use anyhow::{Context, Result};
use capbind::{
    composable, int_arg, mutating, split_continuation, Binder, Capability, CommandLineInput,
    DemoConfig, EngineError, OperationTable, Step, Value, LOG_FILE_NAME,
};
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use serde_json::json;
use std::fs;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join(LOG_FILE_NAME);
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stderr_appender = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

fn balance_of(subject: &Value) -> i64 {
    subject
        .field("balance")
        .and_then(|balance| balance.as_i64())
        .unwrap_or(0)
}

/// Records `delta` against the ledger state carried by `subject`.
fn post(subject: &Value, delta: i64) -> capbind::Result<Value> {
    let state = subject
        .carried_state()
        .ok_or_else(|| EngineError::raised("ledger operations need a state"))?;
    let mut entries = state
        .get("entries")
        .and_then(|entries| entries.as_array())
        .cloned()
        .unwrap_or_default();
    entries.push(json!(delta));

    Ok(Value::from(
        state
            .with("balance", balance_of(subject) + delta)
            .with("entries", entries),
    ))
}

/// Builds the ledger: a mutating base, a reader layer and, when a limit is
/// configured, a composed guard around `withdraw`.
fn open_ledger(binder: &Binder, config: &DemoConfig) -> capbind::Result<Capability> {
    let base = mutating(
        &OperationTable::builder()
            .operation_with_arity("deposit", 1, |subject, args| {
                let amount = int_arg(args, 0)?;
                if amount <= 0 {
                    return Err(EngineError::raised(format!(
                        "deposit must be positive, got {}",
                        amount
                    )));
                }
                post(subject, amount)
            })
            .operation_with_arity("withdraw", 1, |subject, args| {
                let amount = int_arg(args, 0)?;
                let balance = balance_of(subject);
                if amount > balance {
                    return Err(EngineError::raised(format!(
                        "insufficient funds: balance {}, requested {}",
                        balance, amount
                    )));
                }
                post(subject, -amount)
            })
            .build()?,
    );

    let readers = OperationTable::builder()
        .operation_with_arity("balance", 0, |subject, _| Ok(Value::from(balance_of(subject))))
        .operation_with_arity("entries", 0, |subject, _| {
            Ok(subject
                .field("entries")
                .cloned()
                .map_or(Value::Unit, Value::Data))
        })
        .build()?;

    let mut ledger = binder
        .layer(json!({ "balance": config.opening, "entries": [] }), base)?
        .with(readers)?;

    if let Some(limit) = config.limit {
        let guard = composable(&mutating(
            &OperationTable::builder()
                .operation_with_arity("withdraw", 1, move |_, args| {
                    let (own, previous) = split_continuation(args)?;
                    let amount = int_arg(own, 0)?;
                    if amount > limit {
                        return Err(EngineError::raised(format!(
                            "withdrawal of {} exceeds the limit of {}",
                            amount, limit
                        )));
                    }
                    previous.call(own)
                })
                .build()?,
        ));
        log::debug!("Guarding withdrawals with a limit of {}", limit);
        ledger = ledger.with(guard)?;
    }

    Ok(ledger.finish())
}

fn describe_step(step: &Step) -> String {
    match step.argument {
        Some(argument) => format!("{}({})", step.operation, argument),
        None => format!("{}()", step.operation),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Data(data) => data.to_string(),
        Value::Unit => "()".to_string(),
        other => format!("{:?}", other),
    }
}

/// Applies every requested step in order, chaining through mutators.
fn run(config: &DemoConfig) -> Result<()> {
    let binder = Binder::new(config.engine.clone());
    let mut ledger = open_ledger(&binder, config).context("failed to open the ledger")?;

    for step in &config.steps {
        let args: Vec<Value> = step.argument.map(Value::from).into_iter().collect();
        let result = ledger
            .call(&step.operation, &args)
            .with_context(|| format!("step {} failed", describe_step(step)))?;

        match result {
            Value::Capability(next) => {
                let balance = next.state().and_then(|state| state.get_i64("balance"));
                println!("{} -> balance {}", describe_step(step), balance.unwrap_or(0));
                ledger = next;
            }
            other => println!("{} = {}", describe_step(step), render(&other)),
        }
    }

    if config.describe {
        println!("{}", serde_json::to_string_pretty(&ledger.descriptors())?);
    }

    let stats = binder.cache_stats();
    log::info!(
        "Construction cache: {} hit(s), {} miss(es), {}/{} entries",
        stats.hits,
        stats.misses,
        stats.entries,
        stats.capacity
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = DemoConfig::resolve(cli)?;

    run(&config)
}
