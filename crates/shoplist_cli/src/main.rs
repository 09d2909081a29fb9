//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise `shoplist_core` against a real database file.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `shoplist_cli [--data-dir DIR] <version|list|add NAME [QTY]|delete ID|buy ID|qty ID N>`
//! Without `--data-dir`, `SHOPLIST_DATA_DIR` is used.

use shoplist_core::store::{self, Store};
use shoplist_core::{init_logging_from_config, CoreConfig, Item, ItemId, ItemService};
use std::process::ExitCode;
use std::sync::Arc;

enum Command {
    Version,
    List,
    Add { name: String, quantity: Option<i64> },
    Delete(ItemId),
    Buy(ItemId),
    Quantity(ItemId, i64),
}

fn main() -> ExitCode {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let (data_dir, rest) = split_data_dir(args)?;
    let command = parse_command(rest)?;

    if let Command::Version = command {
        println!("shoplist_core version={}", shoplist_core::core_version());
        return Ok(());
    }

    let config = match data_dir {
        Some(dir) => CoreConfig::new(dir),
        None => CoreConfig::from_env().map_err(|err| err.to_string())?,
    };
    // Log setup is best-effort; relative directories are rejected by the logger.
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("warning: logging disabled: {err}");
    }

    let store = store::init_in_dir(&config.data_dir).map_err(|err| err.to_string())?;
    let result = execute(&store, command);
    store::close(store).map_err(|err| err.to_string())?;
    result
}

fn execute(store: &Arc<Store>, command: Command) -> Result<(), String> {
    let service = ItemService::new(Arc::clone(store)).map_err(|err| err.to_string())?;
    let live = service.items().map_err(|err| err.to_string())?;

    match command {
        Command::Version | Command::List => {}
        Command::Add { name, quantity } => service.insert_named(name, quantity),
        Command::Delete(id) => service.delete(find(store, id)?),
        Command::Buy(id) => service.set_purchased(&find(store, id)?, true),
        Command::Quantity(id, quantity) => service.set_quantity(&find(store, id)?, quantity),
    }
    service.flush();

    for event in live.drain() {
        if let shoplist_core::LiveEvent::WriteFailed { op, message, .. } = event {
            return Err(format!("{} failed: {message}", op.as_str()));
        }
    }

    for item in store.query_all().map_err(|err| err.to_string())? {
        println!(
            "{:>4}  [{}]  {} x{}",
            item.id,
            if item.purchased { "x" } else { " " },
            item.name,
            item.quantity
        );
    }
    Ok(())
}

fn find(store: &Store, id: ItemId) -> Result<Item, String> {
    store
        .get(id)
        .map_err(|err| err.to_string())?
        .ok_or_else(|| format!("no item with id {id}"))
}

fn split_data_dir(args: &[String]) -> Result<(Option<&str>, &[String]), String> {
    match args {
        [flag, dir, rest @ ..] if flag == "--data-dir" => Ok((Some(dir.as_str()), rest)),
        [flag] if flag == "--data-dir" => Err("--data-dir needs a value".to_string()),
        rest => Ok((None, rest)),
    }
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let words = args.iter().map(String::as_str).collect::<Vec<_>>();
    match words.as_slice() {
        [] | ["list"] => Ok(Command::List),
        ["version"] => Ok(Command::Version),
        ["add", name] => Ok(Command::Add {
            name: (*name).to_string(),
            quantity: None,
        }),
        ["add", name, quantity] => Ok(Command::Add {
            name: (*name).to_string(),
            quantity: Some(parse_number(quantity)?),
        }),
        ["delete", id] => Ok(Command::Delete(parse_number(id)?)),
        ["buy", id] => Ok(Command::Buy(parse_number(id)?)),
        ["qty", id, quantity] => Ok(Command::Quantity(
            parse_number(id)?,
            parse_number(quantity)?,
        )),
        other => Err(format!("unrecognized command: {}", other.join(" "))),
    }
}

fn parse_number(value: &str) -> Result<i64, String> {
    value
        .parse::<i64>()
        .map_err(|_| format!("expected a number, got `{value}`"))
}
