use std::path::{Path, PathBuf};

use crossterm::style::Stylize;
use tracing::info;

use crate::config::{self, Config, PathSource};
use crate::error::{Result, TodoError};
use crate::network::{self, ShareOptions, ShareServer, DEFAULT_PORT};
use crate::render::{print_tasks, ListFilter};
use crate::storage::TaskStore;

/// Adds a new task built from the given words joined by spaces.
pub fn cmd_add(store: &TaskStore, words: &[String], silent: bool) -> Result<()> {
    let task = store.add(&words.join(" "))?;
    if !silent {
        println!("Added [{}] {}", task.id, task.content);
    }
    Ok(())
}

/// Lists tasks with a progress overview.
pub fn cmd_list(store: &TaskStore, filter: ListFilter) -> Result<()> {
    let tasks = store.list()?;
    if tasks.is_empty() {
        println!("{}", "No tasks.".yellow());
        return Ok(());
    }
    print_tasks("TASKS", &tasks, filter);
    Ok(())
}

/// Marks a task as done or, with `done == false`, as not done.
pub fn cmd_set_done(store: &TaskStore, id: u64, done: bool, silent: bool) -> Result<()> {
    store.set_done(id, done)?;
    if !silent {
        if done {
            println!("Task {} marked as done.", id);
        } else {
            println!("Task {} marked as not done.", id);
        }
    }
    Ok(())
}

/// Deletes a task by ID.
pub fn cmd_delete(store: &TaskStore, id: u64, silent: bool) -> Result<()> {
    store.delete(id)?;
    if !silent {
        println!("Task {} deleted.", id);
    }
    Ok(())
}

/// Removes every task. Refuses to run without explicit confirmation.
pub fn cmd_clear(store: &TaskStore, yes: bool, silent: bool) -> Result<()> {
    if !yes {
        return Err(TodoError::Validation(
            "this will remove ALL tasks; confirm with --yes".into(),
        ));
    }
    store.clear()?;
    if !silent {
        println!("All tasks cleared.");
    }
    Ok(())
}

/// Prints the config file and the database path in effect.
pub fn cmd_config_show(config_file: &Path, effective: &Path, source: PathSource) -> Result<()> {
    if config_file.exists() {
        let cfg = Config::load_from(config_file)?;
        println!("{}", "Current configuration:".green());
        println!("Config file: {}", config_file.display());
        match cfg.db_path {
            Some(p) => println!("{}", format!("Database path: {}", p.display()).cyan()),
            None => println!("Database path: (not set)"),
        }
    } else {
        println!(
            "{}",
            "No configuration file found, using default settings".yellow()
        );
    }
    println!("Effective database: {} ({})", effective.display(), source);
    Ok(())
}

/// Makes `db_path` the permanent database for future invocations.
pub fn cmd_config_set_db(config_file: &Path, db_path: PathBuf, silent: bool) -> Result<()> {
    config::check_writable(&db_path)?;
    let mut cfg = Config::load_from(config_file)?;
    cfg.db_path = Some(db_path.clone());
    cfg.save_to(config_file)?;
    info!(path = %db_path.display(), "database path configured");
    if !silent {
        println!("{}", format!("✓ Database path set to: {}", db_path.display()).green());
    }
    Ok(())
}

/// Shares the store's tasks with peers until the process is stopped.
pub async fn cmd_serve(store: TaskStore, addr: &str, options: ShareOptions) -> Result<()> {
    let addr = network::resolve_addr(addr, DEFAULT_PORT);
    let server = ShareServer::bind(&addr, store, options).await?;
    println!(
        "{}",
        format!("Friend server started on {}", server.local_addr()?).blue().bold()
    );
    server.run().await
}

/// Fetches and prints a peer's task list.
pub async fn cmd_connect(addr: &str, options: ShareOptions) -> Result<()> {
    let tasks = network::fetch_tasks(addr, options).await?;
    if tasks.is_empty() {
        println!("{}", "No tasks received from friend.".yellow());
        return Ok(());
    }
    print_tasks(&format!("Friend's Todo List @ {addr}"), &tasks, ListFilter::All);
    Ok(())
}
