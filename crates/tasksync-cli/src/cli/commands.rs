use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use colored::{ColoredString, Colorize};
use serde_json::json;
use std::path::Path;

use crate::app::App;
use tasksync_core::models::{filter_tasks, sort_tasks};
use tasksync_core::service::PushOutcome;
use tasksync_core::{Config, Error, NewTask, Priority, SortKey, Task, TaskFilter, TaskPatch};

/// Parse a due date given as `YYYY-MM-DD` (midnight UTC) or RFC 3339
pub fn parse_due(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid due date '{}': use YYYY-MM-DD or RFC 3339", input))
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn push_note(push: &PushOutcome) -> ColoredString {
    match push {
        PushOutcome::Converged => "synced".green(),
        PushOutcome::Skipped => "saved locally, will sync later".yellow(),
        PushOutcome::Superseded => "synced, newer local edit pending".yellow(),
        PushOutcome::Deferred(_) => "saved locally, sync failed and will be retried".yellow(),
    }
}

fn print_task_line(task: &Task) {
    let checkbox: ColoredString = if task.completed {
        "[x]".green()
    } else {
        "[ ]".into()
    };
    let title = if task.completed {
        task.title.strikethrough()
    } else {
        task.title.normal()
    };
    let priority = match task.priority {
        Priority::High => "high".red(),
        Priority::Medium => "".normal(),
        Priority::Low => "low".dimmed(),
    };
    let due = match task.due_date {
        Some(due) if task.is_overdue(Utc::now()) => format!("due {}", due.format("%Y-%m-%d")).red(),
        Some(due) => format!("due {}", due.format("%Y-%m-%d")).normal(),
        None => "".normal(),
    };
    let pending = if task.dirty { "*".yellow() } else { " ".normal() };

    println!(
        "{}{} {} {} {} {}",
        pending,
        short_id(&task.id).dimmed(),
        checkbox,
        title,
        priority,
        due
    );
}

/// Handle the 'add' command
pub async fn add_task(
    app: &App,
    title: &str,
    description: Option<String>,
    priority: Option<Priority>,
    due: Option<&str>,
    json: bool,
) -> Result<()> {
    let owner = app.owner()?;
    if title.trim().is_empty() {
        bail!("Title must not be empty");
    }
    let fields = NewTask {
        title: title.to_string(),
        description: description.unwrap_or_default(),
        priority: priority.unwrap_or_default(),
        due_date: due.map(parse_due).transpose()?,
        ..Default::default()
    };

    let mutation = app.service.add_with_outcome(&owner, fields).await?;
    if json {
        println!("{}", serde_json::to_string(&mutation.task)?);
        return Ok(());
    }
    println!(
        "Added {} {} ({})",
        short_id(&mutation.task.id).dimmed(),
        mutation.task.title.bold(),
        push_note(&mutation.push)
    );
    Ok(())
}

/// Handle the 'ls' command
pub fn list_tasks(app: &App, filter: TaskFilter, sort: SortKey, json: bool) -> Result<()> {
    let owner = app.owner()?;
    let mut tasks = filter_tasks(app.service.tasks(&owner)?, filter);
    sort_tasks(&mut tasks, sort);

    if json {
        println!("{}", serde_json::to_string(&tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks found. Create one with 'tasksync add <title>'");
        return Ok(());
    }

    println!("{}:", format!("Tasks of {}", owner).cyan().bold());
    for task in &tasks {
        print_task_line(task);
    }
    if tasks.iter().any(|t| t.dirty) {
        println!("{}", "* not yet synced".dimmed());
    }
    Ok(())
}

/// Handle the 'edit' command
pub async fn edit_task(
    app: &App,
    id: &str,
    mut patch: TaskPatch,
    due: Option<&str>,
    clear_due: bool,
    json: bool,
) -> Result<()> {
    let owner = app.owner()?;
    let id = app.resolve_id(&owner, id)?;

    if clear_due {
        patch.due_date = Some(None);
    } else if let Some(due) = due {
        patch.due_date = Some(Some(parse_due(due)?));
    }
    if patch.is_empty() {
        bail!("Nothing to change. Pass at least one of --title, --description, --priority, --due, --clear-due");
    }

    let mutation = app.service.update_with_outcome(&id, patch).await?;
    if json {
        println!("{}", serde_json::to_string(&mutation.task)?);
        return Ok(());
    }
    println!(
        "Updated {} {} ({})",
        short_id(&id).dimmed(),
        mutation.task.title.bold(),
        push_note(&mutation.push)
    );
    Ok(())
}

/// Handle the 'done' command: flips the completed flag
pub async fn toggle_task(app: &App, id: &str, json: bool) -> Result<()> {
    let owner = app.owner()?;
    let id = app.resolve_id(&owner, id)?;
    let task = app.service.toggle_completed(&id).await?;

    if json {
        println!("{}", serde_json::to_string(&task)?);
        return Ok(());
    }
    let state = if task.completed {
        "done".green()
    } else {
        "not done".normal()
    };
    println!("Marked '{}' as {}", task.title, state);
    Ok(())
}

/// Handle the 'rm' command
pub async fn remove_task(app: &App, id: &str, json: bool) -> Result<()> {
    let owner = app.owner()?;
    let id = app.resolve_id(&owner, id)?;
    app.service.delete(&id, &owner).await?;

    if json {
        println!("{}", json!({ "deleted": id }));
        return Ok(());
    }
    if app.is_reachable() {
        println!("Deleted {}", short_id(&id).dimmed());
    } else {
        println!(
            "Deleted {} locally. {}",
            short_id(&id).dimmed(),
            "The remote copy is left in place while offline".yellow()
        );
    }
    Ok(())
}

/// Handle the 'sync' command
pub async fn sync_now(app: &App, json: bool) -> Result<()> {
    let report = match app.coordinator.run_sync_pass().await {
        Ok(report) => report,
        Err(Error::Offline) if app.remote_url.is_none() => {
            bail!("No remote configured. Set [remote] url in the config file")
        }
        Err(e) => return Err(e.into()),
    };
    let pending = app.coordinator.pending_count()?;

    if json {
        println!(
            "{}",
            json!({
                "converged": report.converged,
                "failed": report.failed,
                "pending": pending,
            })
        );
        return Ok(());
    }

    println!("Synced {} task(s)", report.converged.to_string().green());
    if report.failed > 0 {
        println!(
            "{} task(s) failed and stay pending",
            report.failed.to_string().red()
        );
    }
    Ok(())
}

/// Handle the 'status' command
pub fn status(app: &App, json: bool) -> Result<()> {
    let user = app.owner().ok();
    let pending = app.coordinator.pending_count()?;
    let last_pass = app.coordinator.last_pass_at()?;
    let reachable = app.is_reachable();

    if json {
        println!(
            "{}",
            json!({
                "user_id": user,
                "remote": app.remote_url,
                "reachable": reachable,
                "pending": pending,
                "last_sync": last_pass.map(|t| t.to_rfc3339()),
                "database": app.database_path.display().to_string(),
            })
        );
        return Ok(());
    }

    println!("{}", "Status:".cyan().bold());
    println!(
        "  Signed in: {}",
        match &user {
            Some(id) => id.green(),
            None => "No".red(),
        }
    );
    println!(
        "  Remote: {}",
        match &app.remote_url {
            Some(url) => url.normal(),
            None => "Not configured (local-only)".dimmed(),
        }
    );
    println!(
        "  Connectivity: {}",
        if reachable {
            "Online".green()
        } else {
            "Offline".red()
        }
    );
    println!(
        "  Pending sync: {}",
        if pending == 0 {
            "0".green()
        } else {
            pending.to_string().yellow()
        }
    );
    println!(
        "  Last sync: {}",
        match last_pass {
            Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string().normal(),
            None => "Never".dimmed(),
        }
    );
    println!("  Database: {}", app.database_path.display());
    Ok(())
}

/// Handle the 'login' command: stores the user id in the config file
pub fn login(config_path: &Path, mut config: Config, user_id: &str, json: bool) -> Result<()> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        bail!("User id must not be empty");
    }
    config.auth.user_id = Some(user_id.to_string());
    config.save_to(config_path)?;

    if json {
        println!("{}", json!({ "user_id": user_id }));
    } else {
        println!("Signed in as {}", user_id.green());
    }
    Ok(())
}

/// Handle the 'logout' command
pub fn logout(config_path: &Path, mut config: Config, json: bool) -> Result<()> {
    let previous = config.auth.user_id.take();
    config.save_to(config_path)?;

    if json {
        println!("{}", json!({ "signed_out": previous }));
    } else {
        match previous {
            Some(id) => println!("Signed out {}", id),
            None => println!("Not signed in"),
        }
    }
    Ok(())
}
