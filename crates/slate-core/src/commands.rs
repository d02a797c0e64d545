use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::parse_date_expr;
use crate::prefs;
use crate::query::{BucketFilter, Query, filter_and_sort};
use crate::render::{Renderer, short_id};
use crate::storage::Storage;
use crate::store::TaskStore;
use crate::task::{Status, Tag, Task};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "list", "info", "modify", "done", "cancel", "archive", "delete", "today",
        "archived", "export", "config", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch<S: Storage>(
    store: &TaskStore<S>,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    debug!(command = %inv.command, args = ?inv.args, "dispatching command");

    match inv.command.as_str() {
        "add" => cmd_add(store, &inv.args, now),
        "list" => cmd_list(store, renderer, &inv.args, now),
        "info" => cmd_info(store, renderer, &inv.args, now),
        "modify" => cmd_modify(store, &inv.args, now),
        "done" => cmd_set_status(store, &inv.args, Status::Done, now),
        "cancel" => cmd_set_status(store, &inv.args, Status::Cancelled, now),
        "archive" => cmd_set_status(store, &inv.args, Status::Archived, now),
        "delete" => cmd_delete(store, &inv.args),
        "today" => cmd_today(store, renderer, now),
        "archived" => cmd_archived(store, renderer, now),
        "export" => cmd_export(store),
        "config" => cmd_config(store, cfg, &inv.args),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[derive(Debug, Clone)]
enum Mod {
    TagAdd(Tag),
    TagRemove(Tag),
    Deadline(Option<DateTime<Utc>>),
    Description(String),
    Status(Status),
}

fn parse_title_and_mods(
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<(String, Vec<Mod>)> {
    let mut words: Vec<&str> = vec![];
    let mut mods = vec![];

    for arg in args {
        if let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
        } else {
            words.push(arg);
        }
    }

    Ok((words.join(" "), mods))
}

fn parse_one_mod(tok: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Mod>> {
    if let Some(tag) = tok.strip_prefix('+') {
        let tag = Tag::parse_name(tag).ok_or_else(|| anyhow!("unknown tag: {tag}"))?;
        return Ok(Some(Mod::TagAdd(tag)));
    }
    if let Some(tag) = tok.strip_prefix('-') {
        let tag = Tag::parse_name(tag).ok_or_else(|| anyhow!("unknown tag: {tag}"))?;
        return Ok(Some(Mod::TagRemove(tag)));
    }

    let Some((key, value)) = tok.split_once(':') else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "due" => {
            if value.eq_ignore_ascii_case("none") {
                Ok(Some(Mod::Deadline(None)))
            } else {
                Ok(Some(Mod::Deadline(Some(parse_date_expr(value, now)?))))
            }
        }
        "desc" | "description" => Ok(Some(Mod::Description(value.to_string()))),
        "status" => {
            let status =
                Status::parse_name(value).ok_or_else(|| anyhow!("unknown status: {value}"))?;
            Ok(Some(Mod::Status(status)))
        }
        _ => Ok(None),
    }
}

fn apply_mods(task: &mut Task, mods: &[Mod]) {
    for one_mod in mods {
        match one_mod {
            Mod::TagAdd(tag) => {
                if task.tags.iter().all(|existing| existing != tag) {
                    task.tags.push(*tag);
                }
            }
            Mod::TagRemove(tag) => {
                task.tags.retain(|existing| existing != tag);
            }
            Mod::Deadline(deadline) => {
                task.deadline = *deadline;
            }
            Mod::Description(text) => {
                task.description = if text.is_empty() {
                    None
                } else {
                    Some(text.clone())
                };
            }
            Mod::Status(status) => {
                task.status = *status;
            }
        }
    }
}

fn find_by_prefix(tasks: &[Task], prefix: &str) -> anyhow::Result<usize> {
    if prefix.is_empty() {
        return Err(anyhow!("a task id (or unique prefix) is required"));
    }

    let mut matches = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| task.id.starts_with(prefix));
    let Some((idx, _)) = matches.next() else {
        return Err(anyhow!("no task matches id prefix: {prefix}"));
    };
    if matches.next().is_some() {
        return Err(anyhow!("id prefix is ambiguous: {prefix}"));
    }
    Ok(idx)
}

#[instrument(skip(store, args, now))]
fn cmd_add<S: Storage>(
    store: &TaskStore<S>,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let (title, mods) = parse_title_and_mods(args, now)?;
    if title.is_empty() {
        return Err(anyhow!("a task needs a title"));
    }

    let mut task = Task::new(title, now);
    apply_mods(&mut task, &mods);

    store
        .add_one(task.clone())
        .context("failed to persist new task")?;
    println!("Created task {}.", short_id(&task.id));
    Ok(())
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_list<S: Storage>(
    store: &TaskStore<S>,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    let mut query = Query::parse(args)?;
    if query.bucket.is_none()
        && let Some(bucket) = prefs::date_filter(store)
    {
        debug!(bucket = bucket.name(), "applying date filter preference");
        query.bucket = Some(bucket);
    }

    let tasks = store.load_all().context("failed to load tasks")?;
    let rows = filter_and_sort(&tasks, &query, now);
    renderer.print_task_table(&rows, now)
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_info<S: Storage>(
    store: &TaskStore<S>,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command info");

    let prefix = args.first().map(String::as_str).unwrap_or_default();
    let tasks = store.load_all().context("failed to load tasks")?;
    let idx = find_by_prefix(&tasks, prefix)?;
    renderer.print_task_info(&tasks[idx], now)
}

#[instrument(skip(store, args, now))]
fn cmd_modify<S: Storage>(
    store: &TaskStore<S>,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command modify");

    let Some((prefix, rest)) = args.split_first() else {
        return Err(anyhow!("modify requires a task id"));
    };

    let (title, mods) = parse_title_and_mods(rest, now)?;
    if title.is_empty() && mods.is_empty() {
        return Err(anyhow!("modify requires at least one change"));
    }

    let mut tasks = store.load_all().context("failed to load tasks")?;
    let idx = find_by_prefix(&tasks, prefix)?;

    let task = &mut tasks[idx];
    if !title.is_empty() {
        task.title = title;
    }
    apply_mods(task, &mods);
    task.updated_at = now;
    let id = task.id.clone();

    store
        .save_all(&tasks)
        .context("failed to persist modified task")?;
    println!("Modified task {}.", short_id(&id));
    Ok(())
}

#[instrument(skip(store, args, now))]
fn cmd_set_status<S: Storage>(
    store: &TaskStore<S>,
    args: &[String],
    status: Status,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!(status = status.name(), "command status change");

    let prefix = args.first().map(String::as_str).unwrap_or_default();
    let mut tasks = store.load_all().context("failed to load tasks")?;
    let idx = find_by_prefix(&tasks, prefix)?;

    tasks[idx].set_status(status, now);
    let id = tasks[idx].id.clone();

    store
        .save_all(&tasks)
        .context("failed to persist status change")?;
    println!("Marked task {} {}.", short_id(&id), status.name());
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_delete<S: Storage>(store: &TaskStore<S>, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let prefix = args.first().map(String::as_str).unwrap_or_default();
    let mut tasks = store.load_all().context("failed to load tasks")?;
    let idx = find_by_prefix(&tasks, prefix)?;

    let removed = tasks.remove(idx);
    store
        .save_all(&tasks)
        .context("failed to persist deletion")?;
    println!("Deleted task {}.", short_id(&removed.id));
    Ok(())
}

#[instrument(skip(store, renderer, now))]
fn cmd_today<S: Storage>(
    store: &TaskStore<S>,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command today");

    let due = store
        .load_due_today(now)
        .context("failed to load tasks due today")?;
    let rows = filter_and_sort(&due, &Query::default(), now);
    renderer.print_task_table(&rows, now)
}

#[instrument(skip(store, renderer, now))]
fn cmd_archived<S: Storage>(
    store: &TaskStore<S>,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command archived");

    let archived = store
        .load_archived()
        .context("failed to load archived tasks")?;
    let rows = filter_and_sort(&archived, &Query::default(), now);
    renderer.print_task_table(&rows, now)
}

#[instrument(skip(store))]
fn cmd_export<S: Storage>(store: &TaskStore<S>) -> anyhow::Result<()> {
    info!("command export");

    let tasks = store.load_all().context("failed to load tasks")?;
    let raw = serde_json::to_string_pretty(&tasks).context("failed to encode tasks")?;
    println!("{raw}");
    Ok(())
}

#[instrument(skip(store, cfg, args))]
fn cmd_config<S: Storage>(
    store: &TaskStore<S>,
    cfg: &Config,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command config");

    let Some((setting, rest)) = args.split_first() else {
        let mut entries: Vec<(String, String)> =
            cfg.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort();
        for (key, value) in entries {
            println!("{key} = {value}");
        }
        println!("theme = {}", prefs::theme(store));
        println!("view-mode = {}", prefs::view_mode(store).name());
        let filter = prefs::date_filter(store)
            .map(BucketFilter::name)
            .unwrap_or("all");
        println!("date-filter = {filter}");
        return Ok(());
    };

    let value = rest.first().map(String::as_str).unwrap_or_default();
    match setting.as_str() {
        "theme" => {
            if value.is_empty() {
                return Err(anyhow!("config theme requires a theme name"));
            }
            prefs::set_theme(store, value);
        }
        "view" => {
            let mode = prefs::ViewMode::parse_name(value)
                .ok_or_else(|| anyhow!("unknown view mode: {value}"))?;
            prefs::set_view_mode(store, mode);
        }
        "filter" => {
            let bucket = BucketFilter::parse_name(value)
                .ok_or_else(|| anyhow!("unknown date bucket: {value}"))?;
            prefs::set_date_filter(store, bucket);
        }
        other => {
            warn!(setting = other, "unknown config setting");
            return Err(anyhow!(
                "unknown config setting: {other} (expected theme, view or filter)"
            ));
        }
    }

    println!("Set {setting} to {value}.");
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("usage: slate [flags] <command> [args]");
    println!();
    println!("commands:");
    println!("  add <title> [due:<date>] [+tag]        create a task");
    println!("  list [terms] [status:] [due:] [sort:]  filtered, sorted task view");
    println!("  info <id>                              full task detail");
    println!("  modify <id> [title] [due:] [+/-tag]    edit a task");
    println!("  done | cancel | archive <id>           change a task's status");
    println!("  delete <id>                            remove a task");
    println!("  today                                  tasks due today");
    println!("  archived                               archived tasks");
    println!("  export                                 dump the collection as JSON");
    println!("  config [theme|view|filter <value>]     show or set preferences");
    println!("  help | version");
    Ok(())
}
