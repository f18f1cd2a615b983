//! Dispatch and per-command handlers.
//!
//! Every handler loads what it needs through [`MdvApi`], prints the
//! messages it got back and turns error-level messages into an `Err` so
//! the process exits non-zero.

use super::print::{print_manual_copy, print_messages, print_recent, print_status, print_toc};
use super::setup::{Cli, Commands, RecentAction, SourceArg, ThemeChoice};
use clap::Parser;
use directories::ProjectDirs;
use mdview::api::MdvApi;
use mdview::clipboard::SystemClipboard;
use mdview::commands::open::LocalAccess;
use mdview::commands::{CmdResult, MessageLevel, SaveOutcome};
use mdview::config::MdvConfig;
use mdview::editor::edit_text;
use mdview::emit::DirEmitter;
use mdview::error::{MdvError, Result};
use mdview::fetch::HttpFetcher;
use mdview::store::fs::FileStore;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

struct AppContext {
    api: MdvApi<FileStore>,
    config: MdvConfig,
    save_dir: PathBuf,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut ctx = init_context()?;

    match cli.command {
        Commands::View {
            source,
            out,
            find,
            scroll,
        } => handle_view(&mut ctx, &source, out, find, scroll),
        Commands::Toc { source } => handle_toc(&mut ctx, &source),
        Commands::Find { source, term, html } => handle_find(&mut ctx, &source, &term, html),
        Commands::Edit { source, read_only } => handle_edit(&mut ctx, &source, read_only),
        Commands::Copy { source, number } => handle_copy(&mut ctx, &source, number),
        Commands::Share { url, base } => handle_share(&mut ctx, &url, base),
        Commands::Recent { action } => handle_recent(&mut ctx, action),
        Commands::Theme { choice } => handle_theme(&mut ctx, choice),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("MDV_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn data_dir() -> Result<PathBuf> {
    if let Some(home) = env::var_os("MDV_HOME").filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("com", "mdview", "mdview")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| MdvError::Api("Could not determine data directory".into()))
}

fn init_context() -> Result<AppContext> {
    let data_dir = data_dir()?;
    let config = MdvConfig::load(&data_dir)?;
    let store = FileStore::open(&data_dir)?.with_capacity(config.store_quota);
    let cwd = env::current_dir().map_err(MdvError::Io)?;
    let save_dir = config.save_dir_from(&cwd);
    debug!(data_dir = %data_dir.display(), save_dir = %save_dir.display(), "context ready");

    Ok(AppContext {
        api: MdvApi::new(store, &config),
        config,
        save_dir,
    })
}

/// Print non-error messages and fail with the error ones.
fn finish(result: &CmdResult, to_stderr: bool) -> Result<()> {
    let (errors, rest): (Vec<_>, Vec<_>) = result
        .messages
        .iter()
        .cloned()
        .partition(|m| m.level == MessageLevel::Error);
    if to_stderr {
        print_status(&rest);
    } else {
        print_messages(&rest);
    }
    if errors.is_empty() {
        return Ok(());
    }
    let joined: Vec<String> = errors.into_iter().map(|m| m.content).collect();
    Err(MdvError::Api(joined.join("; ")))
}

fn load(ctx: &mut AppContext, raw: &str, access: LocalAccess) -> Result<()> {
    let result = match SourceArg::parse(raw) {
        SourceArg::Stdin => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map_err(MdvError::Io)?;
            ctx.api.open_text(text, None)
        }
        SourceArg::Sample => ctx.api.open_sample()?,
        SourceArg::Recent(n) => ctx.api.open_recent(n)?,
        SourceArg::Url(url) => ctx.api.open_url(&HttpFetcher::new()?, &url)?,
        SourceArg::Path(path) => ctx.api.open_file(&path, access)?,
    };
    finish(&result, true)
}

fn handle_view(
    ctx: &mut AppContext,
    source: &str,
    out: Option<PathBuf>,
    find: Option<String>,
    scroll: Option<u64>,
) -> Result<()> {
    load(ctx, source, LocalAccess::ReadOnly)?;
    if let Some(offset) = scroll {
        ctx.api.save_scroll(offset)?;
    }

    let result = match find.as_deref() {
        Some(term) => ctx.api.find(term),
        None => ctx.api.render(),
    };
    let Some(rendered) = result.rendered.as_ref() else {
        return finish(&result, true);
    };

    match out {
        Some(path) => {
            let page = ctx.api.page(rendered)?;
            fs::write(&path, page).map_err(MdvError::Io)?;
            finish(&result, true)?;
            println!("Wrote {}", path.display());
        }
        None => {
            finish(&result, true)?;
            print!("{}", rendered.html);
        }
    }
    Ok(())
}

fn handle_toc(ctx: &mut AppContext, source: &str) -> Result<()> {
    load(ctx, source, LocalAccess::ReadOnly)?;
    let result = ctx.api.render();
    if let Some(rendered) = &result.rendered {
        print_toc(&rendered.toc);
    }
    finish(&result, true)
}

fn handle_find(ctx: &mut AppContext, source: &str, term: &str, html: bool) -> Result<()> {
    load(ctx, source, LocalAccess::ReadOnly)?;
    let result = ctx.api.find(term);
    if html {
        if let Some(rendered) = &result.rendered {
            print!("{}", rendered.html);
        }
        return finish(&result, true);
    }
    finish(&result, false)
}

fn handle_edit(ctx: &mut AppContext, source: &str, read_only: bool) -> Result<()> {
    let access = if read_only {
        LocalAccess::ReadOnly
    } else {
        LocalAccess::Writable
    };
    load(ctx, source, access)?;

    let session = ctx.api.session();
    let name = session
        .display_name()
        .unwrap_or(ctx.config.default_file_name.as_str())
        .to_string();
    let original = session.text().to_string();
    let edited = edit_text(&original, &name)?;
    if edited == original && session.source().is_writable() {
        println!("No changes.");
        return Ok(());
    }

    ctx.api.edit(edited);
    fs::create_dir_all(&ctx.save_dir).map_err(MdvError::Io)?;
    let mut emitter = DirEmitter::new(&ctx.save_dir);
    let result = ctx.api.save(&mut emitter)?;
    print_messages(&result.messages);

    match result.save.map(|report| report.outcome) {
        Some(SaveOutcome::NotSaved { error, .. }) => Err(MdvError::Api(error)),
        Some(SaveOutcome::SavedAs { path, .. }) => {
            println!("{}", display_path(&path));
            Ok(())
        }
        _ => Ok(()),
    }
}

fn handle_copy(ctx: &mut AppContext, source: &str, number: usize) -> Result<()> {
    load(ctx, source, LocalAccess::ReadOnly)?;
    let result = ctx.api.copy_code_block(number, &mut SystemClipboard);
    if let Some(text) = &result.manual_copy {
        print_manual_copy(text);
    }
    finish(&result, false)
}

fn handle_share(ctx: &mut AppContext, url: &str, base: Option<String>) -> Result<()> {
    let Some(base) = base.or_else(|| ctx.config.share_base.clone()) else {
        return Err(MdvError::Api(
            "No share base: pass --base or set share-base in config.json".into(),
        ));
    };
    load(ctx, url, LocalAccess::ReadOnly)?;
    let result = ctx.api.share_link(&base, &mut SystemClipboard);
    if let Some(link) = &result.link {
        println!("{}", link);
    }
    finish(&result, true)
}

fn handle_recent(ctx: &mut AppContext, action: Option<RecentAction>) -> Result<()> {
    let result = match action.unwrap_or(RecentAction::List { filter: None }) {
        RecentAction::List { filter } => {
            let result = ctx.api.list_recent(filter.as_deref())?;
            print_recent(&result.recent);
            result
        }
        RecentAction::Rm { number } => ctx.api.remove_recent(number)?,
        RecentAction::Clear => ctx.api.clear_recent()?,
        RecentAction::Prune => ctx.api.prune_recent()?,
    };
    finish(&result, false)
}

fn handle_theme(ctx: &mut AppContext, choice: Option<ThemeChoice>) -> Result<()> {
    let result = match choice {
        None => {
            let result = ctx.api.theme()?;
            if let Some(theme) = result.theme {
                println!("{}", theme);
            }
            result
        }
        Some(ThemeChoice::Next) => ctx.api.cycle_theme()?,
        Some(choice) => match choice.theme() {
            Some(theme) => ctx.api.set_theme(theme)?,
            None => ctx.api.theme()?,
        },
    };
    finish(&result, false)
}

fn display_path(path: &Path) -> String {
    env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(|p| p.display().to_string()))
        .unwrap_or_else(|| path.display().to_string())
}
