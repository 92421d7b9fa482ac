use chrono::Utc;
use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod args;
pub mod cache;
pub mod card;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod formatting;
mod help;
pub mod item;
pub mod markdown;
pub mod nav;
pub mod page;
pub mod render;
pub mod settings;
pub mod site;
pub mod tags;

pub mod shared {
    pub mod table;
}

use args::{ArgParser, CommonFlags, parse_filter_pair};
use cache::IssueCache;
use config::Config;
use fetch::{ContentFetcher, HttpTransport, Transport};
use formatting::{FormatContext, TimeFormatter};
use item::{ContentItem, SectionKind};
use settings::{Settings, TOKEN_KEY, mask_secret};
use shared::table::{display_len, render_table, terminal_columns, truncate_with_ellipsis};

const TITLE_WIDTH: usize = 40;

pub fn entry() -> Result<(), Box<dyn Error>> {
    init_logging();

    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        return help::run(Vec::new());
    }

    let cmd = args.remove(0);
    match cmd.as_str() {
        "help" | "-h" | "--help" => return help::run(args),
        "render" => return render_markdown(args),
        _ => {}
    }

    let config = Config::from_env()?;
    ensure_dir(&config.dir)?;

    match cmd.as_str() {
        "build" => build_site(args, &config)?,
        "list" | "ls" => list_items(args, &config)?,
        "view" | "show" => view_item(args, &config)?,
        "note" | "new" => create_note(args, &config)?,
        "token" => token_command(args, &config)?,
        "cache" => cache_command(args, &config)?,
        "path" => println!("{}", config.dir.display()),
        other => {
            eprintln!("Unknown command: {other}");
            help::run(Vec::new())?;
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("FOLIO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

fn open_fetcher(config: &Config) -> Result<ContentFetcher<HttpTransport>, Box<dyn Error>> {
    let settings = Settings::load(&config.settings_path())?;
    let token = config
        .env_token
        .clone()
        .or_else(|| settings.get(TOKEN_KEY).map(str::to_string));
    let cache = IssueCache::load(&config.cache_path(), config.cache_ttl)?;
    Ok(ContentFetcher::new(HttpTransport::new()?, config.repo.clone())
        .with_token(token)
        .with_cache(cache))
}

fn save_cache<T: Transport>(fetcher: &ContentFetcher<T>, config: &Config) {
    if let Err(err) = fetcher.cache().save(&config.cache_path()) {
        warn!(%err, "could not write cache");
    }
}

fn clear_cache_file(config: &Config) -> io::Result<bool> {
    match fs::remove_file(config.cache_path()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Items for a label. Section labels fall back to the example set (with a
/// warning on stderr); other labels surface the fetch error.
fn load_label(config: &Config, label: &str) -> Result<Vec<ContentItem>, Box<dyn Error>> {
    let mut fetcher = open_fetcher(config)?;
    let result = fetcher.fetch_by_label(label);
    save_cache(&fetcher, config);

    let Some(kind) = SectionKind::from_label(label) else {
        return Ok(result?);
    };
    let outcome = site::resolve(kind, result, &config.repo, Utc::now());
    if let Some(status) = &outcome.status {
        let ctx = FormatContext::from_env(false);
        let reason = outcome.error.as_ref().map(|e| format!(" ({e})")).unwrap_or_default();
        eprintln!(
            "{}",
            ctx.format_warning(&format!(
                "{}{reason} Showing example {}s. See {}",
                status.headline(),
                kind.label(),
                status.repo_url
            ))
        );
    }
    Ok(outcome.items)
}

fn build_site(args: Vec<String>, config: &Config) -> Result<(), Box<dyn Error>> {
    let mut out: Option<PathBuf> = None;
    let mut section: Option<String> = None;
    let mut clicks: Vec<(String, String)> = Vec::new();

    let mut parser = ArgParser::new(args, "build");
    while let Some(arg) = parser.next() {
        match arg.as_str() {
            "-o" | "--out" => out = Some(PathBuf::from(parser.extract_value("--out")?)),
            "--section" => section = Some(parser.extract_value("--section")?),
            "--filter" => clicks.push(parse_filter_pair(&parser.extract_value("--filter")?)?),
            other => return Err(format!("Unknown argument for build: {other}").into()),
        }
    }

    let mut fetcher = open_fetcher(config)?;
    let (mut page, outcomes) = site::load(&mut fetcher, Utc::now())?;
    save_cache(&fetcher, config);

    if let Some(id) = &section {
        nav::activate(&mut page, id)?;
    }
    for (section_label, value) in &clicks {
        filter::click(&mut page, section_label, value)?;
    }

    let path = out.unwrap_or_else(|| config.site_path());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    fs::write(&path, page.to_html())?;
    info!(path = %path.display(), "site written");

    let ctx = FormatContext::from_env(false);
    for outcome in outcomes.iter().filter(|o| o.is_fallback()) {
        if let Some(status) = &outcome.status {
            eprintln!(
                "{}",
                ctx.format_warning(&format!(
                    "{} Showing example {}s.",
                    status.headline(),
                    outcome.kind.label()
                ))
            );
        }
    }
    let count = |kind: SectionKind| {
        outcomes.iter().find(|o| o.kind == kind).map(|o| o.items.len()).unwrap_or(0)
    };
    println!(
        "Wrote {} ({} projects, {} notes)",
        path.display(),
        count(SectionKind::Project),
        count(SectionKind::Note)
    );
    Ok(())
}

fn list_items(args: Vec<String>, config: &Config) -> Result<(), Box<dyn Error>> {
    let flags = CommonFlags::parse(args, "list")?;
    let [label] = flags.positional.as_slice() else {
        return Err("Usage: folio list <project|note|label> [-t tag]...".into());
    };

    let mut items = load_label(config, label)?;
    items.retain(|i| tags::item_has_tags(i, &flags.tag_filters));
    if items.is_empty() {
        println!("No {label} items match.");
        return Ok(());
    }

    let ctx = FormatContext::from_env(flags.plain);
    let time = TimeFormatter::new(flags.relative_time, Utc::now());
    let mut rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            vec![
                ctx.format_number(item.number),
                ctx.format_timestamp(&time.format(item.created_at)),
                ctx.format_header(&truncate_with_ellipsis(&item.title, TITLE_WIDTH)),
                ctx.format_labels(&item.labels, label),
            ]
        })
        .collect();

    let headers: Vec<String> =
        ["#", "Date", "Title", "Labels", "Excerpt"].iter().map(|h| h.to_string()).collect();
    let used: usize = (0..4)
        .map(|col| {
            rows.iter()
                .map(|r| display_len(&r[col]))
                .chain([display_len(&headers[col])])
                .max()
                .unwrap_or(0)
                + 2
        })
        .sum();
    let excerpt_width = terminal_columns().unwrap_or(100).saturating_sub(used).max(16);
    for (row, item) in rows.iter_mut().zip(&items) {
        row.push(extract::excerpt(item.body_text(), excerpt_width));
    }

    println!("{}", render_table(&headers, &rows));
    Ok(())
}

fn view_item(args: Vec<String>, config: &Config) -> Result<(), Box<dyn Error>> {
    let flags = CommonFlags::parse(args, "view")?;
    let [label, number] = flags.positional.as_slice() else {
        return Err("Usage: folio view <project|note|label> <number> [--html] [--plain]".into());
    };
    let number: u64 = number
        .trim_start_matches('#')
        .parse()
        .map_err(|_| format!("Invalid issue number: {number}"))?;

    let items = load_label(config, label)?;
    let item = items
        .iter()
        .find(|i| i.number == number)
        .ok_or_else(|| format!("No {label} #{number} found"))?;

    if flags.html {
        println!("{}", card::build(item, label).to_html());
        return Ok(());
    }

    let ctx = FormatContext::from_env(flags.plain);
    let time = TimeFormatter::new(flags.relative_time, Utc::now());
    println!("{} {}", ctx.format_number(item.number), ctx.format_header(&item.title));
    println!("{}", ctx.format_timestamp(&time.format(item.created_at)));
    let labels = ctx.format_labels(&item.labels, label);
    if !labels.is_empty() {
        println!("{labels}");
    }
    if !item.url.is_empty() {
        println!("{}", item.url);
    }
    println!();
    println!("{}", render::render_markdown(item.body_text(), ctx.use_color));
    Ok(())
}

fn render_markdown(args: Vec<String>) -> Result<(), Box<dyn Error>> {
    let input = match args.as_slice() {
        [] => read_stdin()?,
        [path] if path == "-" => read_stdin()?,
        [path] => fs::read_to_string(path).map_err(|e| format!("Could not read {path}: {e}"))?,
        _ => return Err("Usage: folio render [FILE|-]".into()),
    };
    let html = markdown::render(&input);
    if !html.is_empty() {
        println!("{html}");
    }
    Ok(())
}

fn read_stdin() -> io::Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn create_note(args: Vec<String>, config: &Config) -> Result<(), Box<dyn Error>> {
    let flags = CommonFlags::parse(args, "note")?;
    let mut parts = flags.positional.into_iter();
    let title = parts
        .next()
        .filter(|t| !t.trim().is_empty())
        .ok_or("Usage: folio note <title> [body...] [-t tag]...")?;
    let body = parts.collect::<Vec<_>>().join(" ");

    let mut labels = vec![SectionKind::Note.label().to_string()];
    labels.extend(flags.tag_filters);
    let labels = tags::normalize_tags(labels);

    let mut fetcher = open_fetcher(config)?;
    if !fetcher.has_token() {
        let url = config.repo.new_issue_url(&title, &body, &labels)?;
        println!("No token set; open this link to create the note:");
        println!("{url}");
        return Ok(());
    }

    let item = fetcher.create_item(&title, &body, &labels)?;
    save_cache(&fetcher, config);
    println!("Created note #{} ({})", item.number, item.title);
    Ok(())
}

fn token_command(args: Vec<String>, config: &Config) -> Result<(), Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "token");
    let mut settings = Settings::load(&config.settings_path())?;

    match parser.next().as_deref() {
        Some("set") => {
            let value = parser.extract_value("set")?;
            let value = value.trim();
            if value.is_empty() {
                return Err("Token value is empty".into());
            }
            settings.set(TOKEN_KEY, value)?;
            clear_cache_file(config)?;
            println!("Token saved ({})", mask_secret(value));
        }
        Some("clear") => {
            let removed = settings.remove(TOKEN_KEY)?;
            clear_cache_file(config)?;
            println!("{}", if removed { "Token cleared" } else { "No token stored" });
        }
        Some("status") | None => match (&config.env_token, settings.get(TOKEN_KEY)) {
            (Some(token), _) => println!("Token: {} (from FOLIO_TOKEN)", mask_secret(token)),
            (None, Some(token)) => println!("Token: {} (stored)", mask_secret(token)),
            (None, None) => {
                println!("No token set; requests are unauthenticated (read-only, lower rate limit).")
            }
        },
        Some(other) => {
            return Err(format!("Unknown token action: {other}. Use set, clear or status").into());
        }
    }
    Ok(())
}

fn cache_command(args: Vec<String>, config: &Config) -> Result<(), Box<dyn Error>> {
    let mut parser = ArgParser::new(args, "cache");
    match parser.next().as_deref() {
        Some("clear") => {
            clear_cache_file(config)?;
            println!("Cache cleared");
        }
        Some("status") | None => {
            let cache = IssueCache::load(&config.cache_path(), config.cache_ttl)?;
            if cache.is_empty() {
                println!("Cache is empty");
                return Ok(());
            }
            let now = Utc::now();
            let headers: Vec<String> =
                ["Items", "Age", "State", "Query"].iter().map(|h| h.to_string()).collect();
            let rows: Vec<Vec<String>> = cache
                .entries()
                .map(|(key, entry)| {
                    let fresh = cache.get(key, now).is_some();
                    vec![
                        entry.data.len().to_string(),
                        format!("{}s", entry.age(now).num_seconds().max(0)),
                        if fresh { "fresh" } else { "stale" }.to_string(),
                        key.to_string(),
                    ]
                })
                .collect();
            println!("{}", render_table(&headers, &rows));
        }
        Some(other) => {
            return Err(format!("Unknown cache action: {other}. Use status or clear").into());
        }
    }
    Ok(())
}
