// Binary entry point for the reminder service.
use anyhow::{Context, Result};
use chrono::Local;
use dolist::cli::{print_help, systemd_unit};
use dolist::config::Config;
use dolist::context::{AppContext, StandardContext};
use dolist::model::{format_absolute, matching_rule, parse_reminder, reminder_label};
use dolist::notify::{Notifier, notifier_from_config};
use dolist::store::{JsonTaskStore, ReminderStore};
use dolist::system::Scheduler;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Default)]
struct Args {
    override_root: Option<PathBuf>,
    interval: Option<u64>,
    databases: Vec<PathBuf>,
    verbose: bool,
    print_unit: bool,
    init_config: bool,
    parse_text: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--root" | "-r" => {
                let value = args.get(i + 1).context("--root needs a path")?;
                parsed.override_root = Some(value.into());
                i += 1;
            }
            "--interval" | "-i" => {
                let value = args.get(i + 1).context("--interval needs a number of seconds")?;
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid interval: {}", value))?;
                if secs == 0 {
                    anyhow::bail!("--interval must be at least 1 second");
                }
                parsed.interval = Some(secs);
                i += 1;
            }
            "--databases" | "-d" => {
                let value = args.get(i + 1).context("--databases needs a list of paths")?;
                parsed.databases = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
                    .collect();
                i += 1;
            }
            "--verbose" | "-v" => parsed.verbose = true,
            "--print-systemd-unit" => parsed.print_unit = true,
            "--init-config" => parsed.init_config = true,
            "parse" => {
                let text = args[i + 1..].join(" ");
                parsed.parse_text = Some(text);
                break;
            }
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
        i += 1;
    }
    Ok(parsed)
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let log_config = ConfigBuilder::new()
        .add_filter_allow_str("dolist")
        .add_filter_allow_str("dolist_service")
        .build();
    // A second init (already set) is harmless.
    let _ = TermLogger::init(level, log_config, TerminalMode::Mixed, ColorChoice::Auto);
}

fn run_parse_check(text: &str, config: &Config) -> Result<()> {
    let now = Local::now().naive_local();
    match parse_reminder(text, now, &config.parser_config()) {
        Ok(resolved) => {
            if let Some(rule) = matching_rule(text) {
                println!("Form:       {}", rule);
            }
            println!("Trigger:    {}", resolved.trigger_instant.format("%Y-%m-%d %H:%M:%S"));
            println!("When:       {}", format_absolute(resolved.trigger_instant, now));
            println!(
                "Label:      {}",
                reminder_label(
                    resolved.trigger_instant,
                    resolved.recurrence_descriptor.as_deref(),
                    now
                )
            );
            if let Some(descriptor) = &resolved.recurrence_descriptor {
                println!("Repeats as: {}", descriptor);
            }
            Ok(())
        }
        Err(e) => anyhow::bail!("{} ({})", e, e.kind),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help("dolist-service");
        return Ok(());
    }

    let parsed = parse_args(&args)?;

    if parsed.print_unit {
        let exe = std::env::current_exe().context("Cannot determine executable path")?;
        let user = std::env::var("USER").unwrap_or_else(|_| "root".to_string());
        print!("{}", systemd_unit(&exe.display().to_string(), &user));
        return Ok(());
    }

    let ctx = StandardContext::new(parsed.override_root.clone());
    let mut config = Config::load_or_default(&ctx)?;

    if let Some(text) = &parsed.parse_text {
        return run_parse_check(text, &config);
    }

    if let Some(secs) = parsed.interval {
        config.check_interval_secs = secs;
    }
    if !parsed.databases.is_empty() {
        config.override_stores(&parsed.databases);
    }
    config.verbose |= parsed.verbose;

    if parsed.init_config {
        config.save(&ctx)?;
        println!("Wrote {}", ctx.get_config_file_path()?.display());
        return Ok(());
    }

    init_logging(config.verbose);

    let stores: Vec<Arc<dyn ReminderStore>> = config
        .resolved_stores(&ctx)?
        .into_iter()
        .map(|s| Arc::new(JsonTaskStore::new(&s.name, s.path)) as Arc<dyn ReminderStore>)
        .collect();

    let notifier: Arc<dyn Notifier> = Arc::from(notifier_from_config(config.reminder_cmd.as_deref()));

    let scheduler = Scheduler::new(
        stores,
        notifier,
        config.parser_config(),
        Duration::from_secs(config.check_interval_secs),
    )
    .with_verbose(config.verbose);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown requested");
        }
        let _ = shutdown_tx.send(true);
    });

    scheduler.run(shutdown_rx).await
}
