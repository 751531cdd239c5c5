use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{error, info, warn};
use std::sync::Arc;

use codewatch::bot::TelegramBot;
use codewatch::config::Config;
use codewatch::conversation::ConversationSettings;
use codewatch::http_server::{self, HttpState};
use codewatch::imap_client::ImapMailSource;
use codewatch::notice::{EmailInfoPipeline, ExtractionRules};
use codewatch::telegram_notifier::TelegramNotifier;

type Pipeline = EmailInfoPipeline<ImapMailSource>;

#[derive(Parser)]
#[command(name = "codewatch")]
#[command(about = "Relays account access codes and household links from a mailbox to Telegram")]
#[command(version = "0.1.0")]
struct Args {
    /// Scan the mailbox once, print the records and exit (no Telegram)
    #[arg(short, long)]
    dry_run: bool,

    /// Only keep records whose profile name contains this text (with --dry-run)
    #[arg(short, long)]
    profile: Option<String>,

    /// Also run scheduled scans pushed to TELEGRAM_NOTIFY_CHAT_ID
    #[arg(long)]
    daemon: bool,

    /// Check the configuration without connecting
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load the .env file if present
    dotenv::dotenv().ok();

    let args = Args::parse();

    env_logger::init();

    // Fails fast when a required secret is missing
    let config = Config::new().context("Failed to load configuration")?;

    if args.check_config {
        println!("✅ Configuration valid!");
        println!("📧 Mailbox: {} on {}:{}", config.mail.username, config.mail.server, config.mail.port);
        println!("⏱️  Recency window: {} hour(s)", config.extraction.recency_window_hours);
        println!("🔗 Link texts: {:?}", config.extraction.link_texts().iter().map(|l| &l.text).collect::<Vec<_>>());
        println!("🌐 HTTP bind: {}", config.http_bind);
        println!("🗣️  Language: {:?}", config.telegram.language);
        if config.scheduler.enabled {
            println!("📅 Scheduled scans: {:?}", config.scheduler.schedule_times);
        }
        return Ok(());
    }

    let pipeline: Arc<Pipeline> = Arc::new(EmailInfoPipeline::new(
        ImapMailSource::new(config.mail.clone()),
        ExtractionRules::from_config(&config.extraction),
        config.telegram.language,
    ));

    if args.dry_run {
        info!("🧪 Starting codewatch in DRY-RUN mode");
        return run_dry_run(&config, &pipeline, args.profile.as_deref().map(str::trim)).await;
    }

    info!("🚀 Starting codewatch");
    let notifier = Arc::new(TelegramNotifier::new(&config.telegram));

    // Kept alive for the lifetime of the process
    let _scheduler = if args.daemon {
        Some(start_scheduler(&config, Arc::clone(&pipeline), Arc::clone(&notifier)).await?)
    } else {
        None
    };

    let bot = Arc::new(TelegramBot::new(
        Arc::clone(&notifier),
        Arc::clone(&pipeline),
        ConversationSettings {
            language: config.telegram.language,
            access_password: config.telegram.access_password.clone(),
        },
        config.extraction.recency_window(),
    ));
    let http_state = Arc::new(HttpState {
        pipeline: Arc::clone(&pipeline),
        window: config.extraction.recency_window(),
    });

    let http_bind = config.http_bind.clone();
    let http = tokio::spawn(async move { http_server::serve(&http_bind, http_state).await });
    let telegram = tokio::spawn(bot.run());

    tokio::select! {
        result = http => {
            match result {
                Ok(Ok(())) => warn!("HTTP server stopped"),
                Ok(Err(e)) => {
                    error!("❌ HTTP server failed: {}", e);
                    return Err(e);
                }
                Err(e) => anyhow::bail!("HTTP server task panicked: {}", e),
            }
        }
        result = telegram => {
            if let Err(e) = result {
                anyhow::bail!("Telegram bot task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("⏹️  Ctrl+C received, shutting down");
        }
    }

    Ok(())
}

async fn run_dry_run(config: &Config, pipeline: &Pipeline, profile: Option<&str>) -> Result<()> {
    println!("\n{}", "=".repeat(80));
    println!("🧪 DRY-RUN MODE - MAILBOX SCAN");
    println!("{}", "=".repeat(80));

    let infos = match pipeline.run(Utc::now(), config.extraction.recency_window(), profile).await {
        Ok(infos) => infos,
        Err(e) => {
            error!("❌ Error while checking emails: {}", e);
            return Err(e.into());
        }
    };

    if infos.is_empty() {
        println!("❌ No codes or links available.");
    }
    for (index, email_info) in infos.iter().enumerate() {
        println!("📧 Record {}/{}", index + 1, infos.len());
        println!("   👤 Profile: {}", email_info.profile_name);
        println!("   📄 Type: {}", email_info.kind);
        println!("   ⏰ Time: {}", email_info.time_ago);
        println!("   🔗 Link: {}", email_info.link);
    }

    println!("{}", "=".repeat(80));
    info!("✅ Dry-run finished. {} record(s) found.", infos.len());
    Ok(())
}

async fn start_scheduler(
    config: &Config,
    pipeline: Arc<Pipeline>,
    notifier: Arc<TelegramNotifier>,
) -> Result<tokio_cron_scheduler::JobScheduler> {
    use tokio_cron_scheduler::{Job, JobScheduler};

    if !config.scheduler.enabled {
        error!("❌ Daemon mode requires SCHEDULER_ENABLED=true");
        anyhow::bail!("Scheduler not enabled in the configuration");
    }

    let Some(chat_id) = config.telegram.notify_chat_id else {
        error!("❌ Daemon mode requires TELEGRAM_NOTIFY_CHAT_ID");
        anyhow::bail!("No chat to push scheduled scans to");
    };

    if config.scheduler.schedule_times.is_empty() {
        anyhow::bail!("No schedule defined (SCHEDULER_TIMES)");
    }

    info!("📅 Scheduled scans (UTC): {:?}", config.scheduler.schedule_times);

    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create the scheduler")?;

    for schedule_time in &config.scheduler.schedule_times {
        let Some((hour, minute)) = schedule_time.split_once(':') else {
            error!("❌ Invalid schedule time: {}. Use the HH:MM format", schedule_time);
            continue;
        };

        // Cron format: "sec min hour day month weekday"
        let cron_expr = format!("0 {} {} * * *", minute.trim(), hour.trim());
        info!("📆 Adding scheduled scan: {} (cron: {})", schedule_time, cron_expr);

        let pipeline = Arc::clone(&pipeline);
        let notifier = Arc::clone(&notifier);
        let window = config.extraction.recency_window();
        let language = config.telegram.language;
        let schedule_time = schedule_time.clone();

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
            let pipeline = Arc::clone(&pipeline);
            let notifier = Arc::clone(&notifier);
            let schedule_time = schedule_time.clone();

            Box::pin(async move {
                info!("⏰ Scheduled scan at {}", schedule_time);

                match pipeline.run(Utc::now(), window, None).await {
                    Ok(infos) => {
                        for email_info in &infos {
                            if let Err(e) = notifier.send_email_info(chat_id, email_info, language).await {
                                error!("Failed to send message via Telegram: {}", e);
                            }
                        }
                        info!("✅ Scheduled scan finished: {} record(s) pushed", infos.len());
                    }
                    Err(e) => {
                        error!("❌ Scheduled scan at {} failed: {}", schedule_time, e);
                        if let Err(e) = notifier.send_message(chat_id, language.run_failed()).await {
                            error!("Failed to send message via Telegram: {}", e);
                        }
                    }
                }
            })
        })?;

        scheduler.add(job).await?;
    }

    scheduler.start().await?;
    info!("✅ Scheduler started");
    Ok(scheduler)
}
