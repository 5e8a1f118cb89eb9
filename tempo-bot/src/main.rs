mod events;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::{debug, error, info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;
use sqlx::postgres::PgPoolOptions;

use tempo_core::{Data, Error};
use tempo_database::{CacheService, Database, MIGRATOR};
use tempo_slowmode::{
    Ingestor, RateTracker, Reconciler, SerenityRemote, SlowmodeScheduler, SlowmodeSettings,
    SystemClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        let target = metadata.target();

        if *metadata.level() > tracing::Level::INFO {
            return false;
        }

        !(target.starts_with("serenity::gateway::bridge::shard_manager")
            || target.starts_with("serenity::gateway::bridge::shard_runner"))
    }));

    tracing_subscriber::registry().with(fmt_layer).init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    dotenvy::dotenv().ok();

    let token = env::var("DISCORD_TOKEN")?;
    let database_url = env::var("DATABASE_URL")?;
    let guild_id = match env::var("DISCORD_GUILD_ID") {
        Ok(raw) => Some(raw.trim().parse::<u64>()?),
        Err(_) => None,
    };

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    info!("PostgreSQL connection established.");

    let cache = cache_from_env();
    if cache.is_redis_enabled() {
        if let Err(err) = cache.ping().await {
            warn!(
                ?err,
                "Redis cache ping failed; config reads will fall back to the database."
            );
        } else {
            info!("Redis cache health check passed.");
        }
    }

    let db = Database::with_cache(db_pool, cache);

    if env_bool("AUTO_RUN_MIGRATIONS", true) {
        MIGRATOR.run(db.pool()).await?;
        info!("Database migrations applied.");
    } else {
        info!("Auto migrations disabled (set AUTO_RUN_MIGRATIONS=true to run at startup).");
    }

    let settings = slowmode_settings_from_env();
    info!(
        interval_secs = settings.interval.as_secs(),
        retention_secs = settings.retention.as_secs(),
        rate_window_secs = settings.rate_window.as_secs(),
        notify = settings.notify,
        "Auto-slowmode configured."
    );

    let tracker = RateTracker::new();
    let ingestor = Ingestor::new(db.clone(), tracker.clone());
    let scheduler = Arc::new(SlowmodeScheduler::new(settings.drain_timeout));

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let setup_scheduler = Arc::clone(&scheduler);
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: tempo_commands::commands(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handle_event(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(tempo_utils::COMMAND_PREFIX.to_string()),
                mention_as_prefix: false,
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("Tempo is ready.");

                match guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?;
                        info!(guild_id, "Registered commands in guild.");
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                        info!("Registered commands globally.");
                    }
                }

                setup_scheduler.start(Reconciler::new(
                    db.clone(),
                    SerenityRemote::new(ctx.http.clone()),
                    tracker,
                    SystemClock,
                    settings.clone(),
                ));

                Ok(Data {
                    db,
                    ingestor,
                    settings,
                })
            })
        })
        .build();

    info!("Tempo is connecting...");

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested, disconnecting shards.");
                shard_manager.shutdown_all().await;
            }
            Err(err) => error!(?err, "failed to listen for ctrl-c"),
        }
    });

    let result = client.start().await;
    scheduler.shutdown().await;
    result?;

    Ok(())
}

fn cache_from_env() -> CacheService {
    let redis_key_prefix =
        env::var("REDIS_KEY_PREFIX").unwrap_or_else(|_| "tempo:prod".to_string());

    if !env_bool("REDIS_ENABLED", false) {
        info!("Redis cache disabled (set REDIS_ENABLED=true to enable).");
        return CacheService::disabled(redis_key_prefix);
    }

    match env::var("REDIS_URL") {
        Ok(redis_url) => match CacheService::redis(&redis_url, redis_key_prefix.clone()) {
            Ok(cache) => {
                info!(key_prefix = %redis_key_prefix, "Redis cache enabled.");
                cache
            }
            Err(err) => {
                warn!(
                    ?err,
                    key_prefix = %redis_key_prefix,
                    "Failed to initialize Redis cache; continuing with DB-only mode."
                );
                CacheService::disabled(redis_key_prefix)
            }
        },
        Err(_) => {
            warn!(
                key_prefix = %redis_key_prefix,
                "REDIS_ENABLED=true but REDIS_URL is missing; continuing with DB-only mode."
            );
            CacheService::disabled(redis_key_prefix)
        }
    }
}

fn slowmode_settings_from_env() -> SlowmodeSettings {
    let defaults = SlowmodeSettings::default();

    SlowmodeSettings {
        interval: env_secs("SLOWMODE_INTERVAL_SECONDS", defaults.interval),
        retention: env_secs("ACTIVITY_RETENTION_SECONDS", defaults.retention),
        prune_interval: env_secs("ACTIVITY_PRUNE_INTERVAL_SECONDS", defaults.prune_interval),
        rate_window: env_secs("RATE_WINDOW_SECONDS", defaults.rate_window),
        idle_window: env_secs("IDLE_WINDOW_SECONDS", defaults.idle_window),
        jitter_min: env_millis("SLOWMODE_JITTER_MIN_MS", defaults.jitter_min),
        jitter_max: env_millis("SLOWMODE_JITTER_MAX_MS", defaults.jitter_max),
        call_timeout: env_secs("REMOTE_CALL_TIMEOUT_SECONDS", defaults.call_timeout),
        drain_timeout: env_secs("SHUTDOWN_DRAIN_SECONDS", defaults.drain_timeout),
        notify: env_bool("SLOWMODE_NOTIFY", defaults.notify),
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(value) => value.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

// Zero would make the tickers and windows meaningless, so it is floored to 1s.
fn env_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_u64(key, default.as_secs()).max(1))
}

fn env_millis(key: &str, default: Duration) -> Duration {
    let default = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(env_u64(key, default))
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(?error, command = %ctx.command().qualified_name, "command error");

            let embed = serenity::CreateEmbed::new()
                .title("Command Error")
                .description("Something went wrong while running this command.")
                .color(tempo_utils::embed::DEFAULT_EMBED_COLOR);

            let _ = ctx
                .send(poise::CreateReply::default().ephemeral(true).embed(embed))
                .await;
        }
        poise::FrameworkError::ArgumentParse { ctx, input, .. } => {
            let usage = format!("Usage: `!{}`", ctx.command().qualified_name);
            let description = match input {
                Some(input) => format!("Invalid argument: `{input}`\n{usage}"),
                None => format!("Missing required argument.\n{usage}"),
            };

            let _ = ctx.say(description).await;
        }
        poise::FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let description = match missing_permissions {
                Some(missing) => format!("You need the {missing} permission to use this command."),
                None => "You don't have permission to use this command.".to_owned(),
            };

            let _ = ctx
                .send(poise::CreateReply::default().ephemeral(true).content(description))
                .await;
        }
        poise::FrameworkError::GuildOnly { ctx, .. } => {
            let _ = ctx.say("This command only works in servers.").await;
        }
        poise::FrameworkError::UnknownCommand { .. } => {
            debug!("unknown command invocation");
        }
        other => {
            error!(?other, "framework error");
        }
    }
}

async fn handle_event(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        events::activity::handle_message_activity(data, new_message).await;
    }

    Ok(())
}
