use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::Arc;

use dpybot::commands::context::{core_config, resolve_token, BotIdentity};
use dpybot::commands::{CommandContext, CommandHandler};
use dpybot::config::ConfigContext;
use dpybot::core::Settings;
use dpybot::extensions::ExtensionManager;

struct Handler {
    command_handler: Arc<CommandHandler>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) = self.command_handler.handle_message(&ctx, &msg).await {
            error!("Error handling message: {e:#}");
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        if let Some(shard) = ready.shard {
            info!("⚡ Shard: {}/{}", shard[0] + 1, shard[1]);
        }

        let command_ctx = self.command_handler.context();
        match ctx.http.get_current_application_info().await {
            Ok(app) => command_ctx.set_owner(app.owner.id).await,
            Err(e) => warn!("Could not fetch the application owner: {e}"),
        }

        command_ctx
            .set_ready(BotIdentity {
                id: ready.user.id,
                name: ready.user.name.clone(),
            })
            .await;

        let extensions = command_ctx.extensions.loaded_names().await;
        if !extensions.is_empty() {
            info!("🧩 {} extension(s) loaded", extensions.len());
            for name in extensions {
                info!("   - {name}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let settings = Settings::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_level))
        .init();

    info!("Starting dpybot...");
    info!("📁 Data directory: {}", settings.data_dir.display());

    let config_ctx = ConfigContext::new(settings.data_dir.clone());
    let config = core_config(&config_ctx)?;
    let token = resolve_token(settings.discord_token.as_deref(), &config).await?;

    let extensions = Arc::new(ExtensionManager::new(config_ctx.clone()));
    for name in &settings.load_on_startup {
        if let Err(e) = extensions.load(name).await {
            error!("❌ Startup extension {name}: {e}");
        }
    }

    let command_ctx = Arc::new(CommandContext::new(
        config,
        config_ctx,
        extensions,
        settings.owner_id,
    ));
    let handler = Handler {
        command_handler: Arc::new(CommandHandler::new(Arc::clone(&command_ctx))),
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    command_ctx.set_shard_manager(Arc::clone(&client.shard_manager));

    info!("Establishing WebSocket connection to Discord gateway...");
    info!("Gateway intents: {intents:?}");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        error!("This could be due to:");
        error!("  - Invalid bot token");
        error!("  - Network connectivity issues");
        error!("  - Discord API outage");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    info!("👋 Disconnected from Discord");
    Ok(())
}
