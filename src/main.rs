use clap::{Parser, Subcommand};

use rtm_bot::application::services::Bot;
use rtm_bot::infrastructure::adapters::{ConsoleAdapter, RtmAdapter};
use rtm_bot::infrastructure::config::Config;
use rtm_bot::{BotError, CommandError, ConfigError, Conversation, KeepaliveSettings};

#[derive(Parser)]
#[command(name = "rtm-bot")]
#[command(about = "A real-time messaging bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Session API token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run {
        /// Read messages from stdin instead of connecting to the service
        #[arg(long)]
        console: bool,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { console } => {
            if let Err(e) = run_bot(cli.config, cli.token, console) {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("rtm-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn run_bot(config_path: String, token_override: Option<String>, console: bool) -> Result<(), BotError> {
    // Load config
    let mut config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };
    config.apply_env();
    if let Some(token) = token_override {
        config.rtm.token = Some(token);
    }
    config.validate()?;

    tracing::info!("Starting {}", config.bot.name);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::ConnectFailed(format!("Failed to start runtime: {}", e)))?;

    rt.block_on(async {
        let bot = if console {
            let adapter = ConsoleAdapter::new();
            Bot::new(adapter.bot_id().to_string(), adapter.transport())
        } else {
            let token = config.token()?;
            let adapter = RtmAdapter::new(config.rtm.clone())?;
            adapter.connect(token, &adapter.dialer()).await?
        };

        let mut bot = bot
            .with_keepalive(KeepaliveSettings::from(&config.keepalive))
            .with_help_keyword(config.bot.help_keyword.clone())
            .with_max_concurrent(config.dispatch.max_concurrent);

        register_commands(&mut bot).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        bot.listen().await
    })
}

fn register_commands(bot: &mut Bot) -> Result<(), CommandError> {
    bot.register_command("ping", "Check the bot is alive", |conv: Conversation| async move {
        conv.reply("pong").await
    })?;

    bot.register_command("shout <word>", "Repeat a word, loudly", |conv: Conversation| async move {
        let word = conv.string("word")?.to_uppercase();
        conv.reply(word).await
    })?;

    bot.register_command("whisper <word>", "Repeat a word, quietly", |conv: Conversation| async move {
        let word = conv.string("word")?.to_lowercase();
        conv.reply(word).await
    })?;

    bot.register_command("add <a:integer> <b:integer>", "Add two numbers", |conv: Conversation| async move {
        let sum = conv
            .integer("a")?
            .checked_add(conv.integer("b")?)
            .ok_or_else(|| CommandError::ExecutionFailed("sum overflows".to_string()))?;
        conv.reply(sum.to_string()).await
    })?;

    Ok(())
}

fn init_config() {
    match serde_yaml::to_string(&Config::default()) {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("Failed to render config: {}", e),
    }
}
