use anyhow::{Context, Result};
use env_logger::Env;
use serenity::all::{Client, GatewayIntents};
use std::sync::{Arc, OnceLock};
use vc_mirror::config::Config;
use vc_mirror::discord::{BotState, Handler};

#[tokio::main]
async fn main() -> Result<()> {
    // .env があれば読み込む（トークンをファイルで渡す運用向け）
    dotenv::dotenv().ok();

    // ロガーを初期化
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .filter_module("serenity", log::LevelFilter::Warn)
        .filter_module("tracing", log::LevelFilter::Warn)
        .init();

    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    // 設定ファイル生成モード
    if args.len() > 1 && args[1] == "--generate-config" {
        let config_path = if args.len() > 2 {
            &args[2]
        } else {
            "config.toml"
        };
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    // 設定ファイルのパス
    let config_path = if args.len() > 1 && !args[1].starts_with("--") {
        &args[1]
    } else {
        "config.toml"
    };

    // 設定を読み込み
    let config = Config::load_or_default(config_path)?;

    log::info!("vc-mirror を起動します");
    log::info!("設定: {:?}", config);

    let token = std::env::var("DISCORD_BOT_TOKEN")
        .context("環境変数 DISCORD_BOT_TOKEN が設定されていません")?;

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // BotState はクライアント構築後でないと作れない（http/cache が要る）ため、
    // ハンドラには空のスロットを先に渡しておく
    let state_slot: Arc<OnceLock<Arc<BotState>>> = Arc::new(OnceLock::new());

    let mut client = Client::builder(&token, intents)
        .event_handler(Handler::new(state_slot.clone()))
        .await
        .context("Discord クライアントの生成に失敗")?;

    let state = Arc::new(BotState::new(
        client.http.clone(),
        client.cache.clone(),
        &config,
    ));
    state.start_reconciliation().await;
    if state_slot.set(state.clone()).is_err() {
        log::warn!("BotState は既に初期化されています");
    }

    // Ctrl+C でスイープを止めてからシャードを落とす
    let shard_manager = client.shard_manager.clone();
    {
        let state = state.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("停止シグナルを受信しました...");
                state.stop_reconciliation().await;
                shard_manager.shutdown_all().await;
            }
        });
    }

    client
        .start()
        .await
        .context("Discord クライアントの実行に失敗")?;

    log::info!("vc-mirror を終了しました");
    Ok(())
}
