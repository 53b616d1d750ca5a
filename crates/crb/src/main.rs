use std::{io, sync::Arc};

use crb_openai::OpenAiClient;

use crb_core::{
    config::Config, conversation::Conversation, credentials, registry::UserStateRegistry,
    router::Router, store::FileStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crb_core::logging::init("crb")?;

    let cfg = Config::load()?;
    let store = FileStore::new(cfg.data_dir.clone());

    let creds = {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        credentials::load_or_bootstrap(&store, &mut input, &mut output)?
    };

    let registry = Arc::new(UserStateRegistry::open(store)?);
    let client = Arc::new(OpenAiClient::new(
        creds.openai_api_key.clone(),
        cfg.openai_model.clone(),
        cfg.openai_base_url.clone(),
        cfg.request_timeout,
    )?);
    tracing::info!(
        model = client.model(),
        history_policy = ?cfg.history_policy,
        temperature_source = ?cfg.temperature_source,
        "completion backend ready"
    );

    let conversation = Arc::new(Conversation::new(
        registry.clone(),
        client,
        cfg.history_policy,
        cfg.temperature_source,
    ));
    let router = Arc::new(Router::new(conversation, cfg.show_temperature_button));

    let run = crb_telegram::router::run_polling(creds.telegram_token.clone(), router).await;

    // Final flush even when polling failed.
    if let Err(e) = registry.flush().await {
        tracing::error!("failed to flush user state on shutdown: {e}");
    }

    run
}
