use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    // "mongo" | "memory"
    pub storage: String,

    pub cron_secret: String,

    pub document_feed_url: String,
    pub document_viewer_url: String,
    pub price_api_url: String,
    pub price_api_token: String,
    pub messaging_api_url: String,
    pub messaging_token: String,

    pub page_size: usize,
    pub default_max_pages: usize,
    pub max_funds_to_check: usize,
    pub page_delay_ms: u64,
    pub send_delay_ms: u64,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let page_size = parsed_or("PAGE_SIZE", 100usize).clamp(1, 100);

    Settings {
        mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
        mongodb_db: var_or("MONGODB_DB", "fundwatch"),
        host: var_or("HOST", "127.0.0.1"),
        port: parsed_or("PORT", 3000u16),
        storage: var_or("STORAGE", "mongo").to_lowercase(),
        cron_secret: var_or("CRON_SECRET", ""),
        document_feed_url: var_or(
            "DOCUMENT_FEED_URL",
            "https://fnet.bmfbovespa.com.br/fnet/publico/pesquisarGerenciadorDocumentosDados",
        ),
        document_viewer_url: var_or(
            "DOCUMENT_VIEWER_URL",
            "https://fnet.bmfbovespa.com.br/fnet/publico/exibirDocumento",
        ),
        price_api_url: var_or("PRICE_API_URL", "https://brapi.dev/api"),
        price_api_token: var_or("PRICE_API_TOKEN", ""),
        messaging_api_url: var_or("MESSAGING_API_URL", ""),
        messaging_token: var_or("MESSAGING_TOKEN", ""),
        page_size,
        default_max_pages: parsed_or("DEFAULT_MAX_PAGES", 10usize).max(1),
        max_funds_to_check: parsed_or("MAX_FUNDS_TO_CHECK", 200usize).max(1),
        page_delay_ms: parsed_or("PAGE_DELAY_MS", 300u64),
        send_delay_ms: parsed_or("SEND_DELAY_MS", 1000u64),
    }
}
