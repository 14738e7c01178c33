use dotenvy::dotenv;
use logbook_core::config::ApiSettings;
use logbook_transport_telegram::config::{BotSettings, TelegramSettings};
use logbook_transport_telegram::runner::run_bot;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data from log output.
struct RedactionPatterns {
    bot_url_token: Regex,
    bot_token: Regex,
    api_token: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid.
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            bot_url_token: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            bot_token: Regex::new(r"[0-9]{8,10}:[A-Za-z0-9_-]{35}")?,
            api_token: Regex::new(r"API_TOKEN=[^\s&]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .bot_url_token
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .bot_token
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .api_token
            .replace_all(&output, "API_TOKEN=[MASKED]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Report the original length even though the redacted string
        // may differ in size.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: (self.make_inner)(),
            patterns: self.patterns.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile redaction patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting Logbook TG Bot...");

    let settings = init_settings();
    run_bot(settings).await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter {
        make_inner: io::stderr,
        patterns,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "logbook_core=info,logbook_transport_telegram=info,logbook_telegram_bot=info,hyper=warn,reqwest=warn,teloxide=warn",
        )
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<BotSettings> {
    let api_settings = match ApiSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load API configuration: {e}");
            std::process::exit(1);
        }
    };
    let telegram_settings = match TelegramSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load telegram configuration: {e}");
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully.");
    Arc::new(BotSettings::new(api_settings, telegram_settings))
}

#[cfg(test)]
mod tests {
    use super::RedactionPatterns;

    #[test]
    fn test_bot_token_is_masked() {
        let patterns = RedactionPatterns::new().expect("patterns compile");
        let line = "request to 123456789:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA failed";
        let redacted = patterns.redact(line);
        assert!(!redacted.contains("AAAAAAAA"));
        assert!(redacted.contains("[TELEGRAM_TOKEN]"));
    }

    #[test]
    fn test_api_token_is_masked() {
        let patterns = RedactionPatterns::new().expect("patterns compile");
        let redacted = patterns.redact("env API_TOKEN=super-secret-value loaded");
        assert_eq!(redacted, "env API_TOKEN=[MASKED] loaded");
    }
}
