//! Terminal App - Line-based Screens over Any Async Reader/Writer
//!
//! Renders the route on top of the navigator as a text screen, reads
//! one line per prompt, and dispatches to the use cases. Generic over
//! the I/O halves so tests drive it with byte slices.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tracing::{debug, info, instrument};

use crate::domain::{CURRENCIES, Currency, find_currency};
use crate::usecases::navigation::DRAWER_ITEMS;
use crate::usecases::{ConversionService, MenuAction, Navigator, PopUpTo, Route, SessionManager};

/// What the main loop should do after a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn is_quit(line: &str) -> bool {
    matches!(line.trim(), "q" | "Q")
}

fn is_back(line: &str) -> bool {
    matches!(line.trim(), "b" | "B")
}

/// Resolve a currency by 1-based index or code. Empty input keeps `current`.
pub fn pick_currency(input: &str, current: &'static Currency) -> Option<&'static Currency> {
    let input = input.trim();
    if input.is_empty() {
        return Some(current);
    }
    if let Ok(index) = input.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| CURRENCIES.get(i));
    }
    find_currency(input)
}

/// Interactive front-end.
pub struct TerminalApp<R, W> {
    input: Lines<BufReader<R>>,
    output: W,
    sessions: Arc<SessionManager>,
    conversions: Arc<ConversionService>,
    navigator: Navigator,
    history_limit: usize,
    source: &'static Currency,
    target: &'static Currency,
}

impl<R, W> TerminalApp<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create the app. The start route is resolved in `run`.
    pub fn new(
        reader: R,
        output: W,
        sessions: Arc<SessionManager>,
        conversions: Arc<ConversionService>,
        history_limit: usize,
    ) -> Self {
        Self {
            input: BufReader::new(reader).lines(),
            output,
            sessions,
            conversions,
            navigator: Navigator::new(Route::Login),
            history_limit,
            source: &CURRENCIES[0],
            target: &CURRENCIES[1],
        }
    }

    /// Give back the writer.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Run screens until `q` or end of input.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<()> {
        self.navigator = Navigator::new(self.sessions.start_route().await);
        info!(route = %self.navigator.current(), "Terminal started");

        loop {
            let route = self.navigator.current();
            if route.requires_session() && self.sessions.current_user().await.is_none() {
                self.navigator.navigate(Route::Login, PopUpTo::All);
                continue;
            }

            debug!(route = %route, depth = self.navigator.depth(), "Rendering screen");
            let flow = match route {
                Route::Login => self.login_screen().await?,
                Route::Home => self.home_screen().await?,
                Route::Conversion => self.conversion_screen().await?,
                Route::History => self.history_screen().await?,
            };

            if flow == Flow::Quit {
                self.say("Goodbye").await?;
                return Ok(());
            }
        }
    }

    async fn say(&mut self, line: &str) -> Result<()> {
        self.output.write_all(line.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    /// Print `label` and read one line; `None` at end of input.
    async fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        self.output.write_all(label.as_bytes()).await?;
        self.output.flush().await?;
        Ok(self.input.next_line().await?)
    }

    async fn login_screen(&mut self) -> Result<Flow> {
        self.say("== Sign in ==").await?;

        let Some(email) = self.prompt("Email: ").await? else {
            return Ok(Flow::Quit);
        };
        if is_quit(&email) {
            return Ok(Flow::Quit);
        }
        let Some(password) = self.prompt("Password: ").await? else {
            return Ok(Flow::Quit);
        };

        match self.sessions.login(&email, &password).await {
            Ok(user) => {
                let who = user.email.unwrap_or(user.uid);
                self.say(&format!("Signed in as {who}")).await?;
                self.navigator.navigate(Route::Home, PopUpTo::Inclusive(Route::Login));
            }
            Err(e) => self.say(&format!("Error: {e}")).await?,
        }
        Ok(Flow::Continue)
    }

    async fn home_screen(&mut self) -> Result<Flow> {
        let current = self.navigator.current();
        let who = self
            .sessions
            .current_user()
            .await
            .map(|u| u.email.unwrap_or(u.uid))
            .unwrap_or_default();

        self.say(&format!("== Currency Converter == ({who})")).await?;
        for (i, item) in DRAWER_ITEMS.iter().enumerate() {
            let marker = if item.action == MenuAction::Open(current) { "*" } else { " " };
            self.say(&format!("{marker}{}. {}", i + 1, item.title)).await?;
        }

        let Some(line) = self.prompt("> ").await? else {
            return Ok(Flow::Quit);
        };
        if is_quit(&line) {
            return Ok(Flow::Quit);
        }
        if is_back(&line) {
            self.navigator.back();
            return Ok(Flow::Continue);
        }

        let item = line
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| DRAWER_ITEMS.get(i));

        match item.map(|i| i.action) {
            Some(MenuAction::Open(route)) => self.navigator.navigate(route, PopUpTo::Nothing),
            Some(MenuAction::SignOut) => {
                if let Err(e) = self.sessions.logout().await {
                    self.say(&format!("Error: {e}")).await?;
                } else {
                    self.say("Signed out").await?;
                    self.navigator.navigate(Route::Login, PopUpTo::All);
                }
            }
            None => self.say(&format!("Unknown option '{}'", line.trim())).await?,
        }
        Ok(Flow::Continue)
    }

    async fn conversion_screen(&mut self) -> Result<Flow> {
        self.say("== Convert ==").await?;
        for (i, c) in CURRENCIES.iter().enumerate() {
            self.say(&format!("  {}. {c}", i + 1)).await?;
        }

        let Some(amount) = self.prompt("Amount (b to go back): ").await? else {
            return Ok(Flow::Quit);
        };
        if is_quit(&amount) {
            return Ok(Flow::Quit);
        }
        if is_back(&amount) {
            self.navigator.back();
            return Ok(Flow::Continue);
        }

        let label = format!("From [{}]: ", self.source.code);
        let Some(from) = self.prompt(&label).await? else {
            return Ok(Flow::Quit);
        };
        let Some(source) = pick_currency(&from, self.source) else {
            self.say(&format!("Error: unknown currency '{}'", from.trim())).await?;
            return Ok(Flow::Continue);
        };
        self.source = source;

        let label = format!("To [{}]: ", self.target.code);
        let Some(to) = self.prompt(&label).await? else {
            return Ok(Flow::Quit);
        };
        let Some(target) = pick_currency(&to, self.target) else {
            self.say(&format!("Error: unknown currency '{}'", to.trim())).await?;
            return Ok(Flow::Continue);
        };
        self.target = target;

        match self.conversions.convert_input(&amount, source, target).await {
            Ok(outcome) => {
                self.say(&outcome.summary()).await?;
                self.say(&outcome.notice()).await?;
            }
            Err(e) => self.say(&format!("Error: {e}")).await?,
        }
        Ok(Flow::Continue)
    }

    async fn history_screen(&mut self) -> Result<Flow> {
        self.say("== History ==").await?;

        match self.conversions.history(self.history_limit).await {
            Ok(records) if records.is_empty() => self.say("No conversions yet").await?,
            Ok(records) => {
                for record in &records {
                    let when = record
                        .recorded_at()
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    self.say(&format!("{when}  {}", record.summary())).await?;
                }
            }
            Err(e) => self.say(&format!("Error: {e}")).await?,
        }

        let Some(line) = self.prompt("(b to go back) > ").await? else {
            return Ok(Flow::Quit);
        };
        if is_quit(&line) {
            return Ok(Flow::Quit);
        }
        // Any other input returns to the previous screen
        self.navigator.back();
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::LocalAccounts;
    use crate::adapters::local::accounts::password_digest;
    use crate::adapters::metrics::MetricsRegistry;
    use crate::adapters::persistence::LocalDocumentStore;
    use crate::config::AccountConfig;
    use crate::domain::RateTable;

    async fn run_session(dir: &std::path::Path, script: &str) -> String {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let accounts = Arc::new(
            LocalAccounts::from_config(&[AccountConfig {
                email: "demo@example.com".to_string(),
                password_sha256: password_digest("demo1234"),
                uid: None,
            }])
            .unwrap(),
        );
        let store = Arc::new(
            LocalDocumentStore::from_data_dir(dir.to_str().unwrap())
                .await
                .unwrap(),
        );
        let sessions = Arc::new(SessionManager::new(accounts.clone(), 5, metrics.clone()));
        let conversions = Arc::new(ConversionService::new(
            RateTable::default(),
            accounts,
            store,
            "conversions",
            metrics,
        ));

        let mut app = TerminalApp::new(script.as_bytes(), Vec::new(), sessions, conversions, 20);
        app.run().await.unwrap();
        String::from_utf8(app.into_output()).unwrap()
    }

    /// Writer whose peer has gone away.
    struct ClosedOutput;

    impl AsyncWrite for ClosedOutput {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    fn temp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("terminal-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_closed_output_fails_run() {
        let dir = temp_dir();
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let accounts = Arc::new(LocalAccounts::from_config(&[]).unwrap());
        let store = Arc::new(
            LocalDocumentStore::from_data_dir(dir.to_str().unwrap())
                .await
                .unwrap(),
        );
        let sessions = Arc::new(SessionManager::new(accounts.clone(), 5, metrics.clone()));
        let conversions = Arc::new(ConversionService::new(
            RateTable::default(),
            accounts,
            store,
            "conversions",
            metrics,
        ));

        let mut app = TerminalApp::new(&b"q\n"[..], ClosedOutput, sessions, conversions, 20);
        let err = app.run().await.unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::BrokenPipe);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[test]
    fn test_pick_currency() {
        let usd = &CURRENCIES[0];
        assert_eq!(pick_currency("", usd).map(|c| c.code), Some("USD"));
        assert_eq!(pick_currency("3", usd).map(|c| c.code), Some("PEN"));
        assert_eq!(pick_currency("gbp", usd).map(|c| c.code), Some("GBP"));
        assert!(pick_currency("0", usd).is_none());
        assert!(pick_currency("6", usd).is_none());
        assert!(pick_currency("XYZ", usd).is_none());
    }

    #[tokio::test]
    async fn test_failed_login_shows_error() {
        let dir = temp_dir();
        let out = run_session(&dir, "demo@example.com\nwrong\nq\n").await;
        assert!(out.contains("Error: Invalid email or password"));
        assert!(out.ends_with("Goodbye\n"));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_blank_email_rejected() {
        let dir = temp_dir();
        let out = run_session(&dir, "\nsecret\n").await;
        assert!(out.contains("Error: Email must not be blank"));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_convert_then_history() {
        let dir = temp_dir();
        let script = "demo@example.com\ndemo1234\n\
                      2\n100\n\n\n\
                      50\nGBP\n1\n\
                      10\n\n\n\
                      b\n3\n\nq\n";
        let out = run_session(&dir, script).await;

        assert!(out.contains("Signed in as demo@example.com"));
        assert!(out.contains("100.00 USD equals 92.50 EUR"));
        assert!(out.contains("Conversion saved successfully"));
        assert!(out.contains("50.00 GBP equals 63.29 USD"));
        // The last selection is offered as the default
        assert!(out.contains("From [GBP]: To [USD]: 10.00 GBP equals 12.66 USD"));

        let history = &out[out.find("== History ==").unwrap()..];
        assert!(history.contains("  100.00 USD equals 92.50 EUR"));
        assert!(history.contains("  50.00 GBP equals 63.29 USD"));
        assert!(history.contains("  10.00 GBP equals 12.66 USD"));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_invalid_amount_and_sign_out() {
        let dir = temp_dir();
        let script = "demo@example.com\ndemo1234\n\
                      2\n-5\n\n\nb\n\
                      4\n";
        let out = run_session(&dir, script).await;

        assert!(out.contains("Error: Amount may only contain digits and '.', found '-'"));
        assert!(out.contains("Signed out"));
        // End of input on the login screen quits
        assert!(out.ends_with("Goodbye\n"));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
