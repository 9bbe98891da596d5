use std::time::Duration;

use tracing::{error, info, warn};

use crate::dedup::DedupTracker;
use crate::matcher::KeywordMatcher;
use crate::notifier::{format_alert, Notify};
use crate::twitter::{Post, PostSource};

/// A tracked account after successful handle resolution.
#[derive(Debug, Clone)]
pub struct Account {
    pub handle: String,
    pub user_id: String,
}

/// Resolve all configured handles once at startup. Handles that fail are
/// logged and dropped for the rest of the run; they are not retried.
pub async fn resolve_accounts<S: PostSource>(source: &S, handles: &[String]) -> Vec<Account> {
    let mut accounts = Vec::with_capacity(handles.len());
    for handle in handles {
        let handle = handle.trim_start_matches('@').to_string();
        match source.resolve(&handle).await {
            Ok(user_id) => {
                info!("Resolved @{} to user id {}", handle, user_id);
                accounts.push(Account { handle, user_id });
            }
            Err(e) => {
                error!("Skipping @{} (resolution failed: {})", handle, e);
            }
        }
    }
    accounts
}

/// Pick the post to consider this cycle: among the matching ones, the
/// lexicographically greatest id. The API does not guarantee order, and
/// string comparison is a deliberate proxy for recency (ids of equal
/// length sort chronologically; "9" beats "10").
pub fn newest_match<'a>(posts: &'a [Post], matcher: &KeywordMatcher) -> Option<&'a Post> {
    posts
        .iter()
        .filter(|p| matcher.matches(&p.text))
        .max_by(|a, b| a.id.cmp(&b.id))
}

/// The orchestrating loop: fetch -> match -> dedup -> notify per account,
/// then sleep a fixed interval, forever.
pub struct Watcher<S, N> {
    source: S,
    notifier: N,
    matcher: KeywordMatcher,
    dedup: DedupTracker,
    accounts: Vec<Account>,
    poll_interval: Duration,
}

impl<S: PostSource, N: Notify> Watcher<S, N> {
    pub fn new(
        source: S,
        notifier: N,
        matcher: KeywordMatcher,
        accounts: Vec<Account>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            notifier,
            matcher,
            dedup: DedupTracker::new(),
            accounts,
            poll_interval,
        }
    }

    /// Runs until the process is killed; the Ok branch is never reached.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(
            "Watching {} accounts every {:?}",
            self.accounts.len(),
            self.poll_interval
        );
        loop {
            self.run_cycle().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One pass over all accounts in fixed order. Each account's fetch
    /// carries its own bounded retry, so a rate-limited account delays a
    /// cycle by at most the retry budget and never starves the others.
    pub async fn run_cycle(&mut self) {
        for account in &self.accounts {
            let posts = self.source.fetch_recent(&account.user_id).await;
            let Some(post) = newest_match(&posts, &self.matcher) else {
                continue;
            };
            if !self.dedup.is_new(&account.handle, &post.id) {
                continue;
            }
            let alert = format_alert(&account.handle, post);
            if let Err(e) = self.notifier.send_text(&alert).await {
                warn!(
                    "Delivery failed for @{} post {}: {:#}",
                    account.handle, post.id, e
                );
            }
            // Marked even when delivery failed: a dead Telegram API must
            // not make every later cycle re-send the same post.
            self.dedup.mark_notified(&account.handle, &post.id);
            info!("New post from @{} ({})", account.handle, post.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::PhotoSource;
    use crate::twitter::SourceError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct StubSource {
        ids: HashMap<String, String>,
        posts: Mutex<HashMap<String, Vec<Post>>>,
    }

    impl StubSource {
        fn new() -> Self {
            Self {
                ids: HashMap::new(),
                posts: Mutex::new(HashMap::new()),
            }
        }

        fn with_account(mut self, handle: &str, user_id: &str) -> Self {
            self.ids.insert(handle.to_string(), user_id.to_string());
            self
        }

        fn set_posts(&self, user_id: &str, posts: Vec<Post>) {
            self.posts
                .lock()
                .unwrap()
                .insert(user_id.to_string(), posts);
        }
    }

    #[async_trait]
    impl PostSource for StubSource {
        async fn resolve(&self, handle: &str) -> Result<String, SourceError> {
            self.ids.get(handle).cloned().ok_or(SourceError::NotFound)
        }

        async fn fetch_recent(&self, user_id: &str) -> Vec<Post> {
            self.posts
                .lock()
                .unwrap()
                .get(user_id)
                .cloned()
                .unwrap_or_default()
        }
    }

    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notify for RecordingNotifier {
        async fn send_text(&self, html_text: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(html_text.to_string());
            if self.fail {
                anyhow::bail!("telegram is down");
            }
            Ok(())
        }

        async fn send_photo(&self, _photo: &PhotoSource, _caption: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn post(id: &str, text: &str) -> Post {
        Post {
            id: id.to_string(),
            text: text.to_string(),
            created_at: None,
        }
    }

    fn matcher(keywords: &[&str]) -> KeywordMatcher {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();
        KeywordMatcher::new(&keywords).unwrap()
    }

    fn coindesk_watcher(
        source: StubSource,
        notifier: RecordingNotifier,
    ) -> Watcher<StubSource, RecordingNotifier> {
        Watcher::new(
            source,
            notifier,
            matcher(&["bitcoin"]),
            vec![Account {
                handle: "CoinDesk".to_string(),
                user_id: "1334".to_string(),
            }],
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_newest_match_is_lexicographic_max() {
        let posts = vec![
            post("5", "bitcoin up"),
            post("10", "bitcoin down"),
            post("9", "bitcoin sideways"),
        ];
        // String comparison, not numeric: "9" > "10".
        let selected = newest_match(&posts, &matcher(&["bitcoin"])).unwrap();
        assert_eq!(selected.id, "9");
    }

    #[test]
    fn test_newest_match_ignores_non_matching() {
        let posts = vec![post("8", "ethereum news"), post("3", "bitcoin news")];
        let selected = newest_match(&posts, &matcher(&["bitcoin"])).unwrap();
        assert_eq!(selected.id, "3");
        assert!(newest_match(&posts, &matcher(&["solana"])).is_none());
    }

    #[tokio::test]
    async fn test_resolve_accounts_skips_failures() {
        let source = StubSource::new().with_account("CoinDesk", "1334");
        let handles = vec!["@CoinDesk".to_string(), "@NoSuchAccount".to_string()];
        let accounts = resolve_accounts(&source, &handles).await;
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].handle, "CoinDesk");
        assert_eq!(accounts[0].user_id, "1334");
    }

    #[tokio::test]
    async fn test_first_cycle_notifies_and_records() {
        let source = StubSource::new().with_account("CoinDesk", "1334");
        source.set_posts("1334", vec![post("100", "Bitcoin just in: breaking update")]);
        let mut watcher = coindesk_watcher(source, RecordingNotifier::new());

        watcher.run_cycle().await;

        let sent = watcher.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("CoinDesk"));
        assert!(sent[0].contains("https://twitter.com/CoinDesk/status/100"));
        assert!(!watcher.dedup.is_new("CoinDesk", "100"));
    }

    #[tokio::test]
    async fn test_second_cycle_same_post_sends_nothing() {
        let source = StubSource::new().with_account("CoinDesk", "1334");
        source.set_posts("1334", vec![post("100", "Bitcoin just in: breaking update")]);
        let mut watcher = coindesk_watcher(source, RecordingNotifier::new());

        watcher.run_cycle().await;
        watcher.run_cycle().await;

        assert_eq!(watcher.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_non_matching_posts_never_notify() {
        let source = StubSource::new().with_account("CoinDesk", "1334");
        source.set_posts("1334", vec![post("100", "ethereum merge anniversary")]);
        let mut watcher = coindesk_watcher(source, RecordingNotifier::new());

        watcher.run_cycle().await;

        assert!(watcher.notifier.sent().is_empty());
        assert!(watcher.dedup.is_new("CoinDesk", "100"));
    }

    #[tokio::test]
    async fn test_delivery_failure_still_marks_notified() {
        let source = StubSource::new().with_account("CoinDesk", "1334");
        source.set_posts("1334", vec![post("100", "bitcoin dips")]);
        let mut watcher = coindesk_watcher(source, RecordingNotifier::failing());

        watcher.run_cycle().await;
        watcher.run_cycle().await;

        // One attempt, then the post is considered handled.
        assert_eq!(watcher.notifier.sent().len(), 1);
        assert!(!watcher.dedup.is_new("CoinDesk", "100"));
    }

    #[tokio::test]
    async fn test_stale_match_in_batch_is_superseded() {
        let source = StubSource::new().with_account("CoinDesk", "1334");
        source.set_posts(
            "1334",
            vec![post("200", "bitcoin spikes"), post("150", "bitcoin dips")],
        );
        let mut watcher = coindesk_watcher(source, RecordingNotifier::new());

        watcher.run_cycle().await;

        // Only the newest match goes out; the stale one is dropped, and
        // the dedup marker points at the newest id.
        let sent = watcher.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("/status/200"));
        assert!(!watcher.dedup.is_new("CoinDesk", "200"));
    }
}
