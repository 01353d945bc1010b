//! The bot coordinator: poll cycle, valuation cycle, manual triggers.
//!
//! Both cycles run as tokio tasks spawned by [`Bot::start`] and wind down
//! through a shared `watch` stop channel, so a long inter-cycle sleep is
//! interrupted the moment [`Bot::stop`] is called. Each cycle re-reads the
//! settings snapshot at the top of every iteration; a settings update takes
//! effect on the next iteration without a restart.
//!
//! Error boundaries are per unit of work. A failed item fetch skips that
//! item, a failed page skips that page, a failed cycle logs and waits for
//! the next interval. The loops themselves never die.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use torivahti_core::{ItemRecord, OpenAiSettings, Settings};
use torivahti_scraper::{extract_item, extract_item_ids, pages_needed, FetchPolicy, ToriClient};
use torivahti_store::{ItemStore, SettingsStore};
use torivahti_valuer::{PromptBuilder, Valuer};

use crate::error::BotError;

/// Delay between consecutive valuation requests within one pass.
const VALUATION_ITEM_DELAY: Duration = Duration::from_secs(2);
/// How long [`Bot::stop`] waits for each cycle task before detaching it.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Counts from one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Distinct item ids found on the listing page.
    pub ids_seen: usize,
    /// Items that were not in the store before this cycle.
    pub new_items: usize,
}

/// Result of a manual valuation trigger.
#[derive(Debug, Clone)]
pub struct TriggerOutcome {
    pub started: bool,
    pub message: String,
}

/// Result of a manual multi-page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPagesOutcome {
    pub pages_processed: u32,
    pub new_items: usize,
}

pub struct Bot {
    items: Arc<ItemStore>,
    settings: Arc<SettingsStore>,
    client: ToriClient,
    valuer: Valuer,
    prompt: Arc<dyn PromptBuilder>,
    images_dir: PathBuf,
    running: AtomicBool,
    stop_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Bot {
    #[must_use]
    pub fn new(
        items: Arc<ItemStore>,
        settings: Arc<SettingsStore>,
        client: ToriClient,
        valuer: Valuer,
        prompt: Arc<dyn PromptBuilder>,
        images_dir: PathBuf,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            items,
            settings,
            client,
            valuer,
            prompt,
            images_dir,
            running: AtomicBool::new(false),
            stop_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn item_store(&self) -> &Arc<ItemStore> {
        &self.items
    }

    #[must_use]
    pub fn settings_store(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    /// Performs the one-time login bootstrap when credentials are
    /// configured. Failure is logged inside the client and never blocks
    /// startup.
    pub async fn login_if_configured(&self) -> bool {
        let settings = self.settings.snapshot().await;
        self.client
            .login_if_configured(FetchPolicy::from(&settings), &settings.login)
            .await
    }

    /// Starts the poll and valuation tasks. Returns `false` (with a warn)
    /// when already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("bot already running; start ignored");
            return false;
        }
        // send_replace updates the value even when no receiver is alive,
        // which is the normal state after stop() has joined both tasks.
        self.stop_tx.send_replace(false);
        let mut tasks = self.tasks.lock().await;
        tasks.push(tokio::spawn(
            Arc::clone(self).poll_loop(self.stop_tx.subscribe()),
        ));
        tasks.push(tokio::spawn(
            Arc::clone(self).valuation_loop(self.stop_tx.subscribe()),
        ));
        tracing::info!("bot started");
        true
    }

    /// Signals both cycle tasks to stop and waits up to 5 s for each.
    /// A task that overruns the deadline is detached with a warning.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            tracing::warn!("bot not running; stop ignored");
            return;
        }
        self.stop_tx.send_replace(true);
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            match tokio::time::timeout(STOP_JOIN_TIMEOUT, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "bot task panicked"),
                Err(_) => tracing::warn!("bot task did not stop in time; detaching"),
            }
        }
        tracing::info!("bot stopped");
    }

    /// One poll cycle: fetch the listing (optionally an explicit page),
    /// then fetch, extract, and store every id not already known. Known ids
    /// are never re-fetched. Per-item failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`BotError`] only when the listing page itself cannot be
    /// fetched; everything after that is best-effort.
    pub async fn poll_once(&self, page: Option<u32>) -> Result<PollOutcome, BotError> {
        let settings = self.settings.snapshot().await;
        let policy = FetchPolicy::from(&settings);

        let listing = self
            .client
            .fetch_listing_page(policy, &settings.listing_url, page)
            .await?;
        let ids = extract_item_ids(&listing);
        let ids_seen = ids.len();
        tracing::debug!(ids_seen, page = page.unwrap_or(1), "listing page scanned");

        let mut new_items = 0usize;
        for id in ids {
            if self.items.exists(&id).await {
                continue;
            }
            let detail = match self.client.fetch_item_page(policy, &id).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(item_id = %id, error = %e, "item page fetch failed; skipping");
                    continue;
                }
            };
            let mut record = extract_item(&detail, &id);
            if settings.images.download_enabled {
                self.download_item_images(policy, &settings, &mut record)
                    .await;
            }
            if let Err(e) = self.items.upsert(&id, record).await {
                tracing::error!(item_id = %id, error = %e, "failed to persist new item");
                continue;
            }
            new_items += 1;
            tracing::info!(item_id = %id, "new item stored");
        }

        Ok(PollOutcome { ids_seen, new_items })
    }

    /// Fetches enough listing pages to cover `num_products` items, polling
    /// each page sequentially. A failed page is logged and skipped; the
    /// reported page count is the number of pages attempted.
    pub async fn fetch_multiple_pages(&self, num_products: u32) -> FetchPagesOutcome {
        let settings = self.settings.snapshot().await;
        let pages = pages_needed(num_products, settings.products_per_page);
        tracing::info!(num_products, pages, "manual multi-page fetch");

        let mut new_items = 0usize;
        for page in 1..=pages {
            match self.poll_once(Some(page)).await {
                Ok(outcome) => new_items += outcome.new_items,
                Err(e) => tracing::warn!(page, error = %e, "page fetch failed; continuing"),
            }
        }
        FetchPagesOutcome {
            pages_processed: pages,
            new_items,
        }
    }

    /// Kicks off a one-shot valuation pass in the background. Returns
    /// immediately with `started: false` when valuation is disabled.
    pub async fn trigger_valuations(self: &Arc<Self>) -> TriggerOutcome {
        let settings = self.settings.snapshot().await;
        if !settings.openai.is_enabled() {
            return TriggerOutcome {
                started: false,
                message: "OpenAI is not enabled".to_owned(),
            };
        }
        let bot = Arc::clone(self);
        let mut stop_rx = self.stop_tx.subscribe();
        tokio::spawn(async move {
            bot.run_valuation_pass(&settings.openai, &mut stop_rx).await;
        });
        TriggerOutcome {
            started: true,
            message: "Valuation started".to_owned(),
        }
    }

    async fn poll_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        tracing::info!("poll cycle started");
        while self.is_running() {
            if let Err(e) = self.poll_once(None).await {
                tracing::error!(error = %e, "poll cycle failed; will retry next interval");
            }
            let interval = self.settings.snapshot().await.poll_interval_seconds;
            if sleep_or_stop(&mut stop_rx, Duration::from_secs(interval)).await {
                break;
            }
        }
        tracing::info!("poll cycle stopped");
    }

    async fn valuation_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        tracing::info!("valuation cycle started");
        while self.is_running() {
            let settings = self.settings.snapshot().await;
            if settings.openai.is_enabled() {
                self.run_valuation_pass(&settings.openai, &mut stop_rx).await;
            }
            let interval =
                Duration::from_secs(settings.openai.valuation_interval_minutes.saturating_mul(60));
            if sleep_or_stop(&mut stop_rx, interval).await {
                break;
            }
        }
        tracing::info!("valuation cycle stopped");
    }

    /// Values every item that still needs it, one at a time with a fixed
    /// inter-item delay. Interrupted by the stop signal between items.
    async fn run_valuation_pass(
        &self,
        openai: &OpenAiSettings,
        stop_rx: &mut watch::Receiver<bool>,
    ) {
        let pending = self.items.needing_valuation().await;
        if pending.is_empty() {
            return;
        }
        tracing::info!(count = pending.len(), "valuation pass starting");

        for (id, snapshot) in pending {
            if *stop_rx.borrow() {
                tracing::info!("valuation pass interrupted by stop");
                break;
            }
            let Some(result) = self
                .valuer
                .valuate(&snapshot, openai, self.prompt.as_ref())
                .await
            else {
                // Disabled mid-pass by a settings update.
                break;
            };

            // Re-read in case the poll cycle touched the record meanwhile.
            let mut record = self.items.get(&id).await.unwrap_or(snapshot);
            record.valuation = Some(result);
            record.updated_at = Utc::now();
            if let Err(e) = self.items.upsert(&id, record).await {
                tracing::error!(item_id = %id, error = %e, "failed to persist valuation");
            }

            if sleep_or_stop(stop_rx, VALUATION_ITEM_DELAY).await {
                tracing::info!("valuation pass interrupted by stop");
                break;
            }
        }
    }

    /// Downloads up to `max_images_per_item` of the record's image URLs
    /// into the images directory as `{id}_{idx}.{ext}`. A failed download
    /// logs a warning and leaves that slot out of `image_files`.
    async fn download_item_images(
        &self,
        policy: FetchPolicy,
        settings: &Settings,
        record: &mut ItemRecord,
    ) {
        let urls: Vec<String> = record
            .images
            .iter()
            .take(settings.images.max_images_per_item)
            .cloned()
            .collect();
        for (idx, url) in urls.iter().enumerate() {
            let filename = format!("{}_{}.{}", record.id, idx, image_extension(url));
            let path = self.images_dir.join(&filename);
            match self.client.download_image(policy, url, &path).await {
                Ok(()) => record.image_files.push(filename),
                Err(e) => {
                    tracing::warn!(item_id = %record.id, url = %url, error = %e, "image download failed");
                }
            }
        }
    }
}

/// Waits for `duration` unless the stop signal fires first. Returns `true`
/// when the caller should stop.
async fn sleep_or_stop(stop_rx: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        () = tokio::time::sleep(duration) => false,
        changed = stop_rx.changed() => changed.is_err() || *stop_rx.borrow(),
    }
}

/// Local file extension for an image URL; unknown extensions normalise to
/// `jpg`.
fn image_extension(url: &str) -> String {
    let path = url.split('?').next().unwrap_or(url);
    match path.rsplit('.').next().map(str::to_ascii_lowercase) {
        Some(ext) if matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "webp") => ext,
        _ => "jpg".to_owned(),
    }
}
