pub mod attachment_fetcher;
pub mod bot_bypass;
pub mod cloud_api;
pub mod cloud_saver;
pub mod config;
pub mod connector;
pub mod content_hash;
pub mod item_model;
pub mod local_saver;
pub mod save_context;
pub mod save_engine;
pub mod save_progress;
pub mod utils;

pub use attachment_fetcher::{AttachmentFetcher, FetchMethod, FetchedAttachment};
pub use bot_bypass::{BotBypassChain, BypassLevel, BypassStrategy};
pub use cloud_saver::CloudServerSaver;
pub use config::{ApiCredentials, SaveConfig, SaveConfigBuilder};
pub use content_hash::{ContentHasher, md5_hex};
pub use item_model::{Attachment, AttachmentKind, Creator, Item, LinkMode};
pub use local_saver::LocalClientSaver;
pub use save_context::{CookieProvider, PageCapture, ProxyResolver, SaveContext};
pub use save_engine::{
    DestinationCapabilities, SaveCoordinator, SaveDestination, SaveError, SaveOutcome, SaveResult,
    Session,
};
pub use save_progress::{AttachmentProgress, AttachmentProgressSink, ItemsDoneSink, NoOpProgress};

/// Save `items` with a coordinator built from `config` and `context`
///
/// # Errors
///
/// See [`SaveCoordinator::save_items`].
pub async fn save_items(
    config: SaveConfig,
    context: SaveContext,
    items: Vec<Item>,
    session_id: impl Into<String>,
    on_progress: std::sync::Arc<dyn AttachmentProgressSink>,
    on_items_done: std::sync::Arc<dyn ItemsDoneSink>,
) -> SaveResult<Vec<Item>> {
    let coordinator = SaveCoordinator::new(config, context)?;
    coordinator
        .save_items(items, session_id, on_progress, on_items_done)
        .await
}
