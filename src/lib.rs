pub mod api;
pub mod config;
pub mod db;
pub mod notifications;
pub mod tags;
pub mod utils;

pub use db::DbPool;

use config::Config;
use notifications::OwnerNotifier;
use tags::TagGenerator;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tags: TagGenerator,
    pub notifier: OwnerNotifier,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let http = reqwest::Client::new();
        let tags = TagGenerator::new(config.llm.clone(), http.clone());
        let notifier = OwnerNotifier::new(config.notify.clone(), http);
        Self {
            config,
            db,
            tags,
            notifier,
        }
    }
}
