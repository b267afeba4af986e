use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;

use crate::{
    config::AppConfig,
    openai::OpenAiClient,
    pipeline::ImageRequestPipeline,
    quote::QuoteRequestHandler,
    services::{ImageService, QuoteService},
    store::LocalDocumentStore,
};

pub struct AppState {
    pub pipeline: ImageRequestPipeline,
    pub quotes: QuoteRequestHandler,
    pub images: ImageService<LocalDocumentStore>,
    pub favorites: QuoteService<LocalDocumentStore>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Arc<Self>> {
        let http = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        let provider = OpenAiClient::new(http.clone(), config);
        let store = Arc::new(LocalDocumentStore::new(config.data_dir.clone()));

        Ok(Arc::new(Self {
            pipeline: ImageRequestPipeline::new(
                provider.clone(),
                http,
                config.generation_timeout,
                config.fetch_timeout,
            ),
            quotes: QuoteRequestHandler::new(provider, config.generation_timeout),
            images: ImageService::new(store.clone()),
            favorites: QuoteService::new(store),
        }))
    }
}
