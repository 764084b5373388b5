use crate::types::{CuratorError, Result};
use std::env;

/// Base URL + API key pair for a simple authenticated HTTP capability.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub base_url: String,
    pub api_key: String,
}

/// Connection details for the external summarization capability.
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Connection details for the signed social-API fetch.
#[derive(Debug, Clone)]
pub struct SocialConfig {
    pub base_url: String,
    pub signing_secret: String,
    pub user_id: String,
}

/// Runtime configuration assembled from the environment. Only the database
/// URL is mandatory; each capability block is optional and the operation
/// that needs a missing one fails with a configuration error, immediately
/// and without retry.
#[derive(Debug, Clone)]
pub struct CuratorConfig {
    pub database_url: String,
    pub scraper: Option<ApiCredentials>,
    pub search: Option<ApiCredentials>,
    pub summarizer: Option<SummarizerConfig>,
    pub social: Option<SocialConfig>,
    pub admin_token: Option<String>,
}

impl CuratorConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| CuratorError::Config("DATABASE_URL is not set".to_string()))?;

        let scraper = match (env::var("SCRAPER_API_URL"), env::var("SCRAPER_API_KEY")) {
            (Ok(base_url), Ok(api_key)) => Some(ApiCredentials { base_url, api_key }),
            _ => None,
        };

        let search = match (env::var("SEARCH_API_URL"), env::var("SEARCH_API_KEY")) {
            (Ok(base_url), Ok(api_key)) => Some(ApiCredentials { base_url, api_key }),
            _ => None,
        };

        let summarizer = match (
            env::var("SUMMARIZER_API_URL"),
            env::var("SUMMARIZER_API_KEY"),
        ) {
            (Ok(base_url), Ok(api_key)) => Some(SummarizerConfig {
                base_url,
                api_key,
                model: env::var("SUMMARIZER_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            }),
            _ => None,
        };

        let social = match (
            env::var("SOCIAL_API_URL"),
            env::var("SOCIAL_SIGNING_SECRET"),
            env::var("SOCIAL_USER_ID"),
        ) {
            (Ok(base_url), Ok(signing_secret), Ok(user_id)) => Some(SocialConfig {
                base_url,
                signing_secret,
                user_id,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            scraper,
            search,
            summarizer,
            social,
            admin_token: env::var("CURATOR_ADMIN_TOKEN").ok(),
        })
    }

    pub fn require_scraper(&self) -> Result<&ApiCredentials> {
        self.scraper
            .as_ref()
            .ok_or_else(|| CuratorError::Config("scrape capability is not configured".to_string()))
    }

    pub fn require_search(&self) -> Result<&ApiCredentials> {
        self.search
            .as_ref()
            .ok_or_else(|| CuratorError::Config("search capability is not configured".to_string()))
    }

    pub fn require_summarizer(&self) -> Result<&SummarizerConfig> {
        self.summarizer.as_ref().ok_or_else(|| {
            CuratorError::Config("summarize capability is not configured".to_string())
        })
    }

    pub fn require_social(&self) -> Result<&SocialConfig> {
        self.social.as_ref().ok_or_else(|| {
            CuratorError::Config("social fetch capability is not configured".to_string())
        })
    }
}
