use std::time::Duration;

use miette::{miette, Context, IntoDiagnostic, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::types::ResourceRecord;

/// Records fetched per listing request.
const PAGE_LIMIT: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Interface for the remote store holding the resource records
pub trait RecordStore {
    /// Fetch the full record set of the collection.
    ///
    /// The whole set is materialized up front: a store that cannot be
    /// listed aborts the run before any record is touched.
    fn fetch_all_records(&self) -> Result<Vec<ResourceRecord>>;
}

/// Connection settings of the record store, gathered at startup.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub token: String,
    pub collection: String,
}

/// [`RecordStore`] reading an authenticated, paginated JSON listing.
pub struct HttpRecordStore {
    client: Client,
    config: StoreConfig,
}

/// One page of the store's record listing.
#[derive(Debug, Deserialize)]
struct RecordPage {
    items: Vec<ResourceRecord>,
    total: usize,
}

impl HttpRecordStore {
    /// Validate the settings and build the HTTP client.
    pub fn new(config: StoreConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(miette!("The record store URL is empty"));
        }
        if config.token.trim().is_empty() {
            return Err(miette!("The record store token is empty"));
        }
        if config.collection.trim().is_empty() {
            return Err(miette!("The record store collection is empty"));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .into_diagnostic()
            .wrap_err("Could not build the HTTP client")?;

        Ok(Self { client, config })
    }

    fn fetch_page(&self, offset: usize) -> Result<RecordPage> {
        let url = format!(
            "{}/collections/{}/records",
            self.config.base_url.trim_end_matches('/'),
            self.config.collection
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .query(&[("offset", offset.to_string()), ("limit", PAGE_LIMIT.to_string())])
            .send()
            .into_diagnostic()
            .wrap_err("The record store is unreachable")?;

        let response = response
            .error_for_status()
            .into_diagnostic()
            .wrap_err("The record store refused the listing request")?;

        response
            .json()
            .into_diagnostic()
            .wrap_err("Could not parse the record listing")
    }
}

impl RecordStore for HttpRecordStore {
    fn fetch_all_records(&self) -> Result<Vec<ResourceRecord>> {
        let mut records = Vec::new();

        loop {
            let page = self.fetch_page(records.len())?;
            debug!(
                "Fetched a page of {} records ({} reported in total)",
                page.items.len(),
                page.total
            );

            // Guard against a server that keeps reporting more than it serves
            let exhausted = page.items.len() < PAGE_LIMIT;
            records.extend(page.items);

            if exhausted || records.len() >= page.total {
                break;
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn listing_page_deserializes_with_camel_case_records() {
        let json = indoc! {r#"
            {
                "items": [
                    {
                        "id": "r1",
                        "title": "First",
                        "videoUrl": "https://host/a",
                        "author": "Someone",
                        "startTime": "10"
                    },
                    {
                        "id": "r2",
                        "title": "Second",
                        "videoUrl": "https://host/b"
                    }
                ],
                "total": 2
            }
        "#};

        let page: RecordPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].start_time.as_deref(), Some("10"));
        assert_eq!(page.items[1].author, None);
    }

    #[test]
    fn empty_settings_are_rejected() {
        let config = |base_url: &str, token: &str, collection: &str| StoreConfig {
            base_url: base_url.to_owned(),
            token: token.to_owned(),
            collection: collection.to_owned(),
        };

        assert!(HttpRecordStore::new(config("", "t", "c")).is_err());
        assert!(HttpRecordStore::new(config("https://store", " ", "c")).is_err());
        assert!(HttpRecordStore::new(config("https://store", "t", "")).is_err());
        assert!(HttpRecordStore::new(config("https://store", "t", "c")).is_ok());
    }
}
