use crate::enrichment::EnrichmentType;
use crate::error::ProviderError;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use log::debug;

/// Remote source of enrichment data, one endpoint per [`EnrichmentType`].
pub trait EnrichmentProvider: Send + Sync {
    fn enrich<'a>(
        &'a self,
        enrichment_type: EnrichmentType,
        input: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value, ProviderError>>;
}

/// Provider reached over HTTP: `POST {base_url}/{endpoint}` with the input as
/// a JSON body, answered by the typed result as JSON.
#[derive(Debug, Clone)]
pub struct HttpEnrichmentProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpEnrichmentProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub fn url_for(&self, enrichment_type: EnrichmentType) -> String {
        format!("{}/{}", self.base_url, enrichment_type.endpoint())
    }

    async fn post(
        &self,
        enrichment_type: EnrichmentType,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = self.url_for(enrichment_type);
        debug!("Requesting {} enrichment from {}", enrichment_type, url);

        let mut request = self.client.post(&url).json(input);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

impl EnrichmentProvider for HttpEnrichmentProvider {
    fn enrich<'a>(
        &'a self,
        enrichment_type: EnrichmentType,
        input: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value, ProviderError>> {
        self.post(enrichment_type, input).boxed()
    }
}

/// Provider used when no endpoint is configured. Every request fails, so
/// networked formula functions return their fallbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProvider;

impl EnrichmentProvider for UnavailableProvider {
    fn enrich<'a>(
        &'a self,
        _enrichment_type: EnrichmentType,
        _input: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<serde_json::Value, ProviderError>> {
        async { Err(ProviderError::NotConfigured) }.boxed()
    }
}
