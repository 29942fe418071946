use crate::enrichment::{cache_key, CacheEntry, EnrichmentCache, EnrichmentProvider, EnrichmentType};
use crate::error::ProviderError;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(86_400);
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Typed provider response for one [`EnrichmentType`].
pub trait EnrichmentResult: Serialize + DeserializeOwned + Send {
    const TYPE: EnrichmentType;

    /// Value returned whenever the provider cannot supply one.
    fn fallback() -> Self;

    /// Brings a decoded response into range.
    fn normalize(self) -> Self {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub industry: String,
    pub size: String,
    pub confidence: f64,
}

impl EnrichmentResult for CompanyProfile {
    const TYPE: EnrichmentType = EnrichmentType::CompanyInfo;

    fn fallback() -> Self {
        Self {
            industry: "Unknown".to_string(),
            size: "Unknown".to_string(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSuggestion {
    pub email: Option<String>,
    pub confidence: f64,
}

impl EnrichmentResult for EmailSuggestion {
    const TYPE: EnrichmentType = EnrichmentType::EmailCompletion;

    fn fallback() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneSuggestion {
    pub phone: Option<String>,
}

impl EnrichmentResult for PhoneSuggestion {
    const TYPE: EnrichmentType = EnrichmentType::PhoneCompletion;

    fn fallback() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadScore {
    pub score: f64,
}

impl LeadScore {
    pub const MAX: f64 = 100.0;
}

impl EnrichmentResult for LeadScore {
    const TYPE: EnrichmentType = EnrichmentType::LeadScore;

    fn fallback() -> Self {
        Self::default()
    }

    /// Whole number in `0..=100`; NaN scores count as zero.
    fn normalize(self) -> Self {
        let score = if self.score.is_nan() {
            0.0
        } else {
            self.score.round().clamp(0.0, Self::MAX)
        };
        Self { score }
    }
}

/// Enrichment result plus whether it was served from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched<T> {
    pub value: T,
    pub cached: bool,
}

impl<T: EnrichmentResult> Enriched<T> {
    fn fallback() -> Self {
        Self {
            value: T::fallback(),
            cached: false,
        }
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Cache-then-provider lookup shared by the networked `AI_*` functions.
///
/// Provider failures never escape: they are logged and replaced by the
/// result type's fallback, which is not cached.
#[derive(Clone)]
pub struct EnrichmentService {
    cache: Arc<dyn EnrichmentCache>,
    provider: Arc<dyn EnrichmentProvider>,
    ttl: Duration,
    timeout: Duration,
}

impl EnrichmentService {
    pub fn new(cache: Arc<dyn EnrichmentCache>, provider: Arc<dyn EnrichmentProvider>) -> Self {
        Self {
            cache,
            provider,
            ttl: DEFAULT_CACHE_TTL,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn enrich<T: EnrichmentResult>(&self, input: serde_json::Value) -> Enriched<T> {
        let key = cache_key(T::TYPE, &input);

        if let Some(entry) = self.cache.get(&key).await {
            match serde_json::from_value::<T>(entry.result) {
                Ok(value) => {
                    debug!("Cache hit for {} enrichment {}", T::TYPE, key);
                    return Enriched {
                        value: value.normalize(),
                        cached: true,
                    };
                }
                Err(e) => warn!("Ignoring undecodable cache entry {}: {}", key, e),
            }
        }

        let value = match self.fetch::<T>(&input).await {
            Ok(value) => value.normalize(),
            Err(e) => {
                warn!("{} enrichment failed, using fallback: {}", T::TYPE, e);
                return Enriched::fallback();
            }
        };

        match serde_json::to_value(&value) {
            Ok(result) => {
                let entry = CacheEntry::new(key, T::TYPE, input, result);
                self.cache.upsert(entry, self.ttl).await;
            }
            Err(e) => warn!("Not caching {} enrichment: {}", T::TYPE, e),
        }

        Enriched {
            value,
            cached: false,
        }
    }

    async fn fetch<T: EnrichmentResult>(&self, input: &serde_json::Value) -> Result<T, ProviderError> {
        let response = tokio::time::timeout(self.timeout, self.provider.enrich(T::TYPE, input))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))??;
        serde_json::from_value(response).map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    pub async fn company_info(&self, name: &str) -> Enriched<CompanyProfile> {
        if is_blank(name) {
            return Enriched::fallback();
        }
        self.enrich(json!({ "name": name.trim() })).await
    }

    /// Needs all three parts; a missing one returns the empty suggestion.
    pub async fn complete_email(
        &self,
        first_name: &str,
        last_name: &str,
        domain: &str,
    ) -> Enriched<EmailSuggestion> {
        if [first_name, last_name, domain].into_iter().any(is_blank) {
            return Enriched::fallback();
        }
        self.enrich(json!({
            "firstName": first_name.trim(),
            "lastName": last_name.trim(),
            "domain": domain.trim(),
        }))
        .await
    }

    /// Needs at least one name part.
    pub async fn complete_phone(
        &self,
        first_name: &str,
        last_name: &str,
        company: &str,
    ) -> Enriched<PhoneSuggestion> {
        if is_blank(first_name) && is_blank(last_name) {
            return Enriched::fallback();
        }
        self.enrich(json!({
            "firstName": first_name.trim(),
            "lastName": last_name.trim(),
            "company": company.trim(),
        }))
        .await
    }

    /// Scores a whole record. Records without any fields score zero.
    pub async fn lead_score(&self, record: serde_json::Value) -> Enriched<LeadScore> {
        let has_fields = match &record {
            serde_json::Value::Object(fields) => !fields.is_empty(),
            serde_json::Value::Null => false,
            _ => true,
        };
        if !has_fields {
            return Enriched::fallback();
        }
        self.enrich(json!({ "record": record })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::{MemoryCache, UnavailableProvider};
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider answering every request with a fixed response.
    struct MockProvider {
        response: Result<serde_json::Value, u16>,
        delay: Duration,
        calls: AtomicUsize,
        inputs: Mutex<Vec<(EnrichmentType, serde_json::Value)>>,
    }

    impl MockProvider {
        fn answering(response: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(response),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                inputs: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                response: Err(status),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                inputs: Mutex::new(Vec::new()),
            })
        }

        fn stalled(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(json!({})),
                delay,
                calls: AtomicUsize::new(0),
                inputs: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EnrichmentProvider for MockProvider {
        fn enrich<'a>(
            &'a self,
            enrichment_type: EnrichmentType,
            input: &'a serde_json::Value,
        ) -> BoxFuture<'a, Result<serde_json::Value, ProviderError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.inputs
                    .lock()
                    .unwrap()
                    .push((enrichment_type, input.clone()));
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.response.clone().map_err(ProviderError::Status)
            }
            .boxed()
        }
    }

    fn build_service(provider: Arc<MockProvider>) -> (EnrichmentService, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new(16));
        (EnrichmentService::new(cache.clone(), provider), cache)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let provider = MockProvider::answering(json!({
            "industry": "Software", "size": "51-200", "confidence": 0.8
        }));
        let (service, cache) = build_service(provider.clone());

        let first = service.company_info("Acme").await;
        assert!(!first.cached);
        assert_eq!(first.value.industry, "Software");
        assert_eq!(first.value.size, "51-200");
        assert_eq!(cache.len(), 1);
        let key = cache_key(EnrichmentType::CompanyInfo, &json!({"name": "Acme"}));
        let entry = cache.get(&key).await.unwrap();
        assert_eq!(entry.enrichment_type, EnrichmentType::CompanyInfo);
        assert_eq!(entry.input, json!({"name": "Acme"}));

        let second = service.company_info("Acme").await;
        assert!(second.cached);
        assert_eq!(second.value, first.value);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_yields_uncached_fallback() {
        let provider = MockProvider::failing(503);
        let (service, cache) = build_service(provider.clone());

        let result = service.company_info("Acme").await;
        assert_eq!(result.value, CompanyProfile::fallback());
        assert_eq!(result.value.industry, "Unknown");
        assert!(!result.cached);
        assert!(cache.is_empty());

        service.company_info("Acme").await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_stalled_provider_times_out() {
        let provider = MockProvider::stalled(Duration::from_secs(30));
        let (service, _cache) = build_service(provider);
        let service = service.with_timeout(Duration::from_millis(20));

        let result = service.complete_phone("Jane", "Doe", "Acme").await;
        assert_eq!(result.value, PhoneSuggestion { phone: None });
    }

    #[tokio::test]
    async fn test_zero_ttl_never_serves_from_cache() {
        let provider = MockProvider::answering(json!({"email": "jane@acme.com", "confidence": 0.7}));
        let (service, _cache) = build_service(provider.clone());
        let service = service.with_ttl(Duration::ZERO);

        let first = service.complete_email("Jane", "Doe", "acme.com").await;
        let second = service.complete_email("Jane", "Doe", "acme.com").await;
        assert_eq!(first.value.email.as_deref(), Some("jane@acme.com"));
        assert!(!second.cached);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_blank_inputs_skip_the_provider() {
        let provider = MockProvider::answering(json!({"score": 50}));
        let (service, _cache) = build_service(provider.clone());

        assert_eq!(service.company_info("  ").await.value, CompanyProfile::fallback());
        assert_eq!(
            service.complete_email("Jane", "", "acme.com").await.value,
            EmailSuggestion::fallback()
        );
        assert_eq!(
            service.complete_phone("", " ", "Acme").await.value,
            PhoneSuggestion::fallback()
        );
        assert_eq!(service.lead_score(json!({})).await.value.score, 0.0);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_shapes() {
        let provider = MockProvider::answering(json!({}));
        let (service, _cache) = build_service(provider.clone());

        service.complete_email(" Jane ", "Doe", "acme.com").await;
        service.lead_score(json!({"title": "CTO"})).await;

        let inputs = provider.inputs.lock().unwrap().clone();
        assert_eq!(
            inputs,
            vec![
                (
                    EnrichmentType::EmailCompletion,
                    json!({"firstName": "Jane", "lastName": "Doe", "domain": "acme.com"})
                ),
                (EnrichmentType::LeadScore, json!({"record": {"title": "CTO"}})),
            ]
        );
    }

    #[tokio::test]
    async fn test_lead_score_is_clamped() {
        let (service, _cache) = build_service(MockProvider::answering(json!({"score": 250.4})));
        assert_eq!(service.lead_score(json!({"a": 1})).await.value.score, 100.0);

        let (service, _cache) = build_service(MockProvider::answering(json!({"score": 41.6})));
        assert_eq!(service.lead_score(json!({"a": 1})).await.value.score, 42.0);
    }

    #[tokio::test]
    async fn test_malformed_response_falls_back() {
        let (service, cache) = build_service(MockProvider::answering(json!({"industry": 42})));
        let result = service.company_info("Acme").await;
        assert_eq!(result.value, CompanyProfile::fallback());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_provider_degrades() {
        let service = EnrichmentService::new(
            Arc::new(MemoryCache::new(4)),
            Arc::new(UnavailableProvider),
        );
        let result = service.lead_score(json!({"title": "CTO"})).await;
        assert_eq!(result.value.score, 0.0);
        assert!(!result.cached);
    }
}
