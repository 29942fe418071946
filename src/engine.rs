use crate::ast::{ASTNode, Context, Evaluator, Parser, Value};
use crate::config::EngineConfig;
use crate::enrichment::{
    EnrichmentCache, EnrichmentProvider, EnrichmentService, HttpEnrichmentProvider, MemoryCache,
    UnavailableProvider,
};
use crate::error::FormulaError;
use crate::functions::register_functions;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of [`FormulaEngine::validate_formula`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl ToString) -> Self {
        Self {
            valid: false,
            error: Some(error.to_string()),
        }
    }
}

/// Parser, evaluator and enrichment ports wired together.
#[derive(Clone)]
pub struct FormulaEngine {
    evaluator: Evaluator,
    enrichment: Arc<EnrichmentService>,
    config: EngineConfig,
}

impl FormulaEngine {
    /// Engine with an in-memory cache and, when `config.provider_url` is set,
    /// an HTTP enrichment provider.
    pub fn new(config: EngineConfig) -> Self {
        let cache = Arc::new(MemoryCache::new(config.cache_capacity));
        let provider: Arc<dyn EnrichmentProvider> = match &config.provider_url {
            Some(url) => match HttpEnrichmentProvider::new(url.as_str(), config.api_key.clone()) {
                Ok(provider) => Arc::new(provider),
                Err(e) => {
                    warn!("Enrichment provider unavailable: {}", e);
                    Arc::new(UnavailableProvider)
                }
            },
            None => Arc::new(UnavailableProvider),
        };
        Self::with_ports(cache, provider, config)
    }

    /// Engine that never contacts an enrichment provider.
    pub fn offline() -> Self {
        Self::new(EngineConfig::offline())
    }

    pub fn with_ports(
        cache: Arc<dyn EnrichmentCache>,
        provider: Arc<dyn EnrichmentProvider>,
        config: EngineConfig,
    ) -> Self {
        let enrichment = Arc::new(
            EnrichmentService::new(cache, provider)
                .with_ttl(config.cache_ttl)
                .with_timeout(config.provider_timeout),
        );
        let evaluator = Evaluator::new(register_functions(enrichment.clone()));
        info!(
            "Formula engine ready with {} functions (provider: {})",
            evaluator.functions().len(),
            config.provider_url.as_deref().unwrap_or("none")
        );
        Self {
            evaluator,
            enrichment,
            config,
        }
    }

    pub async fn evaluate_formula(
        &self,
        formula: &str,
        context: &Context,
    ) -> Result<Value, FormulaError> {
        self.evaluator.evaluate_formula(formula, context).await
    }

    /// Evaluates an already parsed formula.
    pub async fn evaluate_ast(
        &self,
        ast: &ASTNode,
        context: &Context,
    ) -> Result<Value, FormulaError> {
        Ok(self.evaluator.evaluate(ast, context).await?)
    }

    pub async fn evaluate_batch(
        &self,
        ast: &ASTNode,
        contexts: &[Context],
    ) -> Vec<Result<Value, FormulaError>> {
        self.evaluator
            .evaluate_batch(ast, contexts)
            .await
            .into_iter()
            .map(|result| result.map_err(FormulaError::from))
            .collect()
    }

    /// Checks that `formula` parses. Nothing is evaluated and unknown
    /// function names are not reported.
    pub fn validate_formula(&self, formula: &str) -> Validation {
        match Parser::parse_formula(formula) {
            Ok(_) => Validation::ok(),
            Err(e) => Validation::invalid(e),
        }
    }

    pub fn enrichment(&self) -> &EnrichmentService {
        &self.enrichment
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
