//! `AI_*` formula functions.
//!
//! The first five consult the [`EnrichmentService`] and degrade to fallback
//! values when the provider is unavailable. The rest are local heuristics,
//! registered as async functions like the networked ones.

use crate::ast::{Context, FunctionRegistry, Value};
use crate::enrichment::EnrichmentService;
use crate::error::EvalError;
use calcfield_macros::formula_fn;
use futures_util::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

pub fn register(registry: &mut FunctionRegistry, service: Arc<EnrichmentService>) {
    register_enrichment(registry, "AI_DETECT_COMPANY", &service, detect_company);
    register_enrichment(registry, "AI_COMPANY_SIZE", &service, company_size);
    register_enrichment(registry, "AI_COMPLETE_EMAIL", &service, complete_email);
    register_enrichment(registry, "AI_COMPLETE_PHONE", &service, complete_phone);

    // Without an argument the whole record being evaluated is scored.
    let lead_service = service;
    registry.register_async_function("AI_LEAD_SCORE", move |args, context| {
        let service = lead_service.clone();
        let record = match args.into_iter().next() {
            Some(value) if !value.is_null() => serde_json::Value::from(value),
            _ => context_record(context),
        };
        async move { lead_score(service, record).await }.boxed()
    });

    register_local(registry, "AI_EXTRACT_DOMAIN", extract_domain);
    register_local(registry, "AI_CLEAN_PHONE", clean_phone);
    register_local(registry, "AI_FORMAT_NAME", format_name);
    register_local(registry, "AI_PREDICT_INDUSTRY", predict_industry);
    register_local(registry, "AI_SENTIMENT", sentiment);
}

fn register_enrichment<F, Fut>(
    registry: &mut FunctionRegistry,
    name: &str,
    service: &Arc<EnrichmentService>,
    function: F,
) where
    F: Fn(Arc<EnrichmentService>, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, EvalError>> + Send + 'static,
{
    let service = service.clone();
    registry.register_async_function(name, move |args, _context| {
        function(service.clone(), args).boxed()
    });
}

fn register_local<F>(registry: &mut FunctionRegistry, name: &str, function: F)
where
    F: Fn(&[Value], &Context) -> Result<Value, EvalError> + Send + Sync + 'static,
{
    registry.register_async_function(name, move |args, context| {
        let result = function(&args, context);
        async move { result }.boxed()
    });
}

fn text_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::to_text).unwrap_or_default()
}

fn context_record(context: &Context) -> serde_json::Value {
    serde_json::Value::Object(
        context
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::Value::from(value.clone())))
            .collect(),
    )
}

async fn detect_company(service: Arc<EnrichmentService>, args: Vec<Value>) -> Result<Value, EvalError> {
    let profile = service.company_info(&text_arg(&args, 0)).await;
    Ok(Value::Text(profile.value.industry))
}

async fn company_size(service: Arc<EnrichmentService>, args: Vec<Value>) -> Result<Value, EvalError> {
    let profile = service.company_info(&text_arg(&args, 0)).await;
    Ok(Value::Text(profile.value.size))
}

async fn complete_email(service: Arc<EnrichmentService>, args: Vec<Value>) -> Result<Value, EvalError> {
    let suggestion = service
        .complete_email(&text_arg(&args, 0), &text_arg(&args, 1), &text_arg(&args, 2))
        .await;
    Ok(Value::from(suggestion.value.email))
}

async fn complete_phone(service: Arc<EnrichmentService>, args: Vec<Value>) -> Result<Value, EvalError> {
    let suggestion = service
        .complete_phone(&text_arg(&args, 0), &text_arg(&args, 1), &text_arg(&args, 2))
        .await;
    Ok(Value::from(suggestion.value.phone))
}

async fn lead_score(
    service: Arc<EnrichmentService>,
    record: serde_json::Value,
) -> Result<Value, EvalError> {
    let score = service.lead_score(record).await;
    Ok(Value::Number(score.value.score))
}

static EMAIL_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@([^\s@.][^\s@]*\.[^\s@.]+)$").expect("email pattern is valid")
});

/// Lowercased domain of an email address, or null when the text is not one.
#[formula_fn]
fn extract_domain(email: String) -> Result<Value, EvalError> {
    Ok(EMAIL_DOMAIN
        .captures(email.trim())
        .and_then(|captures| captures.get(1))
        .map_or(Value::Null, |domain| {
            Value::Text(domain.as_str().to_lowercase())
        }))
}

#[formula_fn]
fn clean_phone(phone: String) -> Result<Value, EvalError> {
    Ok(Value::Text(
        phone
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect(),
    ))
}

/// Title case: every letter that starts a word is uppercased, the rest
/// lowercased. Apostrophes and hyphens start new words (`O'Brien`).
#[formula_fn]
fn format_name(name: String) -> Result<Value, EvalError> {
    let mut formatted = String::with_capacity(name.len());
    let mut word_start = true;
    for ch in name.trim().chars() {
        if word_start {
            formatted.extend(ch.to_uppercase());
        } else {
            formatted.extend(ch.to_lowercase());
        }
        word_start = !(ch.is_alphanumeric() || ch == '_');
    }
    Ok(Value::Text(formatted))
}

static INDUSTRY_KEYWORDS: Lazy<Vec<(&'static str, HashSet<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            "Technology",
            HashSet::from([
                "software", "saas", "cloud", "technology", "tech", "platform", "app", "apps",
                "data", "ai", "cybersecurity", "developer", "developers", "internet",
            ]),
        ),
        (
            "Healthcare",
            HashSet::from([
                "health", "healthcare", "medical", "hospital", "clinic", "pharma",
                "pharmaceutical", "biotech", "patient", "patients",
            ]),
        ),
        (
            "Finance",
            HashSet::from([
                "bank", "banking", "finance", "financial", "fintech", "insurance", "investment",
                "investments", "payments", "lending", "accounting",
            ]),
        ),
        (
            "Retail",
            HashSet::from([
                "retail", "ecommerce", "store", "stores", "shop", "shopping", "consumer",
                "fashion",
            ]),
        ),
        (
            "Manufacturing",
            HashSet::from([
                "manufacturing", "factory", "industrial", "machinery", "production",
                "automotive",
            ]),
        ),
        (
            "Education",
            HashSet::from([
                "education", "school", "university", "learning", "training", "edtech",
                "students",
            ]),
        ),
        (
            "Real Estate",
            HashSet::from(["property", "properties", "realty", "housing", "rental", "rentals"]),
        ),
        (
            "Consulting",
            HashSet::from(["consulting", "consultancy", "advisory", "agency"]),
        ),
    ]
});

static POSITIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "good", "great", "excellent", "amazing", "awesome", "fantastic", "wonderful", "happy",
        "love", "pleased", "satisfied", "interested", "positive", "thanks", "helpful",
    ])
});

static NEGATIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "bad", "poor", "terrible", "awful", "worst", "hate", "angry", "unhappy", "disappointed",
        "negative", "problem", "issue", "complaint", "cancel", "broken",
    ])
});

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Industry whose keywords occur most often in the description. Ties go to
/// the earlier table entry; no match at all is `Other`.
#[formula_fn]
fn predict_industry(description: String) -> Result<Value, EvalError> {
    let words = words(&description);
    let mut best = ("Other", 0);
    for (industry, keywords) in INDUSTRY_KEYWORDS.iter() {
        let hits = words
            .iter()
            .filter(|word| keywords.contains(word.as_str()))
            .count();
        if hits > best.1 {
            best = (*industry, hits);
        }
    }
    Ok(Value::from(best.0))
}

#[formula_fn]
fn sentiment(text: String) -> Result<Value, EvalError> {
    let words = words(&text);
    let count = |lexicon: &HashSet<&str>| {
        words
            .iter()
            .filter(|word| lexicon.contains(word.as_str()))
            .count()
    };
    let positive = count(&*POSITIVE_WORDS);
    let negative = count(&*NEGATIVE_WORDS);

    let label = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => "positive",
        std::cmp::Ordering::Less => "negative",
        std::cmp::Ordering::Equal => "neutral",
    };
    Ok(Value::from(label))
}
