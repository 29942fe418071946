pub mod ai;
pub mod date;
pub mod logic;
pub mod math;
pub mod text;

use crate::ast::FunctionRegistry;
use crate::enrichment::EnrichmentService;
use std::sync::Arc;

/// Builds the full function table: local builtins plus the `AI_*` functions
/// backed by `service`.
pub fn register_functions(service: Arc<EnrichmentService>) -> FunctionRegistry {
    let mut registry = register_builtins();
    ai::register(&mut registry, service);
    registry
}

/// Builtins that never leave the process.
pub fn register_builtins() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    math::register(&mut registry);
    text::register(&mut registry);
    logic::register(&mut registry);
    date::register(&mut registry);
    registry
}
