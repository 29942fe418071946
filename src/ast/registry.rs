use crate::ast::{Context, Value};
use crate::error::EvalError;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type SyncFunction = Arc<dyn Fn(&[Value], &Context) -> Result<Value, EvalError> + Send + Sync>;

pub type AsyncFunction = Arc<
    dyn Fn(Vec<Value>, &Context) -> BoxFuture<'static, Result<Value, EvalError>> + Send + Sync,
>;

/// A formula function. Builtins run synchronously; enrichment functions
/// return a future. Both are invoked through [`Function::call`].
#[derive(Clone)]
pub enum Function {
    Sync(SyncFunction),
    Async(AsyncFunction),
}

impl Function {
    pub async fn call(&self, args: Vec<Value>, context: &Context) -> Result<Value, EvalError> {
        match self {
            Function::Sync(function) => function(&args, context),
            Function::Async(function) => function(args, context).await,
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Function::Async(_))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Sync(_) => write!(f, "Function::Sync"),
            Function::Async(_) => write!(f, "Function::Async"),
        }
    }
}

/// Name to implementation table. Names are stored uppercase and looked up
/// case-insensitively. No arity checking happens here: functions treat
/// missing arguments as absent.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a synchronous function, replacing any previous entry.
    pub fn register_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[Value], &Context) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.functions
            .insert(name.to_uppercase(), Function::Sync(Arc::new(function)));
    }

    /// Registers a function returning a future, replacing any previous entry.
    pub fn register_async_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(Vec<Value>, &Context) -> BoxFuture<'static, Result<Value, EvalError>>
            + Send
            + Sync
            + 'static,
    {
        self.functions
            .insert(name.to_uppercase(), Function::Async(Arc::new(function)));
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    #[tokio::test]
    async fn test_sync_and_async_functions_share_call_interface() {
        let mut registry = FunctionRegistry::new();
        registry.register_function("double", |args, _| {
            Ok(Value::Number(args.first().map_or(0.0, Value::to_number) * 2.0))
        });
        registry.register_async_function("echo", |args, _| {
            async move { Ok(args.into_iter().next().unwrap_or_default()) }.boxed()
        });

        let context = Context::new();
        let double = registry.get("DOUBLE").unwrap();
        assert!(!double.is_async());
        assert_eq!(
            double.call(vec![Value::from(21.0)], &context).await,
            Ok(Value::from(42.0))
        );

        let echo = registry.get("Echo").unwrap();
        assert!(echo.is_async());
        assert_eq!(
            echo.call(vec![Value::from("hi")], &context).await,
            Ok(Value::from("hi"))
        );
    }

    #[test]
    fn test_names_are_uppercased_and_sorted() {
        let mut registry = FunctionRegistry::new();
        registry.register_function("sum", |_, _| Ok(Value::Null));
        registry.register_function("Avg", |_, _| Ok(Value::Null));
        assert_eq!(registry.names(), vec!["AVG", "SUM"]);
        assert!(registry.contains("avg"));
        assert!(!registry.contains("median"));
        assert_eq!(registry.len(), 2);
    }
}
