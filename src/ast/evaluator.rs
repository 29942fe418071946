use crate::ast::{ASTNode, Context, FunctionRegistry, Parser, Value};
use crate::error::{EvalError, FormulaError};
use futures_util::future::{join_all, try_join_all, BoxFuture};
use futures_util::FutureExt;
use log::{debug, trace};
use std::sync::Arc;

/// Walks an AST against a per-record context.
///
/// The evaluator holds no per-call state: the function table is frozen at
/// construction and shared behind an `Arc`, so one evaluator (and one AST) can
/// serve any number of concurrent evaluations.
#[derive(Debug, Clone)]
pub struct Evaluator {
    pub(crate) functions: Arc<FunctionRegistry>,
}

impl Evaluator {
    /// Creates an evaluator over a finished function table.
    pub fn new(functions: FunctionRegistry) -> Self {
        Self {
            functions: Arc::new(functions),
        }
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Parses and evaluates a formula against a provided context.
    ///
    /// # Arguments
    ///
    /// * `formula` - The formula text, e.g. `SUM([a], [b]) * 2`.
    /// * `context` - Field values for the record being evaluated.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` if parsing and evaluation succeed.
    /// * `Err(FormulaError)` if lexing, parsing or evaluation fails.
    pub async fn evaluate_formula(
        &self,
        formula: &str,
        context: &Context,
    ) -> Result<Value, FormulaError> {
        let ast = Parser::parse_formula(formula)?;
        Ok(self.evaluate(&ast, context).await?)
    }

    /// Evaluates one AST against many contexts concurrently. Results come back
    /// in the order of `contexts`.
    pub async fn evaluate_batch(
        &self,
        ast: &ASTNode,
        contexts: &[Context],
    ) -> Vec<Result<Value, EvalError>> {
        debug!("Evaluating batch of {} contexts", contexts.len());
        join_all(contexts.iter().map(|context| self.evaluate(ast, context))).await
    }

    /// Evaluates an `ASTNode` with a given context.
    pub fn evaluate<'a>(
        &'a self,
        ast: &'a ASTNode,
        context: &'a Context,
    ) -> BoxFuture<'a, Result<Value, EvalError>> {
        async move {
            match ast {
                ASTNode::Literal(value) => match value {
                    Value::Number(_) | Value::Text(_) | Value::Boolean(_) => Ok(value.clone()),
                    other => Err(EvalError::MalformedNode(format!(
                        "literal must be a number, text or boolean, got {:?}",
                        other
                    ))),
                },

                // Sparse records are normal: a missing field is null, never an error.
                ASTNode::Field(name) => Ok(context.get(name).cloned().unwrap_or(Value::Null)),

                ASTNode::BinaryOperation {
                    left,
                    operator,
                    right,
                } => {
                    let left_value = self.evaluate(left, context).await?;
                    let right_value = self.evaluate(right, context).await?;
                    operator.apply(left_value, right_value)
                }

                ASTNode::UnaryOperation { operator, operand } => {
                    let value = self.evaluate(operand, context).await?;
                    Ok(operator.apply(value))
                }

                ASTNode::FunctionCall { name, args } => {
                    self.evaluate_function(name, args, context).await
                }
            }
        }
        .boxed()
    }

    async fn evaluate_function(
        &self,
        name: &str,
        args: &[ASTNode],
        context: &Context,
    ) -> Result<Value, EvalError> {
        let name = name.to_uppercase();

        // IF only evaluates the branch it selects, so a guarded division in the
        // other branch never runs.
        if name == "IF" {
            return self.evaluate_if(args, context).await;
        }

        let function = self
            .functions
            .get(&name)
            .ok_or_else(|| EvalError::UnknownFunction(name.clone()))?;

        // Arguments resolve concurrently; try_join_all keeps their positions.
        let values = try_join_all(args.iter().map(|arg| self.evaluate(arg, context))).await?;

        trace!("Calling {} with {:?}", name, values);
        function.call(values, context).await
    }

    async fn evaluate_if(&self, args: &[ASTNode], context: &Context) -> Result<Value, EvalError> {
        let condition = match args.first() {
            Some(node) => self.evaluate(node, context).await?,
            None => Value::Null,
        };

        let branch = if condition.is_truthy() {
            args.get(1)
        } else {
            args.get(2)
        };

        match branch {
            Some(node) => self.evaluate(node, context).await,
            None => Ok(Value::Null),
        }
    }
}
