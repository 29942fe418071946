use calcfield::ast::{Context, Parser, Value};
use calcfield::FormulaEngine;

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let contexts = vec![
        Context::from([
            ("price".to_string(), Value::Number(120.0)),
            ("qty".to_string(), Value::Number(3.0)),
        ]),
        Context::from([
            ("price".to_string(), Value::Number(80.0)),
            ("qty".to_string(), Value::Number(0.0)),
        ]),
        Context::from([("price".to_string(), Value::Number(15.5))]),
    ];

    let formula = r#"IF(AND([price] > 100, [qty] > 0), "bulk", IF(ISEMPTY([qty]), "unknown", [price] * [qty]))"#;
    let ast = Parser::parse_formula(formula).unwrap();

    let engine = FormulaEngine::offline();
    for (i, result) in engine.evaluate_batch(&ast, &contexts).await.iter().enumerate() {
        println!("Result {}: {:?}", i, result);
    }
}
