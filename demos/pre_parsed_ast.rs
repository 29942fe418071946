use calcfield::ast::{Context, Parser, Value};
use calcfield::{EngineConfig, FormulaEngine};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    // Set CALCFIELD_PROVIDER_URL to enrich against a real provider.
    let engine = FormulaEngine::new(EngineConfig::from_env().expect("invalid configuration"));

    let formula = "IF(AI_LEAD_SCORE() >= 50, AI_DETECT_COMPANY([company]), AI_PREDICT_INDUSTRY([about]))";
    let ast = Parser::parse_formula(formula).expect("Failed to parse");
    println!("Canonical form: {}", ast);
    println!("Fields: {:?}", ast.fields());
    println!("Functions: {:?}", ast.functions());

    let context = Context::from([
        ("company".to_string(), Value::from("Acme Robotics")),
        (
            "about".to_string(),
            Value::from("Industrial machinery and factory automation"),
        ),
    ]);

    for _ in 0..2 {
        match engine.evaluate_ast(&ast, &context).await {
            Ok(result) => println!("Result: {}", result),
            Err(err) => println!("Error: {}", err),
        }
    }
}
