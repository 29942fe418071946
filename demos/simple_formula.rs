use calcfield::ast::{Context, Value};
use calcfield::{evaluate_formula, tokenize, validate_formula};
use log::debug;

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let context = Context::from([
        ("firstName".to_string(), Value::from("john")),
        ("lastName".to_string(), Value::from("doe")),
        ("email".to_string(), Value::from("john.doe@acme.com")),
        ("score".to_string(), Value::from(85.0)),
        ("price".to_string(), Value::from(120.0)),
        ("tax".to_string(), Value::from(0.0)),
    ]);

    let formula = r#"CONCAT(AI_FORMAT_NAME([firstName]), " ", AI_FORMAT_NAME([lastName]))"#;
    debug!("tokens: {:?}", tokenize(formula).unwrap());

    let formulas = [
        formula,
        "2 + 3 * 4",
        r#"IF([score] >= 90, "A", IF([score] >= 80, "B", "C"))"#,
        "IF([tax] > 0, [price] / [tax], 0)",
        "AI_EXTRACT_DOMAIN([email])",
        r#"DATEADD("2024-01-31", 1, "months")"#,
        "[price] / [tax]",
    ];

    for formula in formulas {
        match evaluate_formula(formula, &context).await {
            Ok(result) => println!("{} => {}", formula, result),
            Err(err) => println!("{} => error: {}", formula, err),
        }
    }

    let validation = validate_formula("SUM([a], [b]");
    println!("{}", serde_json::to_string(&validation).unwrap());
}
