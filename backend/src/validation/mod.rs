//! JSON Schema validation for generated questions.
//!
//! The generation service returns free-form text; once a JSON object has been
//! extracted from it, the object is checked against an embedded Draft 7 schema
//! (`schemas/question.json`) before it is accepted into the question bank.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use reshaper::validation::validate_question;
//!
//! let q = json!({ "question": "Reverse a string", "sample_input": "abc", "expected_output": "cba" });
//! assert!(validate_question(&q).is_ok().is_ok());
//! assert!(validate_question(&json!({ "sample_input": "abc" })).is_err().is_ok());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static QUESTION_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/question.json"))
        .unwrap_or_else(|e| panic!("embedded question schema is invalid JSON: {e}"))
});

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with one message per violation
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a generated question object.
pub fn validate_question(data: &Value) -> Result<(), Vec<String>> {
    validate(&QUESTION_SCHEMA, data)
}
