//! Prompt generation for coding questions.

/// Keys the service must return.
pub const QUESTION_KEYS: [&str; 3] = ["question", "sample_input", "expected_output"];

/// Build the prompt asking for one coding question on `topic`.
pub fn question_prompt(topic: &str) -> String {
    let topic = topic.trim();
    format!(
        r#"Generate a Python coding question based on: '{topic}'.

Your response must be a JSON object with keys: 'question', 'sample_input', 'expected_output'.

- `question`: the full problem statement for the candidate
- `sample_input`: an example input, as text
- `expected_output`: the exact output expected for `sample_input`, as text

The candidate's program stores its result in a variable named `output`; `expected_output`
must be the string form of that value.

Return only the JSON, nothing else."#
    )
}

/// Build the request payload for the `generateContent` endpoint.
pub fn build_request(topic: &str) -> serde_json::Value {
    serde_json::json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": question_prompt(topic) }]
        }],
        "generationConfig": {
            "temperature": 0.7,
            "responseMimeType": "application/json"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_topic_and_keys() {
        let prompt = question_prompt("  string reversal ");
        assert!(prompt.contains("'string reversal'"));
        for key in QUESTION_KEYS {
            assert!(prompt.contains(key));
        }
    }

    #[test]
    fn test_request_shape() {
        let body = build_request("sorting");
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.contains("sorting"));
        assert_eq!(body["contents"][0]["role"], "user");
    }
}
