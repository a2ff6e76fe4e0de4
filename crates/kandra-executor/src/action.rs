use kandra_core::{AgentAction, KandraError, Result};

/// Parse an [`AgentAction`] out of raw model output. The model is expected
/// to return bare JSON but sometimes wraps it in prose or a fenced code
/// block; fall back to extracting the first balanced `{...}` substring.
pub fn parse_action(raw: &str) -> Result<AgentAction> {
    if let Ok(action) = serde_json::from_str::<AgentAction>(raw.trim()) {
        return Ok(action);
    }
    let extracted = extract_first_json_object(raw)
        .ok_or_else(|| KandraError::LlmError("no JSON object found in model output".to_string()))?;
    serde_json::from_str(&extracted).map_err(|e| KandraError::LlmError(format!("malformed action JSON: {e}")))
}

/// Scan for the first balanced `{...}` substring, respecting string
/// literals and escapes so braces inside a `content` field don't throw off
/// the count.
fn extract_first_json_object(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.iter().position(|&c| c == '{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &c) in chars[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(chars[start..end].iter().collect());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let action = parse_action(r#"{"thought":"looking around","tool":"list_dir"}"#).unwrap();
        assert_eq!(action.thought, "looking around");
    }

    #[test]
    fn extracts_json_wrapped_in_prose() {
        let raw = "Sure, here's my next move:\n```json\n{\"thought\":\"reading config\",\"tool\":\"read_file\",\"args\":{\"path\":\"app.py\"}}\n```\nLet me know.";
        let action = parse_action(raw).unwrap();
        assert_eq!(action.thought, "reading config");
        assert_eq!(action.args.unwrap().path.unwrap(), "app.py");
    }

    #[test]
    fn braces_inside_string_content_do_not_confuse_the_scanner() {
        let raw = r#"{"thought":"writing config","tool":"write_file","args":{"path":"a.json","content":"{\"key\": \"value\"}"}}"#;
        let action = parse_action(raw).unwrap();
        assert_eq!(action.args.unwrap().content.unwrap(), "{\"key\": \"value\"}");
    }

    #[test]
    fn pure_prose_with_no_json_is_rejected() {
        assert!(parse_action("I think we are done here.").is_err());
    }

    #[test]
    fn status_only_action_parses() {
        let action = parse_action(r#"{"thought":"all tests pass","status":"complete"}"#).unwrap();
        assert!(action.tool.is_none());
        assert_eq!(action.status.unwrap().to_string(), "complete");
    }
}
