use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Deserialise a document piped on stdin. JSON when it opens with `{`,
/// YAML otherwise. `None` when stdin is a TTY or the pipe is empty.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped<T: DeserializeOwned>(text: &str) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = if trimmed.starts_with('{') {
        serde_json::from_str(trimmed).map_err(|e| format!("Failed to parse stdin JSON: {e}"))?
    } else {
        serde_yaml::from_str(trimmed).map_err(|e| format!("Failed to parse stdin YAML: {e}"))?
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PairsDocument;

    #[test]
    fn test_empty_pipe_is_none() {
        let doc: Option<PairsDocument> = parse_piped("  \n ").unwrap();
        assert!(doc.is_none());
    }

    #[test]
    fn test_json_and_yaml_pipes() {
        let json: PairsDocument = parse_piped(r#"{"config": {"window": 12}}"#).unwrap().unwrap();
        let yaml: PairsDocument = parse_piped("config:\n  window: 12\n").unwrap().unwrap();
        assert_eq!(json.config.window, 12);
        assert_eq!(yaml.config.window, 12);
    }

    #[test]
    fn test_malformed_json_reports_source() {
        let err = parse_piped::<PairsDocument>("{\"config\": ").unwrap_err();
        assert!(err.to_string().contains("stdin JSON"));
    }
}
