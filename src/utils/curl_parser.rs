use std::collections::BTreeMap;

/// Pulls the endpoint and headers out of a browser "Copy as cURL" command,
/// so an authenticated dashboard session can be reused for uploads.
#[derive(Clone, Debug, Default)]
pub struct CurlParser {
    pub endpoint: Option<String>,
    pub headers: BTreeMap<String, String>,
}

/// Headers reqwest must compute itself for a multipart body.
const SKIPPED_HEADERS: [&str; 3] = ["content-type", "content-length", "host"];

impl CurlParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, curl_text: &str) -> Result<(), String> {
        let endpoint = curl_text
            .split_whitespace()
            .map(|token| token.trim_matches(|c| c == '\'' || c == '"'))
            .find(|token| token.starts_with("http://") || token.starts_with("https://"))
            .ok_or("Could not find endpoint URL in curl command".to_string())?
            .to_string();

        let mut headers = BTreeMap::new();
        for line in curl_text.lines() {
            let line = line.trim().trim_end_matches('\\').trim();
            let content = match line
                .strip_prefix("-H ")
                .or_else(|| line.strip_prefix("--header "))
            {
                Some(rest) => rest.trim().trim_matches(|c| c == '\'' || c == '"'),
                None => continue,
            };

            let Some((key, value)) = content.split_once(": ") else {
                continue;
            };

            let key = key.trim().to_lowercase();
            if SKIPPED_HEADERS.contains(&key.as_str()) {
                continue;
            }
            headers.insert(key, value.trim().to_string());
        }

        self.endpoint = Some(endpoint);
        self.headers = headers;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_endpoint_and_headers() {
        let curl = "curl 'https://intranet.example.com/api/gestiones/adjuntos' \\\n  \
                    -H 'accept: application/json' \\\n  \
                    -H 'Authorization: Bearer abc' \\\n  \
                    -H 'content-type: multipart/form-data; boundary=xyz' \\\n  \
                    --data-raw 'ignored'";

        let mut parser = CurlParser::new();
        parser.parse(curl).unwrap();

        assert_eq!(
            parser.endpoint.as_deref(),
            Some("https://intranet.example.com/api/gestiones/adjuntos")
        );
        assert_eq!(parser.headers.get("authorization").unwrap(), "Bearer abc");
        assert_eq!(parser.headers.get("accept").unwrap(), "application/json");
        assert!(!parser.headers.contains_key("content-type"));
    }

    #[test]
    fn rejects_command_without_url() {
        let mut parser = CurlParser::new();
        assert!(parser.parse("curl -H 'accept: */*'").is_err());
        assert!(parser.endpoint.is_none());
    }
}
