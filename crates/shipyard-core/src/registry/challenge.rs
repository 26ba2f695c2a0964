//! `WWW-Authenticate` bearer challenge parsing.

use crate::error::PipelineError;

/// Parameters of a registry bearer challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerChallenge {
    pub realm: String,
    pub service: String,
    pub scope: String,
}

impl BearerChallenge {
    /// The token-endpoint URL derived from the challenge.
    pub fn token_url(&self) -> String {
        format!(
            "{}?service={}&scope={}",
            self.realm, self.service, self.scope
        )
    }
}

/// Parse a `WWW-Authenticate` header value into a [`BearerChallenge`].
///
/// Accepts the scheme-prefixed form (`Bearer realm="…",service="…",…`) and
/// requires all three of `realm`, `service` and `scope`; anything else is a
/// protocol error, per fail-loudly policy.
pub fn parse_challenge(header: &str) -> anyhow::Result<BearerChallenge> {
    let raw = header.strip_prefix("Bearer ").unwrap_or(header);

    let mut realm = None;
    let mut service = None;
    let mut scope = None;
    for item in split_http_list(raw) {
        if let Some((key, value)) = item.split_once('=') {
            let value = value.trim().trim_matches('"').to_string();
            match key.trim() {
                "realm" => realm = Some(value),
                "service" => service = Some(value),
                "scope" => scope = Some(value),
                _ => {}
            }
        }
    }

    match (realm, service, scope) {
        (Some(realm), Some(service), Some(scope)) => Ok(BearerChallenge {
            realm,
            service,
            scope,
        }),
        _ => Err(PipelineError::Protocol {
            context: "registry auth challenge".to_string(),
            body: header.to_string(),
        }
        .into()),
    }
}

/// Split a comma-separated HTTP parameter list, honoring quoted segments.
fn split_http_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in value.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                if !current.trim().is_empty() {
                    items.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_challenge_parses() {
        let challenge = parse_challenge(
            "Bearer realm=\"https://auth.example.com/token\",\
             service=\"registry.example.com\",\
             scope=\"repository:acme/api:pull\"",
        )
        .unwrap();

        assert_eq!(challenge.realm, "https://auth.example.com/token");
        assert_eq!(challenge.service, "registry.example.com");
        assert_eq!(challenge.scope, "repository:acme/api:pull");
        assert_eq!(
            challenge.token_url(),
            "https://auth.example.com/token?service=registry.example.com&scope=repository:acme/api:pull"
        );
    }

    #[test]
    fn scheme_prefix_is_optional() {
        let challenge =
            parse_challenge("realm=\"r\",service=\"s\",scope=\"repository:x:pull\"").unwrap();
        assert_eq!(challenge.realm, "r");
    }

    #[test]
    fn quoted_commas_do_not_split_parameters() {
        let challenge = parse_challenge(
            "Bearer realm=\"https://auth.example.com/token\",\
             service=\"registry.example.com\",\
             scope=\"repository:acme/api:pull,push\"",
        )
        .unwrap();
        assert_eq!(challenge.scope, "repository:acme/api:pull,push");
    }

    #[test]
    fn missing_parameters_are_a_protocol_error() {
        let err = parse_challenge("Bearer realm=\"r\"").unwrap_err();
        assert!(err.to_string().contains("registry auth challenge"));
    }
}
