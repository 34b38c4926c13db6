//! OAuth 1.0a request signing (HMAC-SHA1) for the posting API.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Static user-context credentials of the posting account. These do not expire.
#[derive(Clone, Default)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl OAuthCredentials {
    /// Names of the environment variables holding empty values.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("SOCIAL_CONSUMER_KEY", &self.consumer_key),
            ("SOCIAL_CONSUMER_SECRET", &self.consumer_secret),
            ("SOCIAL_ACCESS_TOKEN", &self.access_token),
            ("SOCIAL_ACCESS_TOKEN_SECRET", &self.access_token_secret),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// `Authorization` header value for a request with no query or form parameters,
    /// using a fresh nonce and the current time.
    #[must_use]
    pub fn authorization(&self, method: &str, url: &str) -> String {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.authorization_with(method, url, &[], &nonce, &timestamp)
    }

    /// `Authorization` header value with explicit request parameters, nonce and
    /// timestamp. Only the `oauth_*` parameters end up in the header.
    #[must_use]
    pub fn authorization_with(
        &self,
        method: &str,
        url: &str,
        request_params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> String {
        let mut oauth_params = vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let mut all_params: Vec<(&str, &str)> = oauth_params.clone();
        all_params.extend_from_slice(request_params);
        let signature = self.signature(method, url, &all_params);
        oauth_params.push(("oauth_signature", &signature));
        oauth_params.sort_unstable();

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        format!("OAuth {}", fields.join(", "))
    }

    fn signature(&self, method: &str, url: &str, params: &[(&str, &str)]) -> String {
        let mut encoded: Vec<(String, String)> =
            params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
        encoded.sort();
        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            encode(url),
            encode(&param_string)
        );
        let key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(&self.access_token_secret)
        );

        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
        mac.update(base_string.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

/// RFC 3986 percent-encoding: everything but `A-Z a-z 0-9 - . _ ~`.
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWEETS_URL: &str = "https://api.twitter.com/2/tweets";

    fn credentials() -> OAuthCredentials {
        OAuthCredentials {
            consumer_key: "forum-consumer".to_string(),
            consumer_secret: "consumer secret/+".to_string(),
            access_token: "42-access".to_string(),
            access_token_secret: "token&secret".to_string(),
        }
    }

    fn oauth_params() -> Vec<(&'static str, &'static str)> {
        vec![
            ("oauth_consumer_key", "forum-consumer"),
            ("oauth_nonce", "abc123XYZ"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1700000000"),
            ("oauth_token", "42-access"),
            ("oauth_version", "1.0"),
        ]
    }

    #[test]
    fn test_signature_for_tweet_request() {
        let signature = credentials().signature("post", TWEETS_URL, &oauth_params());
        assert_eq!(signature, "uBPnrSuYFMvQ7mqjF5JWvx02dDc=");
    }

    #[test]
    fn test_signature_covers_request_params() {
        let mut params = oauth_params();
        params.push(("status", "Hello Ladies + Gentlemen, a signed OAuth request!"));
        params.push(("include_entities", "true"));
        let signature = credentials().signature(
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
        );
        assert_eq!(signature, "4i1DHir76Jq9PO7dxUJuLnrUGDU=");
    }

    #[test]
    fn test_header_lists_oauth_params_only() {
        let header = credentials().authorization_with(
            "POST",
            TWEETS_URL,
            &[("status", "not in the header")],
            "abc123XYZ",
            "1700000000",
        );

        assert!(header.starts_with("OAuth oauth_consumer_key=\"forum-consumer\", "));
        assert!(header.contains("oauth_nonce=\"abc123XYZ\""));
        assert!(header.contains("oauth_token=\"42-access\""));
        assert!(header.ends_with("oauth_version=\"1.0\""));
        assert!(!header.contains("status"));

        let header = credentials().authorization_with("POST", TWEETS_URL, &[], "abc123XYZ", "1700000000");
        assert!(header.contains("oauth_signature=\"uBPnrSuYFMvQ7mqjF5JWvx02dDc%3D\""));
    }

    #[test]
    fn test_fresh_nonce_per_request() {
        let credentials = credentials();
        let a = credentials.authorization("POST", TWEETS_URL);
        let b = credentials.authorization("POST", TWEETS_URL);
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_lists_empty_fields() {
        let credentials = OAuthCredentials {
            consumer_key: "key".to_string(),
            access_token: "token".to_string(),
            ..OAuthCredentials::default()
        };
        assert_eq!(
            credentials.missing(),
            vec!["SOCIAL_CONSUMER_SECRET", "SOCIAL_ACCESS_TOKEN_SECRET"]
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("consumer secret"));
        assert!(!rendered.contains("token&secret"));
        assert!(!rendered.contains("42-access"));
    }
}
