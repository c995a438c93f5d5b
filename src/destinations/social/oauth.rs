use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

/// OAuth 1.0a user-context credentials.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("access_token", &self.access_token)
            .field("access_token_secret", &"[REDACTED]")
            .finish()
    }
}

/// RFC 3986 percent-encoding, as required for OAuth signatures.
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

impl OAuthCredentials {
    /// `Authorization` header for a request, with a fresh nonce and timestamp.
    ///
    /// `params` are the query/form parameters covered by the signature.
    /// Multipart and JSON bodies are not signed.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> anyhow::Result<String> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string();
        self.authorization_with(method, url, params, &nonce, &timestamp)
    }

    pub fn authorization_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> anyhow::Result<String> {
        let mut oauth: BTreeMap<&str, &str> = BTreeMap::new();
        oauth.insert("oauth_consumer_key", &self.consumer_key);
        oauth.insert("oauth_nonce", nonce);
        oauth.insert("oauth_signature_method", "HMAC-SHA1");
        oauth.insert("oauth_timestamp", timestamp);
        oauth.insert("oauth_token", &self.access_token);
        oauth.insert("oauth_version", "1.0");

        let all_params = oauth
            .iter()
            .map(|(k, v)| (*k, *v))
            .chain(params.iter().copied());
        let signature = self.sign(&signature_base(method, url, all_params))?;

        let mut header = String::from("OAuth ");
        let mut fields: Vec<String> = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        fields.push(format!("oauth_signature=\"{}\"", encode(&signature)));
        fields.sort();
        header.push_str(&fields.join(", "));
        Ok(header)
    }

    fn sign(&self, base: &str) -> anyhow::Result<String> {
        let key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(&self.access_token_secret)
        );
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid signing key: {e}"))?;
        mac.update(base.as_bytes());
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// `METHOD&url&params`, each part percent-encoded, params sorted after encoding.
pub(crate) fn signature_base<'a>(
    method: &str,
    url: &str,
    params: impl Iterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut pairs: Vec<(String, String)> = params.map(|(k, v)| (encode(k), encode(v))).collect();
    pairs.sort();
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&joined)
    )
}
