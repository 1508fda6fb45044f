// Request authorization for the Cosmos DB REST API.
//
// Master-key requests are signed with HMAC-SHA256 over a canonical string
// built from the verb, resource type, resource link and request date.
// Resource tokens (handed out with permissions) are sent as-is.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::error::CosmosError;

type HmacSha256 = Hmac<Sha256>;

/// Credential used to authorize every request made by a client.
#[derive(Clone)]
pub enum Credential {
    /// Decoded account master key.
    MasterKey(Vec<u8>),
    /// Permission-scoped resource token.
    ResourceToken(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::MasterKey(_) => f.write_str("MasterKey(***)"),
            Credential::ResourceToken(_) => f.write_str("ResourceToken(***)"),
        }
    }
}

impl Credential {
    pub fn master_key(key: &str) -> Result<Self, CosmosError> {
        let decoded = STANDARD
            .decode(key.trim())
            .map_err(CosmosError::InvalidKey)?;
        Ok(Credential::MasterKey(decoded))
    }

    pub fn resource_token(token: &str) -> Self {
        Credential::ResourceToken(token.to_string())
    }

    /// Value of the `authorization` header for one request.
    pub fn authorization(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> Result<String, CosmosError> {
        match self {
            Credential::MasterKey(key) => {
                let payload = string_to_sign(verb, resource_type, resource_link, date);
                let mut mac = HmacSha256::new_from_slice(key).map_err(CosmosError::Signing)?;
                mac.update(payload.as_bytes());
                let signature = STANDARD.encode(mac.finalize().into_bytes());
                Ok(urlencoding::encode(&format!("type=master&ver=1.0&sig={signature}")).into_owned())
            }
            Credential::ResourceToken(token) => Ok(urlencoding::encode(token).into_owned()),
        }
    }
}

/// Canonical payload signed for master-key requests.
pub fn string_to_sign(verb: &str, resource_type: &str, resource_link: &str, date: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}\n\n",
        verb.to_lowercase(),
        resource_type,
        resource_link,
        date.to_lowercase()
    )
}

/// RFC 1123 date as expected by the `x-ms-date` header.
pub fn format_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const KEY: &str = "dsZQi3KtZmCv1ljt3VNWNm7sQUF1y5rJfC6kv5JiwvW0EndXdDku/dkKBp8/ufDToSxLzR4y+O/0H/t4bQtVNw==";

    #[test]
    fn string_to_sign_lowercases_verb_and_date() {
        let payload = string_to_sign("GET", "dbs", "dbs/ToDoList", "Thu, 27 Apr 2017 00:51:12 GMT");
        assert_eq!(payload, "get\ndbs\ndbs/ToDoList\nthu, 27 apr 2017 00:51:12 gmt\n\n");
    }

    #[test]
    fn formats_rfc1123_dates() {
        let now = Utc.with_ymd_and_hms(2017, 4, 27, 0, 51, 12).unwrap();
        assert_eq!(format_date(now), "Thu, 27 Apr 2017 00:51:12 GMT");
    }

    #[test]
    fn master_key_signature_is_url_encoded() {
        let credential = Credential::master_key(KEY).unwrap();
        let header = credential.authorization("GET", "dbs", "dbs/ToDoList", "Thu, 27 Apr 2017 00:51:12 GMT").unwrap();

        let decoded = urlencoding::decode(&header).unwrap();
        let signature = decoded
            .strip_prefix("type=master&ver=1.0&sig=")
            .expect("master token prefix");
        assert_eq!(STANDARD.decode(signature).unwrap().len(), 32);
        assert!(!header.contains('&'));
        assert!(!header.contains('='));
    }

    #[test]
    fn signature_depends_on_verb_and_link() {
        let credential = Credential::master_key(KEY).unwrap();
        let date = "Thu, 27 Apr 2017 00:51:12 GMT";
        let sign = |verb, link| credential.authorization(verb, "dbs", link, date).unwrap();
        let get = sign("GET", "dbs/ToDoList");

        assert_eq!(get, sign("get", "dbs/ToDoList"));
        assert_ne!(get, sign("DELETE", "dbs/ToDoList"));
        assert_ne!(get, sign("GET", "dbs/Other"));
    }

    #[test]
    fn resource_tokens_are_passed_through() {
        let credential = Credential::resource_token("type=resource&ver=1.0&sig=abc");
        let header = credential.authorization("GET", "docs", "dbs/db/colls/c", "ignored").unwrap();
        assert_eq!(urlencoding::decode(&header).unwrap(), "type=resource&ver=1.0&sig=abc");
    }

    #[test]
    fn rejects_keys_that_are_not_base64() {
        assert!(matches!(
            Credential::master_key("not base64!"),
            Err(CosmosError::InvalidKey(_))
        ));
    }
}
