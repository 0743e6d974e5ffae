//! URL and query string helpers for format URLs

use crate::error::SigError;
use url::{form_urlencoded, Url};

/// Decoded parameters of a `signatureCipher` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherParams {
    /// Stream URL, already percent-decoded
    pub url: String,
    /// Obfuscated signature
    pub s: Option<String>,
    /// Name of the query parameter the deciphered signature goes into
    pub sp: String,
}

/// Default query parameter name for deciphered signatures
pub const DEFAULT_SIGNATURE_PARAM: &str = "signature";

/// Parse a urlencoded `signatureCipher` value
pub fn parse_cipher(cipher: &str) -> Result<CipherParams, SigError> {
    let mut url = None;
    let mut s = None;
    let mut sp = None;

    for (key, value) in form_urlencoded::parse(cipher.as_bytes()) {
        match key.as_ref() {
            "url" => url = Some(value.into_owned()),
            "s" => s = Some(value.into_owned()),
            "sp" => sp = Some(value.into_owned()),
            _ => {}
        }
    }

    let url = url.ok_or_else(|| SigError::FormatError("cipher has no url parameter".to_string()))?;

    Ok(CipherParams {
        url,
        s: s.filter(|s| !s.is_empty()),
        sp: sp
            .filter(|sp| !sp.is_empty())
            .unwrap_or_else(|| DEFAULT_SIGNATURE_PARAM.to_string()),
    })
}

/// Get the first value of a query parameter
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Set a query parameter, replacing every existing occurrence in place
pub fn set_query_param(url: &mut Url, name: &str, value: &str) {
    let mut replaced = false;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(key, old)| {
            if key != name {
                Some((key.into_owned(), old.into_owned()))
            } else if !replaced {
                replaced = true;
                Some((key.into_owned(), value.to_string()))
            } else {
                None
            }
        })
        .collect();

    let mut query = url.query_pairs_mut();
    query.clear().extend_pairs(pairs);
    if !replaced {
        query.append_pair(name, value);
    }
}
