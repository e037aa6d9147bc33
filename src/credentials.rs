//! Credential codec.
//!
//! Player add-on URLs carry the account as a single path segment. The token
//! is the base64url (unpadded) encoding of `{"username": .., "password": ..}`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::types::Credentials;
use crate::{GatewayError, Result};

/// Encode credentials into a URL-safe path token.
pub fn encode(credentials: &Credentials) -> Result<String> {
    let json = serde_json::to_vec(credentials)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode a path token back into credentials.
///
/// Rejects tokens that are not valid base64url, not the expected JSON
/// shape, or that carry a blank username or password.
pub fn decode(token: &str) -> Result<Credentials> {
    let raw = URL_SAFE_NO_PAD
        .decode(token.trim_end_matches('='))
        .map_err(|e| GatewayError::InvalidInput(format!("credential token: {e}")))?;
    let credentials: Credentials = serde_json::from_slice(&raw)
        .map_err(|e| GatewayError::InvalidInput(format!("credential token: {e}")))?;
    if !credentials.is_complete() {
        return Err(GatewayError::InvalidInput(
            "credential token is missing a username or password".into(),
        ));
    }
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_url_safe() {
        let token = encode(&Credentials::new("marko?/+", "lozinka>>>")).unwrap();
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
    }

    #[test]
    fn decode_restores_credentials() {
        let creds = Credentials::new("marko", "lozinka");
        let decoded = decode(&encode(&creds).unwrap()).unwrap();
        assert_eq!(decoded, creds);
    }

    #[test]
    fn decode_tolerates_padding() {
        let token = format!("{}==", encode(&Credentials::new("a", "b")).unwrap());
        assert!(decode(&token).is_ok());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode("!!!"), Err(GatewayError::InvalidInput(_))));
        let not_json = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(matches!(decode(&not_json), Err(GatewayError::InvalidInput(_))));
    }

    #[test]
    fn decode_rejects_blank_password() {
        let token = encode(&Credentials::new("marko", "  ")).unwrap();
        assert!(decode(&token).is_err());
    }
}
