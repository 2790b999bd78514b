use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

/// Turns a bearer credential into a verified email. Tokens are
/// HMAC-signed: `base64url(email) . base64url(hmac(email))`. The
/// upstream auth provider is out of scope; this layer only owns the
/// credential-to-email contract.
#[derive(Clone)]
pub struct IdentityVerifier {
    secret: String,
}

impl IdentityVerifier {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Option<Hmac<Sha1>> {
        Hmac::<Sha1>::new_from_slice(self.secret.as_bytes()).ok()
    }

    pub fn issue(&self, email: &str) -> Option<String> {
        let payload = URL_SAFE_NO_PAD.encode(email);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Some(format!("{payload}.{signature}"))
    }

    /// Returns the verified email, or `None` for a missing, malformed, or
    /// tampered token.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (payload, signature) = token.split_once('.')?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let expected = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        if expected != signature {
            return None;
        }

        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        String::from_utf8(bytes).ok()
    }
}
