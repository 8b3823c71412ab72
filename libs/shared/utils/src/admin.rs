use sha2::{Digest, Sha256};

pub const ADMIN_PASSWORD_HEADER: &str = "X-Admin-Password";

/// Decides whether a request may reach the admin routes. `credential` is the raw header value.
pub trait AdminAuthenticator: Send + Sync {
    fn authorize(&self, credential: Option<&str>) -> bool;
}

/// Compares the presented password against one configured secret.
pub struct SharedSecretAuthenticator {
    digest: [u8; 32],
}

impl SharedSecretAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self { digest: digest(secret) }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

impl AdminAuthenticator for SharedSecretAuthenticator {
    fn authorize(&self, credential: Option<&str>) -> bool {
        let Some(credential) = credential else {
            return false;
        };

        // Fixed-length digests, compared without early exit.
        digest(credential)
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}
