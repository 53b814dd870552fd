use ssh_key::PrivateKey;
use ssh_packet::userauth;

/// Possible authentication methods attempted by the client (§4.4).
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Method {
    /// The SSH `none` authentication method, used as a probe to learn
    /// which methods the server accepts.
    None,

    /// The SSH `publickey` authentication method.
    Publickey {
        /// The key to sign the authentication request with.
        key: Box<PrivateKey>,
    },

    /// The SSH `password` authentication method.
    Password {
        /// The password to authenticate with.
        password: String,
    },
}

impl std::hash::Hash for Method {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);

        // Allow keys with different fingerprints to coexist in the set.
        if let Self::Publickey { key } = self {
            key.fingerprint(ssh_key::HashAlg::Sha256)
                .as_bytes()
                .hash(state);
        }
    }
}

impl AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        match self {
            Self::None => userauth::Method::NONE,
            Self::Publickey { .. } => userauth::Method::PUBLICKEY,
            Self::Password { .. } => userauth::Method::PASSWORD,
        }
    }
}
