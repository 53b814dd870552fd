use enumset::EnumSetType;
use ssh_packet::{arch::Ascii, userauth};

/// Possible authentication methods in the SSH protocol (§4.4), as a
/// bitset-friendly enum for the server side's per-user tracking.
#[derive(Debug, EnumSetType)]
pub(super) enum Method {
    /// The SSH `none` authentication method.
    None,

    /// The SSH `publickey` authentication method.
    Publickey,

    /// The SSH `password` authentication method.
    Password,

    /// The SSH `hostbased` authentication method.
    Hostbased,

    /// The SSH `keyboard-interactive` authentication method.
    KeyboardInteractive,
}

impl Method {
    pub(super) fn to_ascii(self) -> Ascii<'static> {
        match self {
            Self::None => userauth::Method::NONE,
            Self::Publickey => userauth::Method::PUBLICKEY,
            Self::Password => userauth::Method::PASSWORD,
            Self::Hostbased => userauth::Method::HOSTBASED,
            Self::KeyboardInteractive => userauth::Method::KEYBOARD_INTERACTIVE,
        }
        .into()
    }
}

impl From<&userauth::Method<'_>> for Method {
    fn from(value: &userauth::Method<'_>) -> Self {
        match value {
            userauth::Method::None => Self::None,
            userauth::Method::Publickey { .. } => Self::Publickey,
            userauth::Method::Password { .. } => Self::Password,
            userauth::Method::Hostbased { .. } => Self::Hostbased,
            userauth::Method::KeyboardInteractive { .. } => Self::KeyboardInteractive,
        }
    }
}
