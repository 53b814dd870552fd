use std::io::{Read, Write};

use libflate::zlib::{Decoder, Encoder};
use strum::{AsRefStr, EnumString};

use crate::{side::client::Client, side::server::Server, Error, Result};

use super::Negociate;

impl Negociate<Client> for Compress {
    const ERR: Error = Error::NoCommonCompression;

    fn field<'f>(kex: &'f ssh_packet::trans::KexInit) -> &'f ssh_packet::arch::NameList<'f> {
        &kex.compression_algorithms_client_to_server
    }
}

impl Negociate<Server> for Compress {
    const ERR: Error = Error::NoCommonCompression;

    fn field<'f>(kex: &'f ssh_packet::trans::KexInit) -> &'f ssh_packet::arch::NameList<'f> {
        &kex.compression_algorithms_server_to_client
    }
}

/// SSH compression algorithms (RFC 4253 §6.2).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Compress {
    /// DEFLATE, applied to every packet's payload.
    #[strum(serialize = "zlib")]
    Zlib,

    /// DEFLATE, only applied after authentication has completed.
    #[strum(serialize = "zlib@openssh.com")]
    ZlibOpenssh,

    /// No compression.
    #[default]
    None,
}

impl Compress {
    /// Whether this algorithm only engages once user authentication has
    /// completed (the `@openssh.com` delayed-compression variants).
    pub(crate) fn is_delayed(&self) -> bool {
        matches!(self, Self::ZlibOpenssh)
    }

    pub(crate) fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Zlib | Self::ZlibOpenssh => {
                let mut encoder = Encoder::new(Vec::new()).map_err(Error::Io)?;
                encoder.write_all(data).map_err(Error::Io)?;
                encoder.finish().into_result().map_err(Error::Io)
            }
            Self::None => Ok(data.to_vec()),
        }
    }

    pub(crate) fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Zlib | Self::ZlibOpenssh => {
                let mut decoder = Decoder::new(data).map_err(Error::Io)?;
                let mut out = Vec::new();
                decoder.read_to_end(&mut out).map_err(Error::Io)?;
                Ok(out)
            }
            Self::None => Ok(data.to_vec()),
        }
    }
}
