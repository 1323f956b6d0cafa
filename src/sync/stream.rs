use std::io::{Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(feature = "sync-tls")]
use native_tls::TlsStream;

use crate::error::{Error, Result};

/// A byte stream a session can run over
///
/// Tests plug in scripted streams; [`Stream`] is the socket implementation.
pub trait Transport: Read + Write + Sized {
    /// Wrap the stream in TLS after the server accepted `CapabilitiesSet{tls}`
    fn upgrade_to_tls(self, _host: &str) -> Result<Self> {
        Err(Error::TlsError(
            "TLS is not supported by this transport".to_string(),
        ))
    }

    fn set_nonblocking(&self, _nonblocking: bool) -> Result<()> {
        Ok(())
    }
}

pub enum Stream {
    Tcp(TcpStream),
    #[cfg(feature = "sync-tls")]
    Tls(TlsStream<TcpStream>),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Stream {
    pub fn tcp(stream: TcpStream) -> Self {
        Self::Tcp(stream)
    }

    #[cfg(unix)]
    pub fn unix(stream: UnixStream) -> Self {
        Self::Unix(stream)
    }

    pub fn is_tls(&self) -> bool {
        match self {
            #[cfg(feature = "sync-tls")]
            Self::Tls(_) => true,
            _ => false,
        }
    }
}

impl Transport for Stream {
    #[cfg(feature = "sync-tls")]
    fn upgrade_to_tls(self, host: &str) -> Result<Self> {
        let tcp = match self {
            Self::Tcp(tcp) => tcp,
            Self::Tls(_) => return Err(Error::TlsError("Already using TLS".to_string())),
            #[cfg(unix)]
            Self::Unix(_) => {
                return Err(Error::TlsError(
                    "TLS not supported for Unix sockets".to_string(),
                ));
            }
        };

        let connector = native_tls::TlsConnector::new()?;
        let tls_stream = connector
            .connect(host, tcp)
            .map_err(|e| Error::TlsError(e.to_string()))?;

        Ok(Self::Tls(tls_stream))
    }

    fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        match self {
            Self::Tcp(s) => s.set_nonblocking(nonblocking)?,
            #[cfg(feature = "sync-tls")]
            Self::Tls(s) => s.get_ref().set_nonblocking(nonblocking)?,
            #[cfg(unix)]
            Self::Unix(s) => s.set_nonblocking(nonblocking)?,
        }
        Ok(())
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Tcp(s) => s.read(buf),
            #[cfg(feature = "sync-tls")]
            Self::Tls(s) => s.read(buf),
            #[cfg(unix)]
            Self::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Tcp(s) => s.write(buf),
            #[cfg(feature = "sync-tls")]
            Self::Tls(s) => s.write(buf),
            #[cfg(unix)]
            Self::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Tcp(s) => s.flush(),
            #[cfg(feature = "sync-tls")]
            Self::Tls(s) => s.flush(),
            #[cfg(unix)]
            Self::Unix(s) => s.flush(),
        }
    }
}
