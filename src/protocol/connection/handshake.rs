use crate::constant::{
    ServerMessageType, TLS_UNSUPPORTED_CODE, TLS_UNSUPPORTED_SEVERITY, TLS_UNSUPPORTED_SQL_STATE,
};
use crate::error::{Error, Result, ServerError};
use crate::opts::{AuthMechanism, SslMode};
use crate::protocol::datatypes::{Any, Scalar};
use crate::protocol::dispatch::{Step, dispatch_auth, dispatch_reply, dispatch_session_state};
use crate::protocol::frame::encode_frame;
use crate::protocol::message::{
    AuthenticateContinue, AuthenticateStart, CapabilitiesSet, ErrorMsg, ServerMessage,
};
use crate::protocol::notice::NoticeFrame;
use crate::protocol::r#trait::{AuthProcessor, Processor, ReplyProcessor, SessionStateProcessor};

// ============================================================================
// Authentication Mechanisms
// ============================================================================

/// MYSQL41 scramble
///
/// Formula: SHA1(password) XOR SHA1(salt + SHA1(SHA1(password)))
pub fn mysql41_scramble(password: &str, salt: &[u8]) -> [u8; 20] {
    use sha1::{Digest, Sha1};

    let stage1 = Sha1::digest(password.as_bytes());
    let stage2 = Sha1::digest(stage1);

    let mut hasher = Sha1::new();
    hasher.update(salt);
    hasher.update(stage2);
    let token = hasher.finalize();

    let mut result = [0u8; 20];
    for (out, (a, b)) in result.iter_mut().zip(stage1.iter().zip(token.iter())) {
        *out = a ^ b;
    }
    result
}

/// SHA256_MEMORY scramble
///
/// Formula: SHA256(password) XOR SHA256(SHA256(SHA256(password)) + nonce)
pub fn sha256_memory_scramble(password: &str, nonce: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let stage1 = Sha256::digest(password.as_bytes());
    let stage2 = Sha256::digest(stage1);

    let mut hasher = Sha256::new();
    hasher.update(stage2);
    hasher.update(nonce);
    let scramble = hasher.finalize();

    let mut result = [0u8; 32];
    for (out, (a, b)) in result.iter_mut().zip(stage1.iter().zip(scramble.iter())) {
        *out = a ^ b;
    }
    result
}

fn push_hex_upper(out: &mut Vec<u8>, bytes: &[u8]) {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    for byte in bytes {
        out.push(DIGITS[usize::from(byte >> 4)]);
        out.push(DIGITS[usize::from(byte & 0x0F)]);
    }
}

/// `schema\0user\0`
fn auth_prefix(schema: &str, user: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(schema.len() + user.len() + 2);
    out.extend_from_slice(schema.as_bytes());
    out.push(0);
    out.extend_from_slice(user.as_bytes());
    out.push(0);
    out
}

/// Response to the MYSQL41 challenge: `schema\0user\0*HEX(scramble)`
///
/// The hash part is left out for an empty password.
pub fn mysql41_response(schema: &str, user: &str, password: &str, salt: &[u8]) -> Vec<u8> {
    let mut out = auth_prefix(schema, user);
    if !password.is_empty() {
        out.push(b'*');
        push_hex_upper(&mut out, &mysql41_scramble(password, salt));
    }
    out
}

/// Response to the SHA256_MEMORY challenge: `schema\0user\0HEX(scramble)`
pub fn sha256_memory_response(schema: &str, user: &str, password: &str, nonce: &[u8]) -> Vec<u8> {
    let mut out = auth_prefix(schema, user);
    push_hex_upper(&mut out, &sha256_memory_scramble(password, nonce));
    out
}

/// Initial data of PLAIN: `schema\0user\0password`
pub fn plain_auth_data(schema: &str, user: &str, password: &str) -> Vec<u8> {
    let mut out = auth_prefix(schema, user);
    out.extend_from_slice(password.as_bytes());
    out
}

/// Whether `err` is the server's way of saying it has no TLS support
pub fn is_tls_unsupported(err: &ServerError) -> bool {
    err.code == TLS_UNSUPPORTED_CODE
        && err.severity == TLS_UNSUPPORTED_SEVERITY
        && err.sql_state == TLS_UNSUPPORTED_SQL_STATE
}

// ============================================================================
// State Machine API for Handshake
// ============================================================================

/// Configuration for handshake
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    pub user: String,
    pub password: String,
    pub schema: Option<String>,
    pub ssl_mode: SslMode,
    /// `None` picks PLAIN on a secure transport and MYSQL41 otherwise
    pub auth: Option<AuthMechanism>,
    /// The transport is already private (unix socket)
    pub secure_transport: bool,
}

impl HandshakeConfig {
    fn schema(&self) -> &str {
        self.schema.as_deref().unwrap_or_default()
    }
}

/// Result of driving the handshake state machine
#[derive(Debug, PartialEq, Eq)]
pub enum HandshakeResult {
    /// Write these frames to the server, then read the next message
    Write(Vec<u8>),
    /// Nothing to write, read the next message
    Read,
    /// Wrap the stream in TLS, then call `drive_after_tls()`
    UpgradeTls,
    /// Handshake complete
    Connected {
        tls: bool,
        mechanism: AuthMechanism,
        client_id: Option<u64>,
    },
}

/// State machine for the X Protocol connection handshake
///
/// Pure message processing without I/O. The client speaks first: call
/// `start()`, send what it returns, then feed every server message to
/// `drive()`.
#[derive(Debug)]
pub enum Handshake {
    Start {
        config: HandshakeConfig,
    },
    /// Sent `CapabilitiesSet{tls}`, waiting for Ok or Error
    WaitingTlsReply {
        config: HandshakeConfig,
        client_id: Option<u64>,
    },
    /// Server agreed to TLS, the caller upgrades the stream
    WaitingTlsUpgrade {
        config: HandshakeConfig,
        client_id: Option<u64>,
    },
    /// Sent `AuthenticateStart` or `AuthenticateContinue`
    Authenticating {
        config: HandshakeConfig,
        mechanism: AuthMechanism,
        tls: bool,
        client_id: Option<u64>,
    },
    Connected,
}

/// Collects what one server message said
#[derive(Debug, Default)]
struct Exchange {
    ok: bool,
    error: Option<ServerError>,
    challenge: Option<Vec<u8>>,
    client_id: Option<u64>,
}

impl Processor for Exchange {
    fn error(&mut self, err: &ErrorMsg<'_>) -> Result<()> {
        self.error = Some(ServerError::from(err));
        Ok(())
    }

    fn notice(&mut self, frame: &NoticeFrame<'_>) -> Result<()> {
        dispatch_session_state(frame, self)?;
        Ok(())
    }
}

impl SessionStateProcessor for Exchange {
    fn client_id(&mut self, id: u64) -> Result<()> {
        self.client_id = Some(id);
        Ok(())
    }
}

impl ReplyProcessor for Exchange {
    fn ok(&mut self, _msg: &str) -> Result<()> {
        self.ok = true;
        Ok(())
    }
}

impl AuthProcessor for Exchange {
    fn auth_continue(&mut self, data: &[u8]) -> Result<()> {
        self.challenge = Some(data.to_vec());
        Ok(())
    }

    fn auth_ok(&mut self, _data: &[u8]) -> Result<()> {
        self.ok = true;
        Ok(())
    }
}

impl Handshake {
    pub fn new(config: HandshakeConfig) -> Self {
        Self::Start { config }
    }

    /// Produce the first frames of the handshake
    pub fn start(&mut self) -> Result<HandshakeResult> {
        match std::mem::replace(self, Self::Connected) {
            Self::Start { config } => {
                if config.ssl_mode == SslMode::Disabled {
                    return self.begin_auth(config, false, None);
                }
                let mut out = Vec::new();
                encode_frame(
                    &mut out,
                    &CapabilitiesSet {
                        capabilities: vec![("tls", Any::Scalar(Scalar::Bool(true)))],
                    },
                );
                *self = Self::WaitingTlsReply {
                    config,
                    client_id: None,
                };
                Ok(HandshakeResult::Write(out))
            }
            other => {
                *self = other;
                Err(Error::UsageError("handshake already started"))
            }
        }
    }

    /// Drive the state machine with the next server message
    ///
    /// # Returns
    /// * `Ok(HandshakeResult::Write)` - Write these frames, then read the next message
    /// * `Ok(HandshakeResult::Read)` - Read the next message
    /// * `Ok(HandshakeResult::UpgradeTls)` - Upgrade the stream, then call `drive_after_tls()`
    /// * `Ok(HandshakeResult::Connected)` - Handshake complete
    /// * `Err(Error)` - The handshake failed and the connection is unusable
    pub fn drive(&mut self, msg: &ServerMessage<'_>) -> Result<HandshakeResult> {
        match std::mem::replace(self, Self::Connected) {
            Self::WaitingTlsReply {
                config,
                mut client_id,
            } => {
                let mut exchange = Exchange::default();
                let step = dispatch_reply(msg, &mut exchange)?;
                client_id = exchange.client_id.or(client_id);

                if step == Step::Continue {
                    *self = Self::WaitingTlsReply { config, client_id };
                    return Ok(HandshakeResult::Read);
                }
                if let Some(err) = exchange.error {
                    if config.ssl_mode == SslMode::Preferred && is_tls_unsupported(&err) {
                        tracing::debug!("server has no TLS support, continuing in plaintext");
                        return self.begin_auth(config, false, client_id);
                    }
                    return Err(err.into());
                }
                *self = Self::WaitingTlsUpgrade { config, client_id };
                Ok(HandshakeResult::UpgradeTls)
            }

            Self::Authenticating {
                config,
                mechanism,
                tls,
                mut client_id,
            } => {
                let mut exchange = Exchange::default();
                let step = dispatch_auth(msg, &mut exchange)?;
                client_id = exchange.client_id.or(client_id);

                if step == Step::Continue {
                    *self = Self::Authenticating {
                        config,
                        mechanism,
                        tls,
                        client_id,
                    };
                    return Ok(HandshakeResult::Read);
                }
                if let Some(err) = exchange.error {
                    tracing::warn!(code = err.code, "authentication failed");
                    return Err(Error::AuthFailed(err));
                }
                if let Some(challenge) = exchange.challenge {
                    let response = challenge_response(&config, mechanism, &challenge)?;
                    let mut out = Vec::new();
                    encode_frame(
                        &mut out,
                        &AuthenticateContinue {
                            auth_data: &response,
                        },
                    );
                    *self = Self::Authenticating {
                        config,
                        mechanism,
                        tls,
                        client_id,
                    };
                    return Ok(HandshakeResult::Write(out));
                }
                Ok(HandshakeResult::Connected {
                    tls,
                    mechanism,
                    client_id,
                })
            }

            other => {
                *self = other;
                Err(Error::LibraryBug(crate::error::eyre!(
                    "handshake driven in state {:?}",
                    self
                )))
            }
        }
    }

    /// Continue the handshake after the stream was wrapped in TLS
    pub fn drive_after_tls(&mut self) -> Result<HandshakeResult> {
        match std::mem::replace(self, Self::Connected) {
            Self::WaitingTlsUpgrade { config, client_id } => self.begin_auth(config, true, client_id),
            other => {
                *self = other;
                Err(Error::UsageError("no TLS upgrade pending"))
            }
        }
    }

    fn begin_auth(
        &mut self,
        config: HandshakeConfig,
        tls: bool,
        client_id: Option<u64>,
    ) -> Result<HandshakeResult> {
        let secure = tls || config.secure_transport;
        let mechanism = config.auth.unwrap_or(if secure {
            AuthMechanism::Plain
        } else {
            AuthMechanism::Mysql41
        });
        if mechanism == AuthMechanism::Plain && !secure {
            return Err(Error::BadConfigError(
                "PLAIN authentication requires a TLS connection".to_string(),
            ));
        }
        tracing::debug!(?mechanism, tls, "starting authentication");

        let auth_data = match mechanism {
            AuthMechanism::Plain => {
                plain_auth_data(config.schema(), &config.user, &config.password)
            }
            AuthMechanism::Mysql41 | AuthMechanism::Sha256Memory => Vec::new(),
        };
        let mut out = Vec::new();
        encode_frame(
            &mut out,
            &AuthenticateStart {
                mech_name: mechanism.name(),
                auth_data: &auth_data,
                initial_response: &[],
            },
        );
        *self = Self::Authenticating {
            config,
            mechanism,
            tls,
            client_id,
        };
        Ok(HandshakeResult::Write(out))
    }
}

fn challenge_response(
    config: &HandshakeConfig,
    mechanism: AuthMechanism,
    challenge: &[u8],
) -> Result<Vec<u8>> {
    match mechanism {
        AuthMechanism::Mysql41 => Ok(mysql41_response(
            config.schema(),
            &config.user,
            &config.password,
            challenge,
        )),
        AuthMechanism::Sha256Memory => Ok(sha256_memory_response(
            config.schema(),
            &config.user,
            &config.password,
            challenge,
        )),
        AuthMechanism::Plain => Err(Error::UnexpectedMessage {
            phase: "authenticating with PLAIN",
            actual: ServerMessageType::AuthenticateContinue,
        }),
    }
}
