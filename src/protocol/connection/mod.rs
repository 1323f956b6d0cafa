mod handshake;


pub use handshake::Handshake;
pub use handshake::HandshakeConfig;
pub use handshake::HandshakeResult;
pub use handshake::is_tls_unsupported;
pub use handshake::mysql41_response;
pub use handshake::mysql41_scramble;
pub use handshake::plain_auth_data;
pub use handshake::sha256_memory_response;
pub use handshake::sha256_memory_scramble;
