//! # hop5
//!
//! A two-hop encrypted SOCKS5 proxy.
//!
//! ```text
//! client ──SOCKS5──▶ local hop ══ChaCha20 link══▶ remote hop ──TCP──▶ destination
//! ```
//!
//! The local hop speaks plain SOCKS5 (RFC 1928 subset: no-auth, CONNECT)
//! toward clients and relays each session over an encrypted TCP link to
//! the remote hop, which decrypts and forwards to the real destination.
//! One link per session; the two hops share a 32-byte secret provisioned
//! out of band.
//!
//! ## Modules
//!
//! - [`address`] — SOCKS5 wire address encoding
//! - [`cipher`] — per-direction ChaCha20 stream framing
//! - [`protocol`] — the inbound SOCKS5 handshake state machine
//! - [`tunnel`] — per-session pairing and bidirectional relay
//! - [`server`] — accept loop, one task per session
//! - [`config`] — startup-time configuration and validation
//!
//! ## Hop-to-hop wire contract
//!
//! Per session: each direction starts with a cleartext random 12-byte
//! nonce; the local→remote direction follows it with the target address
//! in SOCKS5 wire form, also in the clear. Everything after is an opaque
//! ChaCha20-encrypted byte stream keyed by the shared secret and that
//! direction's nonce. The remote hop only sends its nonce once its
//! destination connection is up, so the nonce doubles as the connect
//! acknowledgement.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod address;
pub mod cipher;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tunnel;

pub use address::Address;
pub use cipher::{CipherKey, CipherStream, Nonce, KEY_SIZE};
pub use config::{Config, ConfigFile, Mode};
pub use error::{Error, Result};
pub use server::Server;
