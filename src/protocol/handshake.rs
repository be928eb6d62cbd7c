//! Connection handshake: capability discovery, TLS negotiation and
//! authentication.
//!
//! The handshake is a fixed sequence of exchanges driven by the session:
//!
//! 1. `CAPABILITIES_GET`, answered by `CAPABILITIES`
//! 2. optionally `CAPABILITIES_SET{tls=true}`, answered by `OK`, after which
//!    the socket is wrapped in TLS
//! 3. `AUTH_START`, followed by any number of `AUTH_CONTINUE` round trips,
//!    ending in `AUTH_OK` or `AUTH_FAIL`
//!
//! Credentials never appear in log output.

use sha1::{Digest, Sha1};
use tracing::{debug, info, instrument, warn};

use crate::config::{AuthMethod, ClientConfig, TlsMode};
use crate::error::{constants, Error, Result};
use crate::protocol::exchange::Channel;
use crate::protocol::message::{ClientMessage, ServerMessage, ServerTag};
use crate::protocol::schema::{
    Any, AuthenticateContinue, AuthenticateStart, Capabilities, CapabilitiesGet, CapabilitiesSet,
    Capability, Notice, Scalar,
};
use crate::session::Credentials;
use crate::transport::TransportKind;

/// Capability name the server uses to advertise TLS support.
pub const CAP_TLS: &str = "tls";

/// Capability listing the authentication mechanisms the server accepts.
pub const CAP_AUTH_MECHANISMS: &str = "authentication.mechanisms";

/// Upper bound on `AUTH_CONTINUE` round trips before giving up.
pub const MAX_AUTH_STEPS: usize = 8;

const AUTH_EXPECTED: &[ServerTag] = &[
    ServerTag::AuthContinue,
    ServerTag::AuthOk,
    ServerTag::AuthFail,
    ServerTag::Notice,
];

/// Authentication mechanism as sent in `AUTH_START`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    /// Credentials in clear text; only safe over TLS or a local socket.
    Plain,
    /// SHA1 challenge/response.
    Mysql41,
}

impl Mechanism {
    pub fn name(self) -> &'static str {
        match self {
            Mechanism::Plain => "PLAIN",
            Mechanism::Mysql41 => "MYSQL41",
        }
    }

    /// Picks the mechanism for `method` given whether the channel is
    /// encrypted or local.
    pub fn select(method: AuthMethod, secure: bool) -> Self {
        match method {
            AuthMethod::Plain => Mechanism::Plain,
            AuthMethod::Mysql41 => Mechanism::Mysql41,
            AuthMethod::Auto if secure => Mechanism::Plain,
            AuthMethod::Auto => Mechanism::Mysql41,
        }
    }

    /// The `AUTH_START` message opening this mechanism.
    pub fn start(self, credentials: &Credentials, schema: &str) -> AuthenticateStart {
        let auth_data = match self {
            Mechanism::Plain => Some(plain_auth_data(credentials, schema)),
            Mechanism::Mysql41 => None,
        };
        AuthenticateStart {
            mech_name: self.name().to_string(),
            auth_data,
            initial_response: None,
        }
    }

    /// Answer to a server challenge.
    pub fn respond(self, challenge: &[u8], credentials: &Credentials, schema: &str) -> Result<Vec<u8>> {
        match self {
            Mechanism::Plain => Err(Error::Authentication(
                "server sent a challenge to PLAIN authentication".to_string(),
            )),
            Mechanism::Mysql41 => Ok(mysql41_auth_data(credentials, schema, challenge)),
        }
    }
}

/// `schema \0 user \0 password`
fn plain_auth_data(credentials: &Credentials, schema: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(schema.len() + credentials.user.len() + credentials.password.len() + 2);
    data.extend_from_slice(schema.as_bytes());
    data.push(0);
    data.extend_from_slice(credentials.user.as_bytes());
    data.push(0);
    data.extend_from_slice(credentials.password.as_bytes());
    data
}

/// `schema \0 user \0 *HEX(scramble)`, with no hash for an empty password.
fn mysql41_auth_data(credentials: &Credentials, schema: &str, salt: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(schema.len() + credentials.user.len() + 43);
    data.extend_from_slice(schema.as_bytes());
    data.push(0);
    data.extend_from_slice(credentials.user.as_bytes());
    data.push(0);
    if !credentials.password.is_empty() {
        let salt = salt.strip_suffix(&[0]).unwrap_or(salt);
        let scramble = mysql41_scramble(credentials.password.as_bytes(), salt);
        data.push(b'*');
        for byte in scramble {
            data.extend_from_slice(format!("{byte:02X}").as_bytes());
        }
    }
    data
}

/// `SHA1(password) XOR SHA1(salt + SHA1(SHA1(password)))`
pub fn mysql41_scramble(password: &[u8], salt: &[u8]) -> [u8; 20] {
    let hash1 = Sha1::digest(password);
    let hash2 = Sha1::digest(hash1);

    let mut hasher = Sha1::new();
    hasher.update(salt);
    hasher.update(hash2);
    let hash3 = hasher.finalize();

    let mut result = [0u8; 20];
    for (out, (a, b)) in result.iter_mut().zip(hash1.iter().zip(hash3.iter())) {
        *out = a ^ b;
    }
    result
}

/// Whether the server's capability set offers TLS.
pub fn offers_tls(capabilities: &Capabilities) -> bool {
    match capabilities.get(CAP_TLS) {
        Some(value) => value.as_scalar().and_then(Scalar::as_bool).unwrap_or(true),
        None => false,
    }
}

/// Authentication mechanisms advertised by the server, if listed.
pub fn advertised_mechanisms(capabilities: &Capabilities) -> Vec<String> {
    capabilities
        .get(CAP_AUTH_MECHANISMS)
        .map(|value| {
            value
                .elements()
                .into_iter()
                .filter_map(|element| element.as_scalar().and_then(Scalar::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Step 1: read the server's capabilities.
#[instrument(skip(channel))]
pub fn read_capabilities(channel: &mut Channel) -> Result<Capabilities> {
    let reply = channel.exchange(
        &ClientMessage::CapabilitiesGet(CapabilitiesGet {}),
        &[ServerTag::Capabilities],
        constants::CTX_CAPABILITIES_GET,
    )?;
    match reply {
        ServerMessage::Capabilities(capabilities) => {
            debug!(count = capabilities.capabilities.len(), "capabilities received");
            Ok(capabilities)
        }
        other => Err(Error::UnexpectedResponse {
            received_tag: other.tag() as u8,
            context: constants::CTX_CAPABILITIES_GET.to_string(),
        }),
    }
}

/// Step 2a: decides whether to switch to TLS.
///
/// Local sockets are never upgraded. Fails with [`Error::Config`] when TLS is
/// required but the server does not offer it.
pub fn wants_tls(kind: TransportKind, capabilities: &Capabilities, config: &ClientConfig) -> Result<bool> {
    if kind != TransportKind::Tcp {
        return Ok(false);
    }

    match (config.tls_mode, offers_tls(capabilities)) {
        (TlsMode::Disabled, _) => Ok(false),
        (TlsMode::Preferred, false) => {
            warn!("server does not offer TLS, continuing unencrypted");
            Ok(false)
        }
        (TlsMode::Required, false) => Err(Error::Config(
            "TLS is required but the server does not offer it".to_string(),
        )),
        (_, true) => Ok(true),
    }
}

/// Step 2b: asks the server to switch to TLS. The transport must be
/// upgraded right after this returns.
#[instrument(skip(channel))]
pub fn request_tls(channel: &mut Channel) -> Result<()> {
    let request = ClientMessage::CapabilitiesSet(CapabilitiesSet {
        capabilities: Some(Capabilities {
            capabilities: vec![Capability {
                name: CAP_TLS.to_string(),
                value: Some(Any::scalar(Scalar::bool(true))),
            }],
        }),
    });
    channel.exchange(&request, &[ServerTag::Ok], constants::CTX_CAPABILITIES_SET)?;
    info!("server accepted TLS");
    Ok(())
}

/// Step 3: authenticate with `mechanism`.
///
/// Notices received while authenticating are appended to `notices`.
#[instrument(skip(channel, credentials, schema, notices), fields(mechanism = mechanism.name(), user = %credentials.user))]
pub fn authenticate(
    channel: &mut Channel,
    mechanism: Mechanism,
    credentials: &Credentials,
    schema: &str,
    notices: &mut Vec<Notice>,
) -> Result<()> {
    let start = ClientMessage::AuthStart(mechanism.start(credentials, schema));
    let mut pending = channel.send(&start, AUTH_EXPECTED, constants::CTX_AUTH_START)?;
    let mut steps = 0;

    loop {
        match channel.complete(pending)? {
            ServerMessage::AuthOk(_) => {
                debug!(steps, "authenticated");
                return Ok(());
            }
            ServerMessage::AuthFail(fail) => {
                warn!(reason = %fail.msg, "authentication rejected");
                return Err(Error::Authentication(fail.msg));
            }
            ServerMessage::Notice(notice) => {
                notices.push(notice);
                pending = channel.expect(AUTH_EXPECTED, constants::CTX_AUTH_CONTINUE);
            }
            ServerMessage::AuthContinue(challenge) => {
                steps += 1;
                if steps > MAX_AUTH_STEPS {
                    return Err(Error::Authentication(format!(
                        "authentication did not finish within {MAX_AUTH_STEPS} steps"
                    )));
                }
                let auth_data = mechanism.respond(&challenge.auth_data, credentials, schema)?;
                pending = channel.send(
                    &ClientMessage::AuthContinue(AuthenticateContinue { auth_data }),
                    AUTH_EXPECTED,
                    constants::CTX_AUTH_CONTINUE,
                )?;
            }
            other => {
                return Err(Error::UnexpectedResponse {
                    received_tag: other.tag() as u8,
                    context: constants::CTX_AUTH_START.to_string(),
                })
            }
        }
    }
}
