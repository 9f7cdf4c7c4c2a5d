//! Join message codec for the hunt daemon's TCP protocol
//!
//! A join message is a fixed-layout, big-endian record:
//!
//! | field        | bytes |
//! |--------------|-------|
//! | uid          | 4     |
//! | name         | 20    |
//! | team         | 1     |
//! | enter status | 4     |
//! | tty name     | 20    |
//! | connect mode | 4     |
//!
//! followed by an optional 4-byte sentinel (see [`CompatFlags`]) and, for
//! message connections, the message text. The daemon answers with its
//! 4-byte protocol version.

use crate::transport::{IoOutcome, TimeoutStream};
use hunt_core::join::{NAME_LEN, TTY_NAME_LEN};
use hunt_core::{BridgeError, ConnectMode, EnterStatus, JoinParameters, Result, Team};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// The only protocol version the daemon is known to send
pub const SERVER_VERSION: u32 = 0xFFFF_FFFF;

/// Length of the join record without sentinel or message
pub const JOIN_LEN: usize = 4 + NAME_LEN + 1 + 4 + TTY_NAME_LEN + 4;

/// Filler written after the connect mode for daemons that read it as 8 bytes
pub const WIDE_MODE_SENTINEL: u32 = 0xfeed_face;

/// Per-daemon protocol quirks, fixed for the life of the process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompatFlags {
    /// The daemon reads the connect mode as an 8-byte field
    pub legacy_wide_mode_field: bool,
    /// The daemon sends its version only after reading the join record
    pub version_after_join: bool,
}

impl CompatFlags {
    /// Reference protocol behavior
    pub const NETBSD: CompatFlags = CompatFlags {
        legacy_wide_mode_field: false,
        version_after_join: false,
    };

    /// bsdgames as packaged by Debian
    pub const DEBIAN: CompatFlags = CompatFlags {
        legacy_wide_mode_field: true,
        version_after_join: false,
    };

    /// bsdgames-osx
    pub const DARWIN: CompatFlags = CompatFlags {
        legacy_wide_mode_field: false,
        version_after_join: true,
    };

    /// Look up a named preset
    pub fn preset(name: &str) -> Option<CompatFlags> {
        match name.to_ascii_lowercase().as_str() {
            "netbsd" => Some(Self::NETBSD),
            "debian" | "linux" => Some(Self::DEBIAN),
            "darwin" | "macos" | "osx" => Some(Self::DARWIN),
            _ => None,
        }
    }

    /// Length of the join record, sentinel included, without message
    pub fn join_len(self) -> usize {
        if self.legacy_wide_mode_field {
            JOIN_LEN + 4
        } else {
            JOIN_LEN
        }
    }
}

fn put_fixed(buf: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(width);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (width - n), 0);
}

/// Encode a join record followed by `message`
pub fn encode_join(params: &JoinParameters, message: &[u8], flags: CompatFlags) -> Vec<u8> {
    let expected = flags.join_len() + message.len();
    let mut buf = Vec::with_capacity(expected);

    buf.extend_from_slice(&params.uid().to_be_bytes());
    put_fixed(&mut buf, params.name(), NAME_LEN);
    buf.push(params.team().as_byte());
    buf.extend_from_slice(&params.enter_status().as_u32().to_be_bytes());
    put_fixed(&mut buf, params.tty_name(), TTY_NAME_LEN);
    buf.extend_from_slice(&params.connect_mode().as_u32().to_be_bytes());
    if flags.legacy_wide_mode_field {
        buf.extend_from_slice(&WIDE_MODE_SENTINEL.to_be_bytes());
    }
    buf.extend_from_slice(message);

    debug_assert_eq!(buf.len(), expected, "join record packing error");
    buf
}

struct Cursor<'a> {
    bytes: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < n {
            return Err(BridgeError::Protocol(format!(
                "short join record: need {} more bytes, have {}",
                n,
                self.bytes.len()
            )));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn fixed_str(&mut self, width: usize) -> Result<String> {
        let b = self.take(width)?;
        let end = b.iter().position(|&c| c == 0).unwrap_or(width);
        String::from_utf8(b[..end].to_vec())
            .map_err(|e| BridgeError::Protocol(format!("bad string field: {}", e)))
    }
}

fn protocol_err(err: BridgeError) -> BridgeError {
    match err {
        BridgeError::Protocol(_) => err,
        other => BridgeError::Protocol(other.to_string()),
    }
}

/// Decode a join record the way the daemon reads it
///
/// Returns the parameters and any trailing message bytes.
pub fn decode_join(bytes: &[u8], flags: CompatFlags) -> Result<(JoinParameters, Vec<u8>)> {
    let mut cur = Cursor { bytes };

    let uid = cur.u32()?;
    let name = cur.fixed_str(NAME_LEN)?;
    let team = Team::from_byte(cur.take(1)?[0]).map_err(protocol_err)?;
    let enter_status = EnterStatus::from_u32(cur.u32()?).map_err(protocol_err)?;
    let tty_name = cur.fixed_str(TTY_NAME_LEN)?;
    let connect_mode = ConnectMode::from_u32(cur.u32()?).map_err(protocol_err)?;
    if flags.legacy_wide_mode_field {
        cur.u32()?;
    }

    let params = JoinParameters::new(uid, name, team, enter_status, tty_name, connect_mode)
        .map_err(protocol_err)?;
    Ok((params, cur.bytes.to_vec()))
}

/// Check the daemon's protocol version
pub fn decode_version(bytes: [u8; 4]) -> Result<u32> {
    let version = u32::from_be_bytes(bytes);
    if version != SERVER_VERSION {
        return Err(BridgeError::Protocol(format!(
            "unexpected server version {:x}",
            version
        )));
    }
    Ok(version)
}

fn handshake_io<T>(what: &str, r: std::io::Result<IoOutcome<T>>) -> Result<T> {
    match r {
        Ok(IoOutcome::Complete(v)) => Ok(v),
        Ok(IoOutcome::TimedOut(msg)) => Err(BridgeError::Protocol(format!("{}: {}", what, msg))),
        Err(e) => Err(BridgeError::Protocol(format!("{}: {}", what, e))),
    }
}

async fn read_version<S>(stream: &mut TimeoutStream<S>) -> Result<u32>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut buf = [0u8; 4];
    handshake_io("read server version", stream.read_exact(&mut buf).await)?;
    decode_version(buf)
}

/// Run the join exchange on a freshly connected stream
///
/// The record and message go out as a single write so daemons that read
/// the message immediately after the record see it in one segment.
pub async fn handshake<S>(
    stream: &mut TimeoutStream<S>,
    params: &JoinParameters,
    message: &[u8],
    flags: CompatFlags,
) -> Result<u32>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let record = encode_join(params, message, flags);

    let version = if flags.version_after_join {
        handshake_io("write join", stream.write_all(&record).await)?;
        read_version(stream).await?
    } else {
        let version = read_version(stream).await?;
        handshake_io("write join", stream.write_all(&record).await)?;
        version
    };

    debug!(
        "Joined as {} (server version {:x}, {} bytes sent)",
        params.name(),
        version,
        record.len()
    );
    Ok(version)
}
