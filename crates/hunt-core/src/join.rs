//! Join parameters and their enumerations

use crate::error::{BridgeError, Result};
use crate::rpc::JoinRequest;
use serde::{Deserialize, Serialize};

/// Width of the name field in the join message
pub const NAME_LEN: usize = 20;

/// Width of the terminal name field in the join message
pub const TTY_NAME_LEN: usize = 20;

/// Terminal name substituted when the caller leaves it empty
pub const DEFAULT_TTY_NAME: &str = "/dev/tty-web";

/// Team selector: one of `'0'..='9'` or a space for "no team"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Team(u8);

impl Team {
    /// No team
    pub const NONE: Team = Team(b' ');

    /// Parse the wire representation; `"none"` normalizes to a space
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "none" | " " => Ok(Team::NONE),
            _ => match s.as_bytes() {
                [b @ b'0'..=b'9'] => Ok(Team(*b)),
                _ => Err(BridgeError::InvalidParams(format!("bad Team {:?}", s))),
            },
        }
    }

    /// The single byte written to the wire
    pub fn as_byte(self) -> u8 {
        self.0
    }

    /// Build from the wire byte, rejecting anything outside the team set
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            b' ' | b'0'..=b'9' => Ok(Team(b)),
            _ => Err(BridgeError::InvalidParams(format!("bad Team byte {:#04x}", b))),
        }
    }
}

/// How the player enters the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnterStatus {
    Cloak,
    Fly,
    Scan,
}

impl EnterStatus {
    /// Protocol value (`Q_CLOAK`, `Q_FLY`, `Q_SCAN`)
    pub fn as_u32(self) -> u32 {
        match self {
            EnterStatus::Cloak => 1,
            EnterStatus::Fly => 2,
            EnterStatus::Scan => 3,
        }
    }

    pub fn from_u32(v: u32) -> Result<Self> {
        match v {
            1 => Ok(EnterStatus::Cloak),
            2 => Ok(EnterStatus::Fly),
            3 => Ok(EnterStatus::Scan),
            _ => Err(BridgeError::InvalidParams(format!("bad EnterStatus {}", v))),
        }
    }
}

/// What kind of connection is being made to the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectMode {
    /// Interactive player
    Player,
    /// Watch only
    Monitor,
    /// Deliver a one-off text message and hang up
    Message,
}

impl ConnectMode {
    /// Protocol value (`C_PLAYER`, `C_MONITOR`, `C_MESSAGE`)
    pub fn as_u32(self) -> u32 {
        match self {
            ConnectMode::Player => 0,
            ConnectMode::Monitor => 1,
            ConnectMode::Message => 2,
        }
    }

    pub fn from_u32(v: u32) -> Result<Self> {
        match v {
            0 => Ok(ConnectMode::Player),
            1 => Ok(ConnectMode::Monitor),
            2 => Ok(ConnectMode::Message),
            _ => Err(BridgeError::InvalidParams(format!("bad ConnectMode {}", v))),
        }
    }
}

/// Validated join parameters
///
/// Name and terminal name are guaranteed to fit their fixed-width wire
/// fields, so encoding a `JoinParameters` cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinParameters {
    uid: u32,
    name: String,
    team: Team,
    enter_status: EnterStatus,
    tty_name: String,
    connect_mode: ConnectMode,
}

impl JoinParameters {
    pub fn new(
        uid: u32,
        name: impl Into<String>,
        team: Team,
        enter_status: EnterStatus,
        tty_name: impl Into<String>,
        connect_mode: ConnectMode,
    ) -> Result<Self> {
        let name = name.into();
        let mut tty_name = tty_name.into();

        if name.is_empty() {
            return Err(BridgeError::InvalidParams("missing Name".into()));
        }
        if name.contains('\0') {
            return Err(BridgeError::InvalidParams("Name contains NUL".into()));
        }
        if name.len() > NAME_LEN {
            return Err(BridgeError::InvalidParams(format!(
                "Name too long: {} bytes, max {}",
                name.len(),
                NAME_LEN
            )));
        }
        if tty_name.is_empty() {
            tty_name = DEFAULT_TTY_NAME.to_string();
        }
        if tty_name.contains('\0') {
            return Err(BridgeError::InvalidParams("Ttyname contains NUL".into()));
        }
        if tty_name.len() > TTY_NAME_LEN {
            return Err(BridgeError::InvalidParams(format!(
                "Ttyname too long: {} bytes, max {}",
                tty_name.len(),
                TTY_NAME_LEN
            )));
        }

        Ok(Self {
            uid,
            name,
            team,
            enter_status,
            tty_name,
            connect_mode,
        })
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn team(&self) -> Team {
        self.team
    }

    pub fn enter_status(&self) -> EnterStatus {
        self.enter_status
    }

    pub fn tty_name(&self) -> &str {
        &self.tty_name
    }

    pub fn connect_mode(&self) -> ConnectMode {
        self.connect_mode
    }
}

impl TryFrom<&JoinRequest> for JoinParameters {
    type Error = BridgeError;

    fn try_from(req: &JoinRequest) -> Result<Self> {
        JoinParameters::new(
            req.uid,
            req.name.clone(),
            Team::parse(&req.team)?,
            EnterStatus::from_u32(req.enter_status)?,
            req.ttyname.clone(),
            ConnectMode::from_u32(req.connect_mode)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> JoinRequest {
        JoinRequest {
            uid: 1000,
            name: "tad".into(),
            team: "3".into(),
            enter_status: 2,
            ttyname: "web".into(),
            connect_mode: 0,
            token: 1,
        }
    }

    #[test]
    fn test_team_none_normalizes_to_space() {
        assert_eq!(Team::parse("none").unwrap().as_byte(), b' ');
        assert_eq!(Team::parse(" ").unwrap(), Team::NONE);
    }

    #[test]
    fn test_team_digits() {
        for d in 0..=9 {
            let s = d.to_string();
            assert_eq!(Team::parse(&s).unwrap().as_byte(), s.as_bytes()[0]);
        }
    }

    #[test]
    fn test_team_rejects_everything_else() {
        for bad in ["", "10", "a", "None", "  ", "-1"] {
            assert!(Team::parse(bad).is_err(), "accepted {:?}", bad);
        }
        assert!(Team::from_byte(b'x').is_err());
    }

    #[test]
    fn test_from_request() {
        let params = JoinParameters::try_from(&request()).unwrap();
        assert_eq!(params.uid(), 1000);
        assert_eq!(params.name(), "tad");
        assert_eq!(params.team().as_byte(), b'3');
        assert_eq!(params.enter_status(), EnterStatus::Fly);
        assert_eq!(params.tty_name(), "web");
        assert_eq!(params.connect_mode(), ConnectMode::Player);
    }

    #[test]
    fn test_default_tty_name() {
        let mut req = request();
        req.ttyname = String::new();
        let params = JoinParameters::try_from(&req).unwrap();
        assert_eq!(params.tty_name(), DEFAULT_TTY_NAME);
    }

    #[test]
    fn test_rejects_bad_enums() {
        let mut req = request();
        req.enter_status = 0;
        assert!(matches!(
            JoinParameters::try_from(&req),
            Err(BridgeError::InvalidParams(_))
        ));

        let mut req = request();
        req.connect_mode = 3;
        assert!(matches!(
            JoinParameters::try_from(&req),
            Err(BridgeError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_name_bounds() {
        let mut req = request();
        req.name = "x".repeat(NAME_LEN);
        assert!(JoinParameters::try_from(&req).is_ok());

        req.name = "x".repeat(NAME_LEN + 1);
        assert!(JoinParameters::try_from(&req).is_err());

        req.name = String::new();
        assert!(JoinParameters::try_from(&req).is_err());

        req.name = "ab\0cd".into();
        assert!(matches!(
            JoinParameters::try_from(&req),
            Err(BridgeError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_tty_name_rejects_nul() {
        let mut req = request();
        req.ttyname = "tty\0".into();
        assert!(matches!(
            JoinParameters::try_from(&req),
            Err(BridgeError::InvalidParams(_))
        ));
    }
}
