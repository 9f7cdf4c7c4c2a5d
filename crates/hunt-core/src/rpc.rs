//! RPC request and reply records
//!
//! Field names follow the PascalCase convention the existing web clients
//! already speak. Every reply echoes the caller's `Token` unchanged.

use serde::{Deserialize, Serialize};

/// Opaque caller token, echoed in every reply
pub type Token = i64;

/// Opaque session identifier handed out by `Join`
pub type PlayerId = String;

/// Join the game as a player or monitor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JoinRequest {
    pub uid: u32,
    pub name: String,
    /// `"0"..="9"`, `" "` or `"none"`
    pub team: String,
    /// `Q_CLOAK`, `Q_FLY` or `Q_SCAN`
    pub enter_status: u32,
    pub ttyname: String,
    /// `C_PLAYER`, `C_MONITOR` or `C_MESSAGE`
    pub connect_mode: u32,
    pub token: Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JoinReply {
    pub token: Token,
    #[serde(rename = "PlayerID")]
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QuitRequest {
    #[serde(rename = "PlayerID")]
    pub player_id: PlayerId,
    pub token: Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuitReply {
    pub token: Token,
}

/// Join, deliver a text message, and hang up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MessageRequest {
    pub join: JoinRequest,
    pub message: String,
    pub token: Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageReply {
    pub token: Token,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GameDataRequest {
    #[serde(rename = "PlayerID")]
    pub player_id: PlayerId,
    pub token: Token,
}

/// Screen data read from the daemon
///
/// Each raw byte is widened to a `u32` so clients never deal with
/// signedness of 8-bit values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameDataReply {
    pub token: Token,
    pub timeout: bool,
    pub timeout_error: String,
    pub data: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InputRequest {
    #[serde(rename = "PlayerID")]
    pub player_id: PlayerId,
    pub keys: String,
    pub token: Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputReply {
    pub token: Token,
    pub timeout: bool,
    pub timeout_error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StatsRequest {
    pub token: Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatsReply {
    pub token: Token,
    pub stats: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PingRequest {
    pub token: Token,
    pub seq: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PingReply {
    pub token: Token,
    pub seq: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_request_from_web_client() {
        // Exact JSON shape sent by the browser client
        let json = r#"{"Uid":31337,"Name":"tad","Team":"none","EnterStatus":2,"Ttyname":"web","ConnectMode":0,"Token":9}"#;
        let req: JoinRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.uid, 31337);
        assert_eq!(req.team, "none");
        assert_eq!(req.enter_status, 2);
        assert_eq!(req.ttyname, "web");
        assert_eq!(req.token, 9);
    }

    #[test]
    fn test_missing_fields_default() {
        let req: GameDataRequest = serde_json::from_str(r#"{"PlayerID":"abc"}"#).unwrap();
        assert_eq!(req.player_id, "abc");
        assert_eq!(req.token, 0);
    }

    #[test]
    fn test_reply_field_names() {
        let reply = JoinReply {
            token: 3,
            player_id: "p".into(),
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"Token":3,"PlayerID":"p"}"#);

        let reply = GameDataReply {
            token: 1,
            timeout: true,
            timeout_error: "deadline".into(),
            data: vec![255, 0],
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains(r#""TimeoutError":"deadline""#));
        assert!(json.contains(r#""Data":[255,0]"#));
    }
}
