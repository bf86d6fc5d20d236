use serde::{Deserialize, Serialize};

use super::string_or_number;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Group {
    #[serde(deserialize_with = "string_or_number")]
    pub group_code: String,
    pub group_name: String,
    pub member_count: u32,
    pub max_member: u32,
    pub remark: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Friend {
    pub uid: String,
    #[serde(deserialize_with = "string_or_number")]
    pub uin: String,
    pub nick: String,
    pub remark: Option<String>,
    pub avatar_url: Option<String>,
    pub is_online: bool,
    pub category_id: Option<i64>,
}

impl Friend {
    /// Remark if set, otherwise the nickname.
    pub fn display_name(&self) -> &str {
        self.remark
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.nick)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelfInfo {
    pub uid: String,
    #[serde(deserialize_with = "string_or_number")]
    pub uin: String,
    pub nick: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NapcatStatus {
    pub online: bool,
    pub self_info: Option<SelfInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeInfo {
    pub node_version: String,
    pub platform: String,
    /// Seconds since the service started.
    pub uptime: f64,
}

/// Response of `GET /api/system/info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemInfo {
    pub version: String,
    pub napcat: NapcatStatus,
    pub runtime: RuntimeInfo,
}

/// A finished export artifact stored by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportFile {
    pub file_name: String,
    pub file_path: Option<String>,
    pub relative_path: Option<String>,
    pub size: u64,
    pub create_time: Option<String>,
    pub chat_type: Option<String>,
    pub chat_id: Option<String>,
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_code_accepts_number() {
        let group: Group = serde_json::from_value(json!({
            "groupCode": 730_102_911,
            "groupName": "Rust CN",
            "memberCount": 312
        }))
        .unwrap();
        assert_eq!(group.group_code, "730102911");
        assert_eq!(group.member_count, 312);
        assert_eq!(group.remark, None);
    }

    #[test]
    fn test_friend_display_name_prefers_remark() {
        let mut friend = Friend {
            nick: "alice".to_string(),
            remark: Some(String::new()),
            ..Friend::default()
        };
        assert_eq!(friend.display_name(), "alice");
        friend.remark = Some("Alice (work)".to_string());
        assert_eq!(friend.display_name(), "Alice (work)");
    }

    #[test]
    fn test_system_info_nested_decode() {
        let info: SystemInfo = serde_json::from_value(json!({
            "version": "4.2.0",
            "napcat": {"online": true, "selfInfo": {"uid": "u_1", "uin": 10001, "nick": "bot"}},
            "runtime": {"nodeVersion": "v20.11.0", "platform": "win32", "uptime": 12.5}
        }))
        .unwrap();
        assert!(info.napcat.online);
        assert_eq!(info.napcat.self_info.unwrap().uin, "10001");
        assert_eq!(info.runtime.platform, "win32");
    }
}
