//! JSON snapshot persistence.
//!
//! The whole conversation state is serialized as a single JSON document,
//! written after every mutation and loaded once at startup. The snapshot
//! file is placed in the platform-appropriate data directory:
//! - Linux:   `~/.local/share/palaver/state.json`
//! - macOS:   `~/Library/Application Support/com.palaver.palaver/state.json`
//! - Windows: `{FOLDERID_RoamingAppData}\palaver\palaver\data\state.json`

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use palaver_shared::types::{Chat, Message, User};

use crate::error::{Result, StoreError};
use crate::state::{AppState, Language, Theme};

/// The persisted state layout. The foreground chat selection is deliberately
/// not part of it: every session starts with no active chat.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub lang: Language,
    #[serde(default)]
    pub self_user: Option<User>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub chats: Vec<Chat>,
    #[serde(default)]
    pub messages_map: HashMap<String, Vec<Message>>,
    #[serde(default)]
    pub my_peer_id: String,
}

impl Snapshot {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            theme: state.theme,
            lang: state.lang,
            self_user: state.self_user.clone(),
            token: state.token.clone(),
            chats: state.chats.clone(),
            messages_map: state.messages.clone(),
            my_peer_id: state.my_peer_id.clone(),
        }
    }

    pub fn into_state(self) -> AppState {
        AppState {
            theme: self.theme,
            lang: self.lang,
            self_user: self.self_user,
            token: self.token,
            chats: self.chats,
            messages: self.messages_map,
            my_peer_id: self.my_peer_id,
            active_chat_id: None,
        }
    }
}

/// Default snapshot location inside the platform data directory.
pub fn default_snapshot_path() -> Result<PathBuf> {
    let project_dirs =
        ProjectDirs::from("com", "palaver", "palaver").ok_or(StoreError::NoDataDir)?;
    Ok(project_dirs.data_dir().join("state.json"))
}

/// Load a snapshot from `path`. A missing file is not an error: the first
/// session simply starts empty.
pub fn load(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        return Ok(Snapshot::default());
    }
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write a snapshot to `path` via a temp file and rename, so a crash
/// mid-write never leaves a truncated snapshot behind.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
