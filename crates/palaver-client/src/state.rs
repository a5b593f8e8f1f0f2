//! Application state shared across the client tasks.
//!
//! [`ClientState`] is wrapped in `Arc<Mutex<>>` and handed to the bridge
//! loop and the sender at construction time; nothing mutates conversation
//! state except through the store it owns.

use tokio::sync::mpsc;

use palaver_net::NodeCommand;
use palaver_store::ConversationStore;

/// Central client state.
pub struct ClientState {
    /// The conversation store (exclusive owner of chats and messages).
    pub store: ConversationStore,

    /// Sender half of the channel used to dispatch commands to the node
    /// task. `None` until the node is started.
    pub node_cmd_tx: Option<mpsc::Sender<NodeCommand>>,

    /// Whether the application is in a visible/focused state. Together with
    /// the active chat this decides unread suppression. The headless client
    /// counts as visible.
    pub visible: bool,
}

impl ClientState {
    pub fn new(store: ConversationStore) -> Self {
        Self {
            store,
            node_cmd_tx: None,
            visible: true,
        }
    }
}
