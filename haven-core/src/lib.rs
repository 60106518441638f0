pub mod config;
pub mod diary;
pub mod message;
pub mod persona;

// Config re-exports
pub use config::{
    Backend, ClientSettings, Config, ConfigError, DeadlineMode, DiarySettings, GatewaySettings,
    LoggingSettings, PromptSettings, ResilienceSettings, Secrets, Settings, SettingsError,
    load_dotenv,
};

// Domain re-exports
pub use diary::{
    DiaryEntry, DiaryStore, JsonFileDiaryStore, MemoryDiaryStore, StoreError, prepend_entry,
};
pub use message::{
    ChatMessage, ChatRole, GatewayErrorBody, GatewayReply, GatewayRequest,
    MISSING_UPSTREAM_CREDENTIAL, ReplySuggestion,
};
pub use persona::Persona;
