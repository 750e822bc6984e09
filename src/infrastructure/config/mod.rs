mod settings;

pub use settings::{
    DatabaseConfig, JwtConfig, MembershipConfig, ServerConfig, Settings, WebSocketConfig,
};
