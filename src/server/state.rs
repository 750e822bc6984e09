use std::sync::Arc;
use std::time::Instant;

use crate::auth::JwtValidator;
use crate::config::Settings;
use crate::connection_manager::ConnectionManager;
use crate::fanout::FanoutDispatcher;
use crate::membership::MembershipStore;
use crate::presence::PresenceTracker;
use crate::rooms::{RoomManager, RoomRegistry};
use crate::websocket::EventRouter;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt_validator: Arc<JwtValidator>,
    pub connection_manager: Arc<ConnectionManager>,
    pub rooms: Arc<RoomRegistry>,
    pub presence: Arc<PresenceTracker>,
    pub fanout: Arc<FanoutDispatcher>,
    pub router: Arc<EventRouter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings, membership: Arc<dyn MembershipStore>) -> Self {
        let jwt_validator = Arc::new(JwtValidator::new(&settings.jwt));
        let connection_manager = Arc::new(ConnectionManager::new());
        let rooms = Arc::new(RoomRegistry::new());
        let presence = Arc::new(PresenceTracker::new());
        let fanout = Arc::new(FanoutDispatcher::new(
            connection_manager.clone(),
            rooms.clone(),
        ));
        let room_manager = Arc::new(RoomManager::new(rooms.clone(), membership));
        let router = Arc::new(EventRouter::new(
            connection_manager.clone(),
            room_manager,
            presence.clone(),
            fanout.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            jwt_validator,
            connection_manager,
            rooms,
            presence,
            fanout,
            router,
            start_time: Instant::now(),
        }
    }
}
