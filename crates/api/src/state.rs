use std::sync::Arc;

use helpdesk_db::Store;
use helpdesk_desk::{ArticleReview, AssignmentService, MessageService, TicketService};
use helpdesk_events::ChangeBus;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all handlers via axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Every committed row change lands here; WebSocket watchers subscribe.
    pub bus: Arc<ChangeBus>,
    pub config: Arc<ServerConfig>,
    pub ws_manager: Arc<WsManager>,
}

impl AppState {
    pub fn tickets(&self) -> TicketService {
        TicketService::new(Arc::clone(&self.store))
    }

    pub fn messages(&self) -> MessageService {
        MessageService::new(Arc::clone(&self.store))
    }

    pub fn assignment(&self) -> AssignmentService {
        AssignmentService::new(Arc::clone(&self.store))
    }

    pub fn articles(&self) -> ArticleReview {
        ArticleReview::new(Arc::clone(&self.store))
    }
}
