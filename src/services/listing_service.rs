use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        Actor, Category, Flash, ListingPage, ListingState, PageSize, ProductResponse,
        SelectionState, SelectionView, SortField,
    },
    services::{product_policy::Capability, product_service::ProductService},
};

/// A user interaction with an open listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListingIntent {
    Search { value: String },
    Category { category_id: Option<i32> },
    SortBy { field: SortField },
    Page { page: u32 },
    PageSize { page_size: PageSize },
    ClearFilters,
    ToggleSelectAll { checked: bool },
    ToggleOne { id: i32 },
    ClearSelection,
    BulkDelete,
    Delete { id: i32 },
}

#[derive(Debug, Serialize)]
pub struct ListingView {
    pub session: Uuid,
    pub state: ListingState,
    pub items: Vec<ProductResponse>,
    pub total_count: i64,
    pub filtered_count: i64,
    pub page: u32,
    pub last_page: u32,
    pub page_size: u32,
    pub selection: SelectionView,
    pub categories: Vec<Category>,
    pub flash: Option<Flash>,
}

/// One open listing: its query state, the rows on screen, the checked rows
/// and a pending notification.
pub struct ListingController {
    id: Uuid,
    state: ListingState,
    selection: SelectionState,
    page: ListingPage,
    flash: Option<Flash>,
}

impl ListingController {
    pub async fn open(service: &ProductService, actor: &Actor) -> Result<Self> {
        service.authorize(actor, Capability::ViewAny, None)?;

        let mut controller = Self {
            id: Uuid::new_v4(),
            state: ListingState::default(),
            selection: SelectionState::new(),
            page: ListingPage::empty(PageSize::default()),
            flash: None,
        };
        controller.refresh(service).await?;

        Ok(controller)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &ListingState {
        &self.state
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn page(&self) -> &ListingPage {
        &self.page
    }

    pub fn flash(&self) -> Option<&Flash> {
        self.flash.as_ref()
    }

    /// Re-reads the current page and realigns the page number and the
    /// header checkbox with it.
    async fn refresh(&mut self, service: &ProductService) -> Result<()> {
        self.page = service.store().query(&self.state).await?;
        self.state.page = self.page.page;
        self.selection.recompute_select_all(&self.page.ids());
        Ok(())
    }

    pub async fn apply(
        &mut self,
        service: &ProductService,
        actor: &Actor,
        intent: ListingIntent,
    ) -> Result<()> {
        match intent {
            ListingIntent::Search { value } => {
                if self.state.set_search(value) {
                    self.selection.reset();
                }
            }
            ListingIntent::Category { category_id } => {
                if self.state.set_category(category_id) {
                    self.selection.reset();
                }
            }
            ListingIntent::SortBy { field } => {
                self.state.sort_by(field);
                self.selection.reset();
            }
            ListingIntent::Page { page } => self.state.set_page(page),
            ListingIntent::PageSize { page_size } => {
                if self.state.set_page_size(page_size) {
                    self.selection.reset();
                }
            }
            ListingIntent::ClearFilters => {
                self.state.clear_filters();
                self.selection.reset();
            }
            ListingIntent::ToggleSelectAll { checked } => {
                self.selection.toggle_select_all(&self.page.ids(), checked);
            }
            ListingIntent::ToggleOne { id } => {
                if !self.selection.toggle_one(id, &self.page.ids()) {
                    tracing::debug!("Ignored selection of product {} off the current page", id);
                }
            }
            ListingIntent::ClearSelection => self.selection.reset(),
            ListingIntent::BulkDelete => {
                let ids = self.selection.take();
                let outcome = service.bulk_delete(actor, ids).await?;
                if let Some(flash) = outcome.notification() {
                    self.flash = Some(flash);
                }
            }
            ListingIntent::Delete { id } => {
                self.flash = Some(service.soft_delete(actor, id).await?);
                if self.selection.contains(id) {
                    self.selection.toggle_one(id, &[]);
                }
            }
        }

        self.refresh(service).await
    }

    /// Builds the view and hands over the pending flash, so it shows once.
    pub async fn render(&mut self, service: &ProductService) -> Result<ListingView> {
        let categories = service.store().categories().await?;

        Ok(ListingView {
            session: self.id,
            state: self.state.clone(),
            items: self
                .page
                .items
                .iter()
                .cloned()
                .map(|product| service.to_response(product))
                .collect(),
            total_count: self.page.total_count,
            filtered_count: self.page.filtered_count,
            page: self.page.page,
            last_page: self.page.last_page,
            page_size: self.page.page_size,
            selection: self.selection.view(),
            categories,
            flash: self.flash.take(),
        })
    }
}

pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    owner: i32,
    controller: Arc<Mutex<ListingController>>,
    last_used: Instant,
}

impl SessionEntry {
    fn is_idle(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.duration_since(self.last_used) >= idle_timeout
    }
}

/// Open listings keyed by session id. A session is only visible to the
/// actor that opened it, and is dropped once unused for `idle_timeout`.
pub struct ListingSessions {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for ListingSessions {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_IDLE_TIMEOUT)
    }
}

fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Listing session {} not found", id))
}

impl ListingSessions {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Drops every session unused for longer than the idle timeout and
    /// returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_idle(now, self.idle_timeout));

        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!("Expired {} idle listing session(s)", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn open(&self, service: &ProductService, actor: &Actor) -> Result<ListingView> {
        let mut controller = ListingController::open(service, actor).await?;
        let view = controller.render(service).await?;
        let id = controller.id();

        self.cleanup_expired().await;
        self.sessions.write().await.insert(
            id,
            SessionEntry {
                owner: actor.id,
                controller: Arc::new(Mutex::new(controller)),
                last_used: Instant::now(),
            },
        );

        tracing::info!("User {} opened listing session {}", actor.id, id);

        Ok(view)
    }

    /// Looks up an owned, live session and marks it used.
    async fn controller(&self, actor: &Actor, id: Uuid) -> Result<Arc<Mutex<ListingController>>> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let Some(entry) = sessions.get_mut(&id).filter(|entry| entry.owner == actor.id) else {
            return Err(session_not_found(id));
        };
        if entry.is_idle(now, self.idle_timeout) {
            sessions.remove(&id);
            tracing::info!("Listing session {} expired", id);
            return Err(session_not_found(id));
        }

        entry.last_used = now;
        Ok(Arc::clone(&entry.controller))
    }

    pub async fn render(
        &self,
        service: &ProductService,
        actor: &Actor,
        id: Uuid,
    ) -> Result<ListingView> {
        let controller = self.controller(actor, id).await?;
        let mut controller = controller.lock().await;

        controller.render(service).await
    }

    pub async fn apply(
        &self,
        service: &ProductService,
        actor: &Actor,
        id: Uuid,
        intent: ListingIntent,
    ) -> Result<ListingView> {
        let controller = self.controller(actor, id).await?;
        let mut controller = controller.lock().await;

        controller.apply(service, actor, intent).await?;
        controller.render(service).await
    }

    pub async fn close(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.write().await;

        match sessions.get(&id) {
            Some(entry) if entry.owner == actor.id => {
                sessions.remove(&id);
                tracing::info!("User {} closed listing session {}", actor.id, id);
                Ok(())
            }
            _ => Err(session_not_found(id)),
        }
    }
}
