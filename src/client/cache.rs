//! Offline-first card cache.
//!
//! Cached cards are shown first and replaced by the server list whenever the
//! server answers. Cards added while offline carry `offline: true` and a
//! locally generated id until `sync` uploads them; deletions of server cards
//! made while offline are queued the same way.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::AuthSession;
use super::ClientError;
use crate::cards::{matches_search, CardInput};
use crate::database::models::{Card, NewCard};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedCard {
    pub id: Uuid,
    pub store_name: String,
    pub card_number: String,
    pub color: String,
    pub is_qr_code: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub offline: bool,
}

impl CachedCard {
    /// A card created without reaching the server
    pub fn offline(card: NewCard) -> Self {
        Self {
            id: Uuid::new_v4(),
            store_name: card.store_name,
            card_number: card.card_number,
            color: card.color,
            is_qr_code: card.is_qr_code,
            created_at: Utc::now(),
            offline: true,
        }
    }

    pub fn to_input(&self) -> CardInput {
        CardInput {
            store_name: self.store_name.clone(),
            card_number: self.card_number.clone(),
            color: Some(self.color.clone()),
            is_qr_code: self.is_qr_code,
        }
    }
}

impl From<Card> for CachedCard {
    fn from(card: Card) -> Self {
        Self {
            id: card.id,
            store_name: card.store_name,
            card_number: card.card_number,
            color: card.color,
            is_qr_code: card.is_qr_code,
            created_at: card.created_at,
            offline: false,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    server: Option<String>,
    user_id: Option<Uuid>,
    #[serde(default)]
    cards: Vec<CachedCard>,
    #[serde(default)]
    pending_deletes: Vec<Uuid>,
    synced_at: Option<DateTime<Utc>>,
}

/// Cards to show plus whether they came from the server
#[derive(Debug, Clone)]
pub struct LoadedCards {
    pub cards: Vec<CachedCard>,
    pub offline: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub uploaded: usize,
    pub deleted: usize,
    pub failed: Vec<String>,
    pub total: usize,
}

pub struct CardCache {
    path: PathBuf,
    data: CacheFile,
}

impl CardCache {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable card cache {}: {}", path.display(), e);
                CacheFile::default()
            })
        } else {
            CacheFile::default()
        };
        Ok(Self { path, data })
    }

    /// Bind the cache to a server and user, dropping data cached for anyone else
    pub fn scope_to(&mut self, server: &str, user_id: Uuid) -> Result<(), ClientError> {
        let same = self.data.server.as_deref() == Some(server) && self.data.user_id == Some(user_id);
        if !same {
            self.data = CacheFile {
                server: Some(server.to_string()),
                user_id: Some(user_id),
                ..CacheFile::default()
            };
            self.save()?;
        }
        Ok(())
    }

    pub fn cards(&self) -> &[CachedCard] {
        &self.data.cards
    }

    pub fn pending_deletes(&self) -> &[Uuid] {
        &self.data.pending_deletes
    }

    pub fn pending_uploads(&self) -> usize {
        self.data.cards.iter().filter(|c| c.offline).count()
    }

    pub fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.data.synced_at
    }

    /// Find a card by full id, unique id prefix, or exact store name
    pub fn resolve(&self, needle: &str) -> Option<&CachedCard> {
        let needle = needle.trim();
        if let Ok(id) = Uuid::parse_str(needle) {
            return self.data.cards.iter().find(|c| c.id == id);
        }

        let lowered = needle.to_lowercase();
        let by_prefix: Vec<&CachedCard> = self
            .data
            .cards
            .iter()
            .filter(|c| !lowered.is_empty() && c.id.to_string().starts_with(&lowered))
            .collect();
        if let [card] = by_prefix.as_slice() {
            return Some(*card);
        }

        let by_name: Vec<&CachedCard> = self
            .data
            .cards
            .iter()
            .filter(|c| c.store_name.to_lowercase() == lowered)
            .collect();
        match by_name.as_slice() {
            [card] => Some(*card),
            _ => None,
        }
    }

    pub fn search(&self, query: &str) -> Vec<CachedCard> {
        self.data
            .cards
            .iter()
            .filter(|c| matches_search(&c.store_name, query))
            .cloned()
            .collect()
    }

    /// Replace cached server cards with `fresh`, keeping unsynced local work
    pub fn replace(&mut self, fresh: Vec<Card>) -> Result<(), ClientError> {
        let pending = &self.data.pending_deletes;
        let mut cards: Vec<CachedCard> = fresh
            .into_iter()
            .filter(|card| !pending.contains(&card.id))
            .map(CachedCard::from)
            .collect();
        cards.extend(self.data.cards.iter().filter(|c| c.offline).cloned());

        self.data.cards = cards;
        self.data.synced_at = Some(Utc::now());
        self.save()
    }

    pub fn insert(&mut self, card: CachedCard) -> Result<(), ClientError> {
        self.data.cards.push(card);
        self.save()
    }

    /// Remove a card locally. Server cards removed this way are queued for deletion.
    pub fn remove(&mut self, id: Uuid, queue_delete: bool) -> Result<Option<CachedCard>, ClientError> {
        let Some(index) = self.data.cards.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        let card = self.data.cards.remove(index);
        if queue_delete && !card.offline && !self.data.pending_deletes.contains(&id) {
            self.data.pending_deletes.push(id);
        }
        self.save()?;
        Ok(Some(card))
    }

    pub fn clear(&mut self) -> Result<(), ClientError> {
        self.data = CacheFile::default();
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn save(&self) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.data)?)?;
        Ok(())
    }

    /// Cached cards, refreshed from the server unless offline
    pub async fn load(&mut self, auth: &mut AuthSession, offline_mode: bool) -> Result<LoadedCards, ClientError> {
        if offline_mode {
            return Ok(self.cached());
        }

        match auth
            .authorized(|api, token| async move { api.fetch_cards(&token, None).await })
            .await
        {
            Ok(fresh) => {
                self.replace(fresh)?;
                Ok(LoadedCards {
                    cards: self.data.cards.clone(),
                    offline: false,
                })
            }
            Err(e) if e.is_offline() || e.is_server_error() => {
                tracing::info!("Showing cached cards: {}", e);
                Ok(self.cached())
            }
            Err(e) => Err(e),
        }
    }

    /// Add a card on the server, or locally when offline
    pub async fn add(
        &mut self,
        auth: &mut AuthSession,
        input: CardInput,
        offline_mode: bool,
    ) -> Result<CachedCard, ClientError> {
        if !offline_mode {
            let body = input.clone();
            let created = auth
                .authorized(move |api, token| {
                    let body = body.clone();
                    async move { api.add_card(&token, &body).await }
                })
                .await;
            match created {
                Ok(card) => {
                    let card = CachedCard::from(card);
                    self.insert(card.clone())?;
                    return Ok(card);
                }
                Err(e) if e.is_offline() => tracing::info!("Saving card offline: {}", e),
                Err(e) => return Err(e),
            }
        }

        let new_card = input.validate().map_err(|errors| {
            let mut fields: Vec<String> = errors.into_map().into_values().collect();
            fields.sort();
            ClientError::Validation(fields.join("; "))
        })?;
        let card = CachedCard::offline(new_card);
        self.insert(card.clone())?;
        Ok(card)
    }

    /// Delete a card. Returns false when the deletion is queued for the next sync.
    /// Offline, only cached cards can be deleted.
    pub async fn delete(&mut self, auth: &mut AuthSession, id: Uuid, offline_mode: bool) -> Result<bool, ClientError> {
        let local_only = self.data.cards.iter().any(|c| c.id == id && c.offline);
        if local_only {
            self.remove(id, false)?;
            return Ok(true);
        }

        if !offline_mode {
            let result = auth
                .authorized(move |api, token| async move { api.delete_card(&token, id).await })
                .await;
            match result {
                Ok(()) => {
                    self.remove(id, false)?;
                    return Ok(true);
                }
                Err(e) if e.is_not_found() => {
                    self.remove(id, false)?;
                    return Err(e);
                }
                Err(e) if e.is_offline() => tracing::info!("Queueing delete: {}", e),
                Err(e) => return Err(e),
            }
        }

        match self.remove(id, true)? {
            Some(_) => Ok(false),
            None => Err(ClientError::NotCached(id)),
        }
    }

    /// Upload offline cards, flush queued deletions, then reload from the server
    pub async fn sync(&mut self, auth: &mut AuthSession) -> Result<SyncReport, ClientError> {
        let mut report = SyncReport::default();

        let uploads: Vec<CachedCard> = self.data.cards.iter().filter(|c| c.offline).cloned().collect();
        for local in uploads {
            let body = local.to_input();
            let result = auth
                .authorized(move |api, token| {
                    let body = body.clone();
                    async move { api.add_card(&token, &body).await }
                })
                .await;
            match result {
                Ok(card) => {
                    if let Some(slot) = self.data.cards.iter_mut().find(|c| c.id == local.id) {
                        *slot = CachedCard::from(card);
                    }
                    self.save()?;
                    report.uploaded += 1;
                }
                Err(ClientError::Api { status: 400, message }) => {
                    report.failed.push(format!("{}: {}", local.store_name, message));
                }
                Err(e) => return Err(e),
            }
        }

        for id in self.data.pending_deletes.clone() {
            let result = auth
                .authorized(move |api, token| async move { api.delete_card(&token, id).await })
                .await;
            match result {
                Ok(()) => report.deleted += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
            self.data.pending_deletes.retain(|pending| *pending != id);
            self.save()?;
        }

        let loaded = self.load(auth, false).await?;
        if loaded.offline {
            return Err(ClientError::Offline("server went away during sync".to_string()));
        }
        report.total = loaded.cards.len();
        Ok(report)
    }

    fn cached(&self) -> LoadedCards {
        LoadedCards {
            cards: self.data.cards.clone(),
            offline: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiClient, Session, SessionStore, TokenPair};
    use crate::database::models::UserProfile;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    /// Auth session with an unexpired saved login for `server`
    fn signed_in(dir: &std::path::Path, server: &str) -> AuthSession {
        let store = SessionStore::new(dir.join("session.json"));
        let api = ApiClient::new(server).unwrap();
        let session = Session::from_tokens(
            api.base_url(),
            TokenPair {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 3600,
                user: UserProfile {
                    id: Uuid::new_v4(),
                    username: "alice".to_string(),
                    email: "alice@example.com".to_string(),
                    created_at: Utc::now(),
                },
            },
        );
        store.save(&session).unwrap();
        AuthSession::open(api, store).unwrap()
    }

    /// Local server whose card listing always answers 503
    async fn unavailable_server() -> String {
        let app = Router::new().route(
            "/api/cards",
            get(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "success": false, "error": "Database unavailable", "code": "SERVICE_UNAVAILABLE" })),
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn server_card(store: &str) -> Card {
        Card {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            store_name: store.to_string(),
            card_number: "12345".to_string(),
            color: "#6fffe9".to_string(),
            is_qr_code: false,
            created_at: Utc::now(),
        }
    }

    fn offline_card(store: &str) -> CachedCard {
        CachedCard::offline(NewCard {
            store_name: store.to_string(),
            card_number: "999".to_string(),
            color: "#1c1c1e".to_string(),
            is_qr_code: true,
        })
    }

    #[test]
    fn persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.json");

        let mut cache = CardCache::open(&path).unwrap();
        cache.replace(vec![server_card("Grocer")]).unwrap();
        cache.insert(offline_card("Cinema")).unwrap();

        let reopened = CardCache::open(&path).unwrap();
        assert_eq!(reopened.cards().len(), 2);
        assert_eq!(reopened.pending_uploads(), 1);
        assert!(reopened.synced_at().is_some());
    }

    #[test]
    fn replace_keeps_offline_cards_and_honors_pending_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CardCache::open(dir.path().join("cards.json")).unwrap();

        let keep = server_card("Keep");
        let gone = server_card("Gone");
        cache.replace(vec![keep.clone(), gone.clone()]).unwrap();
        cache.insert(offline_card("Local")).unwrap();

        cache.remove(gone.id, true).unwrap();
        assert_eq!(cache.pending_deletes(), &[gone.id]);

        // Server still returns the deleted card until sync flushes the queue
        cache.replace(vec![keep.clone(), gone.clone()]).unwrap();
        let names: Vec<&str> = cache.cards().iter().map(|c| c.store_name.as_str()).collect();
        assert_eq!(names, vec!["Keep", "Local"]);
    }

    #[test]
    fn removing_offline_card_queues_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CardCache::open(dir.path().join("cards.json")).unwrap();
        let local = offline_card("Local");
        cache.insert(local.clone()).unwrap();

        assert_eq!(cache.remove(local.id, true).unwrap(), Some(local));
        assert!(cache.pending_deletes().is_empty());
        assert_eq!(cache.remove(Uuid::new_v4(), true).unwrap(), None);
    }

    #[test]
    fn scope_change_discards_other_users_cards() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CardCache::open(dir.path().join("cards.json")).unwrap();
        let user = Uuid::new_v4();

        cache.scope_to("http://localhost:3000", user).unwrap();
        cache.replace(vec![server_card("Grocer")]).unwrap();
        cache.scope_to("http://localhost:3000", user).unwrap();
        assert_eq!(cache.cards().len(), 1);

        cache.scope_to("http://localhost:3000", Uuid::new_v4()).unwrap();
        assert!(cache.cards().is_empty());
    }

    #[test]
    fn resolves_by_id_prefix_or_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CardCache::open(dir.path().join("cards.json")).unwrap();
        let grocer = server_card("Corner Grocer");
        cache.replace(vec![grocer.clone(), server_card("Book Shop")]).unwrap();

        assert_eq!(cache.resolve(&grocer.id.to_string()).map(|c| c.id), Some(grocer.id));
        assert_eq!(cache.resolve(&grocer.id.to_string()[..8]).map(|c| c.id), Some(grocer.id));
        assert_eq!(cache.resolve("corner grocer").map(|c| c.id), Some(grocer.id));
        assert!(cache.resolve("Bakery").is_none());
        assert_eq!(cache.search("shop").len(), 1);
    }

    #[test]
    fn unreadable_cache_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.json");
        fs::write(&path, "[not a cache").unwrap();
        assert!(CardCache::open(&path).unwrap().cards().is_empty());
    }

    #[tokio::test]
    async fn server_errors_fall_back_to_cached_cards() {
        let dir = tempfile::tempdir().unwrap();
        let server = unavailable_server().await;
        let mut auth = signed_in(dir.path(), &server);

        let mut cache = CardCache::open(dir.path().join("cards.json")).unwrap();
        cache.replace(vec![server_card("Grocer")]).unwrap();

        let loaded = cache.load(&mut auth, false).await.unwrap();
        assert!(loaded.offline);
        assert_eq!(loaded.cards.len(), 1);
        assert!(auth.is_authenticated());
    }

    #[tokio::test]
    async fn offline_delete_needs_a_cached_card() {
        let dir = tempfile::tempdir().unwrap();
        let mut auth = signed_in(dir.path(), "localhost:3000");
        let mut cache = CardCache::open(dir.path().join("cards.json")).unwrap();
        let known = server_card("Grocer");
        cache.replace(vec![known.clone()]).unwrap();

        let missing = Uuid::new_v4();
        let err = cache.delete(&mut auth, missing, true).await.unwrap_err();
        assert!(matches!(err, ClientError::NotCached(id) if id == missing));
        assert!(cache.pending_deletes().is_empty());

        assert!(!cache.delete(&mut auth, known.id, true).await.unwrap());
        assert_eq!(cache.pending_deletes(), &[known.id]);
    }
}
