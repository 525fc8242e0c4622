//! BDD test world for mission control

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use cucumber::World;
use mission_control::config::Config;
use mission_control::state::AppState;
use mission_control::store::MemoryStore;
use tower::ServiceExt;

#[derive(Debug, Default, World)]
pub struct MissionControlWorld {
    pub store: Option<Arc<MemoryStore>>,
    pub app: Option<AppState>,

    // Last HTTP exchange
    pub response_status: Option<u16>,
    pub response_body: Option<String>,

    // Activation wizard
    pub session_id: Option<String>,
}

impl MissionControlWorld {
    pub fn start(&mut self, config: Config) {
        let store = Arc::new(MemoryStore::new());
        self.app = Some(AppState::new(store.clone(), config));
        self.store = Some(store);
    }

    pub fn store(&self) -> &MemoryStore {
        self.store.as_ref().expect("server not started")
    }

    pub fn app(&self) -> &AppState {
        self.app.as_ref().expect("server not started")
    }

    pub async fn send(&mut self, request: Request<Body>) {
        let router = mission_control::build_router(self.app().clone());
        let response = router.oneshot(request).await.unwrap();
        self.response_status = Some(response.status().as_u16());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        self.response_body = Some(String::from_utf8(body.to_vec()).unwrap());
    }

    pub async fn get(&mut self, uri: &str) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await;
    }

    pub async fn post_json(&mut self, uri: &str, body: serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await;
    }

    pub fn json(&self) -> serde_json::Value {
        let body = self.response_body.as_ref().expect("no response body");
        serde_json::from_str(body).expect("response is not JSON")
    }
}
