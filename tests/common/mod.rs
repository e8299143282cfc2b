//! Shared test helpers: a mock Coupa tenant built on wiremock.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use coupa_sync::client::CoupaClient;
use coupa_sync::config::CoupaConfig;
use coupa_sync::connector::{Connector, Resource, ResourceId};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const READ_TOKEN: &str = "ro-token";
pub const WRITE_TOKEN: &str = "rw-token";

/// Serve both client-credentials tokens. The write scope only appears in the
/// read-write request.
pub async fn mount_tokens(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("core.user.write"))
        .respond_with(token_response(WRITE_TOKEN, None))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(token_response(READ_TOKEN, None))
        .mount(server)
        .await;
}

pub fn token_response(token: &str, expires_in: Option<i64>) -> ResponseTemplate {
    let mut body = json!({"access_token": token, "token_type": "bearer"});
    if let Some(secs) = expires_in {
        body["expires_in"] = json!(secs);
    }
    ResponseTemplate::new(200).set_body_json(body)
}

pub fn config(server: &MockServer) -> CoupaConfig {
    CoupaConfig::builder()
        .domain("acme.coupacloud.com")
        .client_id(CLIENT_ID)
        .client_secret(CLIENT_SECRET)
        .base_url(server.uri())
        .build()
}

pub fn client(server: &MockServer) -> Arc<CoupaClient> {
    Arc::new(CoupaClient::from_config(&config(server)).expect("client"))
}

/// A connector against `server` with tokens already mounted.
pub async fn connector(server: &MockServer) -> Connector {
    mount_tokens(server).await;
    Connector::from_client(client(server))
}

pub fn graphql(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
}

/// Answer GraphQL reads whose document contains `marker`.
pub async fn mount_query(server: &MockServer, marker: &str, data: Value) {
    Mock::given(method("POST"))
        .and(path("/api/graphql"))
        .and(header("authorization", format!("Bearer {READ_TOKEN}").as_str()))
        .and(body_string_contains(marker))
        .respond_with(graphql(data))
        .mount(server)
        .await;
}

pub fn user_ref(id: i64) -> Resource {
    Resource::reference(ResourceId::user(id))
}

/// JSON bodies of every PUT the server received, in order.
pub async fn put_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.method.as_str() == "PUT")
        .map(|request| serde_json::from_slice(&request.body).expect("json body"))
        .collect()
}

/// In-memory role list of one user: answers the single-user roles query and
/// the roles PUT, so read-modify-write sequences can run end to end.
#[derive(Clone)]
pub struct RoleStateResponder {
    pub user_id: i64,
    pub roles: Arc<Mutex<Vec<i64>>>,
}

impl RoleStateResponder {
    pub fn new(user_id: i64, roles: &[i64]) -> Self {
        Self {
            user_id,
            roles: Arc::new(Mutex::new(roles.to_vec())),
        }
    }

    pub fn roles(&self) -> Vec<i64> {
        self.roles.lock().unwrap().clone()
    }

    fn role_objects(ids: &[i64]) -> Vec<Value> {
        ids.iter()
            .map(|id| json!({"id": id, "name": format!("role-{id}")}))
            .collect()
    }
}

impl Respond for RoleStateResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut roles = self.roles.lock().unwrap();
        if request.method.as_str() == "PUT" {
            let body: Value = serde_json::from_slice(&request.body).expect("json body");
            *roles = body["roles"]
                .as_array()
                .map(|entries| entries.iter().filter_map(|e| e["id"].as_i64()).collect())
                .unwrap_or_default();
            return ResponseTemplate::new(200)
                .set_body_json(json!({"id": self.user_id, "roles": Self::role_objects(&roles)}));
        }
        graphql(json!({
            "users": [{"id": self.user_id, "roles": Self::role_objects(&roles)}]
        }))
    }
}
