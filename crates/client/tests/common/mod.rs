use serde_json::{json, Value};
use wiremock::MockServer;

use wfm_client::{ApiConfig, WorkflowApi};

pub const TOKEN: &str = "test-token";

/// Start a mock CMS and a client pointed at it.
pub async fn setup() -> (MockServer, WorkflowApi) {
    let server = MockServer::start().await;
    let config = ApiConfig::new(server.uri()).with_token(TOKEN);
    let api = WorkflowApi::new(&config).expect("client builds");
    (server, api)
}

pub fn bearer() -> String {
    format!("Bearer {TOKEN}")
}

pub fn state_record(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "transitions": [],
        "permission_roles": {},
        "group_roles": {}
    })
}

pub fn transition_record(id: &str, title: &str, new_state_id: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "new_state_id": new_state_id,
        "trigger_type": 1,
        "actbox_name": title,
        "guard": {"permissions": [], "roles": [], "groups": []}
    })
}
