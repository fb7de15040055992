//! In-process Databricks and Snowflake fakes

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use relay_tools::Downstream;
use relay_tools::downstream::{
    CortexApi, DatabricksCredentials, DownstreamError, GenieApi, SnowflakeCredentials, Statement,
};
use serde_json::{Value, json};

/// Records every downstream call as a short string
#[derive(Default)]
pub struct FakeDownstream {
    calls: Mutex<Vec<String>>,
}

impl FakeDownstream {
    pub fn shared() -> (Downstream, Arc<Self>) {
        let fake = Arc::new(Self::default());
        let downstream = Downstream {
            genie: fake.clone(),
            cortex: fake.clone(),
        };
        (downstream, fake)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GenieApi for FakeDownstream {
    async fn list_spaces(&self, creds: &DatabricksCredentials) -> Result<Value, DownstreamError> {
        self.record(format!("genie.list_spaces {}", creds.workspace_url));
        Ok(json!({"spaces": [{"space_id": "spaceA", "title": "Sales"}]}))
    }

    async fn get_space(&self, creds: &DatabricksCredentials, space_id: &str) -> Result<Value, DownstreamError> {
        self.record(format!("genie.get_space {} {space_id}", creds.workspace_url));
        Ok(json!({"space_id": space_id, "title": "Sales"}))
    }

    async fn start_conversation(
        &self,
        _: &DatabricksCredentials,
        space_id: &str,
        content: &str,
    ) -> Result<Value, DownstreamError> {
        self.record(format!("genie.start_conversation {space_id} {content}"));
        Ok(json!({"conversation_id": "conv-1"}))
    }

    async fn post_message(
        &self,
        _: &DatabricksCredentials,
        conversation_id: &str,
        content: &str,
        _: Option<&Value>,
    ) -> Result<Value, DownstreamError> {
        self.record(format!("genie.post_message {conversation_id} {content}"));
        Ok(json!({"message_id": "msg-1"}))
    }

    async fn get_conversation(
        &self,
        _: &DatabricksCredentials,
        conversation_id: &str,
    ) -> Result<Value, DownstreamError> {
        self.record(format!("genie.get_conversation {conversation_id}"));
        Ok(json!({"id": conversation_id, "messages": []}))
    }
}

#[async_trait]
impl CortexApi for FakeDownstream {
    async fn execute(&self, creds: &SnowflakeCredentials, statement: &Statement) -> Result<Value, DownstreamError> {
        self.record(format!("cortex.execute {} {}", creds.account, statement.sql));
        Ok(json!({"data": [["1"]]}))
    }
}
