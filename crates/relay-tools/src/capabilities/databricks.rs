use serde_json::{Value, json};

use super::payload;
use crate::error::ToolError;
use crate::registry::{CapabilityResult, CapabilitySpec, Invocation, ParamSpec, Registry};

const NAMESPACE: &str = "databricks";

pub(super) fn register(registry: &mut Registry) {
    registry
        .register(CapabilitySpec::new(
            NAMESPACE,
            "list_spaces",
            "List available Databricks Genie spaces",
            list_spaces,
        ))
        .register(
            CapabilitySpec::new(
                NAMESPACE,
                "get_space",
                "Get details about a specific Databricks Genie space",
                get_space,
            )
            .param(ParamSpec::required("space_id").scoped("spaces")),
        )
        .register(
            CapabilitySpec::new(
                NAMESPACE,
                "start_conversation",
                "Start a new conversation with Databricks Genie",
                start_conversation,
            )
            .param(ParamSpec::required("space_id").scoped("spaces"))
            .param(ParamSpec::required("content")),
        )
        .register(
            CapabilitySpec::new(
                NAMESPACE,
                "post_message",
                "Post a message to an existing Databricks Genie conversation",
                post_message,
            )
            .param(ParamSpec::required("conversation_id"))
            .param(ParamSpec::required("content"))
            .param(ParamSpec::optional("attachments").object()),
        )
        .register(
            CapabilitySpec::new(
                NAMESPACE,
                "get_conversation",
                "Retrieve conversation details and message history",
                get_conversation,
            )
            .param(ParamSpec::required("conversation_id")),
        )
        .register(CapabilitySpec::new(
            NAMESPACE,
            "get_databricks_status",
            "Check connectivity to Databricks Genie",
            get_databricks_status,
        ));
}

async fn list_spaces(invocation: Invocation) -> CapabilityResult {
    let result = invocation.downstream.genie.list_spaces(invocation.databricks()?).await?;
    let spaces = result.get("spaces").cloned().unwrap_or_else(|| json!([]));

    Ok(payload(json!({"spaces": spaces, "result": result})))
}

async fn get_space(invocation: Invocation) -> CapabilityResult {
    let space_id = invocation.str_arg("space_id")?;
    let space = invocation
        .downstream
        .genie
        .get_space(invocation.databricks()?, space_id)
        .await?;

    Ok(payload(json!({"space_id": space_id, "space": space})))
}

async fn start_conversation(invocation: Invocation) -> CapabilityResult {
    let space_id = invocation.str_arg("space_id")?;
    let content = invocation.str_arg("content")?;
    let result = invocation
        .downstream
        .genie
        .start_conversation(invocation.databricks()?, space_id, content)
        .await?;

    Ok(payload(json!({
        "conversation_id": result.get("conversation_id").cloned().unwrap_or(Value::Null),
        "space_id": space_id,
        "result": result,
    })))
}

async fn post_message(invocation: Invocation) -> CapabilityResult {
    let conversation_id = invocation.str_arg("conversation_id")?;
    let content = invocation.str_arg("content")?;
    let attachments = invocation.opt_value("attachments");
    if attachments.is_some_and(|a| !a.is_array()) {
        return Err(ToolError::invalid("attachments", "a list"));
    }

    let result = invocation
        .downstream
        .genie
        .post_message(invocation.databricks()?, conversation_id, content, attachments)
        .await?;

    Ok(payload(json!({
        "conversation_id": conversation_id,
        "attachments_count": attachments.and_then(Value::as_array).map_or(0, Vec::len),
        "result": result,
    })))
}

async fn get_conversation(invocation: Invocation) -> CapabilityResult {
    let conversation_id = invocation.str_arg("conversation_id")?;
    let conversation = invocation
        .downstream
        .genie
        .get_conversation(invocation.databricks()?, conversation_id)
        .await?;

    Ok(payload(json!({"conversation_id": conversation_id, "conversation": conversation})))
}

async fn get_databricks_status(invocation: Invocation) -> CapabilityResult {
    let creds = invocation.databricks()?;
    let spaces = invocation.downstream.genie.list_spaces(creds).await?;
    let count = spaces.get("spaces").and_then(Value::as_array).map(Vec::len);

    Ok(payload(json!({
        "message": "Connected to Databricks Genie",
        "workspace_url": creds.workspace_url.as_str(),
        "spaces_count": count,
    })))
}
