use serde_json::{Value, json};

use super::payload;
use crate::downstream::Statement;
use crate::error::ToolError;
use crate::registry::{CapabilityResult, CapabilitySpec, Invocation, ParamSpec, Registry};

const NAMESPACE: &str = "snowflake";

pub(super) fn register(registry: &mut Registry) {
    registry
        .register(
            CapabilitySpec::new(
                NAMESPACE,
                "execute_sql",
                "Execute a SQL statement against an allowed database",
                execute_sql,
            )
            .param(ParamSpec::required("database").scoped("databases"))
            .param(ParamSpec::required("sql"))
            .param(ParamSpec::optional("warehouse").scoped("clusters"))
            .param(ParamSpec::optional("parameters").object()),
        )
        .register(
            CapabilitySpec::new(
                NAMESPACE,
                "complete_text",
                "Complete text using the Snowflake Cortex COMPLETE function",
                complete_text,
            )
            .param(ParamSpec::required("model"))
            .param(ParamSpec::required("prompt")),
        )
        .register(
            CapabilitySpec::new(
                NAMESPACE,
                "summarize_text",
                "Summarize text using Snowflake Cortex",
                summarize_text,
            )
            .param(ParamSpec::required("text")),
        )
        .register(
            CapabilitySpec::new(
                NAMESPACE,
                "analyze_sentiment",
                "Score the sentiment of text using Snowflake Cortex",
                analyze_sentiment,
            )
            .param(ParamSpec::required("text")),
        )
        .register(CapabilitySpec::new(
            NAMESPACE,
            "get_snowflake_status",
            "Check connectivity to Snowflake",
            get_snowflake_status,
        ));
}

async fn execute_sql(invocation: Invocation) -> CapabilityResult {
    let database = invocation.str_arg("database")?;
    let mut statement = Statement::new(invocation.str_arg("sql")?);
    statement.database = Some(database.to_owned());
    statement.warehouse = invocation.opt_str("warehouse")?.map(str::to_owned);

    if let Some(parameters) = invocation.opt_value("parameters") {
        statement.bindings = parameters
            .as_object()
            .cloned()
            .ok_or_else(|| ToolError::invalid("parameters", "an object of bind variables"))?;
    }

    let result = invocation
        .downstream
        .cortex
        .execute(invocation.snowflake()?, &statement)
        .await?;

    Ok(payload(json!({"database": database, "result": result})))
}

async fn complete_text(invocation: Invocation) -> CapabilityResult {
    let model = invocation.str_arg("model")?;
    let statement = Statement::new("SELECT SNOWFLAKE.CORTEX.COMPLETE(?, ?) AS completion")
        .bind_text(model)
        .bind_text(invocation.str_arg("prompt")?);

    let result = cortex(&invocation, &statement).await?;
    Ok(payload(json!({"model": model, "result": result})))
}

async fn summarize_text(invocation: Invocation) -> CapabilityResult {
    let statement =
        Statement::new("SELECT SNOWFLAKE.CORTEX.SUMMARIZE(?) AS summary").bind_text(invocation.str_arg("text")?);

    let result = cortex(&invocation, &statement).await?;
    Ok(payload(json!({"result": result})))
}

async fn analyze_sentiment(invocation: Invocation) -> CapabilityResult {
    let statement =
        Statement::new("SELECT SNOWFLAKE.CORTEX.SENTIMENT(?) AS sentiment").bind_text(invocation.str_arg("text")?);

    let result = cortex(&invocation, &statement).await?;
    Ok(payload(json!({"result": result})))
}

async fn get_snowflake_status(invocation: Invocation) -> CapabilityResult {
    let creds = invocation.snowflake()?;
    let statement = Statement::new("SELECT CURRENT_VERSION() AS version");
    let result = invocation.downstream.cortex.execute(creds, &statement).await?;

    Ok(payload(json!({
        "message": "Connected to Snowflake",
        "account": creds.account,
        "user": creds.user,
        "result": result,
    })))
}

async fn cortex(invocation: &Invocation, statement: &Statement) -> Result<Value, ToolError> {
    Ok(invocation
        .downstream
        .cortex
        .execute(invocation.snowflake()?, statement)
        .await?)
}
