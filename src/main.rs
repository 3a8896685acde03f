use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use callgate::admin::{LOGGING_METHOD, STATISTICS_METHOD};
use callgate::config::ServiceConfig;
use callgate::error::{CallResult, ConfigError};
use callgate::{CallContext, Metadata, Pipeline, ServerStream, UnaryHandler};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEMO_POLICY: &str = r#"{
    "logger": ["/main.Admin/Logging"],
    "stat": ["/main.Admin/Statistics"],
    "biz_user": ["/main.Biz/Check", "/main.Biz/Add"],
    "biz_admin": ["/main.Biz/*"]
}"#;

const DEMO_CALLS: [(&str, &str); 4] = [
    ("biz_user", "/main.Biz/Check"),
    ("biz_admin", "/main.Biz/Test"),
    ("biz_user", "/main.Biz/Test"),
    ("nobody", "/main.Biz/Add"),
];

/// Business handler stand-in: accepts anything, returns an empty message.
struct Nothing;

#[async_trait]
impl UnaryHandler for Nothing {
    async fn call(&self, _call: &CallContext, _request: Value) -> CallResult<Value> {
        Ok(json!({}))
    }
}

/// Admin stream sink that writes every item to the log.
struct TracingSink {
    name: &'static str,
}

#[async_trait]
impl ServerStream for TracingSink {
    async fn send(&mut self, item: Value) -> CallResult<()> {
        info!(stream = self.name, %item, "admin stream item");
        Ok(())
    }
}

fn admin_call(consumer: &str, method: &str) -> CallContext {
    CallContext::new(method, Metadata::new().with("consumer", consumer), "127.0.0.1:9000")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("callgate booting");

    let config = ServiceConfig::from_env()?;
    let policy = match config.policy_payload() {
        Ok(policy) => policy,
        Err(ConfigError::MissingPolicy) => {
            warn!("no access policy configured, using the demo policy");
            DEMO_POLICY.to_string()
        }
        Err(err) => return Err(err.into()),
    };

    let pipeline = Arc::new(Pipeline::new(&policy, config.pipeline.clone())?);
    let shutdown = pipeline.shutdown_token();

    // Admin observers
    let log_task = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            let call = admin_call("logger", LOGGING_METHOD);
            let handler = pipeline.observe_log();
            let mut sink = TracingSink { name: "log" };
            pipeline.stream(&call, json!({}), &mut sink, &handler).await
        })
    };
    let stat_task = {
        let pipeline = pipeline.clone();
        let interval = config.stat_interval_secs.max(1);
        tokio::spawn(async move {
            let call = admin_call("stat", STATISTICS_METHOD);
            let handler = pipeline.observe_stats();
            let mut sink = TracingSink { name: "stats" };
            pipeline
                .stream(&call, json!({ "interval_seconds": interval }), &mut sink, &handler)
                .await
        })
    };

    // Let the observers subscribe before traffic starts.
    tokio::time::sleep(Duration::from_millis(50)).await;

    for (consumer, method) in DEMO_CALLS.iter().cycle().take(config.demo_calls) {
        let call = admin_call(consumer, method);
        match pipeline.unary(&call, json!({}), &Nothing).await {
            Ok(_) => info!(%consumer, %method, "call served"),
            Err(err) => warn!(%consumer, %method, code = ?err.code(), %err, "call rejected"),
        }
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
        _ = tokio::time::sleep(Duration::from_secs(config.stat_interval_secs.max(1) * 2 + 1)) => {}
    }

    shutdown.cancel();
    for task in [log_task, stat_task] {
        if let Err(err) = task.await? {
            warn!(%err, "admin stream failed");
        }
    }
    info!("callgate stopped");
    Ok(())
}
