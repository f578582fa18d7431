use crate::db::logger::{LogOperation, OperatorLogger};
use serde_json::json;
use std::future::Future;
use std::time::Instant;

/// Higher-order adapter wrapping every independent layer fetch in
/// `assemble_context` (§4.1 Step 2). A failed future degrades only its own
/// slot to `None`; the failure itself is recorded as an `error_graceful`
/// operator log entry rather than propagated.
pub async fn safe_fetch<T, Fut>(
    layer_name: &str,
    logger: &OperatorLogger,
    persona_id: &str,
    session_id: &str,
    fut: Fut,
) -> Option<T>
where
    Fut: Future<Output = crate::error::Result<T>>,
{
    let started = Instant::now();
    match fut.await {
        Ok(value) => Some(value),
        Err(err) => {
            logger.log(LogOperation {
                operation: "error_graceful".to_string(),
                session_id: Some(session_id.to_string()),
                persona_id: Some(persona_id.to_string()),
                details: json!({ "layer": layer_name, "error": err.to_string() }),
                duration_ms: started.elapsed().as_millis() as i64,
                success: false,
                ..Default::default()
            });
            None
        }
    }
}
