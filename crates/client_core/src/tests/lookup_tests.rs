use super::*;
use async_trait::async_trait;
use shared::domain::ToolStatus;
use std::sync::atomic::{AtomicUsize, Ordering};

struct MapApi;

#[async_trait]
impl ToolApi for MapApi {
    async fn fetch_tool_by_id(&self, id: &ToolId) -> Result<ToolRecord, ToolApiError> {
        match id.as_str() {
            "T-0042" => Ok(serde_json::from_value(serde_json::json!({
                "id": "T-0042",
                "name": "Drill",
                "status": "Available",
            }))
            .expect("record")),
            "T-offline" => Err(ToolApiError::Network("connection refused".to_string())),
            _ => Err(ToolApiError::NotFound(id.clone())),
        }
    }

    async fn update_tool_status(
        &self,
        id: &ToolId,
        _status: ToolStatus,
    ) -> Result<ToolRecord, ToolApiError> {
        Err(ToolApiError::NotFound(id.clone()))
    }
}

fn coordinator() -> LookupCoordinator {
    LookupCoordinator::new(Arc::new(MapApi), Duration::from_millis(300))
}

fn counting(fired: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
    let fired = Arc::clone(fired);
    async move {
        fired.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn fires_once_after_quiet_period() {
    let lookup = coordinator();
    let fired = Arc::new(AtomicUsize::new(0));

    lookup.schedule("T", counting(&fired));
    tokio::time::sleep(Duration::from_millis(100)).await;
    lookup.schedule("T-", counting(&fired));
    tokio::time::sleep(Duration::from_millis(100)).await;
    lookup.schedule("T-0042", counting(&fired));

    tokio::time::sleep(Duration::from_millis(299)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_prevents_pending_fire() {
    let lookup = coordinator();
    let fired = Arc::new(AtomicUsize::new(0));

    lookup.schedule("T-0042", counting(&fired));
    tokio::time::sleep(Duration::from_millis(100)).await;
    lookup.cancel();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_coordinator_cancels_timer() {
    let lookup = coordinator();
    let fired = Arc::new(AtomicUsize::new(0));

    lookup.schedule("T-0042", counting(&fired));
    drop(lookup);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fetch_maps_backend_errors() {
    let lookup = coordinator();

    let record = lookup.fetch("T-0042").await.expect("record");
    assert_eq!(record.name, "Drill");

    assert_eq!(
        lookup.fetch("T-9").await,
        Err(SessionError::LookupNotFound(ToolId::from("T-9")))
    );
    assert_eq!(
        lookup.fetch("T-offline").await,
        Err(SessionError::LookupNetwork("connection refused".to_string()))
    );
}
