use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder};
use tracing::trace;

pub const REASON_RECONCILED: &str = "Reconciled";
pub const REASON_FAILED: &str = "ReconcileFailed";

pub async fn emit_event(
    recorder: &Recorder,
    obj_ref: &ObjectReference,
    type_: EventType,
    reason: &str,
    action: &str,
    note: Option<String>,
) {
    if let Err(e) = recorder
        .publish(
            &Event {
                type_,
                reason: reason.into(),
                note,
                action: action.into(),
                secondary: None,
            },
            obj_ref,
        )
        .await
    {
        trace!(error = %e, reason, "event publish failed");
    }
}
