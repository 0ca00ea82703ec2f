use tracing::{debug, info};

use rackrate_core::audit::{AuditEvent, AuditSink};
use rackrate_core::notifications::{ApprovalNotice, NoticeRecipient, Notifier};

/// Writes audit events to the log stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let metadata = serde_json::to_string(&event.metadata).unwrap_or_default();
        info!(
            event_name = %event.event_type,
            event_id = %event.event_id,
            correlation_id = %event.correlation_id,
            submission_id = event.submission_id.as_ref().map(|id| id.as_str()).unwrap_or("unknown"),
            category = ?event.category,
            outcome = ?event.outcome,
            actor = %event.actor,
            metadata = %metadata,
            "audit event"
        );
    }
}

/// Logs approval notices; stands in for the mail transport.
#[derive(Clone, Copy, Debug)]
pub struct TracingNotifier {
    enabled: bool,
}

impl TracingNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for TracingNotifier {
    fn deliver(&self, notice: ApprovalNotice) {
        if !self.enabled {
            debug!(
                event_name = "notification.suppressed",
                submission_id = %notice.submission_id,
                subject = %notice.subject,
                "notifications disabled"
            );
            return;
        }

        let recipient = match &notice.recipient {
            NoticeRecipient::Initiator(user) => format!("initiator:{user}"),
            NoticeRecipient::Approver(stage) => format!("approver:{stage}"),
        };
        info!(
            event_name = "notification.delivered",
            submission_id = %notice.submission_id,
            recipient = %recipient,
            subject = %notice.subject,
            body = %notice.body,
            "approval notice"
        );
    }
}
