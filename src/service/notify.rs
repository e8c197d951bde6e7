use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::model::employee::EmpId;
use crate::model::leave_request::ApprovalStatus;

/// Events worth telling someone about once they are committed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    LeaveDecided {
        leave_id: u64,
        empid: EmpId,
        status: ApprovalStatus,
    },
    RequestDecided {
        request_id: u64,
        empid: EmpId,
        status: ApprovalStatus,
    },
    PayslipsFrozen {
        month: u32,
        year: i32,
        frozen: bool,
        affected: u64,
    },
}

/// Outbound channel (mail, SMS, chat). Delivery runs off the request path.
pub trait Notifier: Send + Sync {
    fn send(&self, notification: Notification) -> BoxFuture<'static, anyhow::Result<()>>;
}

/// Default notifier: writes the event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, notification: Notification) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async move {
            let payload = serde_json::to_string(&notification)?;
            tracing::info!(%payload, "Notification");
            Ok(())
        })
    }
}

/// Fire and forget. Failures are logged and never reach the caller.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    actix_web::rt::spawn(async move {
        if let Err(e) = notifier.send(notification).await {
            tracing::warn!(error = %e, "Notification delivery failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::StreamExt;
    use std::sync::Mutex;

    struct Recording(Mutex<mpsc::UnboundedSender<Notification>>);

    impl Notifier for Recording {
        fn send(&self, notification: Notification) -> BoxFuture<'static, anyhow::Result<()>> {
            let sent = self
                .0
                .lock()
                .map_err(|_| anyhow::anyhow!("poisoned"))
                .and_then(|tx| tx.unbounded_send(notification).map_err(anyhow::Error::from));
            Box::pin(async move { sent })
        }
    }

    struct Failing;

    impl Notifier for Failing {
        fn send(&self, _: Notification) -> BoxFuture<'static, anyhow::Result<()>> {
            Box::pin(async { Err(anyhow::anyhow!("smtp down")) })
        }
    }

    fn frozen() -> Notification {
        Notification::PayslipsFrozen {
            month: 12,
            year: 2025,
            frozen: true,
            affected: 4,
        }
    }

    #[actix_web::test]
    async fn dispatch_delivers_on_a_spawned_task() {
        let (tx, mut rx) = mpsc::unbounded();
        dispatch(Arc::new(Recording(Mutex::new(tx))), frozen());

        match rx.next().await {
            Some(Notification::PayslipsFrozen { affected, .. }) => assert_eq!(affected, 4),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[actix_web::test]
    async fn failing_notifier_is_swallowed() {
        dispatch(Arc::new(Failing), frozen());
        actix_web::rt::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    #[actix_web::test]
    async fn log_notifier_serializes_event() {
        let n = Notification::LeaveDecided {
            leave_id: 7,
            empid: EmpId::parse("1001").unwrap(),
            status: ApprovalStatus::Approved,
        };
        assert_eq!(
            serde_json::to_value(&n).unwrap()["event"],
            "leave_decided"
        );
        LogNotifier.send(n).await.unwrap();
    }
}
