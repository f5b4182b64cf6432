//! Real-time processing: filesystem events feed the change queue, which is
//! drained on a timer.

use crate::app::App;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use mdlocal_library::Document;
use mdlocal_library::queue::{self, ChangeQueue};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub async fn run(app: &App) -> Result<()> {
    let Some(period) = app.config().real_time else {
        exn::bail!(ErrorKind::RealTimeDisabled);
    };

    // The notify callback runs on its own thread; hop onto the runtime
    // through a channel.
    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
        let _ = tx.send(event);
    })
    .or_raise(|| ErrorKind::Watch)?;
    watcher.watch(app.root(), RecursiveMode::Recursive).or_raise(|| ErrorKind::Watch)?;

    let queue = ChangeQueue::new();
    let (stop, shutdown) = watch::channel(false);
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Cannot listen for Ctrl-C");
        }
        info!("Stopping after the current batch");
        stop.send_replace(true);
        std::future::pending::<()>().await;
    };

    info!(vault = %app.root().display(), interval_ms = period.as_millis(), "Watching for changes");
    tokio::select! {
        () = queue::run(&queue, period, shutdown, |document| async move {
            app.process(document).await;
        }) => {},
        () = enqueue(app, &queue, rx) => {},
        () = interrupt => {},
    }
    drop(watcher);
    Ok(())
}

/// Forward relevant filesystem events into `queue` until the watcher goes
/// away.
async fn enqueue(app: &App, queue: &ChangeQueue<Document>, mut rx: mpsc::UnboundedReceiver<notify::Result<Event>>) {
    while let Some(event) = rx.recv().await {
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "File watcher error");
                continue;
            },
        };
        if !is_edit(&event.kind) {
            continue;
        }
        for path in &event.paths {
            if let Some(document) = app.watched_document(path)
                && queue.push(document.clone())
            {
                debug!(%document, "Queued");
            }
        }
    }
}

fn is_edit(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind};
    use rstest::rstest;

    #[rstest]
    #[case(EventKind::Create(CreateKind::File), true)]
    #[case(EventKind::Modify(ModifyKind::Data(DataChange::Content)), true)]
    #[case(EventKind::Remove(RemoveKind::File), false)]
    #[case(EventKind::Access(AccessKind::Read), false)]
    fn test_is_edit(#[case] kind: EventKind, #[case] expected: bool) {
        assert_eq!(is_edit(&kind), expected);
    }
}
