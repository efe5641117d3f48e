//! Outcome bridge: forwards dispatcher results into the action loop.

use acsparam_core::TaskOutcome;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::action::Action;

/// Forward every [`TaskOutcome`] as [`Action::TaskFinished`] until either
/// side closes or `cancel` fires.
pub async fn forward_outcomes(
    mut outcomes: mpsc::UnboundedReceiver<TaskOutcome>,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    loop {
        let outcome = tokio::select! {
            () = cancel.cancelled() => break,
            next = outcomes.recv() => match next {
                Some(outcome) => outcome,
                None => break,
            },
        };

        if action_tx.send(Action::TaskFinished(outcome)).is_err() {
            break;
        }
    }
    debug!("outcome bridge stopped");
}
