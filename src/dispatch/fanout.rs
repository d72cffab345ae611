//! Concurrent delivery of one notification to all its handlers.
//!
//! Every resolved handler runs concurrently against the same borrowed
//! notification, and the publisher stays suspended until all of them
//! reach completion, success or failure. Failure policy: the first
//! failure in registration order is surfaced, later failures are
//! discarded, and successful siblings keep their effects (there is no
//! transactional guarantee across notification handlers).

use std::any::type_name;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::DispatchResult;
use crate::message::Notification;
use crate::registry::RegistryLookup;

/// Delivers `notification` to every handler bound to `N`. Zero handlers
/// is a successful no-op.
pub(crate) async fn fan_out<N, L>(
    lookup: &L,
    notification: &N,
    token: &CancellationToken,
) -> DispatchResult<()>
where
    N: Notification,
    L: RegistryLookup,
{
    let handlers = lookup.resolve_notification_handlers::<N>();
    if handlers.is_empty() {
        trace!(
            notification_type = type_name::<N>(),
            "no handlers subscribed"
        );
        return Ok(());
    }

    debug!(
        notification_type = type_name::<N>(),
        handlers = handlers.len(),
        "fanning out notification"
    );
    let results = join_all(
        handlers
            .iter()
            .map(|handler| handler.handle(notification, token)),
    )
    .await;

    // join_all keeps registration order, so the scan below surfaces the
    // first registered handler's failure after everyone has finished.
    for result in results {
        result?;
    }
    Ok(())
}
