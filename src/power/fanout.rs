//! Bounded per-node fan-out

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::node::ZNode;

/// Run `op` for every node, at most `max_concurrent` at a time.
///
/// Once a node fails, nodes still waiting for a slot are skipped; nodes
/// already in flight run to completion. The error of the first failing node
/// in input order is returned. With `max_concurrent == 1` nodes are processed
/// strictly in input order and the first failure ends the loop.
pub(crate) async fn for_each_node<'a, F, Fut>(
    nodes: &'a [ZNode],
    max_concurrent: usize,
    op: F,
) -> Result<()>
where
    F: Fn(&'a ZNode) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let semaphore = &Semaphore::new(max_concurrent.max(1));
    let failed = &AtomicBool::new(false);
    let op = &op;

    let tasks = nodes.iter().map(|node| async move {
        let _permit = semaphore
            .acquire()
            .await
            .context("Node fan-out semaphore closed")?;

        if failed.load(Ordering::SeqCst) {
            warn!("Skipping node {} after an earlier failure", node.name);
            return Ok(());
        }

        debug!("Processing node {}", node.name);
        let result = op(node).await;
        if result.is_err() {
            failed.store(true, Ordering::SeqCst);
        }
        result
    });

    join_all(tasks).await.into_iter().collect()
}
