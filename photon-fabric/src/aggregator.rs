//! The aggregator loop (spec §4.5): a `RUNNING -> DRAINING -> DONE` state
//! machine that folds worker payloads through a `Processor` and republishes
//! selected results on a `BroadcastChannel`, with a `SHUTDOWN` path triggered by
//! a keyboard interrupt or a fatal transport error.

use photon_broadcast::BroadcastChannel;
use photon_core::{CancellationToken, PhotonError, Rank};
use photon_processing::Processor;
use photon_transport::{AggregatorTransport, Envelope};

/// How the aggregator loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorOutcome {
    /// Every worker sent `END`; `end_aggregator` ran and the run finished cleanly.
    Done,
    /// `cancel` fired or the transport failed; `DIE` was sent to every worker and
    /// `DEAD` collected from all of them (or the shutdown attempt itself failed).
    Shutdown,
}

/// Runs the aggregator's full lifecycle against `transport`, folding payloads
/// through `processor` and publishing selected results on `channel`.
///
/// # Errors
/// Propagates a [`PhotonError::Transport`] if the SHUTDOWN path itself cannot
/// complete (spec §4.5: "any unrecoverable error during shutdown aborts the
/// whole process with a non-zero exit").
pub async fn run_aggregator(
    pool_size: u32,
    mut processor: Box<dyn Processor>,
    mut transport: Box<dyn AggregatorTransport>,
    channel: BroadcastChannel,
    cancel: CancellationToken,
) -> Result<AggregatorOutcome, PhotonError> {
    let worker_count = transport.worker_count();
    processor.initialize_aggregator(Rank::AGGREGATOR, pool_size)?;

    let running = run_running_state(
        pool_size,
        processor.as_mut(),
        transport.as_mut(),
        &channel,
        &cancel,
        worker_count,
    )
    .await?;

    if let RunningExit::Interrupted = running {
        shutdown(transport.as_mut(), worker_count).await?;
        return Ok(AggregatorOutcome::Shutdown);
    }

    if let Some((tag, payload)) = processor.end_aggregator(Rank::AGGREGATOR, pool_size)? {
        channel.publish(tag, payload);
    }
    Ok(AggregatorOutcome::Done)
}

enum RunningExit {
    AllWorkersFinished,
    Interrupted,
}

async fn run_running_state(
    pool_size: u32,
    processor: &mut dyn Processor,
    transport: &mut dyn AggregatorTransport,
    channel: &BroadcastChannel,
    cancel: &CancellationToken,
    worker_count: u32,
) -> Result<RunningExit, PhotonError> {
    let mut finished_workers = 0u32;

    loop {
        if finished_workers == worker_count {
            return Ok(RunningExit::AllWorkersFinished);
        }

        tokio::select! {
            () = cancel.cancelled() => return Ok(RunningExit::Interrupted),
            envelope = transport.recv() => {
                match envelope? {
                    None => return Err(PhotonError::transport("worker uplink closed unexpectedly")),
                    Some(envelope) if envelope.is_end() => {
                        finished_workers += 1;
                    }
                    Some(Envelope::Data { worker_rank, payload }) => {
                        if let Some((tag, out)) = processor.collect(
                            Rank::AGGREGATOR,
                            pool_size,
                            payload,
                            worker_rank,
                        )? {
                            channel.publish(tag, out);
                        }
                    }
                    Some(Envelope::Dead { .. }) => {
                        tracing::warn!("unexpected DEAD while RUNNING; ignoring");
                    }
                    Some(Envelope::Die) => {
                        tracing::warn!("unexpected DIE received by aggregator; ignoring");
                    }
                }
            }
        }
    }
}

/// The aggregator-initiated SHUTDOWN path: send `DIE` to every worker, then
/// drain `DATA` (discarded) and `DEAD` until every worker has confirmed.
///
/// # Errors
/// [`PhotonError::Transport`] if a `DIE` cannot be sent or the uplink closes
/// before every worker confirms.
pub async fn shutdown(
    transport: &mut dyn AggregatorTransport,
    worker_count: u32,
) -> Result<(), PhotonError> {
    for rank in 1..=worker_count {
        transport.send_die(Rank(rank)).await?;
    }

    let mut dead_count = 0u32;
    while dead_count < worker_count {
        match transport.recv().await? {
            None => {
                return Err(PhotonError::transport(
                    "worker uplink closed before every worker confirmed DEAD",
                ))
            }
            Some(Envelope::Dead { .. }) => dead_count += 1,
            Some(Envelope::Data { .. } | Envelope::Die) => {
                // discarded, per spec's SHUTDOWN drain step
            }
        }
    }
    Ok(())
}
