//! Top-level orchestration: reads the three configuration groups, builds an
//! `EventSource`, a `Processor` per rank, and an in-process transport pool, then
//! drives one aggregator task and `pool_size - 1` worker tasks to completion.

use photon_broadcast::BroadcastChannel;
use photon_config::ConfigTree;
use photon_core::record::TIMESTAMP_FIELD;
use photon_core::{CancellationToken, PhotonError};
use photon_processing::ProcessorRegistry;
use photon_source::{DataExtractor, ExtractFn, SourceRegistry};
use photon_transport::in_process::in_process_pool;
use std::sync::Arc;

use crate::aggregator::{run_aggregator, AggregatorOutcome};
use crate::worker::{run_worker, WorkerOutcome};

/// Everything [`run`] needs beyond the parsed configuration: the pool size the
/// process was launched with, and an optional override for the source
/// descriptor (the launcher's `--source` flag, spec §6).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub pool_size: u32,
    pub source_override: Option<String>,
}

/// Summary of one completed run, returned by [`run`] for the CLI layer to turn
/// into an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub aggregator: AggregatorOutcome,
}

/// Builds a `DataExtractor` that reads each name in `required_data` out of the
/// event's scratch map, verbatim. Sources populate `scratch` during `open`;
/// this keeps extraction facility-agnostic, since the actual detector-specific
/// extraction logic lives in the `EventSource` implementation, not here.
fn build_extractor(required_data: &[String]) -> DataExtractor {
    let functions: Vec<(String, ExtractFn)> = required_data
        .iter()
        .filter(|name| name.as_str() != TIMESTAMP_FIELD)
        .map(|name| {
            let key = name.clone();
            let function: ExtractFn = Arc::new(move |event| {
                Ok(event.scratch().get(&key).cloned().unwrap_or(serde_json::Value::Null))
            });
            (name.clone(), function)
        })
        .collect();
    DataExtractor::new(functions)
}

/// Runs the fabric end to end: loads `data_retrieval_layer`/`processing_layer`
/// to build one `EventSource` (shared read-only across workers where the
/// underlying implementation allows it) and one `Processor` instance per rank,
/// wires an in-process transport pool and a `BroadcastChannel`, and drives the
/// aggregator and all workers to completion.
///
/// `cancel` is observed only by the aggregator (spec §4.5: workers are
/// cancelled exclusively through `DIE`, never directly by a signal), so wiring
/// `SIGINT` into `cancel` in the CLI layer is sufficient to trigger SHUTDOWN.
///
/// # Errors
/// [`PhotonError::Config`] if the configuration is malformed or names an
/// unregistered source/processor identifier; otherwise whatever the aggregator
/// or a worker returned as a fatal error.
pub async fn run(
    config: &ConfigTree,
    run_config: RunConfig,
    channel: BroadcastChannel,
    cancel: CancellationToken,
) -> Result<RunReport, PhotonError> {
    let retrieval: photon_config::DataRetrievalConfig =
        config.get_group("data_retrieval_layer")?;
    let processor_identifier: String =
        config
            .get("processing_layer", "processor_identifier", true)?
            .ok_or_else(|| PhotonError::config("processing_layer.processor_identifier missing"))?;

    let source_descriptor = run_config
        .source_override
        .clone()
        .unwrap_or_else(|| retrieval.source_identifier.clone());

    let registry = SourceRegistry::with_defaults();
    let extractor = build_extractor(&retrieval.required_data);

    let (aggregator_transport, worker_transports) = in_process_pool(run_config.pool_size);
    let aggregator_processor = ProcessorRegistry::build(&processor_identifier, config)?;

    let cancel_for_aggregator = cancel.clone();
    let pool_size = run_config.pool_size;
    let channel_for_aggregator = channel.clone();
    let aggregator_handle = tokio::spawn(async move {
        run_aggregator(
            pool_size,
            aggregator_processor,
            Box::new(aggregator_transport),
            channel_for_aggregator,
            cancel_for_aggregator,
        )
        .await
    });

    let mut worker_handles = Vec::with_capacity(worker_transports.len());
    for (index, transport) in worker_transports.into_iter().enumerate() {
        let rank = photon_core::Rank((index + 1) as u32);
        let source = registry.build(&retrieval.source_identifier, &source_descriptor)?;
        let processor = ProcessorRegistry::build(&processor_identifier, config)?;
        let extractor = extractor.clone();
        let num_frames = retrieval.num_frames_in_event_to_process;

        worker_handles.push(tokio::spawn(run_worker(
            rank,
            pool_size,
            source,
            extractor,
            processor,
            Box::new(transport),
            num_frames,
        )));
    }

    for handle in worker_handles {
        let outcome: WorkerOutcome = handle
            .await
            .map_err(|e| PhotonError::transport(format!("worker task panicked: {e}")))??;
        tracing::debug!(?outcome, "worker finished");
    }

    let aggregator_outcome = aggregator_handle
        .await
        .map_err(|e| PhotonError::transport(format!("aggregator task panicked: {e}")))??;

    Ok(RunReport {
        aggregator: aggregator_outcome,
    })
}
