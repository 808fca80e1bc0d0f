//! The worker loop (spec §4.5): pulls events from an `EventSource`, extracts and
//! processes each frame, and streams `DATA` to the aggregator, honoring the
//! one-in-flight-send discipline and polling for `DIE` once per event.

use photon_core::{PhotonError, Rank};
use photon_processing::Processor;
use photon_source::{DataExtractor, EventSource};
use photon_transport::WorkerTransport;

/// How the worker loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The event stream was exhausted and `END` was sent normally.
    Finished,
    /// A `DIE` control message was observed and honored with `DEAD`.
    Died,
}

/// Runs one worker's full lifecycle against `source`, `extractor` and `processor`,
/// sending results to the aggregator over `transport`.
///
/// `num_frames_to_process` caps frames processed per event (`None` means all of
/// them), mirroring `data_retrieval_layer.num_frames_in_event_to_process`.
///
/// # Errors
/// Propagates any [`PhotonError`] not itself recoverable: an event-iterator
/// error, an `open`/`close` failure, or a `Processor::process` failure (the
/// spec's "any other uncaught error" case). Before any such error propagates,
/// `DEAD` is sent to the aggregator, matching the worker-initiated shutdown
/// path (spec §4.5: "print the reason, send DEAD to rank 0, tear down
/// transport, exit"). A per-frame [`photon_source::extractor::ExtractionError`]
/// (wrapped into [`PhotonError::Extraction`] by the stream/extractor boundary) is
/// instead logged and the frame skipped.
pub async fn run_worker(
    rank: Rank,
    pool_size: u32,
    mut source: Box<dyn EventSource>,
    extractor: DataExtractor,
    mut processor: Box<dyn Processor>,
    mut transport: Box<dyn WorkerTransport>,
    num_frames_to_process: Option<usize>,
) -> Result<WorkerOutcome, PhotonError> {
    processor.initialize_worker(rank, pool_size)?;
    source.initialize(rank, pool_size).await?;

    let outcome = run_event_loop(
        rank,
        pool_size,
        source.as_ref(),
        &extractor,
        processor.as_mut(),
        transport.as_mut(),
        num_frames_to_process,
    )
    .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(error) => {
            // worker-initiated shutdown (spec §4.5): a fatal error inside the
            // event loop still owes the aggregator a DEAD confirmation before
            // the error propagates and tears this worker down.
            tracing::error!(rank = rank.get(), error = %error, "fatal worker error, sending DEAD");
            transport.send_dead().await?;
            return Err(error);
        }
    };

    if outcome == WorkerOutcome::Died {
        transport.send_dead().await?;
        return Ok(outcome);
    }

    if let Some(payload) = processor.end_worker(rank, pool_size)? {
        transport.send_data(payload).await?;
    }
    transport.send_end().await?;
    Ok(WorkerOutcome::Finished)
}

async fn run_event_loop(
    rank: Rank,
    pool_size: u32,
    source: &dyn EventSource,
    extractor: &DataExtractor,
    processor: &mut dyn Processor,
    transport: &mut dyn WorkerTransport,
    num_frames_to_process: Option<usize>,
) -> Result<WorkerOutcome, PhotonError> {
    use futures::StreamExt;

    let mut stream = source.events(rank, pool_size);

    while let Some(event) = stream.next().await {
        if transport.poll_die() {
            return Ok(WorkerOutcome::Died);
        }

        let mut event = event?;
        source.open(&mut event).await?;

        let total_frames = source.num_frames(&event);
        let frames_to_process = num_frames_to_process.map_or(total_frames, |cap| total_frames.min(cap));

        for offset in 0..frames_to_process {
            let current_frame = total_frames - frames_to_process + offset;
            event.set_current_frame(current_frame);

            match extractor.extract(&event) {
                Ok(record) => {
                    let payload = processor.process(rank, pool_size, record)?;
                    transport.send_data(payload).await?;
                }
                Err(extraction_error) => {
                    tracing::warn!(
                        rank = rank.get(),
                        event = event.id(),
                        frame = current_frame,
                        error = %extraction_error,
                        "extraction error, skipping frame"
                    );
                }
            }
        }

        source.close(&mut event).await?;
    }

    Ok(WorkerOutcome::Finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use photon_core::RecordMap;
    use photon_source::files::FileListSource;
    use photon_transport::in_process::in_process_pool;
    use photon_transport::Envelope;

    struct CountingProcessor {
        processed: u32,
    }

    impl Processor for CountingProcessor {
        fn initialize_worker(&mut self, _rank: Rank, _pool_size: u32) -> Result<(), PhotonError> {
            Ok(())
        }
        fn initialize_aggregator(&mut self, _rank: Rank, _pool_size: u32) -> Result<(), PhotonError> {
            Ok(())
        }
        fn process(
            &mut self,
            _rank: Rank,
            _pool_size: u32,
            record: RecordMap,
        ) -> Result<RecordMap, PhotonError> {
            self.processed += 1;
            Ok(record)
        }
        fn collect(
            &mut self,
            _rank: Rank,
            _pool_size: u32,
            _payload: RecordMap,
            _source_rank: Rank,
        ) -> Result<Option<(photon_core::Tag, RecordMap)>, PhotonError> {
            Ok(None)
        }
        fn end_worker(&mut self, _rank: Rank, _pool_size: u32) -> Result<Option<RecordMap>, PhotonError> {
            Ok(None)
        }
        fn end_aggregator(
            &mut self,
            _rank: Rank,
            _pool_size: u32,
        ) -> Result<Option<(photon_core::Tag, RecordMap)>, PhotonError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn worker_sends_one_data_per_frame_then_end() {
        let source = FileListSource::from_lines(["/a::2", "/b::1"].into_iter());
        let extractor = DataExtractor::new(vec![]);
        let (mut aggregator, mut workers) = in_process_pool(2);
        let transport = Box::new(workers.remove(0));

        let outcome = run_worker(
            Rank(1),
            2,
            Box::new(source),
            extractor,
            Box::new(CountingProcessor { processed: 0 }),
            transport,
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome, WorkerOutcome::Finished);

        let mut data_count = 0;
        let mut saw_end = false;
        while let Some(envelope) = aggregator.recv().await.unwrap() {
            match envelope {
                Envelope::Data { .. } if !envelope.is_end() => data_count += 1,
                _ if envelope.is_end() => {
                    saw_end = true;
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(data_count, 3); // 2 frames from /a + 1 from /b
        assert!(saw_end);
    }

    #[tokio::test]
    async fn worker_honors_num_frames_to_process_cap() {
        let source = FileListSource::from_lines(["/a::5"].into_iter());
        let extractor = DataExtractor::new(vec![]);
        let (mut aggregator, mut workers) = in_process_pool(2);
        let transport = Box::new(workers.remove(0));

        run_worker(
            Rank(1),
            2,
            Box::new(source),
            extractor,
            Box::new(CountingProcessor { processed: 0 }),
            transport,
            Some(2),
        )
        .await
        .unwrap();

        let mut data_count = 0;
        while let Some(envelope) = aggregator.recv().await.unwrap() {
            if envelope.is_end() {
                break;
            }
            data_count += 1;
        }
        assert_eq!(data_count, 2);
    }

    #[tokio::test]
    async fn worker_dies_when_die_is_observed_before_next_event() {
        let source = FileListSource::from_lines(["/a", "/b", "/c"].into_iter());
        let extractor = DataExtractor::new(vec![]);
        let (mut aggregator, mut workers) = in_process_pool(2);
        let transport = Box::new(workers.remove(0));

        use photon_transport::AggregatorTransport;
        aggregator.send_die(Rank(1)).await.unwrap();

        let outcome = run_worker(
            Rank(1),
            2,
            Box::new(source),
            extractor,
            Box::new(CountingProcessor { processed: 0 }),
            transport,
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome, WorkerOutcome::Died);
        let envelope = aggregator.recv().await.unwrap().unwrap();
        assert!(matches!(envelope, Envelope::Dead { worker_rank } if worker_rank == Rank(1)));
    }

    struct FailingProcessor;

    impl Processor for FailingProcessor {
        fn initialize_worker(&mut self, _rank: Rank, _pool_size: u32) -> Result<(), PhotonError> {
            Ok(())
        }
        fn initialize_aggregator(&mut self, _rank: Rank, _pool_size: u32) -> Result<(), PhotonError> {
            Ok(())
        }
        fn process(
            &mut self,
            rank: Rank,
            _pool_size: u32,
            _record: RecordMap,
        ) -> Result<RecordMap, PhotonError> {
            Err(PhotonError::fatal_worker(rank.get(), "simulated processing failure"))
        }
        fn collect(
            &mut self,
            _rank: Rank,
            _pool_size: u32,
            _payload: RecordMap,
            _source_rank: Rank,
        ) -> Result<Option<(photon_core::Tag, RecordMap)>, PhotonError> {
            Ok(None)
        }
        fn end_worker(&mut self, _rank: Rank, _pool_size: u32) -> Result<Option<RecordMap>, PhotonError> {
            Ok(None)
        }
        fn end_aggregator(
            &mut self,
            _rank: Rank,
            _pool_size: u32,
        ) -> Result<Option<(photon_core::Tag, RecordMap)>, PhotonError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn fatal_process_error_still_sends_dead_before_propagating() {
        let source = FileListSource::from_lines(["/a"].into_iter());
        let extractor = DataExtractor::new(vec![]);
        let (mut aggregator, mut workers) = in_process_pool(2);
        let transport = Box::new(workers.remove(0));

        let result = run_worker(
            Rank(1),
            2,
            Box::new(source),
            extractor,
            Box::new(FailingProcessor),
            transport,
            None,
        )
        .await;

        assert!(matches!(result, Err(PhotonError::FatalWorker { .. })));
        let envelope = aggregator.recv().await.unwrap().unwrap();
        assert!(matches!(envelope, Envelope::Dead { worker_rank } if worker_rank == Rank(1)));
    }
}
