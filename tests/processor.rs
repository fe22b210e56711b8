use std::sync::mpsc;
use std::thread;

use engine_gate::{
   EngineConfig, EngineGate, ErrorRecord, Item, LatencyHist, NullSink, TransformProcessor,
   VecSink, TRANSFORM_STEP,
};

mod common;
use common::{MapSource, ScriptedEngine};

#[test]
fn test_success_emits_output_and_one_sample() {
   let engine = ScriptedEngine::new().transforms_to("x", "X");
   let metrics = LatencyHist::new();
   let successes = VecSink::new();
   let failures: VecSink<ErrorRecord> = VecSink::new();
   let processor = TransformProcessor::new(&engine, &metrics, &successes, &failures);

   processor.process(&Item::with_id("a", "x"));

   assert_eq!(successes.take(), vec!["X".to_string()]);
   assert!(failures.is_empty());
   let snapshot = metrics.snapshot();
   assert_eq!(snapshot.count, 1);
   assert!(snapshot.min_ms.is_some());
}

#[test]
fn test_failure_emits_record_with_source_id() {
   let engine = ScriptedEngine::new().fails_on("y", "boom");
   let metrics = LatencyHist::new();
   let successes: VecSink<String> = VecSink::new();
   let failures = VecSink::new();
   let processor = TransformProcessor::new(&engine, &metrics, &successes, &failures);

   processor.process(&Item::with_id("b", "y"));

   assert!(successes.is_empty());
   let records = failures.take();
   assert_eq!(records.len(), 1);
   assert_eq!(records[0].cause(), "boom");
   assert_eq!(records[0].step(), TRANSFORM_STEP);
   assert_eq!(records[0].sources(), ["b".to_string()].as_slice());
   // Latency is only sampled on success.
   assert_eq!(metrics.snapshot().count, 0);
}

#[test]
fn test_failure_without_id_has_no_sources() {
   let engine = ScriptedEngine::new().fails_on("y", "boom");
   let metrics = LatencyHist::new();
   let successes: VecSink<String> = VecSink::new();
   let failures = VecSink::new();
   let processor = TransformProcessor::new(&engine, &metrics, &successes, &failures);

   processor.process(&Item::new("y"));

   let records = failures.take();
   assert_eq!(records.len(), 1);
   assert!(records[0].sources().is_empty());
}

#[test]
fn test_worker_continues_past_bad_items() {
   let engine = ScriptedEngine::new()
      .transforms_to("one", "ONE")
      .fails_on("two", "boom")
      .transforms_to("three", "THREE");
   let metrics = LatencyHist::new();
   let successes = VecSink::new();
   let failures: VecSink<ErrorRecord> = VecSink::new();
   let processor = TransformProcessor::new(&engine, &metrics, &successes, &failures);

   for data in ["one", "two", "three"] {
      processor.process(&Item::new(data));
   }

   // Order of successes follows the worker's input order.
   assert_eq!(successes.take(), vec!["ONE".to_string(), "THREE".to_string()]);
   assert_eq!(failures.len(), 1);
   assert_eq!(metrics.snapshot().count, 2);
}

#[test]
fn test_mpsc_senders_as_sinks() {
   let engine = ScriptedEngine::new()
      .transforms_to("x", "X")
      .fails_on("y", "boom");
   let metrics = LatencyHist::new();
   let (success_tx, success_rx) = mpsc::channel();
   let (error_tx, error_rx) = mpsc::channel::<ErrorRecord>();
   let processor = TransformProcessor::new(&engine, &metrics, &success_tx, &error_tx);

   processor.process(&Item::new("x"));
   processor.process(&Item::with_id("b", "y"));

   assert_eq!(success_rx.try_recv().unwrap(), "X");
   assert_eq!(error_rx.try_recv().unwrap().cause(), "boom");
}

#[test]
fn test_disconnected_sink_does_not_panic_worker() {
   let engine = ScriptedEngine::new().transforms_to("x", "X");
   let metrics = LatencyHist::new();
   let (success_tx, success_rx) = mpsc::channel::<String>();
   drop(success_rx);
   let errors = NullSink;
   let processor = TransformProcessor::new(&engine, &metrics, &success_tx, &errors);

   // The record is dropped, the worker keeps going.
   processor.process(&Item::new("x"));
   assert_eq!(metrics.snapshot().count, 1);
}

#[test]
fn test_parallel_workers_share_engine_and_metrics() {
   let engine = ScriptedEngine::new().transforms_to("x", "X");
   let metrics = LatencyHist::new();
   let successes = VecSink::new();
   let failures: VecSink<ErrorRecord> = VecSink::new();

   let workers = 4;
   let items_per_worker = 25;
   thread::scope(|scope| {
      for _ in 0..workers {
         scope.spawn(|| {
            let processor = TransformProcessor::new(&engine, &metrics, &successes, &failures);
            for _ in 0..items_per_worker {
               processor.process(&Item::new("x"));
            }
         });
      }
   });

   assert_eq!(successes.len(), workers * items_per_worker);
   assert!(failures.is_empty());
   assert_eq!(metrics.snapshot().count, (workers * items_per_worker) as u64);
}

/// The end-to-end scenario: initialize through the gate with config "C",
/// then run two items where one transform succeeds and one fails.
#[test]
fn test_end_to_end_through_the_gate() {
   let engine = ScriptedEngine::new()
      .transforms_to("x", "X")
      .fails_on("y", "boom");
   let seen_configs = engine.seen_configs();
   let gate = EngineGate::new(engine, EngineConfig::from_text("C"));

   let engine = gate.ensure_ready(&MapSource::empty()).unwrap();
   assert_eq!(*seen_configs.lock().unwrap(), vec!["C".to_string()]);

   let metrics = LatencyHist::new();
   let successes = VecSink::new();
   let failures: VecSink<ErrorRecord> = VecSink::new();
   let processor = TransformProcessor::new(engine, &metrics, &successes, &failures);

   processor.process(&Item::with_id("a", "x"));
   processor.process(&Item::with_id("b", "y"));

   assert_eq!(successes.take(), vec!["X".to_string()]);
   let records = failures.take();
   assert_eq!(records.len(), 1);
   assert_eq!(records[0].cause(), "boom");
   assert_eq!(records[0].step(), "TransformProcessor");
   assert_eq!(records[0].sources(), ["b".to_string()].as_slice());
   assert_eq!(metrics.snapshot().count, 1);
}
