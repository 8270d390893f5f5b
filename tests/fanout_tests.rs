// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Acquisition loop and sink fan-out tests
mod common;

use common::*;
use parking_lot::RwLock;
use radar_recorder::acquisition::{Acquisition, AcquisitionSettings};
use radar_recorder::*;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn settings(dir: &Path, duration: Duration) -> AcquisitionSettings {
    AcquisitionSettings {
        port_identifier: "/dev/ttyTEST0".to_string(),
        duration,
        bit_rate: 921_600,
        read_timeout: Duration::from_millis(50),
        value_field: "unwrapPhasePeak_mm".to_string(),
        output_dir: dir.to_path_buf(),
        file_prefix: "radar_data".to_string(),
        remote_timeout: Duration::from_millis(50),
    }
}

fn recording_session() -> Arc<RwLock<Session>> {
    Arc::new(RwLock::new(Session {
        status: SessionStatus::Recording,
        ..Session::default()
    }))
}

fn mixed_script() -> Vec<Step> {
    vec![
        Step::Value(1.5),
        Step::Malformed,
        Step::Value(-0.25),
        Step::NoData,
        Step::Missing,
        Step::Value(3.0),
        Step::Disconnected,
        Step::Value(4.125),
    ]
}

async fn run_with_remote(
    dir: &Path,
    remote: Option<Arc<dyn RemoteSink>>,
) -> (acquisition::AcquisitionReport, LiveBuffer) {
    let buffer = LiveBuffer::new();
    let acquisition = Acquisition::new(
        settings(dir, Duration::from_millis(400)),
        recording_session(),
        buffer.clone(),
        Arc::new(ScriptedOpener::new(mixed_script())),
        remote,
        CancellationToken::new(),
    );
    (acquisition.run().await, buffer)
}

#[tokio::test]
async fn test_transient_frame_errors_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let (report, buffer) = run_with_remote(temp_dir.path(), None).await;

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.readings, 4);
    assert_eq!(
        buffer.snapshot().iter().map(|r| r.value).collect::<Vec<_>>(),
        vec![1.5, -0.25, 3.0, 4.125]
    );

    let rows = csv_rows(report.output_path.as_ref().unwrap());
    assert_eq!(rows.len(), 4);
    assert!(rows[0].ends_with(",1.5"));
    assert!(rows[3].ends_with(",4.125"));
}

#[tokio::test]
async fn test_failing_remote_loses_nothing_locally() {
    let ok_dir = TempDir::new().unwrap();
    let failing_dir = TempDir::new().unwrap();

    let recording = Arc::new(RecordingRemote::default());
    let failing = Arc::new(FailingRemote::default());

    let (ok_report, ok_buffer) = run_with_remote(ok_dir.path(), Some(recording.clone())).await;
    let (failed_report, failed_buffer) =
        run_with_remote(failing_dir.path(), Some(failing.clone())).await;

    assert_eq!(ok_report.readings, failed_report.readings);
    assert_eq!(ok_buffer.len(), failed_buffer.len());
    assert_eq!(
        csv_rows(ok_report.output_path.as_ref().unwrap()).len(),
        csv_rows(failed_report.output_path.as_ref().unwrap()).len()
    );

    // Every reading was attempted exactly once, never retried
    assert_eq!(recording.received.lock().len(), 4);
    assert_eq!(failing.attempts.load(Ordering::SeqCst), 4);
    assert_eq!(*recording.received.lock(), ok_buffer.snapshot());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hanging_remote_is_bounded_by_timeout() {
    let temp_dir = TempDir::new().unwrap();
    let remote = Arc::new(HangingRemote::default());
    let buffer = LiveBuffer::new();

    let acquisition = Acquisition::new(
        settings(temp_dir.path(), Duration::from_millis(300)),
        recording_session(),
        buffer.clone(),
        Arc::new(ScriptedOpener::streaming(Duration::from_millis(5))),
        Some(remote.clone()),
        CancellationToken::new(),
    );

    let started = Instant::now();
    let report = acquisition.run().await;

    // Each forward gives up after 50ms instead of hanging for 30s
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.status, SessionStatus::Completed);
    assert!(report.readings >= 2);
    assert_eq!(remote.attempts.load(Ordering::SeqCst), report.readings);
    assert_eq!(buffer.len(), report.readings);
}

#[tokio::test]
async fn test_cancel_at_iteration_n_keeps_exactly_n() {
    let temp_dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let session = recording_session();
    let buffer = LiveBuffer::new();

    let opener = ScriptedOpener::streaming(Duration::from_millis(1)).cancel_after(7, cancel.clone());
    let closed = opener.closed.clone();

    let acquisition = Acquisition::new(
        settings(temp_dir.path(), Duration::from_secs(30)),
        session.clone(),
        buffer.clone(),
        Arc::new(opener),
        None,
        cancel,
    );
    let report = acquisition.run().await;

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.readings, 7);
    assert_eq!(buffer.len(), 7);
    assert_eq!(csv_rows(report.output_path.as_ref().unwrap()).len(), 7);
    assert_eq!(session.read().status, SessionStatus::Completed);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_cancelled_before_first_read() {
    let temp_dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let opener = ScriptedOpener::streaming(Duration::from_millis(1));
    let served = opener.served.clone();

    let report = Acquisition::new(
        settings(temp_dir.path(), Duration::from_secs(30)),
        recording_session(),
        LiveBuffer::new(),
        Arc::new(opener),
        None,
        cancel,
    )
    .run()
    .await;

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.readings, 0);
    assert_eq!(served.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_open_failure_sets_error_on_session() {
    let temp_dir = TempDir::new().unwrap();
    let session = recording_session();

    let report = Acquisition::new(
        settings(temp_dir.path(), Duration::from_secs(1)),
        session.clone(),
        LiveBuffer::new(),
        Arc::new(ScriptedOpener::failing("permission denied")),
        None,
        CancellationToken::new(),
    )
    .run()
    .await;

    assert_eq!(report.status, SessionStatus::Failed);
    assert_eq!(report.readings, 0);
    assert!(report.output_path.as_ref().unwrap().exists());

    let session = session.read();
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(session.error.as_ref().unwrap().contains("permission denied"));
    assert_eq!(session.output_path, report.output_path);
}

#[tokio::test]
async fn test_unwritable_output_dir_fails_session() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"file").unwrap();

    let opener = ScriptedOpener::streaming(Duration::from_millis(1));
    let opened = opener.opened.clone();
    let session = recording_session();

    let report = Acquisition::new(
        settings(&blocker, Duration::from_secs(1)),
        session.clone(),
        LiveBuffer::new(),
        Arc::new(opener),
        None,
        CancellationToken::new(),
    )
    .run()
    .await;

    assert_eq!(report.status, SessionStatus::Failed);
    assert!(report.output_path.is_none());
    assert_eq!(opened.load(Ordering::SeqCst), 0);
    assert!(session.read().error.is_some());
}

async fn first_reading_after(steps: Vec<Step>, dir: &Path) -> (usize, Option<Reading>) {
    let buffer = LiveBuffer::new();
    let report = Acquisition::new(
        settings(dir, Duration::from_millis(300)),
        recording_session(),
        buffer.clone(),
        Arc::new(ScriptedOpener::new(steps)),
        None,
        CancellationToken::new(),
    )
    .run()
    .await;
    (report.readings, buffer.snapshot().first().copied())
}

#[tokio::test]
async fn test_malformed_burst_does_not_stall_the_loop() {
    let temp_dir = TempDir::new().unwrap();
    let mut steps = vec![Step::Malformed; 40];
    steps.push(Step::Value(7.0));

    let (readings, first) = first_reading_after(steps, temp_dir.path()).await;

    // Decode failures retry immediately; 40 pauses would outlast the session
    assert_eq!(readings, 1);
    let first = first.unwrap();
    assert_eq!(first.value, 7.0);
    assert!(first.elapsed_seconds < 0.1, "stalled: {}", first.elapsed_seconds);
}

#[tokio::test]
async fn test_transport_errors_back_off() {
    let temp_dir = TempDir::new().unwrap();
    let mut steps = vec![Step::Disconnected; 5];
    steps.push(Step::Value(2.0));

    let (readings, first) = first_reading_after(steps, temp_dir.path()).await;

    assert_eq!(readings, 1);
    let first = first.unwrap();
    assert_eq!(first.value, 2.0);
    assert!(first.elapsed_seconds >= 0.05, "no backoff: {}", first.elapsed_seconds);
}
