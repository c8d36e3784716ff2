//! Asynchronous resolution changes.
//!
//! A resolution write suspends the parameter until the device answers. These
//! tests hold the answer back to observe the suspended state, then release
//! it with success or failure.

use camera_explorer::catalog;
use camera_explorer::device::simulated::{ResolutionMode, SimulatorRemote};
use camera_explorer::notify::drain;
use camera_explorer::parameter::EnumeratedParameter;
use camera_explorer::{
    CameraError, CameraParameter, ParameterField, Resolution, ResolutionKind, SharedDevice,
    SimulatedDevice, WriteOutcome,
};
use tokio_test::{assert_err, assert_ok};

const VGA: Resolution = Resolution::new(640, 480);
const SXGA: Resolution = Resolution::new(1280, 960);
const FIVE_MP: Resolution = Resolution::new(2592, 1944);
const EIGHT_MP: Resolution = Resolution::new(3264, 2448);

fn capture_parameter(mode: ResolutionMode) -> (EnumeratedParameter<Resolution>, SimulatorRemote) {
    let simulated = SimulatedDevice::default()
        .with_resolutions(ResolutionKind::Capture, vec![VGA, SXGA, FIVE_MP, EIGHT_MP], Some(VGA))
        .with_resolution_mode(mode);
    let remote = simulated.remote();
    let parameter = EnumeratedParameter::new(
        catalog::resolution_spec(ResolutionKind::Capture, VGA),
        SharedDevice::new(simulated),
        "Assets/Icons",
    );
    (parameter, remote)
}

fn selected(parameter: &EnumeratedParameter<Resolution>) -> Option<Resolution> {
    parameter.selected_option().map(|o| o.value)
}

#[tokio::test]
async fn rejected_capture_resolution_keeps_previous_selection() {
    let (capture, remote) = capture_parameter(ResolutionMode::Reject);

    let outcome = assert_ok!(capture.select_value(&SXGA));
    assert!(outcome.is_pending());
    assert!(!capture.modifiable());

    let error = assert_err!(outcome.settle().await);
    assert!(matches!(error, CameraError::WriteRejected { .. }));
    assert!(error.is_recoverable());

    assert_eq!(selected(&capture), Some(VGA));
    assert!(capture.modifiable());
    assert_eq!(remote.current_resolution(ResolutionKind::Capture), Some(VGA));
}

#[tokio::test]
async fn second_write_is_refused_while_first_is_outstanding() {
    let (capture, remote) = capture_parameter(ResolutionMode::Deferred);

    let first = assert_ok!(capture.select_value(&SXGA));
    assert!(first.is_pending());
    assert_eq!(remote.pending_resolution_writes(), 1);

    let second = capture.select_value(&FIVE_MP);
    assert!(matches!(second, Err(CameraError::NotModifiable(_))));
    assert!(matches!(capture.set_default(), Err(CameraError::NotModifiable(_))));
    assert_eq!(remote.resolution_writes().len(), 1);

    assert!(remote.complete_resolution_write(Ok(())));
    assert_ok!(first.settle().await);

    assert_eq!(selected(&capture), Some(SXGA));
    assert!(capture.modifiable());
    assert_eq!(remote.current_resolution(ResolutionKind::Capture), Some(SXGA));
}

#[tokio::test]
async fn deferred_failure_restores_modifiable() {
    let (capture, remote) = capture_parameter(ResolutionMode::Deferred);

    let pending = assert_ok!(capture.select_value(&EIGHT_MP));
    assert!(remote.complete_resolution_write(Err(CameraError::DeviceError("sensor busy".into()))));

    let error = assert_err!(pending.settle().await);
    assert!(error.to_string().contains("sensor busy"));
    assert_eq!(selected(&capture), Some(VGA));
    assert!(capture.modifiable());

    // A retry after the failure goes through normally.
    remote.set_resolution_mode(ResolutionMode::Immediate);
    let retry = assert_ok!(capture.select_value(&EIGHT_MP));
    assert_ok!(retry.settle().await);
    assert_eq!(selected(&capture), Some(EIGHT_MP));
}

#[tokio::test]
async fn notifications_follow_suspend_select_resume_order() {
    let (capture, remote) = capture_parameter(ResolutionMode::Deferred);
    let mut changes = capture.subscribe();

    let pending = assert_ok!(capture.select_value(&FIVE_MP));
    remote.complete_resolution_write(Ok(()));
    assert_ok!(pending.settle().await);

    let fields: Vec<_> = drain(&mut changes).into_iter().map(|c| c.field).collect();
    assert_eq!(
        fields,
        vec![
            ParameterField::Modifiable,
            ParameterField::SelectedOption,
            ParameterField::OverlayImage,
            ParameterField::Modifiable,
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_writers_get_exactly_one_pending() {
    let (capture, remote) = capture_parameter(ResolutionMode::Deferred);

    let mut tasks = Vec::new();
    for size in [SXGA, FIVE_MP, EIGHT_MP] {
        let parameter = capture.clone();
        tasks.push(tokio::spawn(async move { parameter.select_value(&size) }));
    }

    let mut pending = Vec::new();
    let mut refused = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(WriteOutcome::Pending(write)) => pending.push(write),
            Err(CameraError::NotModifiable(_)) => refused += 1,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    assert_eq!(pending.len(), 1);
    assert_eq!(refused, 2);

    assert!(remote.complete_resolution_write(Ok(())));
    for write in pending {
        assert_ok!(write.wait().await);
    }
    assert!(capture.modifiable());
}

#[test]
fn resolution_write_inside_a_fresh_runtime() {
    let (capture, remote) = capture_parameter(ResolutionMode::Immediate);

    tokio_test::block_on(async {
        let outcome = assert_ok!(capture.select_value(&SXGA));
        assert_ok!(outcome.settle().await);
    });

    assert_eq!(selected(&capture), Some(SXGA));
    assert_eq!(remote.resolution_writes(), vec![(ResolutionKind::Capture, SXGA)]);
}
