use camera_explorer::device::simulated::SimulatorRemote;
use camera_explorer::parameter::SnapshotDetail;
use camera_explorer::types::SceneMode;
use camera_explorer::{
    testing, CameraError, CameraSession, DeviceProfile, ExplorerConfig, PropertyKey, RawValue,
    RegistryEvent, Resolution, ResolutionKind, SharedDevice, SimulatedDevice,
};
use tempfile::TempDir;

async fn open(profile: &DeviceProfile) -> (CameraSession, SimulatorRemote) {
    let simulated = SimulatedDevice::from_profile(profile);
    let remote = simulated.remote();
    let session = CameraSession::open(SharedDevice::new(simulated), ExplorerConfig::default())
        .await
        .unwrap();
    (session, remote)
}

#[tokio::test]
async fn profile_from_toml_opens_same_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("front.toml");
    testing::front_profile().save_to_file(&path).unwrap();

    let loaded = DeviceProfile::load_from_file(&path).unwrap();
    assert_eq!(loaded, testing::front_profile());

    let (session, _) = open(&loaded).await;
    assert_eq!(session.parameters().unwrap().len(), 4);
}

#[test]
fn malformed_profile_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "iso = \"lots\"\n").unwrap();

    let err = DeviceProfile::load_from_file(&path).unwrap_err();
    assert!(matches!(err, CameraError::ConfigError(_)));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn refresh_all_picks_up_device_changes() {
    let (session, remote) = open(&testing::full_profile()).await;
    let scene = session.parameter("Scene mode").unwrap().unwrap();
    assert_eq!(scene.as_enumerated().unwrap().selected_label().as_deref(), Some("Auto"));

    remote.set_value(PropertyKey::SceneMode, RawValue::SceneMode(SceneMode::Beach));
    session.refresh_all().unwrap();

    assert_eq!(scene.as_enumerated().unwrap().selected_label().as_deref(), Some("Beach"));
    assert_eq!(
        scene.overlay_image().as_deref(),
        Some("Assets/Icons/overlay.scenemode.beach.png")
    );
}

#[tokio::test]
async fn reset_all_restores_defaults() {
    let (session, remote) = open(&testing::full_profile()).await;

    let iso = session.parameter("ISO").unwrap().unwrap();
    let iso_control = iso.as_enumerated().unwrap();
    let index = iso_control.index_of_label("iso 800").unwrap();
    iso_control.select_index(Some(index)).unwrap();

    let compensation = session.parameter("Exposure compensation").unwrap().unwrap();
    compensation.as_range().unwrap().set_value(2).unwrap();

    let capture = session.parameter("Capture resolution").unwrap().unwrap();
    let capture_control = capture.as_enumerated().unwrap();
    let largest = capture_control.index_of_label("3264 x 2448").unwrap();
    capture_control.select_index(Some(largest)).unwrap().settle().await.unwrap();

    let failures = session.reset_all().await.unwrap();
    assert!(failures.is_empty());

    assert_eq!(iso_control.selected_label().as_deref(), Some("ISO 100"));
    assert_eq!(compensation.as_range().unwrap().value(), 0);
    assert_eq!(capture_control.selected_label().as_deref(), Some("640 x 480"));
    assert_eq!(remote.value(PropertyKey::Iso), Some(RawValue::U32(100)));
    assert_eq!(
        remote.current_resolution(ResolutionKind::Capture),
        Some(Resolution::new(640, 480))
    );
}

#[tokio::test]
async fn reset_all_reports_rejections_and_continues() {
    let (session, remote) = open(&testing::full_profile()).await;
    let flash = session.parameter("Flash mode").unwrap().unwrap();
    let control = flash.as_enumerated().unwrap();
    control.select_index(control.index_of_label("On")).unwrap();

    remote.set_rejecting_writes(PropertyKey::FlashMode, true);
    let failures = session.reset_all().await.unwrap();

    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], CameraError::WriteRejected { .. }));
    assert_eq!(control.selected_label().as_deref(), Some("On"));
}

#[tokio::test]
async fn rebuild_notifies_collection_once() {
    let (session, _) = open(&testing::full_profile()).await;
    let mut events = session.registry().subscribe();

    let count = session.rebuild().await.unwrap();
    assert_eq!(count, 12);
    assert_eq!(events.try_recv().unwrap(), RegistryEvent::CollectionChanged { count: 12 });
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn snapshot_serializes_for_display() {
    let (session, _) = open(&testing::front_profile()).await;
    let snapshots = session.snapshot().unwrap();

    let compensation = &snapshots[0];
    assert_eq!(compensation.name, "Exposure compensation");
    assert_eq!(
        compensation.detail,
        SnapshotDetail::Range {
            minimum: -2,
            maximum: 2,
            value: 0
        }
    );

    let json = serde_json::to_value(&snapshots).unwrap();
    assert_eq!(json[0]["kind"], "range");
    assert_eq!(json[1]["name"], "Scene mode");
    assert_eq!(json[1]["kind"], "enumerated");
    assert_eq!(json[1]["options"][1]["label"], "Sport");
    assert_eq!(json[1]["selected"], 1);
    assert_eq!(json[1]["overlay_image"], "Assets/Icons/overlay.scenemode.sport.png");
}
