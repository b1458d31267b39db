mod common;

use async_trait::async_trait;
use common::{STREAM_DOMAIN, add_dj, add_promo, create_test_env, create_test_env_with, manager_in};
use shizulineup::{Error, Manifest, PromoAttrs, RosterAttrs, RosterPatch};
use shizuprobe::{MediaProbe, MemoryProbe, ProbeError, Resolution};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn read_manifest(path: &Path) -> Manifest {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_live_slot_builds_stream_url_without_probing() {
    let (env, probe) = create_test_env();
    env.manager
        .add_roster(RosterAttrs {
            name: "Nova".into(),
            logo_path: Some(env.path("logos/nova.png")),
            recording_path: Some(env.path("recordings/nova.mp4")),
            rtmp_server: Some("us-west".into()),
            stream_key: Some("abc123".into()),
        })
        .await
        .unwrap();
    env.manager
        .update_roster(
            0,
            RosterPatch {
                last_live_resolution: Some(Resolution::new(1920, 1080)),
                ..RosterPatch::default()
            },
        )
        .await
        .unwrap();
    env.manager.create_lineup("friday").await.unwrap();
    env.manager.add_dj_to_lineup("friday", "Nova").await.unwrap();
    env.manager
        .set_lineup_dj_live("friday", "Nova", true, Some("Mika"))
        .await
        .unwrap();

    let summary = env
        .manager
        .export_lineup("friday", env.export_dir())
        .await
        .unwrap();

    assert_eq!(summary.path, env.export_dir().join("friday.json"));
    assert_eq!(summary.djs, 1);
    assert_eq!(summary.probed, 0);
    assert!(probe.calls().is_empty());

    let manifest = read_manifest(&summary.path);
    let nova = &manifest.djs[0];
    assert_eq!(
        nova.url,
        format!("rtmp://rtmp-us-west.{}/live/abc123", STREAM_DOMAIN)
    );
    assert_eq!(nova.resolution, Resolution::new(1920, 1080));
    assert_eq!(nova.vj, "Mika");
    assert_eq!(nova.logo_path, env.path("logos/nova.png"));
}

#[tokio::test]
async fn test_recorded_slots_and_promos_are_probed() {
    let (env, probe) = create_test_env_with(|root| {
        MemoryProbe::new()
            .with_resolution(root.join("recordings/kite.mp4"), Resolution::new(1280, 720))
            .with_resolution(root.join("recordings/teaser.mp4"), Resolution::Empty)
    });
    env.manager
        .add_roster(RosterAttrs {
            recording_path: Some(env.path("recordings/kite.mp4")),
            ..RosterAttrs::named("Kite")
        })
        .await
        .unwrap();
    add_dj(&env, "Bare").await;
    env.manager
        .add_promo(PromoAttrs {
            name: "Teaser".into(),
            path: Some(env.path("recordings/teaser.mp4")),
        })
        .await
        .unwrap();
    add_promo(&env, "Pathless").await;

    env.manager.create_lineup("friday").await.unwrap();
    env.manager.add_dj_to_lineup("friday", "Kite").await.unwrap();
    env.manager.add_dj_to_lineup("friday", "Bare").await.unwrap();
    env.manager.add_promo_to_lineup("friday", "Teaser").await.unwrap();
    env.manager.add_promo_to_lineup("friday", "Pathless").await.unwrap();

    let summary = env
        .manager
        .export_lineup("friday", env.export_dir())
        .await
        .unwrap();
    assert_eq!(summary.probed, 2);
    assert_eq!(probe.calls().len(), 2);

    let manifest = read_manifest(&summary.path);
    assert_eq!(manifest.djs[0].resolution, Resolution::new(1280, 720));
    assert_eq!(manifest.djs[0].url, "");
    assert_eq!(manifest.djs[1].recording_path, "");
    assert_eq!(manifest.djs[1].resolution, Resolution::Empty);
    assert_eq!(manifest.promos[0].path, env.path("recordings/teaser.mp4"));
    assert_eq!(manifest.promos[1].path, "");

    // Forme JSON des résolutions
    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&summary.path).unwrap()).unwrap();
    assert_eq!(raw["djs"][0]["resolution"], serde_json::json!([1280, 720]));
    assert_eq!(raw["promos"][0]["resolution"], serde_json::json!([]));
}

#[tokio::test]
async fn test_missing_references_are_reported_together() {
    let (env, _probe) = create_test_env();
    for dj in ["Nova", "Kite", "Lark"] {
        add_dj(&env, dj).await;
    }
    add_promo(&env, "Teaser").await;
    env.manager.create_lineup("friday").await.unwrap();
    for dj in ["Nova", "Kite", "Lark"] {
        env.manager.add_dj_to_lineup("friday", dj).await.unwrap();
    }
    env.manager.add_promo_to_lineup("friday", "Teaser").await.unwrap();

    // Le ledger est modifié à la main, sans cascade
    std::fs::write(
        env.root().join("ledger.json"),
        r#"{"djs": [{"name": "Kite"}], "promos": []}"#,
    )
    .unwrap();

    match env
        .manager
        .export_lineup("friday", env.export_dir())
        .await
        .unwrap_err()
    {
        Error::ReferenceNotFound(missing) => {
            assert_eq!(missing.djs, vec!["Nova", "Lark"]);
            assert_eq!(missing.promos, vec!["Teaser"]);
            assert_eq!(missing.len(), 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!env.export_dir().join("friday.json").exists());
}

#[tokio::test]
async fn test_probe_failures_are_collected_and_nothing_is_written() {
    let (env, _probe) = create_test_env_with(|root| {
        MemoryProbe::new()
            .with_failure(root.join("recordings/kite.mp4"), "moov atom not found")
            .with_failure(root.join("recordings/teaser.mp4"), "truncated")
            .with_resolution(root.join("recordings/nova.mp4"), Resolution::new(640, 360))
    });
    for (name, file) in [("Nova", "nova.mp4"), ("Kite", "kite.mp4")] {
        env.manager
            .add_roster(RosterAttrs {
                recording_path: Some(env.path(&format!("recordings/{}", file))),
                ..RosterAttrs::named(name)
            })
            .await
            .unwrap();
    }
    env.manager
        .add_promo(PromoAttrs {
            name: "Teaser".into(),
            path: Some(env.path("recordings/teaser.mp4")),
        })
        .await
        .unwrap();
    env.manager.create_lineup("friday").await.unwrap();
    env.manager.add_dj_to_lineup("friday", "Nova").await.unwrap();
    env.manager.add_dj_to_lineup("friday", "Kite").await.unwrap();
    env.manager.add_promo_to_lineup("friday", "Teaser").await.unwrap();

    match env
        .manager
        .export_lineup("friday", env.export_dir())
        .await
        .unwrap_err()
    {
        Error::MediaProbeFailed(failures) => {
            assert_eq!(failures.len(), 2);
            assert!(failures[0].starts_with("DJ Kite, "), "{}", failures[0]);
            assert!(failures[1].starts_with("Promo Teaser, "), "{}", failures[1]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!env.export_dir().join("friday.json").exists());
}

#[tokio::test]
async fn test_export_path_outside_roots_is_rejected_before_loading() {
    let (env, _probe) = create_test_env();

    // Le lineup n'existe même pas : la destination est vérifiée d'abord
    for dir in [
        env.root().join("recordings"),
        env.root().join("export/../recordings"),
        env.root().join("export2"),
    ] {
        let err = env.manager.export_lineup("friday", &dir).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)), "{}", dir.display());
    }

    let err = env
        .manager
        .export_lineup("friday", env.export_dir())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_export_into_nested_directory() {
    let (env, _probe) = create_test_env();
    env.manager.create_lineup("friday").await.unwrap();

    let summary = env
        .manager
        .export_lineup("friday", env.export_dir().join("2026/october"))
        .await
        .unwrap();
    assert!(summary.path.ends_with("export/2026/october/friday.json"));
    assert_eq!(read_manifest(&summary.path), Manifest::default());
}

/// Sonde qui ne répond jamais à temps
struct StalledProbe;

#[async_trait]
impl MediaProbe for StalledProbe {
    async fn probe(&self, _path: &Path) -> Result<Resolution, ProbeError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Resolution::new(1, 1))
    }
}

#[tokio::test]
async fn test_probe_timeout_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_in(
        dir.path(),
        Arc::new(StalledProbe),
        Some(Duration::from_millis(50)),
    );
    let recording = dir.path().join("recordings/slow.mp4");
    manager
        .add_roster(RosterAttrs {
            recording_path: Some(recording.to_string_lossy().into_owned()),
            ..RosterAttrs::named("Slow")
        })
        .await
        .unwrap();
    manager.create_lineup("friday").await.unwrap();
    manager.add_dj_to_lineup("friday", "Slow").await.unwrap();

    match manager
        .export_lineup("friday", dir.path().join("export"))
        .await
        .unwrap_err()
    {
        Error::MediaProbeFailed(failures) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].starts_with("DJ Slow, "));
        }
        other => panic!("unexpected error: {other}"),
    }
}
