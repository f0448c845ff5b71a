//! Tests for deriving a child image configuration from a parent.

use layerstack::{Image, ImagePatch, load_parent_image, write_image};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn parent_with_env(pairs: &[&str]) -> Image {
    let mut parent = Image::default();
    parent.config.env = strings(pairs);
    parent
}

// =============================================================================
// Runtime config
// =============================================================================

#[test]
fn test_user_set_on_fresh_parent() {
    let patch = ImagePatch {
        user: Some("someone".to_string()),
        ..Default::default()
    };
    let image = patch.apply(Image::default());
    assert_eq!(image.config.user, "someone");
}

#[test]
fn test_user_overrides_parent() {
    let mut parent = Image::default();
    parent.config.user = "root".to_string();

    let patch = ImagePatch {
        user: Some("nobody".to_string()),
        ..Default::default()
    };
    let image = patch.apply(parent);
    assert_eq!(image.config.user, "nobody");
}

#[test]
fn test_user_retained_without_override() {
    let mut parent = Image::default();
    parent.config.user = "root".to_string();

    let image = ImagePatch::default().apply(parent);
    assert_eq!(image.config.user, "root");
}

#[test]
fn test_ports_default_to_tcp() {
    let patch = ImagePatch {
        ports: strings(&["80"]),
        ..Default::default()
    };
    let image = patch.apply(Image::default());
    let keys: Vec<&String> = image.config.exposed_ports.keys().collect();
    assert_eq!(keys, vec!["80/tcp"]);
}

#[test]
fn test_ports_keep_explicit_protocol() {
    let patch = ImagePatch {
        ports: strings(&["53/udp", "8080/tcp"]),
        ..Default::default()
    };
    let image = patch.apply(Image::default());
    assert!(image.config.exposed_ports.contains_key("53/udp"));
    assert!(image.config.exposed_ports.contains_key("8080/tcp"));
}

#[test]
fn test_ports_augment_parent() {
    let patch = ImagePatch {
        ports: strings(&["80"]),
        ..Default::default()
    };
    let parent = patch.apply(Image::default());

    let patch = ImagePatch {
        ports: strings(&["443"]),
        ..Default::default()
    };
    let image = patch.apply(parent);
    let keys: Vec<&String> = image.config.exposed_ports.keys().collect();
    assert_eq!(keys, vec!["443/tcp", "80/tcp"]);
}

#[test]
fn test_duplicate_port_collapses() {
    let patch = ImagePatch {
        ports: strings(&["80", "80/tcp"]),
        ..Default::default()
    };
    let image = patch.apply(Image::default());
    assert_eq!(image.config.exposed_ports.len(), 1);
}

#[test]
fn test_env_merges_over_parent() {
    let parent = parent_with_env(&["A=1", "B=2"]);
    let patch = ImagePatch {
        env: strings(&["B=changed", "C=3"]),
        ..Default::default()
    };
    let image = patch.apply(parent);
    assert_eq!(image.config.env, strings(&["A=1", "B=changed", "C=3"]));
}

#[test]
fn test_env_expands_parent_references() {
    let parent = parent_with_env(&["PATH=/usr/bin"]);
    let patch = ImagePatch {
        env: strings(&["PATH=$PATH:/opt/bin"]),
        ..Default::default()
    };
    let image = patch.apply(parent);
    assert_eq!(image.config.env, strings(&["PATH=/usr/bin:/opt/bin"]));
}

#[test]
fn test_env_expands_braced_references() {
    let parent = parent_with_env(&["HOME=/root"]);
    let patch = ImagePatch {
        env: strings(&["CACHE=${HOME}/.cache"]),
        ..Default::default()
    };
    let image = patch.apply(parent);
    assert_eq!(
        image.config.env,
        strings(&["CACHE=/root/.cache", "HOME=/root"])
    );
}

#[test]
fn test_env_unknown_reference_becomes_name() {
    let patch = ImagePatch {
        env: strings(&["X=$UNDEFINED"]),
        ..Default::default()
    };
    let image = patch.apply(Image::default());
    assert_eq!(image.config.env, strings(&["X=UNDEFINED"]));
}

#[test]
fn test_env_output_is_sorted() {
    let patch = ImagePatch {
        env: strings(&["ZZ=1", "AA=2", "MM=3"]),
        ..Default::default()
    };
    let image = patch.apply(Image::default());
    assert_eq!(image.config.env, strings(&["AA=2", "MM=3", "ZZ=1"]));
}

#[test]
fn test_empty_env_patch_keeps_parent_order() {
    let parent = parent_with_env(&["Z=1", "A=2"]);
    let image = ImagePatch::default().apply(parent);
    assert_eq!(image.config.env, strings(&["Z=1", "A=2"]));
}

#[test]
fn test_entrypoint_and_cmd_replace() {
    let mut parent = Image::default();
    parent.config.entrypoint = strings(&["/bin/sh", "-c"]);
    parent.config.cmd = strings(&["old"]);

    let patch = ImagePatch {
        entrypoint: strings(&["/app/server"]),
        command: strings(&["--port", "8080"]),
        ..Default::default()
    };
    let image = patch.apply(parent);
    assert_eq!(image.config.entrypoint, strings(&["/app/server"]));
    assert_eq!(image.config.cmd, strings(&["--port", "8080"]));
}

#[test]
fn test_entrypoint_and_cmd_retained_when_empty() {
    let mut parent = Image::default();
    parent.config.entrypoint = strings(&["/bin/sh"]);
    parent.config.cmd = strings(&["run"]);

    let image = ImagePatch::default().apply(parent);
    assert_eq!(image.config.entrypoint, strings(&["/bin/sh"]));
    assert_eq!(image.config.cmd, strings(&["run"]));
}

#[test]
fn test_volumes_augment_parent() {
    let patch = ImagePatch {
        volumes: strings(&["/data"]),
        ..Default::default()
    };
    let parent = patch.apply(Image::default());

    let patch = ImagePatch {
        volumes: strings(&["/logs"]),
        ..Default::default()
    };
    let image = patch.apply(parent);
    let keys: Vec<&String> = image.config.volumes.keys().collect();
    assert_eq!(keys, vec!["/data", "/logs"]);
}

#[test]
fn test_working_dir_override_and_retention() {
    let mut parent = Image::default();
    parent.config.working_dir = "/srv".to_string();

    let image = ImagePatch::default().apply(parent.clone());
    assert_eq!(image.config.working_dir, "/srv");

    let patch = ImagePatch {
        working_dir: Some("/app".to_string()),
        ..Default::default()
    };
    let image = patch.apply(parent);
    assert_eq!(image.config.working_dir, "/app");
}

#[test]
fn test_labels_augment_and_override() {
    let patch = ImagePatch {
        labels: strings(&["team=infra", "tier=base"]),
        ..Default::default()
    };
    let parent = patch.apply(Image::default());

    let patch = ImagePatch {
        labels: strings(&["tier=app"]),
        ..Default::default()
    };
    let image = patch.apply(parent);
    assert_eq!(image.config.labels.get("team").unwrap(), "infra");
    assert_eq!(image.config.labels.get("tier").unwrap(), "app");
}

// =============================================================================
// Rootfs and history
// =============================================================================

#[test]
fn test_rootfs_appends_layer_digests_in_order() {
    let mut parent = Image::default();
    parent.rootfs.diff_ids = strings(&["sha256:base"]);

    let patch = ImagePatch {
        layers: strings(&["aaa", "bbb"]),
        ..Default::default()
    };
    let image = patch.apply(parent);
    assert_eq!(image.rootfs.fs_type, "layers");
    assert_eq!(
        image.rootfs.diff_ids,
        strings(&["sha256:base", "sha256:aaa", "sha256:bbb"])
    );
}

#[test]
fn test_history_appends_exactly_one_entry() {
    let patch = ImagePatch {
        layers: strings(&["aaa"]),
        ..Default::default()
    };
    let parent = patch.clone().apply(Image::default());
    assert_eq!(parent.history.len(), 1);

    let image = patch.apply(parent);
    assert_eq!(image.history.len(), 2);
    assert!(!image.history[1].empty_layer);
}

#[test]
fn test_history_marks_empty_layer() {
    let image = ImagePatch::default().apply(Image::default());
    assert_eq!(image.history.len(), 1);
    assert!(image.history[0].empty_layer);
    assert!(image.history[0].created_by.is_some());
}

#[test]
fn test_platform_fields_are_fixed() {
    let image = ImagePatch::default().apply(Image::default());
    assert_eq!(image.architecture, "amd64");
    assert_eq!(image.os, "linux");
    assert_eq!(image.created.as_deref(), Some("0001-01-01T00:00:00Z"));
    assert!(image.author.is_some());
}

// =============================================================================
// File operations
// =============================================================================

#[test]
fn test_load_parent_defaults_without_path() {
    let image = load_parent_image(None).unwrap();
    assert_eq!(image, Image::default());
}

#[test]
fn test_write_then_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let patch = ImagePatch {
        layers: strings(&["aaa"]),
        user: Some("nobody".to_string()),
        ports: strings(&["80"]),
        env: strings(&["A=1"]),
        entrypoint: strings(&["/app"]),
        volumes: strings(&["/data"]),
        labels: strings(&["k=v"]),
        ..Default::default()
    };
    let image = patch.apply(Image::default());

    write_image(&image, &path).unwrap();
    let loaded = load_parent_image(Some(&path)).unwrap();
    assert_eq!(loaded, image);
}

#[test]
fn test_write_image_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let patch = ImagePatch {
        layers: strings(&["aaa"]),
        env: strings(&["B=2", "A=1"]),
        ports: strings(&["443", "80"]),
        ..Default::default()
    };
    let image = patch.apply(Image::default());

    let p1 = dir.path().join("c1.json");
    let p2 = dir.path().join("c2.json");
    write_image(&image, &p1).unwrap();
    write_image(&image, &p2).unwrap();
    assert_eq!(std::fs::read(&p1).unwrap(), std::fs::read(&p2).unwrap());
}

#[test]
fn test_load_parent_rejects_invalid_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "not json").unwrap();
    assert!(load_parent_image(Some(&path)).is_err());
}
