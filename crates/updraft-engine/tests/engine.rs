use std::fs;

use anyhow::Result;
use updraft_config::EngineConfig;
use updraft_core::{CoreError, SkipReason, StagingLayout, Version};
use updraft_engine::{Engine, EngineError, OperationError};
use updraft_test_support::{InstallFixture, make_bsdiff};

const V1_0_0: Version = Version::from_parts(1, 0, 0);
const V1_1_0: Version = Version::from_parts(1, 1, 0);
const V1_2_0: Version = Version::from_parts(1, 2, 0);

fn fixture_at(installed: Version) -> Result<InstallFixture> {
    let fixture = InstallFixture::new()?;
    fixture.write_marker(installed)?;
    Ok(fixture)
}

#[test]
fn end_to_end_create_and_delete() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    fixture.install_file("old.txt", b"obsolete")?;
    let digest = fixture.stage_payload(V1_1_0, "foo.txt", b"fresh bytes")?;
    fixture.write_script(&format!(
        "VERSION 1.1.0\n-\nC foo.txt stage/foo.txt {digest}\nD old.txt\nVERSION 1.0.0\n"
    ))?;

    let mut engine = Engine::new(fixture.config())?;
    let summary = engine.run()?;

    assert_eq!(fixture.read_file("foo.txt")?, Some(b"fresh bytes".to_vec()));
    assert!(!fixture.exists("old.txt"));
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 1.1.0\n"));
    assert_eq!(engine.installed(), V1_1_0);
    assert_eq!(summary.from, V1_0_0);
    assert_eq!(summary.to, V1_1_0);
    assert_eq!(summary.repositories_applied, 1);
    assert_eq!(summary.entries_applied, 2);
    assert_eq!(summary.entries_skipped, 0);
    assert!(summary.advanced());
    assert!(!fixture.staging_root().join("1_1_0").exists());
    Ok(())
}

#[test]
fn advisory_checksums_apply_when_verification_disabled() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    fixture.install_file("old.txt", b"obsolete")?;
    fixture.stage_payload(V1_1_0, "foo.txt", b"fresh bytes")?;
    fixture.write_script("VERSION 1.1.0\n-\nC foo.txt stage/foo.txt abc123\nD old.txt\nVERSION 1.0.0\n")?;

    let mut strict = Engine::new(fixture.config())?;
    let err = strict.run().unwrap_err();
    assert!(matches!(
        err.operation_error(),
        Some(OperationError::ChecksumMismatch { .. })
    ));
    assert!(fixture.exists("old.txt"));

    let config = EngineConfig {
        verify_checksums: false,
        ..fixture.config()
    };
    let summary = Engine::new(config)?.run()?;
    assert_eq!(summary.to, V1_1_0);
    assert_eq!(fixture.read_file("foo.txt")?, Some(b"fresh bytes".to_vec()));
    assert!(!fixture.exists("old.txt"));
    Ok(())
}

#[test]
fn failed_validation_commits_nothing() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    let digest = fixture.stage_payload(V1_1_0, "foo.txt", b"fresh bytes")?;
    fixture.write_script(&format!(
        "VERSION 1.1.0\n-\nC foo.txt foo.txt {digest}\nD old.txt\nVERSION 1.0.0\n"
    ))?;
    let before = fixture.snapshot()?;

    let err = Engine::new(fixture.config())?.run().unwrap_err();

    match &err {
        EngineError::Validation {
            version,
            entry,
            source: OperationError::NotFound { path },
        } => {
            assert_eq!(*version, V1_1_0);
            assert_eq!(entry, "D old.txt");
            assert!(path.ends_with("old.txt"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.install_touched());
    assert_eq!(fixture.snapshot()?, before);
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 1.0.0\n"));
    assert!(fixture.staging_root().join("1_1_0/foo.txt").exists());
    Ok(())
}

#[test]
fn modify_of_missing_file_is_rejected_before_commit() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    fixture.install_file("keep.txt", b"kept")?;
    let digest = fixture.stage_payload(V1_1_0, "missing.bin.diff", b"diff bytes")?;
    fixture.write_script(&format!(
        "VERSION 1.1.0\n-\nD keep.txt\nM missing.bin missing.bin.diff {digest}\nVERSION 1.0.0\n"
    ))?;
    let before = fixture.snapshot()?;

    let err = Engine::new(fixture.config())?.run().unwrap_err();

    match &err {
        EngineError::Validation {
            version,
            entry,
            source: OperationError::NotFound { path },
        } => {
            assert_eq!(*version, V1_1_0);
            assert!(entry.starts_with("M missing.bin"));
            assert!(path.ends_with("missing.bin"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fixture.snapshot()?, before);
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 1.0.0\n"));
    Ok(())
}

#[test]
fn rerun_after_fixing_obstruction_matches_clean_run() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    fixture.install_file("foo.txt", b"user file")?;
    let digest = fixture.stage_payload(V1_1_0, "foo.txt", b"fresh bytes")?;
    fixture.write_script(&format!(
        "VERSION 1.1.0\n-\nC foo.txt foo.txt {digest}\nVERSION 1.0.0\n"
    ))?;

    let err = Engine::new(fixture.config())?.run().unwrap_err();
    assert!(matches!(
        err.operation_error(),
        Some(OperationError::AlreadyExists { .. })
    ));
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 1.0.0\n"));

    fs::remove_file(fixture.path("foo.txt"))?;
    let summary = Engine::new(fixture.config())?.run()?;
    assert_eq!(summary.repositories_applied, 1);
    assert_eq!(fixture.read_file("foo.txt")?, Some(b"fresh bytes".to_vec()));
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 1.1.0\n"));

    let again = Engine::new(fixture.config())?.plan()?;
    assert!(again.is_current());
    Ok(())
}

#[test]
fn undeclared_installed_version_aborts_without_mutation() -> Result<()> {
    let fixture = fixture_at(Version::from_parts(2, 0, 0))?;
    fixture.install_file("keep.txt", b"keep")?;
    fixture.write_script("VERSION 3.0.0\n-\nD keep.txt\nVERSION 2.5.0\n-\nD keep.txt\n")?;
    let before = fixture.snapshot()?;

    let err = Engine::new(fixture.config())?.run().unwrap_err();

    assert!(matches!(
        err,
        EngineError::Parse {
            source: CoreError::VersionNotFound { .. }
        }
    ));
    assert_eq!(fixture.snapshot()?, before);
    assert!(!fixture.staging_root().join("3_0_0").exists());
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 2.0.0\n"));
    Ok(())
}

#[test]
fn chain_applies_in_ascending_order_with_modify() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    let v1 = b"shared library, first build. ".repeat(12);
    let v2 = b"shared library, second build!".repeat(12);
    let create_digest = fixture.stage_payload(V1_1_0, "lib.so", &v1)?;
    let diff_digest = fixture.stage_payload(V1_2_0, "lib.so.diff", &make_bsdiff(&v1, &v2)?)?;
    fixture.install_file("app.cfg", b"settings")?;
    fixture.write_script(&format!(
        "VERSION 1.2.0\n-\nM lib/lib.so diffs/lib.so.diff {diff_digest}\nR app.cfg conf/app.cfg\n\
         VERSION 1.1.0\n-\nC lib/lib.so payloads/lib.so {create_digest}\n\
         VERSION 1.0.0\n"
    ))?;

    let summary = Engine::new(fixture.config())?.run()?;

    assert_eq!(summary.repositories_applied, 2);
    assert_eq!(
        summary
            .repositories
            .iter()
            .map(|report| report.version)
            .collect::<Vec<_>>(),
        vec![V1_1_0, V1_2_0]
    );
    assert_eq!(summary.entries_applied, 3);
    assert_eq!(fixture.read_file("lib/lib.so")?, Some(v2));
    assert!(!fixture.exists("app.cfg"));
    assert_eq!(fixture.read_file("conf/app.cfg")?, Some(b"settings".to_vec()));
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 1.2.0\n"));
    Ok(())
}

#[test]
fn commit_failure_keeps_marker_at_last_committed_repository() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    fixture.install_file("lib.so", b"original library bytes")?;
    let create_digest = fixture.stage_payload(V1_1_0, "readme.txt", b"read me")?;
    let bogus = b"this is not a bsdiff payload";
    let diff_digest = fixture.stage_payload(V1_2_0, "lib.so.diff", bogus)?;
    fixture.write_script(&format!(
        "VERSION 1.2.0\n-\nM lib.so lib.so.diff {diff_digest}\n\
         VERSION 1.1.0\n-\nC readme.txt readme.txt {create_digest}\n\
         VERSION 1.0.0\n"
    ))?;

    let err = Engine::new(fixture.config())?.run().unwrap_err();

    assert!(err.install_touched());
    assert_eq!(err.version(), Some(V1_2_0));
    assert!(matches!(err.operation_error(), Some(OperationError::Diff { .. })));
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 1.1.0\n"));
    assert_eq!(fixture.read_file("readme.txt")?, Some(b"read me".to_vec()));
    assert_eq!(fixture.read_file("lib.so")?, Some(b"original library bytes".to_vec()));
    Ok(())
}

#[test]
fn retrying_a_partially_committed_repository_skips_applied_creates() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    let old = b"engine core v1 ".repeat(10);
    let new = b"engine core v2 ".repeat(10);
    fixture.install_file("core.bin", &old)?;
    fixture.stage_payload(V1_1_0, "notes.txt", b"release notes")?;
    fixture.stage_payload(V1_1_0, "core.diff", b"truncated")?;
    fixture.write_script(
        "VERSION 1.1.0\n-\nC notes.txt notes.txt -\nM core.bin core.diff -\nVERSION 1.0.0\n",
    )?;
    let config = EngineConfig {
        verify_checksums: false,
        ..fixture.config()
    };

    let err = Engine::new(config.clone())?.run().unwrap_err();
    assert!(matches!(err, EngineError::Commit { .. }));
    assert!(fixture.exists("notes.txt"));
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 1.0.0\n"));

    fixture.stage_payload(V1_1_0, "core.diff", &make_bsdiff(&old, &new)?)?;
    let summary = Engine::new(config)?.run()?;
    assert_eq!(summary.entries_applied, 1);
    assert_eq!(summary.entries_skipped, 1);
    assert_eq!(fixture.read_file("core.bin")?, Some(new));
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 1.1.0\n"));
    Ok(())
}

#[test]
fn second_run_returns_stored_summary() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    let digest = fixture.stage_payload(V1_1_0, "foo.txt", b"bytes")?;
    fixture.write_script(&format!("VERSION 1.1.0\n-\nC foo.txt foo.txt {digest}\nVERSION 1.0.0\n"))?;

    let mut engine = Engine::new(fixture.config())?;
    let first = engine.run()?;
    fs::remove_file(fixture.path("foo.txt"))?;
    let second = engine.run()?;

    assert_eq!(first.run_id, second.run_id);
    assert!(!fixture.exists("foo.txt"));
    assert!(engine.completed().is_some());
    Ok(())
}

#[test]
fn plan_reports_chain_without_touching_install() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    fixture.install_file("old.txt", b"x")?;
    fixture.write_script("VERSION 1.1.0\n-\nD old.txt\nZ what\nVERSION 1.0.0\n")?;
    let before = fixture.snapshot()?;

    let plan = Engine::new(fixture.config())?.plan()?;

    assert_eq!(plan.installed, V1_0_0);
    assert_eq!(plan.target(), V1_1_0);
    assert_eq!(plan.chain.entry_count(), 1);
    assert_eq!(plan.chain.skipped.len(), 1);
    assert_eq!(fixture.snapshot()?, before);
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 1.0.0\n"));
    Ok(())
}

#[test]
fn current_installation_is_a_no_op() -> Result<()> {
    let fixture = fixture_at(V1_2_0)?;
    fixture.write_script("VERSION 1.2.0\n-\nD anything\nVERSION 1.1.0\n-\nD other\n")?;

    let summary = Engine::new(fixture.config())?.run()?;

    assert_eq!(summary.repositories_applied, 0);
    assert_eq!(summary.from, summary.to);
    assert!(!summary.advanced());
    Ok(())
}

#[test]
fn skipped_lines_are_reported_in_summary() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    fixture.install_file("old.txt", b"x")?;
    fixture.write_script("D orphan\nVERSION 1.1.0\n-\nD old.txt\nC short\nD ../escape\nVERSION 1.0.0\n")?;

    let summary = Engine::new(fixture.config())?.run()?;

    let reasons: Vec<_> = summary
        .skipped_lines
        .iter()
        .map(|skipped| (skipped.line, skipped.reason.clone()))
        .collect();
    assert_eq!(reasons.len(), 3);
    assert_eq!(reasons[0], (1, SkipReason::OrphanEntry));
    assert!(matches!(reasons[1].1, SkipReason::TooFewFields { .. }));
    assert!(matches!(reasons[2].1, SkipReason::UnsafePath { .. }));
    assert_eq!(summary.entries_applied, 1);
    Ok(())
}

#[test]
fn absent_marker_starts_from_baseline() -> Result<()> {
    let fixture = InstallFixture::new()?;
    let digest = fixture.stage_payload(Version::from_parts(0, 1, 0), "a.txt", b"a")?;
    fixture.write_script(&format!("VERSION 0.1.0\n-\nC a.txt a.txt {digest}\nVERSION 0.0.0\n"))?;

    let mut engine = Engine::new(fixture.config())?;
    assert_eq!(engine.installed(), Version::from_parts(0, 0, 0));
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 0.0.0\n"));

    engine.run()?;
    assert_eq!(fixture.read_marker()?.as_deref(), Some("VERSION 0.1.0\n"));
    Ok(())
}

#[test]
fn mirrored_layout_and_kept_staging() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    let digest = fixture.stage_payload(V1_1_0, "payloads/bin/tool", b"tool")?;
    fixture.write_script(&format!(
        "VERSION 1.1.0\n-\nC bin/tool payloads/bin/tool {digest}\nVERSION 1.0.0\n"
    ))?;
    let config = EngineConfig {
        layout: StagingLayout::Mirrored,
        keep_staging: true,
        ..fixture.config()
    };

    Engine::new(config)?.run()?;

    assert_eq!(fixture.read_file("bin/tool")?, Some(b"tool".to_vec()));
    assert!(fixture.staging_root().join("1_1_0/payloads/bin/tool").exists());
    Ok(())
}

#[test]
fn missing_script_is_reported() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    let err = Engine::new(fixture.config())?.run().unwrap_err();
    assert!(matches!(err, EngineError::ScriptRead { .. }));
    Ok(())
}

#[test]
fn summary_serialises_for_reporting() -> Result<()> {
    let fixture = fixture_at(V1_0_0)?;
    fixture.write_script("VERSION 1.0.0\n")?;
    let summary = Engine::new(fixture.config())?.run()?;

    let json = serde_json::to_value(&summary)?;
    assert_eq!(json["from"], "1.0.0");
    assert_eq!(json["repositories_applied"], 0);
    assert!(json["run_id"].is_string());
    Ok(())
}
