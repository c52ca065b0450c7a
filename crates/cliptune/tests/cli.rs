//! The cliptune binary on files in a scratch directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use timeline::{reconstruct, signals_from_smf, timeline_to_smf, NoteEvent, SmfOptions, TimeUnit, Timeline};

/// A command running inside `dir` with an empty config file, so no local
/// `cliptune.toml` leaks in.
fn cliptune(dir: &TempDir) -> Command {
    let config = dir.path().join("empty.toml");
    if !config.exists() {
        fs::write(&config, "").unwrap();
    }
    let mut cmd = Command::cargo_bin("cliptune").unwrap();
    cmd.current_dir(dir.path()).arg("--config").arg(config).env_remove("RUST_LOG");
    cmd
}

fn write(dir: &TempDir, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn two_notes() -> Timeline {
    Timeline {
        events: vec![NoteEvent::new(60, 100, 0.0, 1.0), NoteEvent::new(64, 100, 1.0, 0.5)],
        total_length: 2,
        instrument_program: None,
    }
}

fn midi_file(dir: &TempDir) -> PathBuf {
    let bytes = timeline_to_smf(&two_notes(), &SmfOptions::default()).unwrap();
    write(dir, "clip.mid", bytes)
}

fn read_midi(path: &Path) -> Timeline {
    let bytes = fs::read(path).unwrap();
    reconstruct(signals_from_smf(&bytes, TimeUnit::Beats).unwrap()).unwrap()
}

const SCALE: &str = "X:1\nT:Scale\nL:1/4\nQ:1/4=100\nK:C\nC D E2|\n";

#[test]
fn encode_prints_prompt_document() {
    let dir = TempDir::new().unwrap();
    let midi = midi_file(&dir);

    cliptune(&dir)
        .arg("encode")
        .arg(&midi)
        .assert()
        .success()
        .stdout("X:1\nT:MelodyExample\nM:4/4\nL:1/8\nK:Emin\n|:C8E2:|\n");
}

#[test]
fn encode_body_only_and_overrides() {
    let dir = TempDir::new().unwrap();
    let midi = midi_file(&dir);

    cliptune(&dir)
        .args(["encode", "--body-only"])
        .arg(&midi)
        .assert()
        .success()
        .stdout("C1 E/2\n");

    cliptune(&dir)
        .args(["encode", "--body-only", "--legacy-octaves"])
        .arg(&midi)
        .assert()
        .success()
        .stdout("c1 e/2\n");

    cliptune(&dir)
        .args(["encode", "--title", "Bass Line", "--key", "G"])
        .arg(&midi)
        .assert()
        .success()
        .stdout(predicate::str::contains("T:BassLine\n").and(predicate::str::contains("K:G\n")));
}

#[test]
fn encode_exact_decodes_back() {
    let dir = TempDir::new().unwrap();
    let midi = midi_file(&dir);

    let output = cliptune(&dir).args(["encode", "--exact"]).arg(&midi).output().unwrap();
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("L:1/4\n"));
    assert!(text.contains("C E/2 |]"));

    let decoded = abc::decode(&text, &abc::DecodeOptions { velocity: 100, ..Default::default() }).unwrap();
    assert_eq!(decoded.timeline.events, two_notes().events);
}

#[test]
fn encode_rejects_non_midi() {
    let dir = TempDir::new().unwrap();
    let bogus = write(&dir, "bogus.mid", "not midi at all");

    cliptune(&dir)
        .arg("encode")
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}

#[test]
fn decode_prints_timeline_json() {
    let dir = TempDir::new().unwrap();
    let abc = write(&dir, "scale.abc", SCALE);

    cliptune(&dir)
        .args(["decode", "--velocity", "100"])
        .arg(&abc)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"pitch\": 62")
                .and(predicate::str::contains("\"velocity\": 100"))
                .and(predicate::str::contains("\"total_length\": 4")),
        );
}

#[test]
fn decode_writes_midi() {
    let dir = TempDir::new().unwrap();
    let abc = write(&dir, "scale.abc", SCALE);
    let out = dir.path().join("scale.mid");

    cliptune(&dir).arg("decode").arg(&abc).arg("--midi").arg(&out).assert().success();

    let timeline = read_midi(&out);
    let pitches: Vec<u8> = timeline.events.iter().map(|e| e.pitch).collect();
    assert_eq!(pitches, vec![60, 62, 64]);
    assert_eq!(timeline.events[2].duration, 2.0);
    assert_eq!(timeline.total_length, 4);
}

#[test]
fn decode_rejects_velocity_above_127() {
    let dir = TempDir::new().unwrap();
    let abc = write(&dir, "scale.abc", SCALE);

    cliptune(&dir)
        .args(["decode", "--velocity", "200"])
        .arg(&abc)
        .assert()
        .failure()
        .stderr(predicate::str::contains("200"));

    cliptune(&dir)
        .env("CLIPTUNE_VELOCITY", "200")
        .arg("decode")
        .arg(&abc)
        .assert()
        .failure()
        .stderr(predicate::str::contains("velocity 200 is outside 0-127"));
}

#[test]
fn decode_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    cliptune(&dir)
        .args(["decode", "nope.abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn plan_from_notation_and_midi() {
    let dir = TempDir::new().unwrap();
    let abc = write(&dir, "scale.abc", SCALE);
    let midi = midi_file(&dir);

    cliptune(&dir)
        .arg("plan")
        .arg(&abc)
        .args(["--track", "2", "--slot", "1"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"notes\": 3")
                .and(predicate::str::contains("/live/clip/remove/notes"))
                .and(predicate::str::contains("/live/clip/set/loop_end")),
        );

    cliptune(&dir)
        .arg("plan")
        .arg(&midi)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"notes\": 2").and(predicate::str::contains("/live/clip/add/notes")));
}

#[test]
fn extract_reads_fenced_block() {
    let dir = TempDir::new().unwrap();
    let reply = write(
        &dir,
        "reply.txt",
        "Here you go:\n```abc\nX:1\nK:C\n\n\"C,maj7\"C D|\n```\nEnjoy.\n",
    );

    cliptune(&dir)
        .arg("extract")
        .arg(&reply)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Cmaj7\"C D|").and(predicate::str::contains("Enjoy").not()));
}

const SESSION: &str = r#"{
  "bpm": 110,
  "tracks": [
    {"name": "Bass", "clips": [
      {"name": "Verse", "index": 0, "notes": [48, 0, 1, 100, 0]}
    ]},
    {"name": "Lead", "clips": [
      {"name": "Hook", "index": 1}
    ]}
  ]
}"#;

#[test]
fn prompt_builds_request() {
    let dir = TempDir::new().unwrap();
    let session = write(&dir, "session.json", SESSION);

    cliptune(&dir)
        .arg("prompt")
        .arg(&session)
        .args(["--track", "1", "--clip", "0", "--prompt", "a soaring lead"])
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with(
                "Write ABC notation for track \"Lead\" and clip \"Hook\" and this prompt:\"a soaring lead\"",
            )
            .and(predicate::str::contains("BPM: 110.0\n"))
            .and(predicate::str::contains("T:Bass\nM:4/4\nL:1/8\nK:Emin\n|:C,8:|"))
            .and(predicate::str::contains("Clip Name: Hook, Index: 1, Notes: [No notes given yet]")),
        );
}

#[test]
fn prompt_with_system_and_bad_position() {
    let dir = TempDir::new().unwrap();
    let session = write(&dir, "session.json", SESSION);

    cliptune(&dir)
        .arg("prompt")
        .arg(&session)
        .args(["-t", "0", "-c", "0", "-p", "walking bass", "--system"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("System: You generate music in ABC notation"));

    cliptune(&dir)
        .arg("prompt")
        .arg(&session)
        .args(["-t", "0", "-c", "5", "-p", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn config_shows_file_values() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "custom.toml", "[notation]\nkey = \"G\"\n");

    Command::cargo_bin("cliptune")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("CLIPTUNE_KEY")
        .arg("config")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("key = \"G\"")
                .and(predicate::str::contains("# file:"))
                .and(predicate::str::contains("[telemetry]")),
        );
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("cliptune")
        .unwrap()
        .current_dir(dir.path())
        .args(["--config", "absent.toml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}
