use assert_cmd::Command;
use indoc::indoc;
use std::fs;
use tempfile::TempDir;

const MACHINE: &str = indoc! {r#"
    package sm

    import "github.com/insolar/assured-ledger/ledger-core/conveyor/smachine"

    func (s *SM) Init(ctx smachine.InitializationContext) smachine.StateUpdate {
        return ctx.Jump(s.stepRun)
    }

    func (s *SM) stepRun(ctx smachine.ExecutionContext) smachine.StateUpdate {
        return ctx.Stop()
    }
"#};

#[allow(deprecated)]
fn stepmap(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stepmap").unwrap();
    cmd.current_dir(dir.path()).env_remove("STEPMAP_CONFIG");
    cmd
}

#[test]
fn console_mode_prints_one_document() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sm.go"), MACHINE).unwrap();

    let assert = stepmap(&dir).args(["-c", "sm.go"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();

    assert!(stdout.starts_with("@startuml\n"));
    assert!(stdout.contains("[*] --> T00_S001"));
    assert!(stdout.contains("T00_S002 -->[*]"));

    assert!(!dir.path().join("sm.plantuml").exists());
}

#[test]
fn file_mode_writes_diagram_next_to_source() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sm.go"), MACHINE).unwrap();

    stepmap(&dir).arg("sm.go").assert().success().stdout("");

    let diagram = fs::read_to_string(dir.path().join("sm.plantuml")).unwrap();
    assert!(diagram.starts_with("@startuml\n"));
    assert!(diagram.ends_with("@enduml\n"));
}

#[test]
fn extension_comes_from_config_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sm.go"), MACHINE).unwrap();
    fs::write(dir.path().join(".stepmap.toml"), "diagram_extension = \".puml\"\n").unwrap();

    stepmap(&dir).arg("sm.go").assert().success();

    assert!(dir.path().join("sm.puml").exists());
}

#[test]
fn no_steps_means_no_output() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("plain.go"), "package plain\n\nfunc f() int { return 1 }\n").unwrap();

    stepmap(&dir).arg("plain.go").assert().success().stdout("");

    assert!(!dir.path().join("plain.plantuml").exists());
}

#[test]
fn missing_file_fails() {
    let dir = TempDir::new().unwrap();

    let assert = stepmap(&dir).arg("absent.go").assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("absent.go"));
}

#[test]
fn files_are_required() {
    let dir = TempDir::new().unwrap();
    stepmap(&dir).assert().failure();
}
