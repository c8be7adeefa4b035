//! End-to-end runs of the `finch` binary

use std::process::Command;

fn finch() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_finch"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_eval_prints() {
    let output = finch()
        .args(["eval", "IO.print(\"hello \" + (6 * 7).toString)"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello 42\n");
}

#[test]
fn test_eval_runtime_error_fails() {
    let output = finch()
        .args(["eval", "IO.print(1)\nFiber.abort(\"nope\")"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "1\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nope"), "stderr was {stderr}");
    assert!(stderr.contains("[line 2] in eval"), "stderr was {stderr}");
}

#[test]
fn test_run_script_with_config() {
    let dir = std::env::temp_dir().join(format!("finch-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let script = dir.join("count.fn");
    std::fs::write(
        &script,
        "var gen = new Fiber {\n  for (i in 1..3) Fiber.yield(i)\n}\nwhile (!gen.isDone) IO.write(gen.call)\n",
    )
    .unwrap();
    let config = dir.join("finch.toml");
    std::fs::write(&config, "[vm]\nmax_call_depth = 64\n").unwrap();

    let output = finch()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&script)
        .output()
        .unwrap();
    std::fs::remove_dir_all(&dir).unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "123null");
}

#[test]
fn test_dump_bytecode() {
    let dir = std::env::temp_dir().join(format!("finch-dump-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let script = dir.join("tiny.fn");
    std::fs::write(&script, "IO.print(1)\n").unwrap();

    let output = finch()
        .args(["run", "--dump-bytecode"])
        .arg(&script)
        .output()
        .unwrap();
    std::fs::remove_dir_all(&dir).unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"name\": \"tiny\""), "stdout was {stdout}");
}
