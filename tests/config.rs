mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

use support::Sandbox;

#[test]
fn first_run_logs_the_created_config() -> Result<(), Box<dyn std::error::Error>> {
    let sandbox = Sandbox::new()?;
    let config = sandbox.path().join("fresh").join("config.toml");
    let run = || -> Result<Command, Box<dyn std::error::Error>> {
        let mut cmd = Command::cargo_bin("organizer")?;
        cmd.current_dir(sandbox.path())
            .env("HOME", sandbox.path())
            .env("XDG_DATA_HOME", sandbox.path().join("data"))
            .env("XDG_CONFIG_HOME", sandbox.path().join("config"))
            .env("RUST_LOG", "info")
            .arg("--config")
            .arg(&config)
            .args(["settings", "show"]);
        Ok(cmd)
    };

    run()?
        .assert()
        .success()
        .stderr(contains("created default config"));
    assert!(config.exists());

    run()?
        .assert()
        .success()
        .stderr(contains("created default config").not());
    Ok(())
}
