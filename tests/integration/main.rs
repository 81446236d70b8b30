//! Integration tests for tierbox

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn tierbox() -> Command {
        cargo_bin_cmd!("tierbox")
    }

    /// Command with all XDG locations inside `home`
    fn isolated(home: &TempDir) -> Command {
        let mut cmd = tierbox();
        cmd.env("HOME", home.path())
            .env("XDG_CONFIG_HOME", home.path().join("config"))
            .env("XDG_CACHE_HOME", home.path().join("cache"))
            .env("XDG_STATE_HOME", home.path().join("state"))
            .env("TIERBOX_PLAIN", "1")
            .env_remove("TIERBOX_CONFIG");
        cmd
    }

    #[test]
    fn help_displays() {
        tierbox()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cached development containers"))
            .stdout(predicate::str::contains("init"))
            .stdout(predicate::str::contains("shell"))
            .stdout(predicate::str::contains("clean"));
    }

    #[test]
    fn version_displays() {
        tierbox()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("tierbox"));
    }

    #[test]
    fn init_creates_project_config() {
        let home = TempDir::new().unwrap();
        let project = home.path().join("demo");

        isolated(&home)
            .args(["init", "--path"])
            .arg(&project)
            .assert()
            .success();

        let content = std::fs::read_to_string(project.join("tierbox.toml")).unwrap();
        assert!(content.contains("name = \"demo\""));
        assert!(home.path().join("config/tierbox/config.toml").exists());
    }

    #[test]
    fn init_twice_requires_force() {
        let home = TempDir::new().unwrap();
        let project = home.path().join("demo");

        isolated(&home)
            .args(["init", "--path"])
            .arg(&project)
            .assert()
            .success();

        isolated(&home)
            .args(["init", "--path"])
            .arg(&project)
            .assert()
            .failure()
            .stderr(predicate::str::contains("--force"));

        isolated(&home)
            .args(["init", "--force", "--path"])
            .arg(&project)
            .assert()
            .success();
    }

    #[test]
    fn run_without_config_points_to_init() {
        let home = TempDir::new().unwrap();
        let project = home.path().join("empty");
        std::fs::create_dir_all(&project).unwrap();

        isolated(&home)
            .current_dir(&project)
            .assert()
            .failure()
            .stderr(predicate::str::contains("No project configuration"))
            .stderr(predicate::str::contains("tierbox init"));
    }

    #[test]
    fn shell_without_config_fails() {
        let home = TempDir::new().unwrap();

        isolated(&home)
            .current_dir(home.path())
            .arg("shell")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No project configuration"));
    }

    #[test]
    fn clean_help() {
        tierbox()
            .args(["clean", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--base"));
    }
}
