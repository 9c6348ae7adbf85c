//! Integration tests for the bundle optimizer

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn optimizer(config: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("bundle-optimizer");
        cmd.arg("--no-local").arg("--config").arg(config);
        cmd.env_remove("BUNDLE_OPTIMIZER_CACHE_KEY");
        cmd
    }

    /// Temp workspace with one plugin bundle and its source file
    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let public = dir.path().join("plugins").join("foo").join("public");
            std::fs::create_dir_all(&public).unwrap();
            std::fs::write(public.join("index.ts"), "export const foo = 1;").unwrap();

            let bundles = serde_json::json!([{
                "type": "plugin",
                "id": "foo",
                "publicDirNames": ["public"],
                "contextDir": dir.path().join("plugins").join("foo"),
                "sourceRoot": dir.path(),
                "outputDir": dir.path().join("plugins").join("foo").join("target"),
            }]);
            std::fs::write(dir.path().join("bundles.json"), bundles.to_string()).unwrap();

            Self { dir }
        }

        fn bundles(&self) -> PathBuf {
            self.dir.path().join("bundles.json")
        }

        fn config(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn source(&self) -> PathBuf {
            self.dir
                .path()
                .join("plugins")
                .join("foo")
                .join("public")
                .join("index.ts")
        }

        fn cache_file(&self) -> PathBuf {
            self.dir
                .path()
                .join("plugins")
                .join("foo")
                .join("target")
                .join(".optimizer-cache")
        }

        /// Configure a shell script standing in for the bundler
        fn use_shell_compiler(&self, script: &str) {
            let config = format!(
                "[worker]\noptimizer_cache_key = \"v1\"\n\n[compiler]\ncommand = \"sh\"\nargs = [\"-c\", '''{}\n''']\n",
                script
            );
            std::fs::write(self.config(), config).unwrap();
        }

        fn succeeding_compiler(&self) {
            let source = self.source().display().to_string();
            self.use_shell_compiler(&format!(
                r#"cat > /dev/null
echo 'bundler starting'
echo '{{"hook":"run","bundleId":"foo"}}'
echo '{{"hook":"done","bundleId":"foo","stats":{{"modules":[{{"kind":"normal","resource":"{0}"}}],"fileDependencies":["{0}"]}}}}'"#,
                source
            ));
        }
    }

    #[test]
    fn help_displays() {
        let ws = Workspace::new();
        optimizer(&ws.config())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("incremental multi-bundle builds"));
    }

    #[test]
    fn version_displays() {
        let ws = Workspace::new();
        optimizer(&ws.config())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("bundle-optimizer"));
    }

    #[test]
    fn config_path() {
        let ws = Workspace::new();
        optimizer(&ws.config())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let ws = Workspace::new();
        optimizer(&ws.config())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[worker]"))
            .stdout(predicate::str::contains("[compiler]"));
    }

    #[test]
    fn config_init_creates_file() {
        let ws = Workspace::new();
        optimizer(&ws.config())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(ws.config().exists());
    }

    #[test]
    fn invalid_config_fails() {
        let ws = Workspace::new();
        std::fs::write(ws.config(), "[worker\n").unwrap();
        optimizer(&ws.config())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn invalid_bundles_file_fails() {
        let ws = Workspace::new();
        std::fs::write(ws.bundles(), r#"[{"type": "theme"}]"#).unwrap();
        optimizer(&ws.config())
            .args(["cache", "status", "--bundles"])
            .arg(ws.bundles())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid bundle specs"));
    }

    #[test]
    fn missing_bundles_file_fails() {
        let ws = Workspace::new();
        optimizer(&ws.config())
            .args(["build", "--bundles"])
            .arg(ws.dir.path().join("missing.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn fresh_bundle_is_not_cached() {
        let ws = Workspace::new();
        optimizer(&ws.config())
            .args(["cache", "status", "--optimizer-cache-key", "v1", "--bundles"])
            .arg(ws.bundles())
            .assert()
            .success()
            .stdout(predicate::str::contains("plugin/foo"))
            .stdout(predicate::str::contains("optimizer cache key mismatch"));
    }

    #[test]
    fn status_without_key_reports_missing_key() {
        let ws = Workspace::new();
        optimizer(&ws.config())
            .args(["cache", "status", "--format", "json", "--bundles"])
            .arg(ws.bundles())
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "\"reason\": \"optimizer cache key is missing\"",
            ));
    }

    #[cfg(unix)]
    #[test]
    fn build_then_rebuild_is_cached() {
        let ws = Workspace::new();
        ws.succeeding_compiler();

        optimizer(&ws.config())
            .args(["build", "--bundles"])
            .arg(ws.bundles())
            .assert()
            .success()
            .stdout(predicate::str::contains("foo built (1 modules)"));
        assert!(ws.cache_file().exists());

        optimizer(&ws.config())
            .args(["build", "--bundles"])
            .arg(ws.bundles())
            .assert()
            .success()
            .stdout(predicate::str::contains("All 1 bundles are cached"));

        std::fs::write(ws.source(), "export const foo = 2;").unwrap();
        optimizer(&ws.config())
            .args(["cache", "status", "--bundles"])
            .arg(ws.bundles())
            .assert()
            .success()
            .stdout(predicate::str::contains("cache key mismatch"));
    }

    #[cfg(unix)]
    #[test]
    fn build_json_emits_events() {
        let ws = Workspace::new();
        ws.succeeding_compiler();

        optimizer(&ws.config())
            .args(["build", "--format", "json", "--bundles"])
            .arg(ws.bundles())
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"{"bundleId":"foo","state":{"type":"running"}}"#,
            ))
            .stdout(predicate::str::contains(
                r#"{"bundleId":"foo","state":{"type":"success","moduleCount":1}}"#,
            ));
    }

    #[cfg(unix)]
    #[test]
    fn compile_errors_fail_the_build() {
        let ws = Workspace::new();
        ws.use_shell_compiler(
            r#"cat > /dev/null
echo '{"hook":"run","bundleId":"foo"}'
echo '{"hook":"done","bundleId":"foo","stats":{"errors":["Module not found"]}}'"#,
        );

        optimizer(&ws.config())
            .args(["build", "--bundles"])
            .arg(ws.bundles())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Module not found"))
            .stderr(predicate::str::contains("1 bundle(s) failed to build: foo"));
        assert!(!ws.cache_file().exists());
    }

    #[cfg(unix)]
    #[test]
    fn crashing_compiler_fails_the_build() {
        let ws = Workspace::new();
        ws.use_shell_compiler("cat > /dev/null; echo 'cannot load bundler' >&2; exit 2");

        optimizer(&ws.config())
            .args(["build", "--bundles"])
            .arg(ws.bundles())
            .assert()
            .failure()
            .stdout(predicate::str::contains("cannot load bundler"));
    }

    #[cfg(unix)]
    #[test]
    fn cache_clear_removes_record() {
        let ws = Workspace::new();
        ws.succeeding_compiler();

        optimizer(&ws.config())
            .args(["build", "--bundles"])
            .arg(ws.bundles())
            .assert()
            .success();
        assert!(ws.cache_file().exists());

        optimizer(&ws.config())
            .args(["cache", "clear", "--bundles"])
            .arg(ws.bundles())
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleared 1 bundle cache(s)"));
        assert!(!ws.cache_file().exists());
    }
}
