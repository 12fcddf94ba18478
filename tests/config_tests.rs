//! Config loading, supervisor settings and the instance lock

mod common;

use common::FakeEnvironment;
use std::fs;
use tempfile::TempDir;
use worldrec_watch::config::{SupervisorConfig, WatchConfig, DEFAULT_POLL_SECONDS, DEFAULT_TASK_NAME};
use worldrec_watch::process::{InstanceLock, ProcessEntry, ProcessProbe, RuntimeTier};
use worldrec_watch::WatchError;

#[cfg(test)]
mod watch_config_tests {
    use super::*;

    #[test]
    fn test_defaults_match_worldrec() {
        let config = WatchConfig::default();
        assert_eq!(config.target.process_name, "VRChat.exe");
        assert_eq!(config.companion.executable, "WorldRec.exe");
        assert_eq!(config.companion.module_marker, "app.main");
        assert_eq!(config.companion.start_flag, "--start-minimized");
        assert!(config
            .companion
            .interpreters
            .iter()
            .any(|i| i == "pythonw.exe"));
        assert!(config.install_dir.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let toml = r#"
            install_dir = "D:/Tools/WorldRec"

            [target]
            process_name = "VRChat-Beta.exe"
        "#;

        let config: WatchConfig = toml::from_str(toml).expect("Failed to parse");
        assert_eq!(config.target.process_name, "VRChat-Beta.exe");
        assert_eq!(config.companion.executable, "WorldRec.exe");
        assert_eq!(
            config.resolve_install_dir().unwrap(),
            std::path::PathBuf::from("D:/Tools/WorldRec")
        );
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("watch.toml");
        fs::write(
            &path,
            r#"
            [companion]
            executable = "Helper.exe"
            interpreters = ["python3"]
            "#,
        )
        .unwrap();

        let config = WatchConfig::load(Some(&path)).unwrap();
        assert_eq!(config.companion.executable, "Helper.exe");
        assert_eq!(config.companion.interpreters, vec!["python3"]);
        assert_eq!(config.companion.module_marker, "app.main");
    }

    #[test]
    fn test_load_explicit_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = WatchConfig::load(Some(&temp_dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, WatchError::Config(_)));
    }

    #[test]
    fn test_load_explicit_invalid_toml_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("watch.toml");
        fs::write(&path, "[target\nprocess_name = 1").unwrap();

        assert!(matches!(
            WatchConfig::load(Some(&path)),
            Err(WatchError::Toml(_))
        ));
    }

    #[test]
    fn test_process_view_and_resolver_follow_config() {
        let config: WatchConfig = toml::from_str(
            r#"
            install_dir = "D:/Tools/Helper"

            [target]
            process_name = "Game.exe"

            [companion]
            executable = "Helper.exe"
            "#,
        )
        .unwrap();

        let probe = config.process_view(vec![
            ProcessEntry::new(1, "Game.exe", "Game.exe"),
            ProcessEntry::new(2, "Helper.exe", "Helper.exe"),
        ]);
        assert!(probe.is_target_running().unwrap());
        assert!(probe.is_companion_running().unwrap());

        let env = FakeEnvironment::new()
            .with_file(std::path::PathBuf::from("D:/Tools/Helper").join("Helper.exe"));
        let resolver = config.resolver(Box::new(env)).unwrap();
        assert_eq!(resolver.install_dir(), std::path::Path::new("D:/Tools/Helper"));
        let candidate = resolver.resolve().unwrap();
        assert_eq!(candidate.tier, RuntimeTier::PackagedExecutable);
        assert_eq!(
            candidate.program,
            std::path::PathBuf::from("D:/Tools/Helper").join("Helper.exe")
        );
    }

    #[test]
    fn test_install_dir_defaults_to_exe_dir() {
        let dir = WatchConfig::default().resolve_install_dir().unwrap();
        let exe = std::env::current_exe().unwrap();
        assert_eq!(Some(dir.as_path()), exe.parent());
    }
}

#[cfg(test)]
mod supervisor_config_tests {
    use super::*;

    #[test]
    fn test_default_supervisor_config() {
        let config = SupervisorConfig::default();
        assert_eq!(config.poll_interval_seconds(), DEFAULT_POLL_SECONDS);
        assert_eq!(config.poll_interval_seconds(), 60);
        assert_eq!(config.task_name(), DEFAULT_TASK_NAME);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(matches!(
            SupervisorConfig::new(0, "task"),
            Err(WatchError::Config(_))
        ));
    }

    #[test]
    fn test_blank_task_name_rejected() {
        assert!(SupervisorConfig::new(10, "  ").is_err());
    }

    #[test]
    fn test_poll_interval_duration() {
        let config = SupervisorConfig::new(15, "task").unwrap();
        assert_eq!(config.poll_interval(), std::time::Duration::from_secs(15));
    }
}

#[cfg(test)]
mod instance_lock_tests {
    use super::*;

    #[test]
    fn test_acquire_writes_own_pid_and_releases_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("watch.lock");

        let lock = InstanceLock::acquire(&path).unwrap().expect("lock should be free");
        assert_eq!(InstanceLock::holder(&path), Some(std::process::id()));
        assert_eq!(lock.path(), path.as_path());

        drop(lock);
        assert!(!path.exists(), "lock file removed on drop");
    }

    #[cfg(unix)]
    #[test]
    fn test_live_holder_blocks_second_acquire() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("watch.lock");

        // A real process whose PID stays alive while we try the lock.
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        fs::write(&path, child.id().to_string()).unwrap();

        let second = InstanceLock::acquire(&path).unwrap();
        let _ = child.kill();
        let _ = child.wait();

        assert!(second.is_none(), "a live holder keeps the lock");
        assert!(path.exists());
    }

    #[test]
    fn test_stale_lock_is_taken_over() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("watch.lock");
        // PIDs this large are never handed out.
        fs::write(&path, "4294967").unwrap();

        let lock = InstanceLock::acquire(&path).unwrap();
        assert!(lock.is_some());
        assert_eq!(InstanceLock::holder(&path), Some(std::process::id()));
    }

    fn backdate(path: &std::path::Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(std::time::SystemTime::now() - std::time::Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_fresh_empty_lock_counts_as_held() {
        // Another instance may have just created it; it must not be stolen.
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("watch.lock");
        fs::write(&path, "").unwrap();

        assert!(InstanceLock::acquire(&path).unwrap().is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_old_empty_lock_is_taken_over() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("watch.lock");
        fs::write(&path, "").unwrap();
        backdate(&path, 3600);

        let lock = InstanceLock::acquire(&path).unwrap();
        assert!(lock.is_some());
        assert_eq!(InstanceLock::holder(&path), Some(std::process::id()));
    }

    #[test]
    fn test_old_garbage_lock_is_taken_over() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("watch.lock");
        fs::write(&path, "not a pid").unwrap();
        backdate(&path, 3600);

        assert!(InstanceLock::acquire(&path).unwrap().is_some());
    }

    #[test]
    fn test_acquire_leaves_no_staging_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("watch.lock");

        let first = InstanceLock::acquire(&path).unwrap();
        assert!(first.is_some());
        // Our own PID in the lock is treated as stale and replaced.
        let second = InstanceLock::acquire(&path).unwrap();
        assert!(second.is_some());

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["watch.lock"]);
    }
}
