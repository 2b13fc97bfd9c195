//! Unit tests for the install gateway.

use super::*;
use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output};
use rstest::rstest;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};

const SHARED: &str = "/k/4.9.6/all/common/linux-headers-4.9.6-040906_4.9.6-040906.1_all.deb";
const HEADERS: &str =
    "/k/4.9.6/amd64/generic/linux-headers-4.9.6-040906-generic_4.9.6-040906.1_amd64.deb";
const MODULES: &str =
    "/k/4.9.6/amd64/generic/linux-modules-4.9.6-040906-generic_4.9.6-040906.1_amd64.deb";
const IMAGE: &str =
    "/k/4.9.6/amd64/generic/linux-image-unsigned-4.9.6-040906-generic_4.9.6-040906.1_amd64.deb";

fn paths(raw: &[&str]) -> Vec<Utf8PathBuf> {
    raw.iter().map(|p| Utf8PathBuf::from(*p)).collect()
}

fn dpkg_call(path: &str, result: io::Result<std::process::Output>) -> ExpectedCall {
    ExpectedCall {
        cmd: "dpkg".to_owned(),
        args: vec!["-i".to_owned(), path.to_owned()],
        result,
    }
}

fn unlocked_gateway(executor: StubExecutor) -> DpkgGateway<StubExecutor> {
    DpkgGateway::with_lock_path(executor, Utf8PathBuf::from("/nonexistent/dpkg/lock"))
}

#[rstest]
#[case::reversed(&[IMAGE, MODULES, HEADERS, SHARED])]
#[case::interleaved(&[MODULES, SHARED, IMAGE, HEADERS])]
fn dependencies_install_first(#[case] input: &[&str]) {
    let packages = paths(input);
    let ordered: Vec<&str> = install_order(&packages)
        .into_iter()
        .map(Utf8Path::as_str)
        .collect();
    assert_eq!(ordered, vec![SHARED, HEADERS, MODULES, IMAGE]);
}

#[test]
fn unrecognised_files_install_last() {
    let packages = paths(&["/k/extra.deb", IMAGE]);
    let ordered: Vec<&str> = install_order(&packages)
        .into_iter()
        .map(Utf8Path::as_str)
        .collect();
    assert_eq!(ordered, vec![IMAGE, "/k/extra.deb"]);
}

#[test]
fn installs_each_package_in_order() {
    let executor = StubExecutor::new(vec![
        dpkg_call(HEADERS, Ok(success_output())),
        dpkg_call(IMAGE, Ok(success_output())),
    ]);
    let gateway = unlocked_gateway(executor);

    gateway
        .install(&paths(&[IMAGE, HEADERS]))
        .expect("install succeeds");
    gateway.executor.assert_finished();
}

#[test]
fn failures_are_collected_and_installation_continues() {
    let executor = StubExecutor::new(vec![
        dpkg_call(HEADERS, Ok(failure_output("dependency problems"))),
        dpkg_call(IMAGE, Ok(success_output())),
    ]);
    let gateway = unlocked_gateway(executor);

    let err = gateway
        .install(&paths(&[HEADERS, IMAGE]))
        .expect_err("one package failed");
    match err {
        InstallError::PackagesFailed {
            failed,
            last_detail,
        } => {
            assert_eq!(failed.len(), 1);
            assert!(failed[0].starts_with("linux-headers"));
            assert_eq!(last_detail, "dependency problems");
        }
        other => panic!("expected PackagesFailed, got {other:?}"),
    }
    gateway.executor.assert_finished();
}

/// Holds a POSIX record lock from another process, the way dpkg does.
struct ForeignLockHolder {
    child: Child,
}

impl ForeignLockHolder {
    fn lock(path: &Utf8Path) -> Self {
        let mut child = Command::new("python3")
            .args([
                "-c",
                "import fcntl, sys, time\n\
                 f = open(sys.argv[1], 'r+')\n\
                 fcntl.lockf(f, fcntl.LOCK_EX)\n\
                 print('locked', flush=True)\n\
                 time.sleep(60)",
                path.as_str(),
            ])
            .stdout(Stdio::piped())
            .spawn()
            .expect("spawn python3 lock holder");
        let stdout = child.stdout.take().expect("piped stdout");
        let mut line = String::new();
        BufReader::new(stdout)
            .read_line(&mut line)
            .expect("lock holder reports");
        assert_eq!(line.trim(), "locked");
        Self { child }
    }
}

impl Drop for ForeignLockHolder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn lock_file(dir: &tempfile::TempDir) -> Utf8PathBuf {
    let lock_path =
        Utf8PathBuf::from_path_buf(dir.path().join("lock")).expect("UTF-8 temp path");
    std::fs::File::create(&lock_path).expect("create lock file");
    lock_path
}

#[test]
fn record_lock_held_by_another_process_refuses_to_start() {
    let dir = tempfile::tempdir().expect("temp dir");
    let lock_path = lock_file(&dir);
    let _holder = ForeignLockHolder::lock(&lock_path);

    let gateway = DpkgGateway::with_lock_path(StubExecutor::new(Vec::new()), lock_path);
    let err = gateway
        .install(&paths(&[IMAGE]))
        .expect_err("lock is held");
    assert!(matches!(err, InstallError::Locked { .. }), "got {err:?}");
    gateway.executor.assert_finished();
}

#[test]
fn released_record_lock_allows_installation() {
    let dir = tempfile::tempdir().expect("temp dir");
    let lock_path = lock_file(&dir);
    drop(ForeignLockHolder::lock(&lock_path));

    let gateway = DpkgGateway::with_lock_path(
        StubExecutor::new(vec![dpkg_call(IMAGE, Ok(success_output()))]),
        lock_path,
    );
    gateway
        .install(&paths(&[IMAGE]))
        .expect("install succeeds");
    gateway.executor.assert_finished();
}

#[test]
fn free_lock_allows_installation() {
    let dir = tempfile::tempdir().expect("temp dir");
    let lock_path = lock_file(&dir);

    let gateway = DpkgGateway::with_lock_path(
        StubExecutor::new(vec![dpkg_call(IMAGE, Ok(success_output()))]),
        lock_path,
    );
    gateway
        .install(&paths(&[IMAGE]))
        .expect("install succeeds");
    gateway.executor.assert_finished();
}

#[test]
fn nothing_to_install_runs_nothing() {
    let gateway = unlocked_gateway(StubExecutor::new(Vec::new()));
    gateway.install(&[]).expect("no-op install");
}
