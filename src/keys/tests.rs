//! Unit tests for key material provisioning.

use super::*;
use crate::test_support::{CommandInvocation, FakeKeygen, ScriptedRunner};
use cap_std::{ambient_authority, fs_utf8::Dir};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Workspace {
    _tmp: TempDir,
    root: Utf8PathBuf,
    store: MachineStore,
}

#[fixture]
fn workspace() -> Workspace {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()));
    let store = MachineStore::new(&root.join("store"), "dev");
    Workspace {
        _tmp: tmp,
        root,
        store,
    }
}

fn write_user_key(root: &Utf8Path) -> Utf8PathBuf {
    let dir = Dir::open_ambient_dir(root, ambient_authority())
        .unwrap_or_else(|err| panic!("open root: {err}"));
    dir.write("user_key", "PRIVATE")
        .unwrap_or_else(|err| panic!("write private: {err}"));
    dir.write("user_key.pub", "ssh-rsa USERKEY me@host")
        .unwrap_or_else(|err| panic!("write public: {err}"));
    root.join("user_key")
}

#[cfg(unix)]
fn private_mode(store: &MachineStore) -> u32 {
    use cap_std::fs_utf8::PermissionsExt;

    let dir = Dir::open_ambient_dir(store.machine_dir(), ambient_authority())
        .unwrap_or_else(|err| panic!("open machine dir: {err}"));
    dir.metadata(PRIVATE_KEY_FILE)
        .unwrap_or_else(|err| panic!("stat private key: {err}"))
        .permissions()
        .mode()
        & 0o777
}

#[rstest]
fn generates_fresh_keys_with_ssh_keygen(workspace: Workspace) {
    let keygen = FakeKeygen::new();
    let files = KeyProvisioner::new(&keygen, &workspace.store, "dev")
        .provision(None, KeyReuse::Fresh)
        .unwrap_or_else(|err| panic!("provision: {err}"));

    assert_eq!(files.private_key, workspace.store.private_key_path());
    let invocations = keygen.invocations();
    assert_eq!(invocations.len(), 1);
    let command = invocations
        .first()
        .map(CommandInvocation::command_string)
        .unwrap_or_default();
    assert!(command.starts_with("ssh-keygen -t rsa -b 2048 -f "), "{command}");
    assert!(command.ends_with("-q -C dev"), "{command}");

    let public = workspace
        .store
        .read_public_key()
        .unwrap_or_else(|err| panic!("read public key: {err}"));
    assert!(public.starts_with("ssh-rsa "));
    #[cfg(unix)]
    assert_eq!(private_mode(&workspace.store), 0o600);
}

#[rstest]
fn copies_user_key_and_restricts_mode(workspace: Workspace) {
    let user_key = write_user_key(&workspace.root);
    let keygen = FakeKeygen::new();
    KeyProvisioner::new(&keygen, &workspace.store, "dev")
        .provision(Some(&user_key), KeyReuse::Fresh)
        .unwrap_or_else(|err| panic!("provision: {err}"));

    assert!(keygen.invocations().is_empty());
    let public = workspace
        .store
        .read_public_key()
        .unwrap_or_else(|err| panic!("read public key: {err}"));
    assert_eq!(public, "ssh-rsa USERKEY me@host");
    #[cfg(unix)]
    assert_eq!(private_mode(&workspace.store), 0o600);
}

#[rstest]
fn missing_user_key_is_import_failure(workspace: Workspace) {
    let keygen = FakeKeygen::new();
    let missing = workspace.root.join("absent_key");
    let result = KeyProvisioner::new(&keygen, &workspace.store, "dev")
        .provision(Some(&missing), KeyReuse::Fresh);

    let Err(DriverError::KeyImportFailed { path, .. }) = result else {
        panic!("expected KeyImportFailed, got {result:?}");
    };
    assert_eq!(path, missing);
}

#[rstest]
fn keygen_exit_failure_is_generation_failure(workspace: Workspace) {
    let runner = ScriptedRunner::new();
    runner.push_failure(1);
    let result =
        KeyProvisioner::new(&runner, &workspace.store, "dev").provision(None, KeyReuse::Fresh);

    let Err(DriverError::KeyGenerationFailed { message }) = result else {
        panic!("expected KeyGenerationFailed, got {result:?}");
    };
    assert!(message.contains("simulated failure"), "{message}");
}

#[rstest]
fn missing_keygen_binary_is_generation_failure(workspace: Workspace) {
    let runner = ScriptedRunner::new();
    let result =
        KeyProvisioner::new(&runner, &workspace.store, "dev").provision(None, KeyReuse::Fresh);
    assert!(matches!(
        result,
        Err(DriverError::KeyGenerationFailed { .. })
    ));
}

#[rstest]
fn existing_keys_without_record_are_rejected(workspace: Workspace) {
    let keygen = FakeKeygen::new();
    let provisioner = KeyProvisioner::new(&keygen, &workspace.store, "dev");
    provisioner
        .provision(None, KeyReuse::Fresh)
        .unwrap_or_else(|err| panic!("first provision: {err}"));
    let before = workspace
        .store
        .read_public_key()
        .unwrap_or_else(|err| panic!("read public key: {err}"));

    let result = provisioner.provision(None, KeyReuse::Fresh);
    assert!(matches!(result, Err(DriverError::KeyMaterialExists { .. })));

    let after = workspace
        .store
        .read_public_key()
        .unwrap_or_else(|err| panic!("read public key: {err}"));
    assert_eq!(before, after, "existing keys must not be overwritten");
}

#[rstest]
fn existing_keys_are_reused_when_resuming(workspace: Workspace) {
    let keygen = FakeKeygen::new();
    let provisioner = KeyProvisioner::new(&keygen, &workspace.store, "dev");
    provisioner
        .provision(None, KeyReuse::Fresh)
        .unwrap_or_else(|err| panic!("first provision: {err}"));
    provisioner
        .provision(None, KeyReuse::Resume)
        .unwrap_or_else(|err| panic!("resume provision: {err}"));

    assert_eq!(keygen.invocations().len(), 1);
}

#[rstest]
fn user_key_without_public_half_leaves_nothing_behind(workspace: Workspace) {
    let dir = Dir::open_ambient_dir(&workspace.root, ambient_authority())
        .unwrap_or_else(|err| panic!("open root: {err}"));
    dir.write("lonely_key", "PRIVATE")
        .unwrap_or_else(|err| panic!("write private: {err}"));
    let user_key = workspace.root.join("lonely_key");
    let keygen = FakeKeygen::new();
    let provisioner = KeyProvisioner::new(&keygen, &workspace.store, "dev");

    for reuse in [KeyReuse::Fresh, KeyReuse::Resume] {
        let result = provisioner.provision(Some(&user_key), reuse);
        assert!(
            matches!(result, Err(DriverError::KeyImportFailed { .. })),
            "{reuse:?}: expected KeyImportFailed, got {result:?}"
        );
        assert_eq!(workspace.store.has_key_material(), Ok(false));
    }

    dir.write("lonely_key.pub", "ssh-rsa LATE me@host")
        .unwrap_or_else(|err| panic!("write public: {err}"));
    provisioner
        .provision(Some(&user_key), KeyReuse::Resume)
        .unwrap_or_else(|err| panic!("provision after fixing the key: {err}"));
    assert_eq!(workspace.store.has_key_pair(), Ok(true));
}

#[rstest]
fn incomplete_key_material_is_regenerated_when_resuming(workspace: Workspace) {
    let dir = workspace
        .store
        .ensure_dir()
        .unwrap_or_else(|err| panic!("ensure dir: {err}"));
    dir.write(PRIVATE_KEY_FILE, "TRUNCATED")
        .unwrap_or_else(|err| panic!("write private: {err}"));
    let keygen = FakeKeygen::new();

    KeyProvisioner::new(&keygen, &workspace.store, "dev")
        .provision(None, KeyReuse::Resume)
        .unwrap_or_else(|err| panic!("resume provision: {err}"));

    assert_eq!(keygen.invocations().len(), 1);
    assert_eq!(workspace.store.has_key_pair(), Ok(true));
}

#[rstest]
fn failed_generation_removes_partial_output(workspace: Workspace) {
    let runner = ScriptedRunner::new();
    runner.push_failure(1);
    let dir = workspace
        .store
        .ensure_dir()
        .unwrap_or_else(|err| panic!("ensure dir: {err}"));
    dir.write(PUBLIC_KEY_FILE, "ssh-rsa STALE")
        .unwrap_or_else(|err| panic!("write public: {err}"));

    let result =
        KeyProvisioner::new(&runner, &workspace.store, "dev").provision(None, KeyReuse::Resume);

    assert!(matches!(
        result,
        Err(DriverError::KeyGenerationFailed { .. })
    ));
    assert_eq!(workspace.store.has_key_material(), Ok(false));
}
