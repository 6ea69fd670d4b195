//! Per-machine namespaced storage for key files and the association record.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

use crate::naming::MachineRecord;

/// File name of the generated or copied private key.
pub const PRIVATE_KEY_FILE: &str = "id_rsa";
/// File name of the matching public key.
pub const PUBLIC_KEY_FILE: &str = "id_rsa.pub";
/// File name of the machine association record.
pub const RECORD_FILE: &str = "machine.json";
/// Permission bits applied to the private key file.
pub const PRIVATE_KEY_MODE: u32 = 0o600;

/// Errors raised while reading or writing machine state on disk.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StoreError {
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when a machine name would resolve outside its own directory.
    #[error("machine name {name:?} is not a single path component")]
    InvalidName {
        /// Rejected machine name.
        name: String,
    },
    /// Raised when the stored record cannot be parsed or rendered.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path of the malformed record.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Returns `true` when `name` maps to exactly one directory beneath the
/// store root: non-empty, not `.` or `..`, and free of path separators and
/// control characters.
#[must_use]
pub fn is_valid_machine_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name
            .chars()
            .any(|ch| ch == '/' || ch == '\\' || ch.is_control())
}

/// Storage directory dedicated to one machine: `<root>/machines/<name>`.
#[derive(Clone, Debug)]
pub struct MachineStore {
    parent: Utf8PathBuf,
    name: String,
    dir: Utf8PathBuf,
}

impl MachineStore {
    /// Builds a store for `machine_name` beneath `root`.
    #[must_use]
    pub fn new(root: &Utf8Path, machine_name: &str) -> Self {
        let parent = root.join("machines");
        Self {
            dir: parent.join(machine_name),
            parent,
            name: machine_name.to_owned(),
        }
    }

    /// Directory holding this machine's files.
    #[must_use]
    pub fn machine_dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Path of the private key file.
    #[must_use]
    pub fn private_key_path(&self) -> Utf8PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    /// Path of the public key file.
    #[must_use]
    pub fn public_key_path(&self) -> Utf8PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// Creates the machine directory if needed and returns a handle to it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created.
    pub fn ensure_dir(&self) -> Result<Dir, StoreError> {
        self.check_name()?;
        Dir::create_ambient_dir_all(&self.dir, ambient_authority())
            .map_err(|err| io_error(&self.dir, &err))?;
        self.open_dir()
    }

    fn check_name(&self) -> Result<(), StoreError> {
        if is_valid_machine_name(&self.name) {
            return Ok(());
        }
        Err(StoreError::InvalidName {
            name: self.name.clone(),
        })
    }

    fn open_dir(&self) -> Result<Dir, StoreError> {
        self.check_name()?;
        Dir::open_ambient_dir(&self.dir, ambient_authority())
            .map_err(|err| io_error(&self.dir, &err))
    }

    fn open_existing(&self) -> Result<Option<Dir>, StoreError> {
        self.check_name()?;
        match Dir::open_ambient_dir(&self.dir, ambient_authority()) {
            Ok(dir) => Ok(Some(dir)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&self.dir, &err)),
        }
    }

    /// Loads the association record, if one was written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the record exists but cannot be read or
    /// parsed.
    pub fn load_record(&self) -> Result<Option<MachineRecord>, StoreError> {
        let Some(dir) = self.open_existing()? else {
            return Ok(None);
        };
        let path = self.dir.join(RECORD_FILE);
        let contents = match dir.read_to_string(RECORD_FILE) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(&path, &err)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| StoreError::Parse {
                path,
                message: err.to_string(),
            })
    }

    /// Persists the association record, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when rendering or writing fails.
    pub fn save_record(&self, record: &MachineRecord) -> Result<(), StoreError> {
        let dir = self.ensure_dir()?;
        let path = self.dir.join(RECORD_FILE);
        let rendered =
            serde_json::to_string_pretty(record).map_err(|err| StoreError::Parse {
                path: path.clone(),
                message: err.to_string(),
            })?;
        dir.write(RECORD_FILE, rendered)
            .map_err(|err| io_error(&path, &err))
    }

    /// Returns `true` when either key file is already present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when existence checks fail.
    pub fn has_key_material(&self) -> Result<bool, StoreError> {
        Ok(self.key_file_presence()?.contains(&true))
    }

    /// Returns `true` only when both the private and the public key file are
    /// present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when existence checks fail.
    pub fn has_key_pair(&self) -> Result<bool, StoreError> {
        Ok(!self.key_file_presence()?.contains(&false))
    }

    fn key_file_presence(&self) -> Result<[bool; 2], StoreError> {
        let Some(dir) = self.open_existing()? else {
            return Ok([false, false]);
        };
        let exists = |name: &str| {
            dir.try_exists(name)
                .map_err(|err| io_error(&self.dir.join(name), &err))
        };
        Ok([exists(PRIVATE_KEY_FILE)?, exists(PUBLIC_KEY_FILE)?])
    }

    /// Deletes both key files. Files that are already absent are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when a file exists but cannot be removed.
    pub fn remove_key_material(&self) -> Result<(), StoreError> {
        let Some(dir) = self.open_existing()? else {
            return Ok(());
        };
        for name in [PRIVATE_KEY_FILE, PUBLIC_KEY_FILE] {
            match dir.remove_file(name) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(io_error(&self.dir.join(name), &err)),
            }
        }
        Ok(())
    }

    /// Reads the public key file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the file is missing or unreadable.
    pub fn read_public_key(&self) -> Result<String, StoreError> {
        let path = self.public_key_path();
        let dir = self.open_dir()?;
        dir.read_to_string(PUBLIC_KEY_FILE)
            .map_err(|err| io_error(&path, &err))
    }

    /// Copies `source` into the machine directory as `target_name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the source is missing or the copy
    /// fails.
    pub fn copy_in(&self, source: &Utf8Path, target_name: &str) -> Result<(), StoreError> {
        let parent = source.parent().unwrap_or_else(|| Utf8Path::new("."));
        let file_name = source.file_name().ok_or_else(|| StoreError::Io {
            path: source.to_path_buf(),
            message: String::from("path is missing a filename"),
        })?;
        let source_dir = Dir::open_ambient_dir(parent, ambient_authority())
            .map_err(|err| io_error(parent, &err))?;
        let target_dir = self.ensure_dir()?;
        source_dir
            .copy(file_name, &target_dir, target_name)
            .map(|_| ())
            .map_err(|err| io_error(source, &err))
    }

    /// Restricts the private key file to owner read/write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the permission change fails.
    #[cfg(unix)]
    pub fn restrict_private_key(&self) -> Result<(), StoreError> {
        use cap_std::fs_utf8::{Permissions, PermissionsExt};

        let dir = self.open_dir()?;
        dir.set_permissions(PRIVATE_KEY_FILE, Permissions::from_mode(PRIVATE_KEY_MODE))
            .map_err(|err| io_error(&self.private_key_path(), &err))
    }

    /// Permission bits are not modelled on this platform.
    ///
    /// # Errors
    ///
    /// Never fails.
    #[cfg(not(unix))]
    pub fn restrict_private_key(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Deletes the machine directory and everything in it. A missing
    /// directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when removal fails.
    pub fn remove_all(&self) -> Result<(), StoreError> {
        self.check_name()?;
        let parent = match Dir::open_ambient_dir(&self.parent, ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(io_error(&self.parent, &err)),
        };
        match parent.remove_dir_all(&self.name) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&self.dir, &err)),
        }
    }
}

fn io_error(path: &Utf8Path, err: &io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
