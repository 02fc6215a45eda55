//! Device archive workflow: create, download, verify, clean up.
//!
//! This module implements the full lifecycle of a configuration archive
//! against one remote appliance:
//!
//! ```text
//! run_backup (workflow)
//!      │
//!      ├── create    direct save → async task fallback (create/start/poll/teardown)
//!      ├── download  range-GET session with size discovery
//!      ├── verify    remote md5sum vs local digest
//!      └── cleanup   retention sweep of remote archives
//! ```
//!
//! Each phase is an independent async function over `&dyn RestClient` and an
//! explicit `DeviceConfig`; nothing here holds state between calls. Failure
//! in one phase is returned as a typed `ArchiveError` and the caller decides
//! whether later phases still make sense.

mod cleanup;
mod create;
mod download;
mod error;
mod masterkey;
mod naming;
mod task;
mod verify;

pub use cleanup::{
    cleanup_archives, list_archives, CleanupReport, DeletedArchive, RetentionEntry,
};
pub use create::{
    create_archive, fetch_hostname, CreationMode, CreationPath, CreationReport, DeleteOutcome,
    GLOBAL_SETTINGS_ENDPOINT, HOSTNAME_QUERY, UCS_ENDPOINT,
};
pub use download::{download_archive, DownloadReport, ProgressFn, DOWNLOAD_ENDPOINT};
pub use error::{ArchiveError, ArchiveResult};
pub use masterkey::{track_master_key, MasterKeyReport, MasterKeyStatus};
pub use naming::{
    derive_archive_name, random_disambiguator, ArchiveName, ARCHIVE_SUFFIX, DISAMBIGUATOR_MAX,
    DISAMBIGUATOR_MIN,
};
pub use task::{AsyncTask, TaskState, TASK_ACK_PHRASE, TASK_ENDPOINT};
pub use verify::{verify_archive, ChecksumPair, BASH_ENDPOINT, REMOTE_ARCHIVE_DIR};
