//! Directory helpers
//!
//! State (the audit log) lives under the XDG state directory. Backups are
//! deliberately NOT here: they go under the invoking user's home so an
//! operator recovering over a serial console finds them without knowing
//! the XDG layout.

use directories::ProjectDirs;
use std::path::PathBuf;

pub fn get_state_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "sshift", "sshift")
        .and_then(|pd| pd.state_dir().map(std::path::Path::to_path_buf))
}

pub fn ensure_state_dir() -> std::io::Result<()> {
    let Some(dir) = get_state_dir() else {
        return Ok(());
    };

    #[cfg(unix)]
    {
        use std::fs::DirBuilder;
        use std::os::unix::fs::DirBuilderExt;

        let mut builder = DirBuilder::new();
        builder.mode(0o700); // User read/write/execute only
        builder.recursive(true);
        builder.create(dir)
    }

    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir)
    }
}
