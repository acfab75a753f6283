//! Fake converter installs and managed-storage trees

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Converter that copies the source into a Zarr-shaped tree and stays silent
pub const COPYING_CONVERTER: &str = r#"set -e
mkdir -p "$3/0/0"
printf '{"zarr_format": 2}' > "$3/.zgroup"
printf '{"chunks": [1]}' > "$3/0/.zarray"
cat "$2" > "$3/0/0/0"
"#;

/// Converter that writes usable output but also a warning on stderr
pub const NOISY_CONVERTER: &str = r#"mkdir -p "$3/0"
cat "$2" > "$3/0/0"
echo "WARN: unsupported metadata key" >&2
"#;

/// Install `body` as `<install_dir>/bin/bioformats2raw`
pub fn install_converter(install_dir: &Path, body: &str) -> PathBuf {
    let bin = install_dir.join("bin");
    std::fs::create_dir_all(&bin).expect("create bin dir");
    let script = bin.join("bioformats2raw");
    std::fs::write(&script, format!("#!/bin/sh\n{}", body)).expect("write converter");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
        .expect("chmod converter");
    script
}

/// Place a file in managed storage at `<managed>/<dir>/<name>`
pub fn managed_file(managed: &Path, dir: &str, name: &str, content: &[u8]) {
    let parent = managed.join(dir);
    std::fs::create_dir_all(&parent).expect("create managed dir");
    std::fs::write(parent.join(name), content).expect("write managed file");
}
