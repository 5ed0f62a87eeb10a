/// Config path resolution.
///
/// The config file is given on the command line and may use a leading `~`
/// for the home directory, the way a shell would expand it. The resolved
/// path is always absolute so log lines show exactly which file was read.
use std::path::{Component, Path, PathBuf};

/// Expands a leading `~` and makes `raw` absolute against the current
/// working directory. Absolute paths are returned unchanged.
pub fn resolve_config_path(raw: &Path) -> PathBuf {
    let expanded = expand_home(raw, dirs::home_dir().as_deref());
    if expanded.is_absolute() {
        return expanded;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(expanded),
        // Leave it relative; the "not found" error will still name it.
        Err(_) => expanded,
    }
}

/// Replaces a leading `~` component with `home`. `~user` forms are not
/// supported and are left as is, as is everything when `home` is unknown.
fn expand_home(raw: &Path, home: Option<&Path>) -> PathBuf {
    let mut components = raw.components();
    match (components.next(), home) {
        (Some(Component::Normal(first)), Some(home)) if first == "~" => {
            home.join(components.as_path())
        }
        _ => raw.to_path_buf(),
    }
}
