//! Canonical directory identity.
//!
//! Every directory that reaches the store goes through [`normalize_directory`]
//! on both the write and the read path, so two spellings of one location
//! always land in the same partition. Normalization is purely lexical: it
//! never touches the filesystem and never resolves symlinks, which keeps it
//! deterministic for directories that no longer exist.
//!
//! Rules:
//! - `\` separators become `/`
//! - a leading `~` or `~/` expands to the home directory
//! - relative paths are joined onto the base directory (the process cwd)
//! - `.` segments, empty segments and trailing slashes are dropped
//! - `..` pops the previous segment and never climbs above the root
//! - `C:` drive prefixes are kept with the letter upper-cased
//! - on Windows a leading `//server` is a UNC prefix; elsewhere a leading
//!   `//` is the same directory as `/`

use std::path::Path;

/// Normalize `raw` against the current working directory and home directory.
///
/// An empty string means "the current directory".
pub fn normalize_directory(raw: &str) -> String {
    let cwd = std::env::current_dir().ok();
    let home = dirs::home_dir();
    normalize_with_base(raw, cwd.as_deref(), home.as_deref())
}

/// Fully injectable form of [`normalize_directory`].
///
/// `base` resolves relative input; when it is `None` (or itself relative)
/// relative input is rooted at `/`.
pub fn normalize_with_base(raw: &str, base: Option<&Path>, home: Option<&Path>) -> String {
    let unified = raw.replace('\\', "/");
    let expanded = expand_home(&unified, home);

    let (prefix, mut segments, rest) = match split_root(&expanded) {
        Some((prefix, rest)) => (prefix, Vec::new(), rest),
        None => {
            let (prefix, segments) = base_root(base);
            (prefix, segments, expanded.as_str())
        }
    };
    push_segments(&mut segments, rest);
    render(&prefix, &segments)
}

fn expand_home(path: &str, home: Option<&Path>) -> String {
    let Some(home) = home else {
        return path.to_string();
    };
    let home = home.to_string_lossy().replace('\\', "/");
    if path == "~" {
        return home;
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return format!("{home}/{rest}");
    }
    path.to_string()
}

/// `X:` followed by a separator or nothing. `a:b` is an ordinary name.
fn drive_letter(path: &str) -> Option<char> {
    let mut chars = path.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() || chars.next() != Some(':') {
        return None;
    }
    matches!(chars.next(), None | Some('/')).then_some(letter)
}

/// Split an absolute path into its root prefix and the remainder; `None`
/// for relative input.
///
/// The prefix is rendered without its trailing separator: `""` for a plain
/// POSIX root, `"//"` for UNC (Windows only), `"C:"` for a drive.
fn split_root(path: &str) -> Option<(String, &str)> {
    if let Some(letter) = drive_letter(path) {
        return Some((format!("{}:", letter.to_ascii_uppercase()), &path[2..]));
    }
    if cfg!(windows) && path.starts_with("//") && !path.starts_with("///") {
        return Some(("//".to_string(), &path[2..]));
    }
    path.starts_with('/').then(|| (String::new(), path))
}

/// Root and segments of the base directory. A missing or relative base is `/`.
fn base_root(base: Option<&Path>) -> (String, Vec<String>) {
    let Some(base) = base else {
        return (String::new(), Vec::new());
    };
    let unified = base.to_string_lossy().replace('\\', "/");
    let Some((prefix, rest)) = split_root(&unified) else {
        return (String::new(), Vec::new());
    };
    let mut segments = Vec::new();
    push_segments(&mut segments, rest);
    (prefix, segments)
}

fn push_segments(segments: &mut Vec<String>, path: &str) {
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
}

fn render(prefix: &str, segments: &[String]) -> String {
    let joined = segments.join("/");
    if prefix == "//" {
        format!("//{joined}")
    } else {
        format!("{prefix}/{joined}")
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn norm(raw: &str) -> String {
        let base = PathBuf::from("/home/user/work");
        let home = PathBuf::from("/home/user");
        normalize_with_base(raw, Some(&base), Some(&home))
    }

    #[test]
    fn already_normal_path_is_unchanged() {
        assert_eq!(norm("/test/directory"), "/test/directory");
        assert_eq!(norm("/"), "/");
    }

    #[test]
    fn trailing_and_repeated_separators_collapse() {
        assert_eq!(norm("/test/directory/"), "/test/directory");
        assert_eq!(norm("/test//directory///"), "/test/directory");
        assert_eq!(norm("///"), "/");
    }

    #[test]
    fn dot_segments_are_resolved() {
        assert_eq!(norm("/a/./b/../c"), "/a/c");
        assert_eq!(norm("/a/b/.."), "/a");
        assert_eq!(norm("/a/."), "/a");
    }

    #[test]
    fn parent_segments_never_climb_above_root() {
        assert_eq!(norm("/../../etc"), "/etc");
        assert_eq!(norm("/.."), "/");
    }

    #[test]
    fn relative_paths_join_the_base() {
        assert_eq!(norm("project"), "/home/user/work/project");
        assert_eq!(norm("./project/"), "/home/user/work/project");
        assert_eq!(norm("../other"), "/home/user/other");
    }

    #[test]
    fn empty_input_means_base_directory() {
        assert_eq!(norm(""), "/home/user/work");
        assert_eq!(norm("."), "/home/user/work");
    }

    #[test]
    fn relative_input_without_base_is_rooted() {
        assert_eq!(normalize_with_base("a/b", None, None), "/a/b");
        assert_eq!(
            normalize_with_base("a", Some(Path::new("relative/base")), None),
            "/a"
        );
    }

    #[test]
    fn home_directory_is_expanded() {
        assert_eq!(norm("~"), "/home/user");
        assert_eq!(norm("~/code/"), "/home/user/code");
        // Only a bare `~` prefix expands; `~bob` is an ordinary segment.
        assert_eq!(norm("~bob"), "/home/user/work/~bob");
    }

    #[test]
    fn backslashes_become_forward_slashes() {
        assert_eq!(norm("C:\\Users\\me\\proj"), "C:/Users/me/proj");
        assert_eq!(norm("/mixed\\style/path"), "/mixed/style/path");
    }

    #[test]
    fn drive_letters_are_upper_cased_and_kept() {
        assert_eq!(norm("c:/Users/me/"), "C:/Users/me");
        assert_eq!(norm("d:"), "D:/");
        assert_eq!(norm("C:\\..\\.."), "C:/");
    }

    #[cfg(windows)]
    #[test]
    fn unc_prefix_is_preserved() {
        assert_eq!(norm("\\\\server\\share\\dir"), "//server/share/dir");
        assert_eq!(norm("//server/share/./x/.."), "//server/share");
    }

    #[cfg(not(windows))]
    #[test]
    fn leading_double_slash_is_the_root() {
        assert_eq!(norm("//home/u/proj"), "/home/u/proj");
        assert_eq!(norm("//home/u/proj"), norm("/home/u/proj"));
        assert_eq!(norm("//"), "/");
    }

    #[test]
    fn root_base_joins_without_doubling_the_separator() {
        let root = PathBuf::from("/");
        assert_eq!(normalize_with_base("", Some(&root), None), "/");
        assert_eq!(normalize_with_base(".", Some(&root), None), "/");
        assert_eq!(normalize_with_base("etc", Some(&root), None), "/etc");
        assert_eq!(
            normalize_with_base("", Some(&root), None),
            normalize_with_base("/", Some(&root), None)
        );
    }

    #[test]
    fn colon_without_separator_is_not_a_drive() {
        let base = PathBuf::from("/work");
        assert_eq!(normalize_with_base("a:b", Some(&base), None), "/work/a:b");
        assert_eq!(normalize_with_base("a:", Some(&base), None), "A:/");
    }

    #[test]
    fn windows_base_root_joins_relative_input() {
        let base = PathBuf::from("C:\\");
        assert_eq!(normalize_with_base("proj", Some(&base), None), "C:/proj");
    }

    #[test]
    fn relative_input_joins_a_windows_base() {
        let base = PathBuf::from("C:\\work");
        assert_eq!(normalize_with_base("sub\\dir", Some(&base), None), "C:/work/sub/dir");
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            "",
            ".",
            "/",
            "/a/b/../c/",
            "rel/./x",
            "~/x",
            "C:\\a\\b",
            "c:",
            "\\\\srv\\share",
            "//double/lead",
            "a:b",
            "///triple",
            "/with space/ and trailing /",
        ];
        for raw in inputs {
            let once = norm(raw);
            assert_eq!(norm(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn equivalent_spellings_share_identity() {
        assert_eq!(norm("/test/directory"), norm("/test/./directory/"));
        assert_eq!(norm("/test/directory"), norm("/test/x/../directory"));
        assert_eq!(norm("/home/user/work"), norm(""));
    }
}
