//! Unique filename generation for the save-path naming law: a new download
//! never silently overwrites an existing file of the same name. Instead it
//! gets a `(n)` suffix inserted before the extension, like `archive (1).zip`.

/// Returns `candidate` unchanged if `exists(candidate)` is false, otherwise
/// finds the smallest `n >= 1` such that `"<stem> (<n>).<ext>"` does not
/// exist, and returns that name.
pub fn unique_filename(candidate: &str, mut exists: impl FnMut(&str) -> bool) -> String {
    if !exists(candidate) {
        return candidate.to_string();
    }

    let (stem, ext) = split_stem_ext(candidate);
    for n in 1u64.. {
        let attempt = match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        if !exists(&attempt) {
            return attempt;
        }
    }
    unreachable!("u64 counter exhausted")
}

/// Convenience wrapper over [`unique_filename`] backed by a plain list of
/// filenames already known to exist (e.g. fetched once from the database).
pub fn unique_filename_among(candidate: &str, existing: &[String]) -> String {
    unique_filename(candidate, |name| existing.iter().any(|e| e == name))
}

/// Splits `name` into `(stem, extension)`. A leading dot (dotfile) is kept as
/// part of the stem, matching how `Path::extension` treats e.g. `.gitignore`.
fn split_stem_ext(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_filename_passthrough_when_free() {
        assert_eq!(unique_filename("a.txt", |_| false), "a.txt");
    }

    #[test]
    fn unique_filename_suffixes_on_collision() {
        let taken = ["a.txt".to_string(), "a (1).txt".to_string()];
        assert_eq!(
            unique_filename_among("a.txt", &taken),
            "a (2).txt"
        );
    }

    #[test]
    fn unique_filename_first_collision() {
        let taken = ["a.txt".to_string()];
        assert_eq!(unique_filename_among("a.txt", &taken), "a (1).txt");
    }

    #[test]
    fn unique_filename_no_extension() {
        let taken = ["README".to_string()];
        assert_eq!(unique_filename_among("README", &taken), "README (1)");
    }

    #[test]
    fn unique_filename_dotfile_keeps_leading_dot() {
        assert_eq!(unique_filename(".bashrc", |_| false), ".bashrc");
        let taken = [".bashrc".to_string()];
        assert_eq!(unique_filename_among(".bashrc", &taken), ".bashrc (1)");
    }
}
