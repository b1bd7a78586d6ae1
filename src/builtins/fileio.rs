use super::{Arity, BuiltinEntry};
use crate::language::span::Span;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    numeric::{get_bool, get_string},
    value::{MapValue, Value},
};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

pub const NAMES: &[(&str, Arity)] = &[
    ("__appendtext__", Arity::Exact(2)),
    ("__copyfile__", Arity::Range(2, 3)),
    ("__createfile__", Arity::Exact(1)),
    ("__deletefile__", Arity::Exact(1)),
    ("__movefile__", Arity::Range(2, 3)),
    ("__readfile__", Arity::Exact(1)),
    ("__readlines__", Arity::Exact(1)),
    ("__writeline__", Arity::Exact(2)),
    ("__writetext__", Arity::Range(2, 3)),
    ("__fileexists__", Arity::Exact(1)),
    ("__fileext__", Arity::Exact(1)),
    ("__filename__", Arity::Exact(1)),
    ("__filesize__", Arity::Exact(1)),
    ("__filepath__", Arity::Exact(1)),
    ("__fileabspath__", Arity::Exact(1)),
    ("__fileattrs__", Arity::Exact(1)),
    ("__glob__", Arity::Range(1, 2)),
    ("__direxists__", Arity::Exact(1)),
    ("__dirname__", Arity::Exact(1)),
    ("__listdir__", Arity::Exact(1)),
    ("__mkdir__", Arity::Exact(1)),
    ("__mkdirp__", Arity::Exact(1)),
    ("__rmdir__", Arity::Range(1, 2)),
    ("__isdir__", Arity::Exact(1)),
    ("__chdir__", Arity::Exact(1)),
    ("__cwd__", Arity::Exact(0)),
];

pub fn execute(entry: &BuiltinEntry, args: &[Value], span: &Span) -> RuntimeResult<Value> {
    entry.check_arity(args, span)?;
    let name = entry.name;
    if name == "__cwd__" {
        let cwd = std::env::current_dir().map_err(|err| io_error(span, ".", err))?;
        return Ok(path_value(&cwd));
    }

    let path = get_string(name, &args[0], span)?;
    let flag = |index: usize, default: bool| -> RuntimeResult<bool> {
        match args.get(index) {
            Some(value) => get_bool(name, value, span),
            None => Ok(default),
        }
    };

    let value = match name {
        "__appendtext__" => {
            let text = get_string(name, &args[1], span)?;
            append(path, text, span)?;
            Value::Bool(true)
        }
        "__writeline__" => {
            let text = get_string(name, &args[1], span)?;
            append(path, &format!("{text}\n"), span)?;
            Value::Bool(true)
        }
        "__writetext__" => {
            let text = get_string(name, &args[1], span)?;
            if flag(2, false)? {
                append(path, text, span)?;
            } else {
                fs::write(path, text).map_err(|err| io_error(span, path, err))?;
            }
            Value::Bool(true)
        }
        "__createfile__" => {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| io_error(span, path, err))?;
            Value::Bool(true)
        }
        "__deletefile__" => {
            if !Path::new(path).is_file() {
                return Ok(Value::Bool(false));
            }
            fs::remove_file(path).map_err(|err| io_error(span, path, err))?;
            Value::Bool(true)
        }
        "__copyfile__" | "__movefile__" => {
            let target = get_string(name, &args[1], span)?;
            if !flag(2, true)? && Path::new(target).exists() {
                return Ok(Value::Bool(false));
            }
            if name == "__copyfile__" {
                fs::copy(path, target).map_err(|err| io_error(span, path, err))?;
            } else {
                fs::rename(path, target).map_err(|err| io_error(span, path, err))?;
            }
            Value::Bool(true)
        }
        "__readfile__" => {
            Value::String(fs::read_to_string(path).map_err(|err| io_error(span, path, err))?)
        }
        "__readlines__" => {
            let text = fs::read_to_string(path).map_err(|err| io_error(span, path, err))?;
            Value::list(text.lines().map(Value::string).collect())
        }
        "__fileexists__" => Value::Bool(Path::new(path).is_file()),
        "__direxists__" | "__isdir__" => Value::Bool(Path::new(path).is_dir()),
        "__fileext__" => component(Path::new(path).extension()),
        "__filename__" => component(Path::new(path).file_name()),
        "__dirname__" => {
            let dir = Path::new(path);
            let dir = if dir.is_dir() { Some(dir) } else { dir.parent() };
            component(dir.and_then(Path::file_name))
        }
        "__filepath__" => match Path::new(path).parent() {
            Some(parent) => path_value(parent),
            None => Value::string(""),
        },
        "__fileabspath__" => {
            let absolute = fs::canonicalize(path).map_err(|err| io_error(span, path, err))?;
            path_value(&absolute)
        }
        "__filesize__" => {
            let meta = fs::metadata(path).map_err(|err| io_error(span, path, err))?;
            Value::Int(meta.len() as i64)
        }
        "__fileattrs__" => attributes(path, span)?,
        "__listdir__" => {
            let mut entries = Vec::new();
            for entry in fs::read_dir(path).map_err(|err| io_error(span, path, err))? {
                let entry = entry.map_err(|err| io_error(span, path, err))?;
                entries.push(entry.path());
            }
            entries.sort();
            Value::list(entries.iter().map(|p| path_value(p)).collect())
        }
        "__mkdir__" => {
            fs::create_dir(path).map_err(|err| io_error(span, path, err))?;
            Value::Bool(true)
        }
        "__mkdirp__" => {
            fs::create_dir_all(path).map_err(|err| io_error(span, path, err))?;
            Value::Bool(true)
        }
        "__rmdir__" => {
            if flag(1, false)? {
                fs::remove_dir_all(path).map_err(|err| io_error(span, path, err))?;
            } else {
                fs::remove_dir(path).map_err(|err| io_error(span, path, err))?;
            }
            Value::Bool(true)
        }
        "__chdir__" => {
            std::env::set_current_dir(path).map_err(|err| io_error(span, path, err))?;
            Value::Bool(true)
        }
        "__glob__" => {
            let (base, pattern) = match args.get(1) {
                Some(pattern) => (PathBuf::from(path), get_string(name, pattern, span)?),
                None => (PathBuf::from("."), path),
            };
            let mut matches = glob(&base, pattern, span)?;
            matches.sort();
            matches.dedup();
            Value::list(matches.iter().map(|p| path_value(p)).collect())
        }
        _ => {
            return Err(RuntimeError::UnknownBuiltin {
                span: span.clone(),
                name: name.to_string(),
            })
        }
    };
    Ok(value)
}

fn io_error(span: &Span, path: impl AsRef<Path>, err: std::io::Error) -> RuntimeError {
    RuntimeError::io(span, format!("{}: {err}", path.as_ref().display()))
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

fn component(part: Option<&std::ffi::OsStr>) -> Value {
    Value::String(
        part.map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default(),
    )
}

fn append(path: &str, text: &str, span: &Span) -> RuntimeResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| io_error(span, path, err))?;
    file.write_all(text.as_bytes())
        .map_err(|err| io_error(span, path, err))
}

fn attributes(path: &str, span: &Span) -> RuntimeResult<Value> {
    let meta = fs::metadata(path).map_err(|err| io_error(span, path, err))?;
    let modified = meta
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|d| Value::Int(d.as_millis() as i64))
        .unwrap_or(Value::Null);
    let attrs = MapValue::new();
    attrs.insert(Value::string("size"), Value::Int(meta.len() as i64));
    attrs.insert(Value::string("is_file"), Value::Bool(meta.is_file()));
    attrs.insert(Value::string("is_dir"), Value::Bool(meta.is_dir()));
    attrs.insert(
        Value::string("readonly"),
        Value::Bool(meta.permissions().readonly()),
    );
    attrs.insert(Value::string("modified"), modified);
    Ok(Value::Map(attrs))
}

/// Expands `pattern` under `base`. Path segments may use `*` and `?`, and a
/// `**` segment matches any number of nested directories.
fn glob(base: &Path, pattern: &str, span: &Span) -> RuntimeResult<Vec<PathBuf>> {
    let (root, pattern) = if Path::new(pattern).is_absolute() {
        (PathBuf::from("/"), pattern.trim_start_matches('/'))
    } else {
        (base.to_path_buf(), pattern)
    };
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let mut found = Vec::new();
    expand(&root, &segments, &mut found, span)?;
    Ok(found)
}

fn expand(dir: &Path, segments: &[&str], found: &mut Vec<PathBuf>, span: &Span) -> RuntimeResult<()> {
    let Some((segment, rest)) = segments.split_first() else {
        found.push(dir.to_path_buf());
        return Ok(());
    };
    if *segment == "**" {
        expand(dir, rest, found, span)?;
        for child in children(dir, span)? {
            if child.is_dir() {
                expand(&child, segments, found, span)?;
            }
        }
        return Ok(());
    }
    if !segment.contains(['*', '?']) {
        let next = dir.join(segment);
        if next.exists() {
            expand(&next, rest, found, span)?;
        }
        return Ok(());
    }
    for child in children(dir, span)? {
        let matched = child
            .file_name()
            .map(|name| wildcard_match(segment, &name.to_string_lossy()))
            .unwrap_or(false);
        if matched && (rest.is_empty() || child.is_dir()) {
            expand(&child, rest, found, span)?;
        }
    }
    Ok(())
}

fn children(dir: &Path, span: &Span) -> RuntimeResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|err| io_error(span, dir, err))? {
        entries.push(entry.map_err(|err| io_error(span, dir, err))?.path());
    }
    Ok(entries)
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::dispatch;

    fn call(name: &str, args: &[Value]) -> RuntimeResult<Value> {
        dispatch(name, args, &Span::unknown())
    }

    fn text(path: &Path) -> Value {
        path_value(path)
    }

    #[test]
    fn write_append_and_read_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("notes.txt");
        call("__writetext__", &[text(&file), Value::string("one\n")]).expect("write");
        call("__writeline__", &[text(&file), Value::string("two")]).expect("line");
        call("__appendtext__", &[text(&file), Value::string("three")]).expect("append");
        assert_eq!(
            call("__readfile__", &[text(&file)]).expect("read").to_string(),
            "one\ntwo\nthree"
        );
        assert_eq!(
            call("__readlines__", &[text(&file)]).expect("lines").to_string(),
            "[\"one\", \"two\", \"three\"]"
        );
        assert!(matches!(call("__filesize__", &[text(&file)]), Ok(Value::Int(13))));
        assert_eq!(call("__fileext__", &[text(&file)]).expect("ext").to_string(), "txt");
        assert_eq!(
            call("__filename__", &[text(&file)]).expect("name").to_string(),
            "notes.txt"
        );
    }

    #[test]
    fn copy_move_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("a.txt");
        let copy = dir.path().join("b.txt");
        let moved = dir.path().join("c.txt");
        call("__createfile__", &[text(&source)]).expect("create");
        call("__copyfile__", &[text(&source), text(&copy)]).expect("copy");
        assert!(matches!(
            call("__copyfile__", &[text(&source), text(&copy), Value::Bool(false)]),
            Ok(Value::Bool(false))
        ));
        call("__movefile__", &[text(&copy), text(&moved)]).expect("move");
        assert!(matches!(call("__fileexists__", &[text(&copy)]), Ok(Value::Bool(false))));
        assert!(matches!(call("__deletefile__", &[text(&moved)]), Ok(Value::Bool(true))));
        assert!(matches!(call("__deletefile__", &[text(&moved)]), Ok(Value::Bool(false))));
        let err = call("__readfile__", &[text(&moved)]).expect_err("missing");
        assert!(matches!(err, RuntimeError::Io { .. }));
    }

    #[test]
    fn directories_and_globs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("x/y");
        call("__mkdirp__", &[text(&nested)]).expect("mkdirp");
        fs::write(dir.path().join("x/top.kiwi"), "").expect("seed");
        fs::write(nested.join("deep.kiwi"), "").expect("seed");
        fs::write(nested.join("skip.txt"), "").expect("seed");

        assert!(matches!(call("__isdir__", &[text(&nested)]), Ok(Value::Bool(true))));
        assert_eq!(call("__dirname__", &[text(&nested)]).expect("dirname").to_string(), "y");
        let listed = call("__listdir__", &[text(&dir.path().join("x"))]).expect("list");
        assert_eq!(listed.list_len(), 2);

        let found = call("__glob__", &[text(dir.path()), Value::string("**/*.kiwi")])
            .expect("glob");
        assert_eq!(found.list_len(), 2);
        let found = call("__glob__", &[text(dir.path()), Value::string("x/*.kiwi")])
            .expect("glob");
        assert_eq!(found.list_len(), 1);

        let err = call("__rmdir__", &[text(&dir.path().join("x"))]).expect_err("not empty");
        assert!(matches!(err, RuntimeError::Io { .. }));
        call("__rmdir__", &[text(&dir.path().join("x")), Value::Bool(true)]).expect("recursive");
        assert!(matches!(call("__direxists__", &[text(&nested)]), Ok(Value::Bool(false))));
    }

    #[test]
    fn wildcards() {
        assert!(wildcard_match("*.kiwi", "main.kiwi"));
        assert!(wildcard_match("m?in.*", "main.rs"));
        assert!(!wildcard_match("*.kiwi", "main.rs"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
    }

    trait ListLen {
        fn list_len(&self) -> usize;
    }

    impl ListLen for Value {
        fn list_len(&self) -> usize {
            match self {
                Value::List(list) => list.len(),
                other => panic!("expected list, got {other:?}"),
            }
        }
    }
}
