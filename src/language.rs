use crate::config::{Config, ConfigError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

static LANGUAGE_BY_EXTENSION: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (".java", "Java"),
        (".c", "C"),
        (".cpp", "C++"),
        (".h", "C++"),
        (".cc", "C++"),
        (".cxx", "C++"),
        (".c++", "C++"),
        (".py", "Python"),
        (".cs", "C#"),
        (".c#", "C#"),
        (".go", "Go"),
        (".m", "Objective-C"),
        (".hs", "Haskell"),
        (".pl", "Prolog"),
        (".js", "JavaScript"),
        (".php", "PHP"),
        (".rb", "Ruby"),
    ])
});

/// Languages whose judge needs an explicit entry point.
static NEEDS_MAINCLASS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["Java", "Python"]));

const PYTHON: &str = "Python";
const DEFAULT_PYTHON_MAJOR: char = '3';

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum InferenceError {
    #[error(
        "No language specified, and I failed to guess language from filename
extension \"{extension}\""
    )]
    UnknownLanguage { extension: String },
}

/// What the first file name tells us about the submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Guess {
    /// Base name without extension.
    pub(crate) stem: String,
    /// Extension including the leading dot, or empty.
    pub(crate) extension: String,
    pub(crate) language: Option<&'static str>,
    pub(crate) mainclass: Option<String>,
}

/// Splits like a shell user would expect: `dir/Foo.java` gives `Foo` and `.java`,
/// `.bashrc` has no extension.
fn split_file_name(path: &Path) -> (String, String) {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.rfind('.') {
        Some(index) if index > 0 => (
            file_name[..index].to_string(),
            file_name[index..].to_string(),
        ),
        _ => (file_name, String::new()),
    }
}

pub(crate) fn language_for_extension(extension: &str) -> Option<&'static str> {
    LANGUAGE_BY_EXTENSION.get(extension).copied()
}

pub(crate) fn needs_mainclass(language: &str) -> bool {
    NEEDS_MAINCLASS.contains(language)
}

pub(crate) fn guess(first_file: &Path) -> Guess {
    let (stem, extension) = split_file_name(first_file);
    let language = language_for_extension(&extension);
    let mainclass = language
        .filter(|language| needs_mainclass(language))
        .map(|_| stem.clone());
    Guess {
        stem,
        extension,
        language,
        mainclass,
    }
}

/// Picks the language string sent to the judge. An explicit language is sent
/// as is; a guessed Python gets its major version appended.
pub(crate) fn resolve_language(
    explicit: Option<&str>,
    guess: &Guess,
    config: &Config,
) -> anyhow::Result<String> {
    if let Some(language) = explicit {
        return Ok(language.to_string());
    }
    match guess.language {
        Some(PYTHON) => {
            let major = python_major(config)?;
            Ok(format!("{} {}", PYTHON, major))
        }
        Some(language) => Ok(language.to_string()),
        None => Err(InferenceError::UnknownLanguage {
            extension: guess.extension.clone(),
        }
        .into()),
    }
}

fn python_major(config: &Config) -> Result<char, ConfigError> {
    if let Some(major) = config.python_version()? {
        return Ok(major);
    }
    Ok(installed_python_major().unwrap_or(DEFAULT_PYTHON_MAJOR))
}

fn installed_python_major() -> Option<char> {
    ["python", "python3"].iter().find_map(|program| {
        let output = Command::new(program).arg("--version").output().ok()?;
        // Python 2 prints its version on stderr.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let major = parse_python_major(&text);
        debug!("{} --version: {:?}", program, major);
        major
    })
}

fn parse_python_major(version_output: &str) -> Option<char> {
    static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Python ([23])\.").unwrap());
    VERSION
        .captures(version_output)
        .and_then(|captures| captures[1].chars().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config_with(content: &str) -> Config {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".iic1103src");
        fs::write(&path, content).unwrap();
        Config::load(Some(&path)).unwrap()
    }

    #[test]
    fn every_extension_maps_to_its_language() {
        let table = [
            (".java", "Java"),
            (".c", "C"),
            (".cpp", "C++"),
            (".h", "C++"),
            (".cc", "C++"),
            (".cxx", "C++"),
            (".c++", "C++"),
            (".py", "Python"),
            (".cs", "C#"),
            (".c#", "C#"),
            (".go", "Go"),
            (".m", "Objective-C"),
            (".hs", "Haskell"),
            (".pl", "Prolog"),
            (".js", "JavaScript"),
            (".php", "PHP"),
            (".rb", "Ruby"),
        ];
        for (extension, language) in table {
            assert_eq!(language_for_extension(extension), Some(language), "{}", extension);
        }
    }

    #[test]
    fn unknown_extensions_have_no_language() {
        for extension in [".rs", ".txt", ".JAVA", "", ".kt"] {
            assert_eq!(language_for_extension(extension), None, "{}", extension);
        }
    }

    #[test]
    fn java_guesses_mainclass_from_file_name() {
        let guess = guess(Path::new("src/Foo.java"));

        assert_eq!(guess.stem, "Foo");
        assert_eq!(guess.extension, ".java");
        assert_eq!(guess.language, Some("Java"));
        assert_eq!(guess.mainclass.as_deref(), Some("Foo"));
    }

    #[test]
    fn ruby_has_no_mainclass() {
        let guess = guess(Path::new("script.rb"));

        assert_eq!(guess.language, Some("Ruby"));
        assert_eq!(guess.mainclass, None);
    }

    #[test]
    fn dotfile_has_no_extension() {
        let guess = guess(Path::new(".hidden"));

        assert_eq!(guess.stem, ".hidden");
        assert_eq!(guess.extension, "");
        assert_eq!(guess.language, None);
    }

    #[test]
    fn explicit_language_wins() {
        let guess = guess(Path::new("main.py"));
        let config = config_with("[defaults]\npython-version = 4\n");

        let language = resolve_language(Some("Python 3"), &guess, &config).unwrap();

        assert_eq!(language, "Python 3");
    }

    #[test]
    fn configured_python_version_is_used() {
        let guess = guess(Path::new("main.py"));
        let config = config_with("[defaults]\npython-version = 3\n");

        let language = resolve_language(None, &guess, &config).unwrap();

        assert_eq!(language, "Python 3");
    }

    #[test]
    fn invalid_python_version_fails() {
        let guess = guess(Path::new("main.py"));
        let config = config_with("[defaults]\npython-version = 4\n");

        let error = resolve_language(None, &guess, &config).unwrap_err();

        assert!(error
            .to_string()
            .contains("python-version in .iic1103src must be 2 or 3"));
    }

    #[test]
    fn unconfigured_python_uses_installed_interpreter() {
        let guess = guess(Path::new("main.py"));
        let expected = format!(
            "Python {}",
            installed_python_major().unwrap_or(DEFAULT_PYTHON_MAJOR)
        );

        let language = resolve_language(None, &guess, &Config::default()).unwrap();

        assert_eq!(language, expected);
    }

    #[test]
    fn unknown_extension_without_override_fails() {
        let guess = guess(Path::new("notes.txt"));

        let error = resolve_language(None, &guess, &Config::default()).unwrap_err();

        assert_eq!(
            error.downcast_ref::<InferenceError>(),
            Some(&InferenceError::UnknownLanguage {
                extension: ".txt".to_string()
            })
        );
    }

    #[test]
    fn parses_interpreter_version_output() {
        assert_eq!(parse_python_major("Python 3.11.4\n"), Some('3'));
        assert_eq!(parse_python_major("Python 2.7.18\n"), Some('2'));
        assert_eq!(parse_python_major("command not found"), None);
    }
}
