use crate::value::Value;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Variable holding the directory of the running executable.
pub const SHELL_DIR: &str = "SHELL_DIR";
/// Variable holding the shell version.
pub const VERSION: &str = "VERSION";

/// Mutable state of one shell session.
///
/// - `vars`: the variable environment. Assignments and `del` write it, external
///   programs receive it as their process environment.
/// - `current_dir`: the working directory for commands.
/// - `should_exit`: set by `exit`, checked by the REPL loop.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, Value>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the process environment as text variables, plus the reserved ones.
    pub fn new() -> Self {
        let vars = stdenv::vars().map(|(k, v)| (k, Value::Str(v))).collect();
        Self::with_vars(vars)
    }

    /// An environment holding exactly `vars` plus the reserved variables.
    pub fn with_vars(vars: HashMap<String, Value>) -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut env = Self {
            vars,
            current_dir,
            should_exit: false,
        };
        env.set_reserved();
        env
    }

    /// Restore an environment saved by [`Environment::to_serialized`].
    pub fn from_serialized(json: &str) -> serde_json::Result<Self> {
        let vars: HashMap<String, Value> = serde_json::from_str(json)?;
        Ok(Self::with_vars(vars))
    }

    /// The variables as a JSON object, used to carry them across a reload.
    pub fn to_serialized(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.vars)
    }

    fn set_reserved(&mut self) {
        let shell_dir = stdenv::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| self.current_dir.clone());
        self.set_var(SHELL_DIR, shell_dir.to_string_lossy().into_owned());
        self.set_var(VERSION, env!("CARGO_PKG_VERSION"));
    }

    pub fn get_var(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Textual form of a variable, as seen by external programs.
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.vars.get(key).map(Value::to_string)
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<Value>) {
        self.vars.insert(key.into(), val.into());
    }

    pub fn remove_var(&mut self, key: &str) -> Option<Value> {
        self.vars.remove(key)
    }

    /// The variables rendered as text, for a child process environment.
    pub fn process_vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    /// `HOME` (or `USERPROFILE`) as a path.
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get_text("HOME")
            .or_else(|| self.get_text("USERPROFILE"))
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_set_get_remove() {
        let mut env = Environment::with_vars(HashMap::new());
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", 5i64);
        assert_eq!(env.get_var("KEY"), Some(&Value::Int(5)));
        assert_eq!(env.get_text("KEY"), Some("5".to_string()));

        assert_eq!(env.remove_var("KEY"), Some(Value::Int(5)));
        assert_eq!(env.get_var("KEY"), None);
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert!(env.get_var(SHELL_DIR).is_some());
        assert_eq!(
            env.get_text(VERSION),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_serialized_round_trip_keeps_types() {
        let mut env = Environment::with_vars(HashMap::new());
        env.set_var("n", 3i64);
        env.set_var("x", 2.0f64);
        env.set_var("s", "text");

        let restored = Environment::from_serialized(&env.to_serialized().unwrap()).unwrap();
        assert_eq!(restored.get_var("n"), Some(&Value::Int(3)));
        assert_eq!(restored.get_var("x"), Some(&Value::Float(2.0)));
        assert_eq!(restored.get_var("s"), Some(&Value::from("text")));
    }

    #[test]
    fn test_from_serialized_rejects_garbage() {
        assert!(Environment::from_serialized("[1, 2]").is_err());
    }
}
