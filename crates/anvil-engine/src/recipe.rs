//! Recipes: the work bound to a target
//!
//! A recipe runs at most once per build per target, only when the scheduler
//! has found the target stale and every producer fresh. Built-in kinds cover
//! the common cases (subprocess command, file copy, deletion); programmatic
//! clients can bind arbitrary closures.

use crate::fsutil;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Closure recipe signature; the error string becomes the failure cause
pub type RecipeFn = dyn Fn(&RecipeContext) -> Result<(), String> + Send + Sync;

/// Everything a recipe may consult while running
#[derive(Debug, Clone)]
pub struct RecipeContext {
    /// Qualified target name, for messages
    pub target: String,
    /// Artifact path for concrete targets
    pub target_path: Option<PathBuf>,
    /// Concrete producer paths (declared plus discovered), in order
    pub producers: Vec<PathBuf>,
    /// Environment for subprocess recipes: namespace vars plus flag
    /// categories (CPPFLAGS, CFLAGS, CXXFLAGS, LDFLAGS), plus OUT/IN
    pub env: HashMap<String, String>,
    /// Working directory for subprocess recipes
    pub working_dir: Option<PathBuf>,
    /// Build-wide subprocess timeout; a recipe's own timeout wins
    pub timeout: Option<Duration>,
    /// Verbose output
    pub verbose: bool,
}

/// Subprocess recipe
#[derive(Debug, Clone)]
pub struct CommandRecipe {
    command: String,
    timeout: Option<Duration>,
}

impl CommandRecipe {
    /// Create a shell command recipe
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: None,
        }
    }

    /// Set a per-recipe timeout, overriding the build-wide one
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The command line
    pub fn command(&self) -> &str {
        &self.command
    }

    fn run(&self, ctx: &RecipeContext) -> Result<(), String> {
        if ctx.verbose {
            println!("  $ {}", self.command);
        }

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .envs(&ctx.env)
            .stdin(Stdio::null());
        if let Some(dir) = &ctx.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("failed to spawn '{}': {}", self.command, e))?;

        let timeout = self.timeout.or(ctx.timeout);
        let status = match timeout {
            Some(limit) => {
                let deadline = Instant::now() + limit;
                loop {
                    match child.try_wait() {
                        Ok(Some(status)) => break status,
                        Ok(None) => {
                            if Instant::now() >= deadline {
                                let _ = child.kill();
                                let _ = child.wait();
                                return Err(format!(
                                    "timed out after {:.1}s",
                                    limit.as_secs_f64()
                                ));
                            }
                            std::thread::sleep(Duration::from_millis(10));
                        }
                        Err(e) => return Err(format!("failed to wait for subprocess: {}", e)),
                    }
                }
            }
            None => child
                .wait()
                .map_err(|e| format!("failed to wait for subprocess: {}", e))?,
        };

        if status.success() {
            Ok(())
        } else {
            match status.code() {
                Some(code) => Err(format!("exited with status {}", code)),
                None => Err("terminated by signal".to_string()),
            }
        }
    }
}

/// The unit of work bound to a target
#[derive(Clone)]
pub enum Recipe {
    /// Run a shell command
    Command(CommandRecipe),
    /// Copy the first producer to the target path
    Copy,
    /// Delete the listed paths
    Delete(Vec<PathBuf>),
    /// Programmatic closure
    Func(Arc<RecipeFn>),
}

impl Recipe {
    /// Shell command recipe
    pub fn command(command: impl Into<String>) -> Self {
        Self::Command(CommandRecipe::new(command))
    }

    /// Closure recipe
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&RecipeContext) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::Func(Arc::new(f))
    }

    /// Execute the recipe; the error string is the failure cause
    pub fn run(&self, ctx: &RecipeContext) -> Result<(), String> {
        match self {
            Self::Command(command) => command.run(ctx),
            Self::Copy => {
                let to = ctx
                    .target_path
                    .as_ref()
                    .ok_or_else(|| "copy recipe on a virtual target".to_string())?;
                let from = ctx
                    .producers
                    .first()
                    .ok_or_else(|| "copy recipe without a producer".to_string())?;
                fsutil::copy_file(from, to).map_err(|e| e.to_string())
            }
            Self::Delete(paths) => fsutil::remove_any(paths).map_err(|e| e.to_string()),
            Self::Func(f) => f(ctx),
        }
    }
}

impl std::fmt::Debug for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(c) => f.debug_tuple("Command").field(&c.command).finish(),
            Self::Copy => write!(f, "Copy"),
            Self::Delete(paths) => f.debug_tuple("Delete").field(paths).finish(),
            Self::Func(_) => write!(f, "Func(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> RecipeContext {
        RecipeContext {
            target: "test".to_string(),
            target_path: None,
            producers: Vec::new(),
            env: HashMap::new(),
            working_dir: Some(dir.path().to_path_buf()),
            timeout: None,
            verbose: false,
        }
    }

    #[test]
    fn test_command_success() {
        let dir = TempDir::new().unwrap();
        let recipe = Recipe::command("echo hello > out.txt");
        recipe.run(&context(&dir)).unwrap();
        assert!(dir.path().join("out.txt").exists());
    }

    #[test]
    fn test_command_failure_reports_status() {
        let dir = TempDir::new().unwrap();
        let recipe = Recipe::command("exit 3");
        let err = recipe.run(&context(&dir)).unwrap_err();
        assert!(err.contains("status 3"), "unexpected cause: {}", err);
    }

    #[test]
    fn test_command_env() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        ctx.env.insert("CPPFLAGS".to_string(), "-DX".to_string());
        let recipe = Recipe::command("printf '%s' \"$CPPFLAGS\" > flags.txt");
        recipe.run(&ctx).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("flags.txt")).unwrap(),
            "-DX"
        );
    }

    #[test]
    fn test_command_timeout_kills() {
        let dir = TempDir::new().unwrap();
        let recipe =
            Recipe::Command(CommandRecipe::new("sleep 5").with_timeout(Duration::from_millis(50)));
        let start = Instant::now();
        let err = recipe.run(&context(&dir)).unwrap_err();
        assert!(err.contains("timed out"), "unexpected cause: {}", err);
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_copy_recipe() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("a.h");
        let to = dir.path().join("include/a.h");
        fs::write(&from, "header").unwrap();

        let mut ctx = context(&dir);
        ctx.target_path = Some(to.clone());
        ctx.producers = vec![from];
        Recipe::Copy.run(&ctx).unwrap();
        assert_eq!(fs::read_to_string(&to).unwrap(), "header");
    }

    #[test]
    fn test_copy_without_producer_fails() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        ctx.target_path = Some(dir.path().join("x"));
        assert!(Recipe::Copy.run(&ctx).is_err());
    }

    #[test]
    fn test_delete_recipe() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("stale.o");
        fs::write(&file, "").unwrap();
        Recipe::Delete(vec![file.clone()]).run(&context(&dir)).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn test_func_recipe() {
        let dir = TempDir::new().unwrap();
        let recipe = Recipe::from_fn(|ctx| {
            if ctx.target == "test" {
                Ok(())
            } else {
                Err("wrong target".to_string())
            }
        });
        recipe.run(&context(&dir)).unwrap();
    }
}
