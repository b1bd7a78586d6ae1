use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Host primitives used by the time and environment builtins. Installing a
/// different implementation keeps the call sites stable for embedders that
/// sandbox the clock or the process environment.
pub trait Platform: Send + Sync {
    fn now_ms(&self) -> i64;
    fn sleep_ms(&self, millis: i64);
    fn env_var(&self, name: &str) -> Option<String>;
    fn set_env_var(&self, name: &str, value: &str) -> Result<(), String>;
}

pub struct StdPlatform;

impl Platform for StdPlatform {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn sleep_ms(&self, millis: i64) {
        if millis > 0 {
            std::thread::sleep(Duration::from_millis(millis as u64));
        }
    }

    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn set_env_var(&self, name: &str, value: &str) -> Result<(), String> {
        if name.is_empty() || name.contains(['=', '\0']) || value.contains('\0') {
            return Err(format!("invalid environment variable name `{name}`"));
        }
        std::env::set_var(name, value);
        Ok(())
    }
}

static PLATFORM: OnceLock<Box<dyn Platform>> = OnceLock::new();

pub fn platform() -> &'static dyn Platform {
    PLATFORM.get_or_init(|| Box::new(StdPlatform)).as_ref()
}

/// Must run before the first builtin call; afterwards the installed platform
/// is fixed and the rejected one is handed back.
pub fn install_platform<P: Platform + 'static>(platform: P) -> Result<(), Box<dyn Platform>> {
    PLATFORM.set(Box::new(platform))
}
