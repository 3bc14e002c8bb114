use tokio::sync::Mutex as AsyncMutex;

/// Serializes tests that read or mutate process environment variables.
/// Sync tests take `.blocking_lock()`, async tests `.lock().await`.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());
