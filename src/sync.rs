// Cloud sync of the local task list for signed-in users
use crate::error::{AppError, Result};
use crate::session::Session;
use crate::tasks::{Storage, Task, TaskStore};
use async_trait::async_trait;

#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>>;
    async fn replace_tasks(&self, token: &str, tasks: &[Task]) -> Result<()>;
}

pub struct TaskSync<B> {
    backend: B,
}

impl<B: TaskBackend> TaskSync<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Overwrites the remote set with the local one.
    pub async fn push<S: Storage>(&self, session: Option<&Session>, store: &TaskStore<S>) -> Result<usize> {
        let session = session.ok_or(AppError::Unauthenticated)?;
        self.backend.replace_tasks(&session.token, store.tasks()).await?;
        tracing::info!("Pushed {} tasks for user {}", store.tasks().len(), session.user.id);
        Ok(store.tasks().len())
    }

    /// Overwrites the local set with the remote one.
    pub async fn pull<S: Storage>(&self, session: Option<&Session>, store: &mut TaskStore<S>) -> Result<usize> {
        let session = session.ok_or(AppError::Unauthenticated)?;
        let remote = self.backend.list_tasks(&session.token).await?;
        store.replace_all(remote)?;
        tracing::info!("Pulled {} tasks for user {}", store.tasks().len(), session.user.id);
        Ok(store.tasks().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::session_for;
    use crate::session::UserRole;
    use crate::tasks::MemoryStorage;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCloud {
        by_token: Mutex<HashMap<String, Vec<Task>>>,
    }

    #[async_trait]
    impl TaskBackend for FakeCloud {
        async fn list_tasks(&self, token: &str) -> Result<Vec<Task>> {
            Ok(self.by_token.lock().unwrap().get(token).cloned().unwrap_or_default())
        }

        async fn replace_tasks(&self, token: &str, tasks: &[Task]) -> Result<()> {
            self.by_token.lock().unwrap().insert(token.to_string(), tasks.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_push_then_pull_on_another_device() {
        let sync = TaskSync::new(FakeCloud::default());
        let session = session_for("sam@example.com", UserRole::User);

        let mut laptop = TaskStore::load(MemoryStorage::default()).unwrap();
        laptop.add("Renew passport", None).unwrap();
        laptop.add("Book dentist", None).unwrap();
        assert_eq!(sync.push(Some(&session), &laptop).await.unwrap(), 2);

        let mut phone = TaskStore::load(MemoryStorage::default()).unwrap();
        assert_eq!(sync.pull(Some(&session), &mut phone).await.unwrap(), 2);
        assert_eq!(phone.tasks(), laptop.tasks());
    }

    #[tokio::test]
    async fn test_sync_requires_session() {
        let sync = TaskSync::new(FakeCloud::default());
        let mut store = TaskStore::load(MemoryStorage::default()).unwrap();

        assert!(matches!(sync.push(None, &store).await, Err(AppError::Unauthenticated)));
        assert!(matches!(sync.pull(None, &mut store).await, Err(AppError::Unauthenticated)));
    }
}
